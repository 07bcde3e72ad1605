use std::collections::HashMap;

use crate::job::{Job, JobId, JobPatch, JobStatus, Millis};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    job: Job,
    seq: u64,
    first_seen: Millis,
    last_update: Millis,
}

/// Outcome of a single `apply_update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub created: bool,
    pub changed: bool,
    pub previous_status: Option<JobStatus>,
}

/// Authoritative client-side map of job id to last-known job state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobRegistry {
    entries: HashMap<JobId, Entry>,
    next_seq: u64,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `patch` into the record for `job_id`, creating it if absent.
    pub fn apply_update(&mut self, job_id: &str, patch: &JobPatch, now: Millis) -> Applied {
        if let Some(entry) = self.entries.get_mut(job_id) {
            let previous_status = Some(entry.job.status);
            let changed = entry.job.merge(patch);
            if changed {
                entry.last_update = now;
            }
            return Applied {
                created: false,
                changed,
                previous_status,
            };
        }

        self.next_seq += 1;
        self.entries.insert(
            job_id.to_owned(),
            Entry {
                job: Job::from_patch(job_id, patch),
                seq: self.next_seq,
                first_seen: now,
                last_update: now,
            },
        );
        Applied {
            created: true,
            changed: true,
            previous_status: None,
        }
    }

    pub fn remove(&mut self, job_id: &str) -> Option<Job> {
        self.entries.remove(job_id).map(|entry| entry.job)
    }

    pub fn get(&self, job_id: &str) -> Option<&Job> {
        self.entries.get(job_id).map(|entry| &entry.job)
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.entries.contains_key(job_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_update(&self, job_id: &str) -> Option<Millis> {
        self.entries.get(job_id).map(|entry| entry.last_update)
    }

    pub fn first_seen(&self, job_id: &str) -> Option<Millis> {
        self.entries.get(job_id).map(|entry| entry.first_seen)
    }

    pub fn ids(&self) -> Vec<JobId> {
        self.entries.keys().cloned().collect()
    }

    /// Jobs newest first, along with their last-update timestamp.
    pub fn iter_newest_first(&self) -> impl Iterator<Item = (&Job, Millis)> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by(|a, b| b.seq.cmp(&a.seq));
        entries
            .into_iter()
            .map(|entry| (&entry.job, entry.last_update))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: JobStatus) -> JobPatch {
        JobPatch {
            status: Some(status),
            ..JobPatch::default()
        }
    }

    #[test]
    fn redundant_update_keeps_last_update() {
        let mut registry = JobRegistry::new();
        let first = registry.apply_update("a", &status(JobStatus::Streaming), 1_000);
        assert!(first.created);

        let again = registry.apply_update("a", &status(JobStatus::Streaming), 9_000);
        assert!(!again.created);
        assert!(!again.changed);
        assert_eq!(registry.last_update("a"), Some(1_000));

        let moved = registry.apply_update("a", &status(JobStatus::Completed), 12_000);
        assert!(moved.changed);
        assert_eq!(moved.previous_status, Some(JobStatus::Streaming));
        assert_eq!(registry.last_update("a"), Some(12_000));
        assert_eq!(registry.first_seen("a"), Some(1_000));
    }

    #[test]
    fn newest_jobs_come_first() {
        let mut registry = JobRegistry::new();
        registry.apply_update("old", &JobPatch::default(), 0);
        registry.apply_update("new", &JobPatch::default(), 0);
        registry.apply_update("old", &status(JobStatus::Detecting), 5);

        let ids: Vec<_> = registry
            .iter_newest_first()
            .map(|(job, _)| job.job_id.clone())
            .collect();
        assert_eq!(ids, vec!["new".to_string(), "old".to_string()]);
    }
}
