use crate::job::{JobId, JobStatus, Millis};
use crate::registry::JobRegistry;

pub const SWEEP_INTERVAL_MS: Millis = 60_000;
/// A `streaming` job untouched for longer than this is treated as abandoned.
pub const STREAMING_STALE_MS: Millis = 10 * 60 * 1_000;
/// A terminal job untouched for longer than this is purged.
pub const TERMINAL_STALE_MS: Millis = 30 * 60 * 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SweepPlan {
    pub cancel: Vec<JobId>,
    pub purge: Vec<JobId>,
}

impl SweepPlan {
    pub fn is_empty(&self) -> bool {
        self.cancel.is_empty() && self.purge.is_empty()
    }
}

/// Collects stale jobs. Thresholds are exclusive: a job exactly at the limit
/// is left alone.
pub fn sweep(registry: &JobRegistry, now: Millis) -> SweepPlan {
    let mut plan = SweepPlan::default();
    for (job, last_update) in registry.iter_newest_first() {
        let age = now.saturating_sub(last_update);
        if job.status == JobStatus::Streaming && age > STREAMING_STALE_MS {
            plan.cancel.push(job.job_id.clone());
        } else if job.status.is_terminal() && age > TERMINAL_STALE_MS {
            plan.purge.push(job.job_id.clone());
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobPatch;

    const MINUTE: Millis = 60_000;

    fn registry_with(status: JobStatus, at: Millis) -> JobRegistry {
        let mut registry = JobRegistry::new();
        registry.apply_update(
            "job",
            &JobPatch {
                status: Some(status),
                ..JobPatch::default()
            },
            at,
        );
        registry
    }

    #[test]
    fn streaming_job_is_cancelled_after_ten_minutes() {
        let registry = registry_with(JobStatus::Streaming, 0);
        assert!(sweep(&registry, 9 * MINUTE).is_empty());
        assert!(sweep(&registry, STREAMING_STALE_MS).is_empty());
        assert_eq!(sweep(&registry, 11 * MINUTE).cancel, vec!["job".to_string()]);
    }

    #[test]
    fn terminal_jobs_are_purged_after_thirty_minutes() {
        for status in [JobStatus::Completed, JobStatus::Error, JobStatus::Cancelled] {
            let registry = registry_with(status, 0);
            assert!(sweep(&registry, 29 * MINUTE).is_empty());
            let plan = sweep(&registry, 31 * MINUTE);
            assert_eq!(plan.purge, vec!["job".to_string()]);
            assert!(plan.cancel.is_empty());
        }
    }

    #[test]
    fn active_jobs_are_never_swept() {
        for status in [JobStatus::Pending, JobStatus::Detecting, JobStatus::Downloading] {
            let registry = registry_with(status, 0);
            assert!(sweep(&registry, 120 * MINUTE).is_empty());
        }
    }
}
