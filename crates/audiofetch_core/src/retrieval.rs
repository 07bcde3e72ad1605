use std::collections::HashMap;

use crate::job::{JobId, Millis};

/// Delay between deciding to auto-download and firing the retrieval.
pub const AUTO_DOWNLOAD_DELAY_MS: Millis = 500;
/// How long a fired retrieval blocks further triggers for the same job.
pub const RETRIEVAL_RELEASE_MS: Millis = 5_000;

/// Tab-local guard collapsing rapid repeated retrieval triggers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RetrievalGuard {
    in_progress: HashMap<JobId, Millis>,
    scheduled: Vec<(JobId, Millis)>,
}

impl RetrievalGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `job_id` for a retrieval fired at `now`. `false` while a previous
    /// claim has not been released.
    pub fn try_begin(&mut self, job_id: &str, now: Millis) -> bool {
        if self.in_progress.contains_key(job_id) {
            return false;
        }
        self.in_progress
            .insert(job_id.to_owned(), now + RETRIEVAL_RELEASE_MS);
        true
    }

    pub fn is_in_progress(&self, job_id: &str) -> bool {
        self.in_progress.contains_key(job_id)
    }

    /// Queues an automatic retrieval to fire after the settle delay.
    pub fn schedule(&mut self, job_id: &str, now: Millis) {
        if self.scheduled.iter().any(|(id, _)| id == job_id) {
            return;
        }
        self.scheduled
            .push((job_id.to_owned(), now + AUTO_DOWNLOAD_DELAY_MS));
    }

    pub fn scheduled_count(&self) -> usize {
        self.scheduled.len()
    }

    /// Drops expired claims and returns scheduled retrievals that are due.
    pub fn advance(&mut self, now: Millis) -> Vec<JobId> {
        self.in_progress.retain(|_, release_at| *release_at > now);

        let (due, pending): (Vec<_>, Vec<_>) = self
            .scheduled
            .drain(..)
            .partition(|(_, fire_at)| *fire_at <= now);
        self.scheduled = pending;
        due.into_iter().map(|(job_id, _)| job_id).collect()
    }
}
