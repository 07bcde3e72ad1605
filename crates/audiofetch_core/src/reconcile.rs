//! Resynchronising the registry against the server's authoritative job list.

use std::collections::HashSet;

use crate::job::{DownloadMode, JobId, JobPatch, JobStatus, Millis};
use crate::registry::JobRegistry;

/// Jobs first seen this recently are never treated as orphans; the server's
/// list endpoint may not reflect a job this client has just created.
pub const RECONCILE_GRACE_MS: Millis = 10_000;

/// Why the job list was fetched. Decides how much of the reconciliation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPurpose {
    /// Requested at startup. Whichever list is applied first acts as the
    /// initial load, whatever its purpose.
    InitialLoad,
    /// After the push channel (re)opens: full reconciliation.
    Reconcile,
    /// While disconnected: add and update, never remove.
    FallbackPoll,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconcilePlan {
    /// Displayed jobs the server no longer knows about.
    pub remove: Vec<JobId>,
    /// Every server job, to be merged through the registry.
    pub apply: Vec<(JobId, JobPatch)>,
    /// Jobs to record in the ledger without retrieving them.
    pub mark_downloaded: Vec<JobId>,
    /// Whether merges may trigger automatic retrievals.
    pub allow_auto_download: bool,
    /// Whether a staleness sweep should follow.
    pub sweep_after: bool,
}

/// `first_list` is true for the first job list this client applies. It adds
/// everything and records ready browser jobs instead of retrieving them, so a
/// restart never fetches an artifact a second time.
pub fn plan(
    registry: &JobRegistry,
    server_jobs: Vec<(JobId, JobPatch)>,
    purpose: FetchPurpose,
    first_list: bool,
    now: Millis,
) -> ReconcilePlan {
    let mut remove = Vec::new();
    if purpose == FetchPurpose::Reconcile {
        let server_ids: HashSet<&str> = server_jobs.iter().map(|(id, _)| id.as_str()).collect();
        remove = registry
            .ids()
            .into_iter()
            .filter(|id| !server_ids.contains(id.as_str()))
            .filter(|id| {
                registry
                    .first_seen(id)
                    .is_some_and(|seen| now.saturating_sub(seen) >= RECONCILE_GRACE_MS)
            })
            .collect();
        remove.sort();
    }

    let mark_downloaded = if first_list {
        server_jobs
            .iter()
            .filter(|(_, patch)| {
                patch.status == Some(JobStatus::Streaming)
                    && patch.download_mode.unwrap_or_default() == DownloadMode::Browser
            })
            .map(|(id, _)| id.clone())
            .collect()
    } else {
        Vec::new()
    };

    ReconcilePlan {
        remove,
        apply: server_jobs,
        mark_downloaded,
        allow_auto_download: !first_list,
        sweep_after: purpose == FetchPurpose::Reconcile,
    }
}
