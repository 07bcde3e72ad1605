use crate::job::JobId;
use crate::reconcile::FetchPurpose;
use crate::session::{ActionOrigin, CreateJobRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    OpenChannel,
    FetchJobs { purpose: FetchPurpose },
    CreateJob(CreateJobRequest),
    CancelJob { job_id: JobId, origin: ActionOrigin },
    DeleteJob { job_id: JobId, origin: ActionOrigin },
    RetrieveArtifact { job_id: JobId },
    /// Write the full ledger to durable storage.
    PersistLedger { job_ids: Vec<JobId> },
    /// Write (or with `None`, erase) the durable credential.
    PersistCredential { token: Option<String> },
    Login { password: String },
    LoadServerDownloads { token: String },
    FetchServerZip { name: String, token: String },
    DeleteServerDownload { name: String, token: String },
    LoadConfig,
}
