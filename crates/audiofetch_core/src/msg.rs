use crate::channel::ChannelEvent;
use crate::error::ClientError;
use crate::job::{JobId, JobPatch, Millis};
use crate::reconcile::FetchPurpose;
use crate::session::{ActionOrigin, CreatedJob, DownloadForm, ServerConfig, ServerDownload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Clock tick; drives every timer. The first tick starts the client.
    Tick { now: Millis },
    /// Push connection lifecycle.
    Channel(ChannelEvent),
    /// `job_update` frame from the push connection.
    JobUpdate { job_id: JobId, patch: JobPatch },
    /// `GET /api/jobs` finished.
    JobsFetched {
        purpose: FetchPurpose,
        result: Result<Vec<(JobId, JobPatch)>, ClientError>,
    },
    /// User submitted the download form.
    DownloadSubmitted(DownloadForm),
    /// `POST /api/download` finished.
    JobCreated(Result<CreatedJob, ClientError>),
    CancelClicked(JobId),
    ClearClicked(JobId),
    /// User asked for the artifact of a ready job.
    RetrieveClicked(JobId),
    JobCancelFinished {
        job_id: JobId,
        origin: ActionOrigin,
        result: Result<(), ClientError>,
    },
    JobDeleteFinished {
        job_id: JobId,
        origin: ActionOrigin,
        result: Result<(), ClientError>,
    },
    /// Artifact retrieval finished; `Ok` carries where it was saved.
    ArtifactSaved {
        job_id: JobId,
        result: Result<String, ClientError>,
    },
    LoginSubmitted { password: String },
    LoginFinished(Result<String, ClientError>),
    LogoutClicked,
    /// Credential found in durable storage, at startup or written by another tab.
    CredentialSynced(Option<String>),
    /// Ledger snapshot found in durable storage.
    LedgerSynced(Vec<JobId>),
    ServerDownloadsRefreshClicked,
    ServerDownloadsLoaded(Result<Vec<ServerDownload>, ClientError>),
    ServerZipClicked { name: String },
    ServerZipSaved {
        name: String,
        result: Result<String, ClientError>,
    },
    ServerDeleteClicked { name: String },
    ServerDeleteFinished {
        name: String,
        result: Result<(), ClientError>,
    },
    ConfigLoaded(Result<ServerConfig, ClientError>),
    /// Fallback for placeholder wiring.
    NoOp,
}
