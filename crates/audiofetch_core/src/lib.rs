//! Audiofetch core: pure job-tracking state machine and view-model helpers.
mod channel;
mod effect;
mod error;
mod job;
mod ledger;
mod msg;
mod notification;
mod reconcile;
mod registry;
mod retrieval;
mod session;
mod state;
mod sweeper;
mod update;
mod view_model;

pub use channel::{
    ChannelAction, ChannelEvent, ChannelState, LiveChannel, CONNECT_TIMEOUT_MS,
    FALLBACK_POLL_INTERVAL_MS, RECONNECT_DELAY_MS,
};
pub use effect::Effect;
pub use error::ClientError;
pub use job::{DownloadMode, Job, JobId, JobPatch, JobStatus, Millis, Progress};
pub use ledger::AutoDownloadLedger;
pub use msg::Msg;
pub use notification::{Notification, NotificationLevel, Notifications, NOTIFICATION_LIFETIME_MS};
pub use reconcile::{plan as plan_reconciliation, FetchPurpose, ReconcilePlan, RECONCILE_GRACE_MS};
pub use registry::{Applied, JobRegistry};
pub use retrieval::{RetrievalGuard, AUTO_DOWNLOAD_DELAY_MS, RETRIEVAL_RELEASE_MS};
pub use session::{
    ActionOrigin, AuthSession, CreateJobRequest, CreatedJob, DownloadForm, ServerConfig,
    ServerDownload, SubmitGate, DEFAULT_WORKERS, RATE_LIMIT_COOLDOWN_MS,
};
pub use state::AppState;
pub use sweeper::{sweep, SweepPlan, STREAMING_STALE_MS, SWEEP_INTERVAL_MS, TERMINAL_STALE_MS};
pub use update::update;
pub use view_model::{
    format_size, render, AppViewModel, AuthView, ConnectionStatus, JobAction, JobView,
    NotificationView, ProgressView, ServerDownloadView, SubmitView,
};
