use crate::job::{DownloadMode, Job, JobId, JobStatus, Millis};
use crate::notification::NotificationLevel;
use crate::session::ServerDownload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    Connected,
    #[default]
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    Cancel,
    Retrieve,
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressView {
    pub completed: u64,
    pub total: u64,
    pub percent: u8,
}

/// Disposable projection of one job. Never read back as state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobView {
    pub job_id: JobId,
    pub name: String,
    pub status: JobStatus,
    pub mode: DownloadMode,
    pub message: String,
    pub progress: Option<ProgressView>,
    pub status_text: Option<&'static str>,
    pub actions: Vec<JobAction>,
    pub queue_position: Option<u32>,
    pub created_at: Option<Millis>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthView {
    pub authenticated: bool,
    pub server_mode_available: bool,
    pub server_downloads_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmitView {
    pub enabled: bool,
    pub cooldown_secs: Option<u64>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDownloadView {
    pub name: String,
    pub files: u64,
    pub size_text: String,
    pub created: Option<Millis>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationView {
    pub level: NotificationLevel,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub connection: ConnectionStatus,
    pub auth: AuthView,
    pub submit: SubmitView,
    pub jobs: Vec<JobView>,
    pub server_downloads: Vec<ServerDownloadView>,
    pub notifications: Vec<NotificationView>,
    pub contact_email: Option<String>,
    pub dirty: bool,
}

/// Pure projection of a job record into its view and available actions.
pub fn render(job: &Job) -> JobView {
    let mode = job.download_mode();
    let (status_text, actions) = match (job.status, mode) {
        (JobStatus::Pending | JobStatus::Detecting, _) => (None, vec![JobAction::Cancel]),
        (JobStatus::Downloading, DownloadMode::Browser) => {
            (Some("Streaming to your browser..."), Vec::new())
        }
        (JobStatus::Downloading, DownloadMode::Server) => (Some("Saving to server..."), Vec::new()),
        (JobStatus::Streaming, DownloadMode::Browser) => (
            Some("Ready!"),
            vec![JobAction::Retrieve, JobAction::Cancel],
        ),
        (JobStatus::Streaming, DownloadMode::Server) => (None, Vec::new()),
        (JobStatus::Completed | JobStatus::Error | JobStatus::Cancelled, _) => {
            (None, vec![JobAction::Clear])
        }
    };

    JobView {
        job_id: job.job_id.clone(),
        name: job
            .download_name
            .clone()
            .unwrap_or_else(|| "Unnamed".to_string()),
        status: job.status,
        mode,
        message: job.message.clone(),
        progress: job.progress.map(|progress| ProgressView {
            completed: progress.completed,
            total: progress.total,
            percent: progress.percent(),
        }),
        status_text,
        actions,
        queue_position: job
            .queue_position
            .filter(|_| job.status == JobStatus::Pending),
        created_at: job.created_at,
    }
}

pub fn render_server_download(download: &ServerDownload) -> ServerDownloadView {
    ServerDownloadView {
        name: download.name.clone(),
        files: download.files,
        size_text: format_size(download.size),
        created: download.created,
    }
}

/// Human-readable size with one decimal, up to GB.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}
