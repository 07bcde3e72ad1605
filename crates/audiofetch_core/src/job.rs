/// Opaque server-assigned job identifier.
pub type JobId = String;

/// Milliseconds since the Unix epoch. The only clock the core knows about.
pub type Millis = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JobStatus {
    #[default]
    Pending,
    Detecting,
    Downloading,
    Streaming,
    Completed,
    Error,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Error | JobStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Detecting => "detecting",
            JobStatus::Downloading => "downloading",
            JobStatus::Streaming => "streaming",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DownloadMode {
    /// Artifact is streamed to this client when ready.
    #[default]
    Browser,
    /// Artifact is persisted on the server; requires a credential.
    Server,
}

impl DownloadMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DownloadMode::Browser => "browser",
            DownloadMode::Server => "server",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: u64,
    pub total: u64,
}

impl Progress {
    /// `round(100 * completed / total)`, clamped to 100; zero when `total` is zero.
    /// `completed` capped at `total`.
    pub fn clamped(self) -> Self {
        Self {
            completed: self.completed.min(self.total),
            total: self.total,
        }
    }

    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let completed = self.completed.min(self.total) as u128;
        let total = self.total as u128;
        ((200 * completed + total) / (2 * total)) as u8
    }
}

/// Partial job state as delivered by the push channel or the job list.
///
/// Absent fields leave the stored value untouched on merge.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub download_mode: Option<DownloadMode>,
    pub progress: Option<Progress>,
    pub message: Option<String>,
    pub auto_download: Option<bool>,
    pub created_at: Option<Millis>,
    pub queue_position: Option<u32>,
    pub download_name: Option<String>,
}

/// Last-known state of one server job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub job_id: JobId,
    pub status: JobStatus,
    download_mode: Option<DownloadMode>,
    pub progress: Option<Progress>,
    pub message: String,
    pub auto_download: bool,
    pub created_at: Option<Millis>,
    pub queue_position: Option<u32>,
    pub download_name: Option<String>,
}

impl Job {
    pub fn new(job_id: impl Into<JobId>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::default(),
            download_mode: None,
            progress: None,
            message: String::new(),
            auto_download: false,
            created_at: None,
            queue_position: None,
            download_name: None,
        }
    }

    pub fn from_patch(job_id: impl Into<JobId>, patch: &JobPatch) -> Self {
        let mut job = Self::new(job_id);
        job.merge(patch);
        job
    }

    /// Mode the job was created with; browser until the server says otherwise.
    pub fn download_mode(&self) -> DownloadMode {
        self.download_mode.unwrap_or_default()
    }

    /// Merges present fields, last write wins. Returns whether anything changed.
    ///
    /// `download_mode` is only written while unknown. While the job stays in
    /// `downloading` with an unchanged total, `progress.completed` never moves
    /// backwards. Stored progress never exceeds its total.
    pub fn merge(&mut self, patch: &JobPatch) -> bool {
        let before = self.clone();

        if let Some(mode) = patch.download_mode {
            if self.download_mode.is_none() {
                self.download_mode = Some(mode);
            }
        }
        if let Some(progress) = patch.progress.map(Progress::clamped) {
            let keep_previous = match (self.progress, patch.status.unwrap_or(self.status)) {
                (Some(prev), JobStatus::Downloading) => {
                    self.status == JobStatus::Downloading
                        && prev.total == progress.total
                        && progress.completed < prev.completed
                }
                _ => false,
            };
            if !keep_previous {
                self.progress = Some(progress);
            }
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(message) = &patch.message {
            self.message.clone_from(message);
        }
        if let Some(auto_download) = patch.auto_download {
            self.auto_download = auto_download;
        }
        if let Some(created_at) = patch.created_at {
            self.created_at = Some(created_at);
        }
        if let Some(position) = patch.queue_position {
            self.queue_position = Some(position);
        }
        if let Some(name) = &patch.download_name {
            self.download_name = Some(name.clone());
        }

        *self != before
    }
}
