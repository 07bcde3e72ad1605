use crate::job::{DownloadMode, JobId, Millis};

/// Cooldown imposed after the server rate-limits a submission.
pub const RATE_LIMIT_COOLDOWN_MS: Millis = 60_000;
pub const DEFAULT_WORKERS: u32 = 5;

/// Bearer credential for privileged operations. The server alone decides
/// whether it is valid.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthSession {
    token: Option<String>,
}

impl AuthSession {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn sign_in(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Returns whether a credential was held.
    pub fn sign_out(&mut self) -> bool {
        self.token.take().is_some()
    }
}

/// What the user filled into the download form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DownloadForm {
    pub url: String,
    pub name: Option<String>,
    pub plugin: Option<String>,
    pub workers: Option<u32>,
    pub mode: DownloadMode,
}

/// Body of `POST /api/download`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateJobRequest {
    pub url: String,
    pub name: Option<String>,
    pub plugin: Option<String>,
    pub workers: u32,
    pub download_mode: DownloadMode,
    pub auth_token: Option<String>,
    pub connection_id: Option<String>,
}

/// Who asked for a cancel/delete; decides whether the outcome is announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOrigin {
    User,
    Sweeper,
}

/// Blocks submissions while a rate-limit cooldown is running.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmitGate {
    cooldown_until: Option<Millis>,
}

impl SubmitGate {
    pub fn can_submit(&self, now: Millis) -> bool {
        self.cooldown_until.is_none_or(|until| now >= until)
    }

    pub fn start_cooldown(&mut self, now: Millis) {
        self.cooldown_until = Some(now + RATE_LIMIT_COOLDOWN_MS);
    }

    /// Whole seconds left, rounded up.
    pub fn remaining_secs(&self, now: Millis) -> Option<u64> {
        self.cooldown_until
            .filter(|until| *until > now)
            .map(|until| (until - now).div_ceil(1_000))
    }

    /// Clears an expired cooldown. Returns `true` when it was released.
    pub fn advance(&mut self, now: Millis) -> bool {
        match self.cooldown_until {
            Some(until) if now >= until => {
                self.cooldown_until = None;
                true
            }
            _ => false,
        }
    }
}

/// A server-side download folder (server mode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDownload {
    pub name: String,
    pub files: u64,
    pub size: u64,
    pub created: Option<Millis>,
}

/// Public server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerConfig {
    pub contact_email: Option<String>,
}

/// A job as returned by `POST /api/download`.
pub type CreatedJob = (JobId, crate::job::JobPatch);
