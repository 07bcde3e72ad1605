use std::fmt;
use std::path::PathBuf;

use crate::wire::{ChannelFrame, JobRecord, ServerConfigRecord, ServerDownloadRecord};

pub type JobId = String;

/// Why a job list was requested; echoed back with the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPurpose {
    Initial,
    Reconcile,
    Poll,
}

/// Who asked for a cancel or delete; echoed back with the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    Sweeper,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    ChannelOpened,
    ChannelFrame(ChannelFrame),
    ChannelClosed {
        reason: Option<String>,
    },
    JobsFetched {
        purpose: ListPurpose,
        result: Result<Vec<JobRecord>, ApiError>,
    },
    JobCreated(Result<JobRecord, ApiError>),
    JobCancelled {
        job_id: JobId,
        origin: Origin,
        result: Result<(), ApiError>,
    },
    JobDeleted {
        job_id: JobId,
        origin: Origin,
        result: Result<(), ApiError>,
    },
    ArtifactSaved {
        job_id: JobId,
        result: Result<PathBuf, ApiError>,
    },
    LoggedIn(Result<String, ApiError>),
    ServerDownloadsLoaded(Result<Vec<ServerDownloadRecord>, ApiError>),
    ServerZipSaved {
        name: String,
        result: Result<PathBuf, ApiError>,
    },
    ServerDownloadDeleted {
        name: String,
        result: Result<(), ApiError>,
    },
    ConfigLoaded(Result<ServerConfigRecord, ApiError>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
    /// Server-supplied `detail`, when the error body carried one.
    pub detail: Option<String>,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail;
        self
    }

    pub fn status(&self) -> Option<u16> {
        match self.kind {
            FailureKind::HttpStatus(code) => Some(code),
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {} ({detail})", self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Decode,
    Io,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Decode => write!(f, "malformed response"),
            FailureKind::Io => write!(f, "io error"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
