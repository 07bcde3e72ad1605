//! JSON shapes exchanged with the server.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireStatus {
    Pending,
    Detecting,
    Downloading,
    Streaming,
    Completed,
    Error,
    Cancelled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireMode {
    Browser,
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireProgress {
    pub completed: u64,
    pub total: u64,
}

/// A full or partial job record. Every field is optional so the same type
/// decodes `GET /api/jobs` elements and `job_update` deltas.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<WireStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_mode: Option<WireMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<WireProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_download: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Server → client push frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelFrame {
    ConnectionEstablished {
        connection_id: String,
    },
    JobUpdate {
        job_id: String,
        #[serde(default)]
        data: JobRecord,
    },
    #[serde(other)]
    Unknown,
}

/// Body of `POST /api/download`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateJobBody {
    pub url: String,
    pub name: Option<String>,
    pub plugin: Option<String>,
    pub workers: u32,
    pub download_mode: WireMode,
    pub auth_token: Option<String>,
    pub connection_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct LoginBody<'a> {
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LoginResponse {
    pub access_token: String,
}

/// Error body of a rejected request. `detail` is usually a string but some
/// validation errors carry a structured value.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn detail_text(self) -> Option<String> {
        match self.detail? {
            serde_json::Value::String(text) => Some(text),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServerDownloadRecord {
    pub name: String,
    #[serde(default)]
    pub files: u64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub created: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServerConfigRecord {
    #[serde(default)]
    pub contact_email: Option<String>,
}
