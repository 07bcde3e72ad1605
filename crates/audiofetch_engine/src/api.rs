use std::path::{Path, PathBuf};
use std::time::Duration;

use audiofetch_logging::{af_debug, af_warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::artifact::save_response;
use crate::types::{ApiError, FailureKind};
use crate::wire::{
    CreateJobBody, ErrorBody, JobRecord, LoginBody, LoginResponse, ServerConfigRecord,
    ServerDownloadRecord,
};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000/";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVER_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ApiSettings {
    /// `{base_url}/{segments...}?{query...}`, with every segment percent-encoded.
    pub fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::new(FailureKind::InvalidUrl, "base url cannot hold a path"))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }
}

/// The server's HTTP surface as consumed by this client.
#[async_trait::async_trait]
pub trait JobApi: Send + Sync {
    /// Exchanges a password for a bearer credential.
    async fn login(&self, password: &str) -> Result<String, ApiError>;
    async fn create_job(&self, body: &CreateJobBody) -> Result<JobRecord, ApiError>;
    async fn list_jobs(&self) -> Result<Vec<JobRecord>, ApiError>;
    async fn cancel_job(&self, job_id: &str) -> Result<(), ApiError>;
    async fn delete_job(&self, job_id: &str) -> Result<(), ApiError>;
    async fn list_server_downloads(&self, token: &str)
        -> Result<Vec<ServerDownloadRecord>, ApiError>;
    async fn delete_server_download(&self, name: &str, token: &str) -> Result<(), ApiError>;
    async fn server_config(&self) -> Result<ServerConfigRecord, ApiError>;
    /// Streams a finished job's artifact into `dir`; returns the saved path.
    async fn save_artifact(&self, job_id: &str, dir: &Path) -> Result<PathBuf, ApiError>;
    /// Streams a zip of a server-side download into `dir`.
    async fn save_server_zip(&self, name: &str, token: &str, dir: &Path)
        -> Result<PathBuf, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestApi {
    settings: ApiSettings,
    client: reqwest::Client,
    /// Artifact and zip downloads. No total deadline, only a per-read one,
    /// so a long transfer survives while a stalled one still fails.
    transfer_client: reqwest::Client,
}

impl ReqwestApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        let transfer_client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            settings,
            client,
            transfer_client,
        })
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<Response, ApiError> {
        self.send_with(&self.client, method, url, body).await
    }

    async fn send_with(
        &self,
        client: &reqwest::Client,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<Response, ApiError> {
        let label = format!("{method} {}", url.path());
        let mut request = client.request(method, url);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }
        let response = request.send().await.map_err(|err| {
            let error = map_reqwest_error(err);
            af_warn!("{label} failed: {error}");
            error
        })?;
        let response = check_status(response).await.inspect_err(|error| {
            af_warn!("{label} rejected: {error}");
        })?;
        af_debug!("{label} -> {}", response.status());
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<T, ApiError> {
        let response = self.send(method, url, body).await?;
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&bytes)
            .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
    }
}

#[async_trait::async_trait]
impl JobApi for ReqwestApi {
    async fn login(&self, password: &str) -> Result<String, ApiError> {
        let url = self.settings.endpoint(&["api", "auth", "login"], &[])?;
        let body = encode(&LoginBody { password })?;
        let response: LoginResponse = self.send_json(Method::POST, url, Some(body)).await?;
        Ok(response.access_token)
    }

    async fn create_job(&self, body: &CreateJobBody) -> Result<JobRecord, ApiError> {
        let url = self.settings.endpoint(&["api", "download"], &[])?;
        self.send_json(Method::POST, url, Some(encode(body)?)).await
    }

    async fn list_jobs(&self) -> Result<Vec<JobRecord>, ApiError> {
        let url = self.settings.endpoint(&["api", "jobs"], &[])?;
        self.send_json(Method::GET, url, None).await
    }

    async fn cancel_job(&self, job_id: &str) -> Result<(), ApiError> {
        let url = self
            .settings
            .endpoint(&["api", "jobs", job_id, "cancel"], &[])?;
        self.send(Method::POST, url, None).await.map(|_| ())
    }

    async fn delete_job(&self, job_id: &str) -> Result<(), ApiError> {
        let url = self.settings.endpoint(&["api", "jobs", job_id], &[])?;
        self.send(Method::DELETE, url, None).await.map(|_| ())
    }

    async fn list_server_downloads(
        &self,
        token: &str,
    ) -> Result<Vec<ServerDownloadRecord>, ApiError> {
        let url = self
            .settings
            .endpoint(&["api", "downloads"], &[("auth_token", token)])?;
        self.send_json(Method::GET, url, None).await
    }

    async fn delete_server_download(&self, name: &str, token: &str) -> Result<(), ApiError> {
        let url = self
            .settings
            .endpoint(&["api", "downloads", name], &[("auth_token", token)])?;
        self.send(Method::DELETE, url, None).await.map(|_| ())
    }

    async fn server_config(&self) -> Result<ServerConfigRecord, ApiError> {
        let url = self.settings.endpoint(&["api", "config"], &[])?;
        self.send_json(Method::GET, url, None).await
    }

    async fn save_artifact(&self, job_id: &str, dir: &Path) -> Result<PathBuf, ApiError> {
        let url = self.settings.endpoint(&["api", "stream", job_id], &[])?;
        let response = self
            .send_with(&self.transfer_client, Method::GET, url, None)
            .await?;
        save_response(response, dir, &format!("{job_id}.zip")).await
    }

    async fn save_server_zip(
        &self,
        name: &str,
        token: &str,
        dir: &Path,
    ) -> Result<PathBuf, ApiError> {
        let url = self
            .settings
            .endpoint(&["api", "downloads", name, "zip"], &[("auth_token", token)])?;
        let response = self
            .send_with(&self.transfer_client, Method::GET, url, None)
            .await?;
        save_response(response, dir, &format!("{name}.zip")).await
    }
}

fn encode<T: serde::Serialize>(body: &T) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec(body).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
}

/// Turns a non-2xx response into an error carrying the server's `detail`.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let detail = match response.bytes().await {
        Ok(bytes) => serde_json::from_slice::<ErrorBody>(&bytes)
            .ok()
            .and_then(ErrorBody::detail_text),
        Err(_) => None,
    };
    Err(ApiError::new(FailureKind::HttpStatus(status.as_u16()), status.to_string())
        .with_detail(detail))
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::Decode, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(base: &str) -> ApiSettings {
        ApiSettings {
            base_url: base.to_string(),
            ..ApiSettings::default()
        }
    }

    #[test]
    fn endpoint_encodes_segments_and_query() {
        let url = settings("http://host:9000")
            .endpoint(&["api", "downloads", "my album/1", "zip"], &[("auth_token", "a&b")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://host:9000/api/downloads/my%20album%2F1/zip?auth_token=a%26b"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let url = settings("http://host/prefix/")
            .endpoint(&["api", "jobs"], &[])
            .unwrap();
        assert_eq!(url.as_str(), "http://host/prefix/api/jobs");
    }

    #[test]
    fn endpoint_rejects_unusable_base() {
        let err = settings("not a url").endpoint(&["api"], &[]).unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidUrl);
    }
}
