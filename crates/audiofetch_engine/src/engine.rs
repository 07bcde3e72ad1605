use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;

use audiofetch_logging::{af_debug, af_error};
use tokio::task::JoinHandle;
use url::Url;

use crate::api::{ApiSettings, JobApi, ReqwestApi};
use crate::channel::{channel_url, run_channel, HANDSHAKE_TIMEOUT};
use crate::types::{ApiError, EngineEvent, JobId, ListPurpose, Origin};
use crate::wire::CreateJobBody;

enum EngineCommand {
    OpenChannel,
    ListJobs { purpose: ListPurpose },
    CreateJob(CreateJobBody),
    CancelJob { job_id: JobId, origin: Origin },
    DeleteJob { job_id: JobId, origin: Origin },
    SaveArtifact { job_id: JobId },
    Login { password: String },
    ListServerDownloads { token: String },
    SaveServerZip { name: String, token: String },
    DeleteServerDownload { name: String, token: String },
    LoadConfig,
}

/// Runs every network operation on a background tokio runtime and hands the
/// results back as [`EngineEvent`]s, polled with [`EngineHandle::try_recv`].
/// Clones share the same runtime and event queue.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineHandle {
    pub fn new(settings: ApiSettings, download_dir: PathBuf) -> Result<Self, ApiError> {
        let channel = channel_url(&settings.base_url)?;
        let api = ReqwestApi::new(settings)?;
        Ok(Self::with_api(Arc::new(api), channel, download_dir))
    }

    pub fn with_api(api: Arc<dyn JobApi>, channel: Url, download_dir: PathBuf) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    af_error!("Could not start tokio runtime: {err}");
                    return;
                }
            };
            let download_dir = Arc::new(download_dir);
            let mut live: Option<JoinHandle<()>> = None;
            while let Ok(command) = cmd_rx.recv() {
                if let EngineCommand::OpenChannel = command {
                    // At most one connection at a time.
                    if let Some(previous) = live.take() {
                        previous.abort();
                    }
                    live = Some(runtime.spawn(run_channel(
                        channel.clone(),
                        HANDSHAKE_TIMEOUT,
                        event_tx.clone(),
                    )));
                    continue;
                }
                let api = Arc::clone(&api);
                let event_tx = event_tx.clone();
                let download_dir = Arc::clone(&download_dir);
                runtime.spawn(async move {
                    if let Some(event) = handle_command(api.as_ref(), &download_dir, command).await
                    {
                        let _ = event_tx.send(event);
                    }
                });
            }
            af_debug!("Engine command channel closed");
        });

        Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        }
    }

    fn send(&self, command: EngineCommand) {
        let _ = self.cmd_tx.send(command);
    }

    /// Opens the push connection, replacing any existing one.
    pub fn open_channel(&self) {
        self.send(EngineCommand::OpenChannel);
    }

    pub fn list_jobs(&self, purpose: ListPurpose) {
        self.send(EngineCommand::ListJobs { purpose });
    }

    pub fn create_job(&self, body: CreateJobBody) {
        self.send(EngineCommand::CreateJob(body));
    }

    pub fn cancel_job(&self, job_id: JobId, origin: Origin) {
        self.send(EngineCommand::CancelJob { job_id, origin });
    }

    pub fn delete_job(&self, job_id: JobId, origin: Origin) {
        self.send(EngineCommand::DeleteJob { job_id, origin });
    }

    pub fn save_artifact(&self, job_id: JobId) {
        self.send(EngineCommand::SaveArtifact { job_id });
    }

    pub fn login(&self, password: String) {
        self.send(EngineCommand::Login { password });
    }

    pub fn list_server_downloads(&self, token: String) {
        self.send(EngineCommand::ListServerDownloads { token });
    }

    pub fn save_server_zip(&self, name: String, token: String) {
        self.send(EngineCommand::SaveServerZip { name, token });
    }

    pub fn delete_server_download(&self, name: String, token: String) {
        self.send(EngineCommand::DeleteServerDownload { name, token });
    }

    pub fn load_config(&self) {
        self.send(EngineCommand::LoadConfig);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_recv()
            .ok()
    }
}

async fn handle_command(
    api: &dyn JobApi,
    download_dir: &std::path::Path,
    command: EngineCommand,
) -> Option<EngineEvent> {
    let event = match command {
        EngineCommand::OpenChannel => return None,
        EngineCommand::ListJobs { purpose } => EngineEvent::JobsFetched {
            purpose,
            result: api.list_jobs().await,
        },
        EngineCommand::CreateJob(body) => EngineEvent::JobCreated(api.create_job(&body).await),
        EngineCommand::CancelJob { job_id, origin } => {
            let result = api.cancel_job(&job_id).await;
            EngineEvent::JobCancelled {
                job_id,
                origin,
                result,
            }
        }
        EngineCommand::DeleteJob { job_id, origin } => {
            let result = api.delete_job(&job_id).await;
            EngineEvent::JobDeleted {
                job_id,
                origin,
                result,
            }
        }
        EngineCommand::SaveArtifact { job_id } => {
            let result = api.save_artifact(&job_id, download_dir).await;
            EngineEvent::ArtifactSaved { job_id, result }
        }
        EngineCommand::Login { password } => EngineEvent::LoggedIn(api.login(&password).await),
        EngineCommand::ListServerDownloads { token } => {
            EngineEvent::ServerDownloadsLoaded(api.list_server_downloads(&token).await)
        }
        EngineCommand::SaveServerZip { name, token } => {
            let result = api.save_server_zip(&name, &token, download_dir).await;
            EngineEvent::ServerZipSaved { name, result }
        }
        EngineCommand::DeleteServerDownload { name, token } => {
            let result = api.delete_server_download(&name, &token).await;
            EngineEvent::ServerDownloadDeleted { name, result }
        }
        EngineCommand::LoadConfig => EngineEvent::ConfigLoaded(api.server_config().await),
    };
    Some(event)
}
