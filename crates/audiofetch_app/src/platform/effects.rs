use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use audiofetch_core::Effect;
use audiofetch_engine::{DurableStore, EngineEvent, EngineHandle};
use audiofetch_logging::{af_debug, af_info, af_warn};

use super::app::Input;
use super::mapping::{create_body, engine_event_to_msg, list_purpose, origin};
use super::persistence::{persist_credential, persist_ledger};

/// Executes core effects against the engine and durable storage, and feeds
/// engine events back into the message loop.
pub struct EffectRunner {
    engine: EngineHandle,
    store: Arc<dyn DurableStore>,
    input_tx: mpsc::Sender<Input>,
}

impl EffectRunner {
    pub fn new(
        engine: EngineHandle,
        store: Arc<dyn DurableStore>,
        input_tx: mpsc::Sender<Input>,
    ) -> Self {
        let runner = Self {
            engine,
            store,
            input_tx,
        };
        runner.spawn_event_loop();
        runner
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::OpenChannel => {
                    af_info!("OpenChannel");
                    self.engine.open_channel();
                }
                Effect::FetchJobs { purpose } => {
                    af_debug!("FetchJobs purpose={purpose:?}");
                    self.engine.list_jobs(list_purpose(purpose));
                }
                Effect::CreateJob(request) => {
                    af_info!(
                        "CreateJob mode={} url={}",
                        request.download_mode.as_str(),
                        request.url
                    );
                    self.engine.create_job(create_body(request));
                }
                Effect::CancelJob {
                    job_id,
                    origin: who,
                } => {
                    af_info!("CancelJob job_id={job_id} origin={who:?}");
                    self.engine.cancel_job(job_id, origin(who));
                }
                Effect::DeleteJob {
                    job_id,
                    origin: who,
                } => {
                    af_info!("DeleteJob job_id={job_id} origin={who:?}");
                    self.engine.delete_job(job_id, origin(who));
                }
                Effect::RetrieveArtifact { job_id } => {
                    af_info!("RetrieveArtifact job_id={job_id}");
                    self.engine.save_artifact(job_id);
                }
                Effect::PersistLedger { job_ids } => {
                    af_debug!("PersistLedger entries={}", job_ids.len());
                    if let Some(msg) = persist_ledger(self.store.as_ref(), &job_ids) {
                        let _ = self.input_tx.send(Input::Msg(msg));
                    }
                }
                Effect::PersistCredential { token } => {
                    af_info!(
                        "PersistCredential {}",
                        if token.is_some() { "set" } else { "cleared" }
                    );
                    persist_credential(self.store.as_ref(), token.as_deref());
                }
                Effect::Login { password } => {
                    af_info!("Login");
                    self.engine.login(password);
                }
                Effect::LoadServerDownloads { token } => {
                    af_debug!("LoadServerDownloads");
                    self.engine.list_server_downloads(token);
                }
                Effect::FetchServerZip { name, token } => {
                    af_info!("FetchServerZip name={name}");
                    self.engine.save_server_zip(name, token);
                }
                Effect::DeleteServerDownload { name, token } => {
                    af_info!("DeleteServerDownload name={name}");
                    self.engine.delete_server_download(name, token);
                }
                Effect::LoadConfig => {
                    af_debug!("LoadConfig");
                    self.engine.load_config();
                }
            }
        }
    }

    fn spawn_event_loop(&self) {
        let engine = self.engine.clone();
        let input_tx = self.input_tx.clone();
        thread::spawn(move || loop {
            if let Some(event) = engine.try_recv() {
                log_failure(&event);
                if input_tx.send(Input::Msg(engine_event_to_msg(event))).is_err() {
                    break;
                }
            } else {
                thread::sleep(Duration::from_millis(20));
            }
        });
    }
}

fn log_failure(event: &EngineEvent) {
    match event {
        EngineEvent::JobCancelled {
            job_id,
            origin,
            result: Err(err),
        } => af_warn!("Cancel of {job_id} ({origin:?}) failed: {err}"),
        EngineEvent::JobDeleted {
            job_id,
            origin,
            result: Err(err),
        } => af_warn!("Delete of {job_id} ({origin:?}) failed: {err}"),
        EngineEvent::JobsFetched {
            purpose,
            result: Err(err),
        } => af_warn!("Job list ({purpose:?}) failed: {err}"),
        _ => {}
    }
}
