use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use audiofetch_engine::{
    ApiError, CreateJobBody, EngineEvent, EngineHandle, JobApi, JobRecord, ListPurpose, Origin,
    ServerConfigRecord, ServerDownloadRecord,
};
use url::Url;

#[derive(Default)]
struct RecordingApi {
    calls: Mutex<Vec<String>>,
}

impl RecordingApi {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl JobApi for RecordingApi {
    async fn login(&self, password: &str) -> Result<String, ApiError> {
        self.record(format!("login {password}"));
        Ok("tok".to_string())
    }

    async fn create_job(&self, body: &CreateJobBody) -> Result<JobRecord, ApiError> {
        self.record(format!("create {}", body.url));
        Ok(JobRecord {
            job_id: Some("new".to_string()),
            ..JobRecord::default()
        })
    }

    async fn list_jobs(&self) -> Result<Vec<JobRecord>, ApiError> {
        self.record("list".to_string());
        Ok(Vec::new())
    }

    async fn cancel_job(&self, job_id: &str) -> Result<(), ApiError> {
        self.record(format!("cancel {job_id}"));
        Ok(())
    }

    async fn delete_job(&self, job_id: &str) -> Result<(), ApiError> {
        self.record(format!("delete {job_id}"));
        Ok(())
    }

    async fn list_server_downloads(
        &self,
        token: &str,
    ) -> Result<Vec<ServerDownloadRecord>, ApiError> {
        self.record(format!("downloads {token}"));
        Ok(Vec::new())
    }

    async fn delete_server_download(&self, name: &str, token: &str) -> Result<(), ApiError> {
        self.record(format!("rm {name} {token}"));
        Ok(())
    }

    async fn server_config(&self) -> Result<ServerConfigRecord, ApiError> {
        self.record("config".to_string());
        Ok(ServerConfigRecord {
            contact_email: Some("ops@example.com".to_string()),
        })
    }

    async fn save_artifact(&self, job_id: &str, dir: &Path) -> Result<PathBuf, ApiError> {
        self.record(format!("artifact {job_id}"));
        Ok(dir.join(format!("{job_id}.zip")))
    }

    async fn save_server_zip(
        &self,
        name: &str,
        _token: &str,
        dir: &Path,
    ) -> Result<PathBuf, ApiError> {
        self.record(format!("zip {name}"));
        Ok(dir.join(format!("{name}.zip")))
    }
}

fn collect(engine: &EngineHandle, count: usize) -> Vec<EngineEvent> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut events = Vec::new();
    while events.len() < count && Instant::now() < deadline {
        match engine.try_recv() {
            Some(event) => events.push(event),
            None => std::thread::sleep(Duration::from_millis(10)),
        }
    }
    events
}

#[test]
fn commands_round_trip_as_events() {
    audiofetch_logging::initialize_for_tests();
    let api = Arc::new(RecordingApi::default());
    let engine = EngineHandle::with_api(
        api.clone(),
        Url::parse("ws://127.0.0.1:9/ws").unwrap(),
        PathBuf::from("/downloads"),
    );

    engine.list_jobs(ListPurpose::Reconcile);
    engine.cancel_job("j1".to_string(), Origin::Sweeper);
    engine.save_artifact("j2".to_string());
    engine.load_config();

    let events = collect(&engine, 4);
    assert_eq!(events.len(), 4, "{events:?}");
    assert!(events.contains(&EngineEvent::JobsFetched {
        purpose: ListPurpose::Reconcile,
        result: Ok(Vec::new()),
    }));
    assert!(events.contains(&EngineEvent::JobCancelled {
        job_id: "j1".to_string(),
        origin: Origin::Sweeper,
        result: Ok(()),
    }));
    assert!(events.contains(&EngineEvent::ArtifactSaved {
        job_id: "j2".to_string(),
        result: Ok(PathBuf::from("/downloads/j2.zip")),
    }));
    assert!(events.contains(&EngineEvent::ConfigLoaded(Ok(ServerConfigRecord {
        contact_email: Some("ops@example.com".to_string()),
    }))));

    let mut calls = api.calls.lock().unwrap().clone();
    calls.sort();
    assert_eq!(calls, vec!["artifact j2", "cancel j1", "config", "list"]);
}

#[test]
fn unreachable_channel_reports_close() {
    audiofetch_logging::initialize_for_tests();
    let engine = EngineHandle::with_api(
        Arc::new(RecordingApi::default()),
        Url::parse("ws://127.0.0.1:9/ws").unwrap(),
        PathBuf::from("/downloads"),
    );

    engine.open_channel();
    let events = collect(&engine, 1);
    assert!(matches!(
        events.as_slice(),
        [EngineEvent::ChannelClosed { reason: Some(_) }]
    ));
}
