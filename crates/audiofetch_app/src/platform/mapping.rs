//! Translation between engine wire types and core messages.

use audiofetch_core::{
    ActionOrigin, ChannelEvent, ClientError, CreateJobRequest, CreatedJob, DownloadMode,
    FetchPurpose, JobPatch, JobStatus, Millis, Msg, Progress, ServerConfig, ServerDownload,
};
use audiofetch_engine::{
    ApiError, ChannelFrame, CreateJobBody, EngineEvent, FailureKind, JobRecord, ListPurpose,
    Origin, ServerDownloadRecord, WireMode, WireStatus,
};
use audiofetch_logging::af_warn;
use chrono::{DateTime, NaiveDateTime};

pub(crate) fn engine_event_to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::ChannelOpened => Msg::Channel(ChannelEvent::Opened),
        EngineEvent::ChannelClosed { .. } => Msg::Channel(ChannelEvent::Closed),
        EngineEvent::ChannelFrame(ChannelFrame::ConnectionEstablished { connection_id }) => {
            Msg::Channel(ChannelEvent::ConnectionEstablished { connection_id })
        }
        EngineEvent::ChannelFrame(ChannelFrame::JobUpdate { job_id, data }) => Msg::JobUpdate {
            job_id,
            patch: job_patch(&data),
        },
        EngineEvent::ChannelFrame(ChannelFrame::Unknown) => Msg::NoOp,
        EngineEvent::JobsFetched { purpose, result } => Msg::JobsFetched {
            purpose: fetch_purpose(purpose),
            result: result.map_err(client_error).map(|records| {
                records
                    .iter()
                    .filter_map(|record| {
                        let id = record.job_id.clone()?;
                        Some((id, job_patch(record)))
                    })
                    .collect()
            }),
        },
        EngineEvent::JobCreated(result) => {
            Msg::JobCreated(result.map_err(client_error).and_then(created_job))
        }
        EngineEvent::JobCancelled {
            job_id,
            origin,
            result,
        } => Msg::JobCancelFinished {
            job_id,
            origin: action_origin(origin),
            result: result.map_err(client_error),
        },
        EngineEvent::JobDeleted {
            job_id,
            origin,
            result,
        } => Msg::JobDeleteFinished {
            job_id,
            origin: action_origin(origin),
            result: result.map_err(client_error),
        },
        EngineEvent::ArtifactSaved { job_id, result } => Msg::ArtifactSaved {
            job_id,
            result: result
                .map(|path| path.display().to_string())
                .map_err(client_error),
        },
        EngineEvent::LoggedIn(result) => Msg::LoginFinished(result.map_err(login_error)),
        EngineEvent::ServerDownloadsLoaded(result) => Msg::ServerDownloadsLoaded(
            result
                .map(|records| records.iter().map(server_download).collect())
                .map_err(client_error),
        ),
        EngineEvent::ServerZipSaved { name, result } => Msg::ServerZipSaved {
            name,
            result: result
                .map(|path| path.display().to_string())
                .map_err(client_error),
        },
        EngineEvent::ServerDownloadDeleted { name, result } => Msg::ServerDeleteFinished {
            name,
            result: result.map_err(client_error),
        },
        EngineEvent::ConfigLoaded(result) => Msg::ConfigLoaded(
            result
                .map(|record| ServerConfig {
                    contact_email: record.contact_email.filter(|email| !email.is_empty()),
                })
                .map_err(client_error),
        ),
    }
}

pub(crate) fn job_patch(record: &JobRecord) -> JobPatch {
    JobPatch {
        status: record.status.and_then(job_status),
        download_mode: record.download_mode.map(download_mode),
        progress: record.progress.map(|p| Progress {
            completed: p.completed,
            total: p.total,
        }),
        message: record.message.clone(),
        auto_download: record.auto_download,
        created_at: record.created_at.as_deref().and_then(parse_timestamp),
        queue_position: record.queue_position,
        download_name: record.download_name.clone(),
    }
}

fn job_status(status: WireStatus) -> Option<JobStatus> {
    Some(match status {
        WireStatus::Pending => JobStatus::Pending,
        WireStatus::Detecting => JobStatus::Detecting,
        WireStatus::Downloading => JobStatus::Downloading,
        WireStatus::Streaming => JobStatus::Streaming,
        WireStatus::Completed => JobStatus::Completed,
        WireStatus::Error => JobStatus::Error,
        WireStatus::Cancelled => JobStatus::Cancelled,
        WireStatus::Unknown => return None,
    })
}

fn download_mode(mode: WireMode) -> DownloadMode {
    match mode {
        WireMode::Browser => DownloadMode::Browser,
        WireMode::Server => DownloadMode::Server,
    }
}

fn wire_mode(mode: DownloadMode) -> WireMode {
    match mode {
        DownloadMode::Browser => WireMode::Browser,
        DownloadMode::Server => WireMode::Server,
    }
}

/// RFC 3339, or a naive ISO timestamp taken as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<Millis> {
    let millis = match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed.timestamp_millis(),
        Err(_) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()?
            .and_utc()
            .timestamp_millis(),
    };
    Millis::try_from(millis).ok()
}

fn server_download(record: &ServerDownloadRecord) -> ServerDownload {
    ServerDownload {
        name: record.name.clone(),
        files: record.files,
        size: record.size,
        created: record.created.as_deref().and_then(parse_timestamp),
    }
}

fn created_job(record: JobRecord) -> Result<CreatedJob, ClientError> {
    let patch = job_patch(&record);
    match record.job_id {
        Some(job_id) => Ok((job_id, patch)),
        None => {
            af_warn!("Created job response carried no job_id");
            Err(ClientError::NetworkFailure(
                "response carried no job id".to_string(),
            ))
        }
    }
}

pub(crate) fn client_error(err: ApiError) -> ClientError {
    match err.kind {
        FailureKind::HttpStatus(status) => ClientError::from_status(status, err.detail),
        _ => ClientError::NetworkFailure(err.to_string()),
    }
}

fn login_error(err: ApiError) -> ClientError {
    match err.kind {
        FailureKind::HttpStatus(401) => ClientError::InvalidCredential,
        _ => client_error(err),
    }
}

fn fetch_purpose(purpose: ListPurpose) -> FetchPurpose {
    match purpose {
        ListPurpose::Initial => FetchPurpose::InitialLoad,
        ListPurpose::Reconcile => FetchPurpose::Reconcile,
        ListPurpose::Poll => FetchPurpose::FallbackPoll,
    }
}

pub(crate) fn list_purpose(purpose: FetchPurpose) -> ListPurpose {
    match purpose {
        FetchPurpose::InitialLoad => ListPurpose::Initial,
        FetchPurpose::Reconcile => ListPurpose::Reconcile,
        FetchPurpose::FallbackPoll => ListPurpose::Poll,
    }
}

fn action_origin(origin: Origin) -> ActionOrigin {
    match origin {
        Origin::User => ActionOrigin::User,
        Origin::Sweeper => ActionOrigin::Sweeper,
    }
}

pub(crate) fn origin(origin: ActionOrigin) -> Origin {
    match origin {
        ActionOrigin::User => Origin::User,
        ActionOrigin::Sweeper => Origin::Sweeper,
    }
}

pub(crate) fn create_body(request: CreateJobRequest) -> CreateJobBody {
    CreateJobBody {
        url: request.url,
        name: request.name,
        plugin: request.plugin,
        workers: request.workers,
        download_mode: wire_mode(request.download_mode),
        auth_token: request.auth_token,
        connection_id: request.connection_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audiofetch_engine::WireProgress;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn api_error(kind: FailureKind, detail: Option<&str>) -> ApiError {
        ApiError {
            kind,
            message: "x".to_string(),
            detail: detail.map(str::to_string),
        }
    }

    #[test]
    fn timestamps_accept_offset_and_naive_forms() {
        assert_eq!(parse_timestamp("1970-01-01T00:00:01Z"), Some(1_000));
        assert_eq!(parse_timestamp("1970-01-01T00:00:02.500"), Some(2_500));
        assert_eq!(parse_timestamp("1970-01-01 00:01:00"), Some(60_000));
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("1960-01-01T00:00:00Z"), None);
    }

    #[test]
    fn record_maps_to_patch() {
        let record = JobRecord {
            job_id: Some("j".to_string()),
            status: Some(WireStatus::Downloading),
            download_mode: Some(WireMode::Server),
            progress: Some(WireProgress {
                completed: 1,
                total: 4,
            }),
            message: Some("working".to_string()),
            created_at: Some("1970-01-01T00:00:10Z".to_string()),
            ..JobRecord::default()
        };
        assert_eq!(
            job_patch(&record),
            JobPatch {
                status: Some(JobStatus::Downloading),
                download_mode: Some(DownloadMode::Server),
                progress: Some(Progress {
                    completed: 1,
                    total: 4
                }),
                message: Some("working".to_string()),
                created_at: Some(10_000),
                ..JobPatch::default()
            }
        );
    }

    #[test]
    fn unknown_status_leaves_status_untouched() {
        let record = JobRecord {
            status: Some(WireStatus::Unknown),
            ..JobRecord::default()
        };
        assert_eq!(job_patch(&record).status, None);
    }

    #[test]
    fn errors_are_classified() {
        assert_eq!(
            client_error(api_error(FailureKind::HttpStatus(429), Some("slow down"))),
            ClientError::RateLimited
        );
        assert_eq!(
            client_error(api_error(FailureKind::HttpStatus(400), Some("bad url"))),
            ClientError::ServerRejected {
                status: 400,
                detail: Some("bad url".to_string())
            }
        );
        assert!(matches!(
            client_error(api_error(FailureKind::Timeout, None)),
            ClientError::NetworkFailure(_)
        ));
        assert_eq!(
            login_error(api_error(FailureKind::HttpStatus(401), None)),
            ClientError::InvalidCredential
        );
    }

    #[test]
    fn channel_events_map_to_core_messages() {
        assert_eq!(
            engine_event_to_msg(EngineEvent::ChannelClosed { reason: None }),
            Msg::Channel(ChannelEvent::Closed)
        );
        assert_eq!(
            engine_event_to_msg(EngineEvent::ChannelFrame(ChannelFrame::Unknown)),
            Msg::NoOp
        );
        assert_eq!(
            engine_event_to_msg(EngineEvent::ChannelFrame(
                ChannelFrame::ConnectionEstablished {
                    connection_id: "c".to_string()
                }
            )),
            Msg::Channel(ChannelEvent::ConnectionEstablished {
                connection_id: "c".to_string()
            })
        );
    }

    #[test]
    fn job_list_drops_records_without_id() {
        let msg = engine_event_to_msg(EngineEvent::JobsFetched {
            purpose: ListPurpose::Poll,
            result: Ok(vec![
                JobRecord::default(),
                JobRecord {
                    job_id: Some("a".to_string()),
                    ..JobRecord::default()
                },
            ]),
        });
        assert_eq!(
            msg,
            Msg::JobsFetched {
                purpose: FetchPurpose::FallbackPoll,
                result: Ok(vec![("a".to_string(), JobPatch::default())]),
            }
        );
    }

    #[test]
    fn created_job_without_id_is_an_error() {
        let msg = engine_event_to_msg(EngineEvent::JobCreated(Ok(JobRecord::default())));
        assert!(matches!(msg, Msg::JobCreated(Err(ClientError::NetworkFailure(_)))));
    }

    #[test]
    fn saved_artifact_reports_path() {
        let msg = engine_event_to_msg(EngineEvent::ArtifactSaved {
            job_id: "j".to_string(),
            result: Ok(PathBuf::from("dl/a.zip")),
        });
        assert_eq!(
            msg,
            Msg::ArtifactSaved {
                job_id: "j".to_string(),
                result: Ok("dl/a.zip".to_string()),
            }
        );
    }

    #[test]
    fn empty_contact_email_is_hidden() {
        let msg = engine_event_to_msg(EngineEvent::ConfigLoaded(Ok(
            audiofetch_engine::ServerConfigRecord {
                contact_email: Some(String::new()),
            },
        )));
        assert_eq!(msg, Msg::ConfigLoaded(Ok(ServerConfig::default())));
    }
}
