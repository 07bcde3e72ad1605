use audiofetch_core::{
    update, AppState, DownloadMode, Effect, FetchPurpose, JobId, JobPatch, JobStatus, Msg,
    Progress, RECONCILE_GRACE_MS,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    audiofetch_logging::initialize_for_tests();
}

fn started(now: u64) -> AppState {
    let (state, _) = update(AppState::new(), Msg::Tick { now });
    state
}

fn downloading(completed: u64) -> JobPatch {
    JobPatch {
        status: Some(JobStatus::Downloading),
        download_mode: Some(DownloadMode::Browser),
        progress: Some(Progress {
            completed,
            total: 10,
        }),
        message: Some(format!("Track {completed}")),
        ..JobPatch::default()
    }
}

fn fetched(state: AppState, purpose: FetchPurpose, jobs: Vec<(JobId, JobPatch)>) -> AppState {
    let (state, _) = update(
        state,
        Msg::JobsFetched {
            purpose,
            result: Ok(jobs),
        },
    );
    state
}

fn displayed_ids(state: &AppState) -> Vec<String> {
    let mut ids: Vec<_> = state.view().jobs.into_iter().map(|job| job.job_id).collect();
    ids.sort();
    ids
}

fn seed(ids: &[&str]) -> AppState {
    let mut state = started(0);
    for id in ids {
        let (next, _) = update(
            state,
            Msg::JobUpdate {
                job_id: id.to_string(),
                patch: downloading(1),
            },
        );
        state = next;
    }
    let (state, _) = update(
        state,
        Msg::Tick {
            now: RECONCILE_GRACE_MS,
        },
    );
    state
}

#[test]
fn applying_an_update_twice_matches_applying_it_once() {
    init_logging();
    let once = {
        let (state, _) = update(
            started(0),
            Msg::JobUpdate {
                job_id: "a".to_string(),
                patch: downloading(4),
            },
        );
        state
    };
    let (twice, effects) = update(
        once.clone(),
        Msg::JobUpdate {
            job_id: "a".to_string(),
            patch: downloading(4),
        },
    );

    assert!(effects.is_empty());
    assert_eq!(twice.view().jobs, once.view().jobs);
    assert_eq!(twice.registry(), once.registry());
}

#[test]
fn reconnect_reconciliation_removes_orphans_and_updates_the_rest() {
    init_logging();
    let state = seed(&["A", "B", "C"]);
    assert_eq!(displayed_ids(&state), vec!["A", "B", "C"]);

    let state = fetched(
        state,
        FetchPurpose::Reconcile,
        vec![
            ("A".to_string(), downloading(5)),
            ("C".to_string(), downloading(7)),
        ],
    );

    assert_eq!(displayed_ids(&state), vec!["A", "C"]);
    assert!(!state.registry().contains("B"));
    let a = state.job_view("A").expect("A displayed");
    assert_eq!(a.progress.map(|p| p.completed), Some(5));
    assert_eq!(a.message, "Track 5");
    let c = state.job_view("C").expect("C displayed");
    assert_eq!(c.progress.map(|p| p.percent), Some(70));
}

#[test]
fn fallback_poll_adds_and_updates_but_never_removes() {
    init_logging();
    let state = seed(&["A", "B"]);
    let state = fetched(
        state,
        FetchPurpose::FallbackPoll,
        vec![
            ("A".to_string(), downloading(9)),
            ("D".to_string(), downloading(1)),
        ],
    );

    assert_eq!(displayed_ids(&state), vec!["A", "B", "D"]);
    assert_eq!(
        state.job_view("A").and_then(|v| v.progress).map(|p| p.completed),
        Some(9)
    );
}

#[test]
fn just_created_job_survives_reconciliation() {
    init_logging();
    let state = started(0);
    let (state, _) = update(state, Msg::Tick { now: 100_000 });
    let (state, _) = update(
        state,
        Msg::JobCreated(Ok((
            "new".to_string(),
            JobPatch {
                status: Some(JobStatus::Pending),
                download_mode: Some(DownloadMode::Browser),
                ..JobPatch::default()
            },
        ))),
    );

    let state = fetched(state, FetchPurpose::Reconcile, Vec::new());
    assert_eq!(displayed_ids(&state), vec!["new"]);
}

#[test]
fn failed_fetch_leaves_state_untouched() {
    init_logging();
    let state = seed(&["A"]);
    let (next, effects) = update(
        state.clone(),
        Msg::JobsFetched {
            purpose: FetchPurpose::Reconcile,
            result: Err(audiofetch_core::ClientError::NetworkFailure(
                "connection refused".to_string(),
            )),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(next.registry(), state.registry());
}

#[test]
fn server_job_reaching_completion_refreshes_server_downloads() {
    init_logging();
    let state = started(0);
    let (state, _) = update(state, Msg::LoginFinished(Ok("token".to_string())));
    let server_done = JobPatch {
        status: Some(JobStatus::Completed),
        download_mode: Some(DownloadMode::Server),
        ..JobPatch::default()
    };

    let (state, effects) = update(
        state,
        Msg::JobUpdate {
            job_id: "s".to_string(),
            patch: server_done.clone(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::LoadServerDownloads {
            token: "token".to_string()
        }]
    );

    let (_state, effects) = update(
        state,
        Msg::JobUpdate {
            job_id: "s".to_string(),
            patch: server_done,
        },
    );
    assert!(effects.is_empty());
}
