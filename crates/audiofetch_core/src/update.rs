use crate::channel::{ChannelAction, ChannelEvent};
use crate::error::ClientError;
use crate::job::{DownloadMode, JobId, JobPatch, JobStatus, Millis};
use crate::notification::NotificationLevel;
use crate::reconcile::{self, FetchPurpose};
use crate::session::{ActionOrigin, CreateJobRequest, CreatedJob, DownloadForm, DEFAULT_WORKERS};
use crate::sweeper::{self, SWEEP_INTERVAL_MS};
use crate::{AppState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::Tick { now } => on_tick(&mut state, now),
        Msg::Channel(event) => on_channel_event(&mut state, event),
        Msg::JobUpdate { job_id, patch } => apply_job_patch(&mut state, &job_id, &patch, true),
        Msg::JobsFetched { purpose, result } => match result {
            Ok(jobs) => on_jobs_fetched(&mut state, purpose, jobs),
            // Logged by the runtime; the next reconnect or poll tries again.
            Err(_) => Vec::new(),
        },
        Msg::DownloadSubmitted(form) => on_download_submitted(&mut state, form),
        Msg::JobCreated(result) => on_job_created(&mut state, result),
        Msg::CancelClicked(job_id) => vec![Effect::CancelJob {
            job_id,
            origin: ActionOrigin::User,
        }],
        Msg::ClearClicked(job_id) => vec![Effect::DeleteJob {
            job_id,
            origin: ActionOrigin::User,
        }],
        Msg::RetrieveClicked(job_id) => begin_retrieval(&mut state, job_id),
        Msg::JobCancelFinished {
            job_id: _,
            origin,
            result,
        } => {
            if origin == ActionOrigin::User {
                match result {
                    Ok(()) => state.notify(NotificationLevel::Info, "Job cancelled"),
                    Err(err) => state.notify(
                        NotificationLevel::Error,
                        err.user_message("Failed to cancel job"),
                    ),
                }
            }
            Vec::new()
        }
        Msg::JobDeleteFinished {
            job_id,
            origin,
            result,
        } => {
            match result {
                Ok(()) => {
                    state.remove_job(&job_id);
                }
                Err(err) if origin == ActionOrigin::User => state.notify(
                    NotificationLevel::Error,
                    err.user_message("Failed to clear job"),
                ),
                Err(_) => {}
            }
            Vec::new()
        }
        Msg::ArtifactSaved { job_id, result } => {
            match result {
                Ok(path) => state.notify(NotificationLevel::Success, format!("Saved {path}")),
                Err(err) => state.notify(
                    NotificationLevel::Error,
                    err.user_message(&format!("Download of job {job_id} failed")),
                ),
            }
            Vec::new()
        }
        Msg::LoginSubmitted { password } => vec![Effect::Login { password }],
        Msg::LoginFinished(result) => on_login_finished(&mut state, result),
        Msg::LogoutClicked => {
            state.session.sign_out();
            state.server_downloads.clear();
            state.notify(NotificationLevel::Info, "Logged out");
            vec![Effect::PersistCredential { token: None }]
        }
        Msg::CredentialSynced(token) => on_credential_synced(&mut state, token),
        Msg::LedgerSynced(job_ids) => {
            state.ledger.absorb(job_ids);
            Vec::new()
        }
        Msg::ServerDownloadsRefreshClicked => load_server_downloads(&state),
        Msg::ServerDownloadsLoaded(result) => {
            if let Ok(downloads) = result {
                if state.session.is_authenticated() {
                    state.server_downloads = downloads;
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::ServerZipClicked { name } => match state.session.token() {
            Some(token) => vec![Effect::FetchServerZip {
                name,
                token: token.to_owned(),
            }],
            None => Vec::new(),
        },
        Msg::ServerZipSaved { name, result } => {
            match result {
                Ok(path) => state.notify(NotificationLevel::Success, format!("Saved {path}")),
                Err(err) => state.notify(
                    NotificationLevel::Error,
                    err.user_message(&format!("Failed to fetch {name}")),
                ),
            }
            Vec::new()
        }
        Msg::ServerDeleteClicked { name } => match state.session.token() {
            Some(token) => vec![Effect::DeleteServerDownload {
                name,
                token: token.to_owned(),
            }],
            None => Vec::new(),
        },
        Msg::ServerDeleteFinished { name: _, result } => match result {
            Ok(()) => {
                state.notify(NotificationLevel::Info, "Download deleted");
                load_server_downloads(&state)
            }
            Err(err) => {
                state.notify(
                    NotificationLevel::Error,
                    err.user_message("Failed to delete download"),
                );
                Vec::new()
            }
        },
        Msg::ConfigLoaded(result) => {
            let contact_email = result.ok().and_then(|config| config.contact_email);
            if contact_email != state.contact_email {
                state.contact_email = contact_email;
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn on_tick(state: &mut AppState, now: Millis) -> Vec<Effect> {
    state.now = now.max(state.now);
    let now = state.now;
    let mut effects = Vec::new();

    if !state.started {
        state.started = true;
        state.mark_dirty();
        effects.extend(channel_effects(state.channel.start(now)));
        effects.push(Effect::FetchJobs {
            purpose: FetchPurpose::InitialLoad,
        });
        effects.push(Effect::LoadConfig);
        effects.extend(load_server_downloads(state));
        state.next_sweep_at = now;
    }

    effects.extend(channel_effects(state.channel.tick(now)));

    for job_id in state.retrievals.advance(now) {
        if state.registry.contains(&job_id) {
            effects.extend(begin_retrieval(state, job_id));
        }
    }

    if state.notifications.expire(now) {
        state.mark_dirty();
    }

    state.submit_gate.advance(now);
    let cooldown_secs = state.submit_gate.remaining_secs(now);
    if cooldown_secs != state.last_cooldown_secs {
        state.last_cooldown_secs = cooldown_secs;
        state.mark_dirty();
    }

    if now >= state.next_sweep_at {
        state.next_sweep_at = now + SWEEP_INTERVAL_MS;
        effects.extend(run_sweep(state));
    }

    effects
}

fn on_channel_event(state: &mut AppState, event: ChannelEvent) -> Vec<Effect> {
    let was_connected = state.channel.is_connected();
    let actions = state.channel.handle(event, state.now);
    if was_connected != state.channel.is_connected() {
        state.mark_dirty();
    }
    channel_effects(actions)
}

fn channel_effects(actions: Vec<ChannelAction>) -> Vec<Effect> {
    actions
        .into_iter()
        .map(|action| match action {
            ChannelAction::Connect => Effect::OpenChannel,
            ChannelAction::Reconcile => Effect::FetchJobs {
                purpose: FetchPurpose::Reconcile,
            },
            ChannelAction::Poll => Effect::FetchJobs {
                purpose: FetchPurpose::FallbackPoll,
            },
        })
        .collect()
}

/// Merges one job update, then decides on an automatic retrieval.
///
/// The ledger entry is written together with the decision, before the
/// retrieval fires, so a duplicate update arriving in between is ignored.
fn apply_job_patch(
    state: &mut AppState,
    job_id: &str,
    patch: &JobPatch,
    allow_auto_download: bool,
) -> Vec<Effect> {
    let applied = state.apply_to_registry(job_id, patch);
    let Some(job) = state.registry.get(job_id) else {
        return Vec::new();
    };
    let mode = job.download_mode();
    let status = job.status;
    let mut effects = Vec::new();

    if allow_auto_download
        && status == JobStatus::Streaming
        && mode == DownloadMode::Browser
        && patch.auto_download == Some(true)
        && state.ledger.add(job_id)
    {
        state.retrievals.schedule(job_id, state.now);
        effects.push(Effect::PersistLedger {
            job_ids: state.ledger.to_vec(),
        });
    }

    let reached_end = matches!(status, JobStatus::Completed | JobStatus::Error)
        && applied.previous_status != Some(status);
    if mode == DownloadMode::Server && reached_end {
        effects.extend(load_server_downloads(state));
    }

    effects
}

fn on_jobs_fetched(
    state: &mut AppState,
    purpose: FetchPurpose,
    jobs: Vec<(JobId, JobPatch)>,
) -> Vec<Effect> {
    let first_list = !state.initial_list_applied;
    state.initial_list_applied = true;
    let plan = reconcile::plan(&state.registry, jobs, purpose, first_list, state.now);
    let mut effects = Vec::new();

    for job_id in &plan.remove {
        state.remove_job(job_id);
    }

    let mut ledger_grew = false;
    for job_id in &plan.mark_downloaded {
        ledger_grew |= state.ledger.add(job_id);
    }
    if ledger_grew {
        effects.push(Effect::PersistLedger {
            job_ids: state.ledger.to_vec(),
        });
    }

    for (job_id, patch) in &plan.apply {
        effects.extend(apply_job_patch(
            state,
            job_id,
            patch,
            plan.allow_auto_download,
        ));
    }

    if plan.sweep_after {
        effects.extend(run_sweep(state));
    }
    effects
}

fn run_sweep(state: &mut AppState) -> Vec<Effect> {
    let plan = sweeper::sweep(&state.registry, state.now);
    let mut effects = Vec::with_capacity(plan.cancel.len() + plan.purge.len());
    for job_id in plan.cancel {
        effects.push(Effect::CancelJob {
            job_id,
            origin: ActionOrigin::Sweeper,
        });
    }
    for job_id in plan.purge {
        state.remove_job(&job_id);
        effects.push(Effect::DeleteJob {
            job_id,
            origin: ActionOrigin::Sweeper,
        });
    }
    effects
}

fn begin_retrieval(state: &mut AppState, job_id: JobId) -> Vec<Effect> {
    if !state.retrievals.try_begin(&job_id, state.now) {
        return Vec::new();
    }
    state.notify(
        NotificationLevel::Success,
        "ZIP file downloading! Check your downloads folder.",
    );
    vec![Effect::RetrieveArtifact { job_id }]
}

fn on_download_submitted(state: &mut AppState, form: DownloadForm) -> Vec<Effect> {
    if !state.submit_gate.can_submit(state.now) {
        return Vec::new();
    }

    let url = form.url.trim();
    if url.is_empty() {
        state.notify(NotificationLevel::Error, "Please enter a URL");
        return Vec::new();
    }
    if url::Url::parse(url).is_err() {
        state.notify(NotificationLevel::Error, "Please enter a valid URL");
        return Vec::new();
    }

    let download_mode = if state.session.is_authenticated() {
        form.mode
    } else {
        DownloadMode::Browser
    };
    let auth_token = match download_mode {
        DownloadMode::Server => state.session.token().map(ToOwned::to_owned),
        DownloadMode::Browser => None,
    };

    vec![Effect::CreateJob(CreateJobRequest {
        url: url.to_owned(),
        name: non_empty(form.name),
        plugin: non_empty(form.plugin),
        workers: form.workers.filter(|w| *w > 0).unwrap_or(DEFAULT_WORKERS),
        download_mode,
        auth_token,
        connection_id: state.channel.connection_id().map(ToOwned::to_owned),
    })]
}

fn on_job_created(
    state: &mut AppState,
    result: Result<CreatedJob, ClientError>,
) -> Vec<Effect> {
    match result {
        Ok((job_id, patch)) => {
            let effects = apply_job_patch(state, &job_id, &patch, false);
            let mode = state
                .registry
                .get(&job_id)
                .map(|job| job.download_mode())
                .unwrap_or_default();
            let text = match mode {
                DownloadMode::Browser => {
                    "Processing... Download will start automatically in a few seconds!"
                }
                DownloadMode::Server => "Download started! Files will be saved to the server.",
            };
            state.notify(NotificationLevel::Success, text);
            effects
        }
        Err(err) => {
            if err == ClientError::RateLimited {
                state.submit_gate.start_cooldown(state.now);
                state.last_cooldown_secs = state.submit_gate.remaining_secs(state.now);
            }
            state.notify(
                NotificationLevel::Error,
                err.user_message("Failed to start download"),
            );
            Vec::new()
        }
    }
}

fn on_login_finished(state: &mut AppState, result: Result<String, ClientError>) -> Vec<Effect> {
    match result {
        Ok(token) => {
            state.session.sign_in(token.clone());
            state.notify(NotificationLevel::Success, "Login successful!");
            let mut effects = vec![Effect::PersistCredential { token: Some(token) }];
            effects.extend(load_server_downloads(state));
            effects
        }
        Err(ClientError::InvalidCredential) => {
            state.notify(NotificationLevel::Error, "Invalid password");
            Vec::new()
        }
        Err(_) => {
            state.notify(NotificationLevel::Error, "Login failed");
            Vec::new()
        }
    }
}

fn on_credential_synced(state: &mut AppState, token: Option<String>) -> Vec<Effect> {
    if state.session.token() == token.as_deref() {
        return Vec::new();
    }
    state.mark_dirty();
    match token {
        Some(token) => {
            state.session.sign_in(token);
            // Before the first tick, startup loads the list itself.
            if state.started {
                load_server_downloads(state)
            } else {
                Vec::new()
            }
        }
        None => {
            state.session.sign_out();
            state.server_downloads.clear();
            Vec::new()
        }
    }
}

fn load_server_downloads(state: &AppState) -> Vec<Effect> {
    match state.session.token() {
        Some(token) => vec![Effect::LoadServerDownloads {
            token: token.to_owned(),
        }],
        None => Vec::new(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
