use std::collections::HashMap;

use crate::channel::LiveChannel;
use crate::job::{JobId, JobPatch, Millis};
use crate::ledger::AutoDownloadLedger;
use crate::notification::{NotificationLevel, Notifications};
use crate::registry::{Applied, JobRegistry};
use crate::retrieval::RetrievalGuard;
use crate::session::{AuthSession, ServerDownload, SubmitGate};
use crate::view_model::{
    render, render_server_download, AppViewModel, AuthView, ConnectionStatus, JobView,
    NotificationView, SubmitView,
};

/// Everything one client instance (one tab) knows. Owned by the runtime and
/// threaded through [`crate::update`]; there is no ambient global state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    pub(crate) now: Millis,
    pub(crate) started: bool,
    /// Set once any job list has been applied.
    pub(crate) initial_list_applied: bool,
    pub(crate) registry: JobRegistry,
    pub(crate) views: HashMap<JobId, JobView>,
    pub(crate) ledger: AutoDownloadLedger,
    pub(crate) retrievals: RetrievalGuard,
    pub(crate) channel: LiveChannel,
    pub(crate) session: AuthSession,
    pub(crate) submit_gate: SubmitGate,
    pub(crate) notifications: Notifications,
    pub(crate) server_downloads: Vec<ServerDownload>,
    pub(crate) contact_email: Option<String>,
    pub(crate) next_sweep_at: Millis,
    pub(crate) last_cooldown_secs: Option<u64>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &AutoDownloadLedger {
        &self.ledger
    }

    pub fn channel(&self) -> &LiveChannel {
        &self.channel
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    pub fn retrievals(&self) -> &RetrievalGuard {
        &self.retrievals
    }

    pub fn can_submit(&self) -> bool {
        self.submit_gate.can_submit(self.now)
    }

    /// Rendered view of one job, as last produced by the renderer.
    pub fn job_view(&self, job_id: &str) -> Option<&JobView> {
        self.views.get(job_id)
    }

    pub fn view(&self) -> AppViewModel {
        let authenticated = self.session.is_authenticated();
        let cooldown_secs = self.submit_gate.remaining_secs(self.now);
        let label = match cooldown_secs {
            Some(secs) => format!("Rate Limited - Wait {secs}s"),
            None => "Start Download".to_string(),
        };

        AppViewModel {
            connection: if self.channel.is_connected() {
                ConnectionStatus::Connected
            } else {
                ConnectionStatus::Disconnected
            },
            auth: AuthView {
                authenticated,
                server_mode_available: authenticated,
                server_downloads_visible: authenticated,
            },
            submit: SubmitView {
                enabled: cooldown_secs.is_none(),
                cooldown_secs,
                label,
            },
            jobs: self
                .registry
                .iter_newest_first()
                .filter_map(|(job, _)| self.views.get(&job.job_id).cloned())
                .collect(),
            server_downloads: if authenticated {
                self.server_downloads
                    .iter()
                    .map(render_server_download)
                    .collect()
            } else {
                Vec::new()
            },
            notifications: self
                .notifications
                .iter()
                .map(|n| NotificationView {
                    level: n.level,
                    text: n.text.clone(),
                })
                .collect(),
            contact_email: self.contact_email.clone(),
            dirty: self.dirty,
        }
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn notify(&mut self, level: NotificationLevel, text: impl Into<String>) {
        self.notifications.push(level, text, self.now);
        self.mark_dirty();
    }

    /// Merges into the registry and replaces exactly that job's view.
    pub(crate) fn apply_to_registry(&mut self, job_id: &str, patch: &JobPatch) -> Applied {
        let applied = self.registry.apply_update(job_id, patch, self.now);
        if applied.changed {
            if let Some(job) = self.registry.get(job_id) {
                self.views.insert(job_id.to_owned(), render(job));
            }
            self.mark_dirty();
        }
        applied
    }

    pub(crate) fn remove_job(&mut self, job_id: &str) -> bool {
        self.views.remove(job_id);
        let removed = self.registry.remove(job_id).is_some();
        if removed {
            self.mark_dirty();
        }
        removed
    }
}
