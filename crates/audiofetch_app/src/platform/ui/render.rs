//! Text rendering of the view model.

use audiofetch_core::{
    AppViewModel, ConnectionStatus, JobAction, JobView, NotificationLevel, NotificationView,
    ServerDownloadView,
};

/// Prints only what changed since the previous view.
#[derive(Debug, Default)]
pub struct Renderer {
    last: AppViewModel,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diff(&mut self, view: AppViewModel) -> Vec<String> {
        let mut lines = Vec::new();
        let last = &self.last;

        if view.connection != last.connection {
            lines.push(connection_line(view.connection));
        }
        if view.auth.authenticated != last.auth.authenticated {
            lines.push(if view.auth.authenticated {
                "[auth] signed in; server mode available".to_string()
            } else {
                "[auth] guest".to_string()
            });
        }
        if view.submit.label != last.submit.label {
            lines.push(format!("[submit] {}", view.submit.label));
        }

        for job in &view.jobs {
            if last.jobs.iter().find(|old| old.job_id == job.job_id) != Some(job) {
                lines.push(job_line(job));
            }
        }
        for old in &last.jobs {
            if !view.jobs.iter().any(|job| job.job_id == old.job_id) {
                lines.push(format!("[job {}] removed", old.job_id));
            }
        }

        let mut seen = last.notifications.clone();
        for note in &view.notifications {
            match seen.iter().position(|old| old == note) {
                Some(index) => {
                    seen.remove(index);
                }
                None => lines.push(notification_line(note)),
            }
        }

        if view.server_downloads != last.server_downloads && view.auth.server_downloads_visible {
            lines.extend(server_download_lines(&view.server_downloads));
        }
        if view.contact_email != last.contact_email {
            if let Some(email) = &view.contact_email {
                lines.push(format!("[contact] {email}"));
            }
        }

        self.last = view;
        lines
    }
}

/// The whole view, for the `show` command.
pub fn full(view: &AppViewModel) -> Vec<String> {
    let mut lines = vec![
        connection_line(view.connection),
        format!("[submit] {}", view.submit.label),
    ];
    if view.jobs.is_empty() {
        lines.push("(no jobs)".to_string());
    }
    lines.extend(view.jobs.iter().map(job_line));
    if view.auth.server_downloads_visible {
        lines.extend(server_download_lines(&view.server_downloads));
    }
    if let Some(email) = &view.contact_email {
        lines.push(format!("[contact] {email}"));
    }
    lines
}

fn connection_line(status: ConnectionStatus) -> String {
    match status {
        ConnectionStatus::Connected => "[live] connected".to_string(),
        ConnectionStatus::Disconnected => "[live] disconnected; polling".to_string(),
    }
}

pub fn job_line(job: &JobView) -> String {
    let mut line = format!(
        "[job {}] {} {} ({})",
        job.job_id,
        job.name,
        job.status.as_str(),
        job.mode.as_str()
    );
    if let Some(position) = job.queue_position {
        line.push_str(&format!(" #{position} in queue"));
    }
    if let Some(progress) = &job.progress {
        line.push_str(&format!(
            " {}% ({}/{})",
            progress.percent, progress.completed, progress.total
        ));
    }
    if let Some(text) = job.status_text {
        line.push_str(&format!(" {text}"));
    } else if !job.message.is_empty() {
        line.push_str(&format!(" {}", job.message));
    }
    if !job.actions.is_empty() {
        let actions: Vec<&str> = job
            .actions
            .iter()
            .map(|action| match action {
                JobAction::Cancel => "cancel",
                JobAction::Retrieve => "get",
                JobAction::Clear => "clear",
            })
            .collect();
        line.push_str(&format!(" [{}]", actions.join("|")));
    }
    line
}

fn notification_line(note: &NotificationView) -> String {
    let tag = match note.level {
        NotificationLevel::Info => "info",
        NotificationLevel::Success => "ok",
        NotificationLevel::Error => "error",
    };
    format!("<{tag}> {}", note.text)
}

fn server_download_lines(downloads: &[ServerDownloadView]) -> Vec<String> {
    if downloads.is_empty() {
        return vec!["[server] no downloads".to_string()];
    }
    downloads
        .iter()
        .map(|d| format!("[server] {} {} files {}", d.name, d.files, d.size_text))
        .collect()
}
