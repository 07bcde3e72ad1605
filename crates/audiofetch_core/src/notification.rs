use crate::job::Millis;

pub const NOTIFICATION_LIFETIME_MS: Millis = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub text: String,
    expires_at: Millis,
}

/// Transient user-facing messages, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Notifications {
    items: Vec<Notification>,
    next_id: u64,
}

impl Notifications {
    pub fn push(&mut self, level: NotificationLevel, text: impl Into<String>, now: Millis) {
        self.next_id += 1;
        self.items.push(Notification {
            id: self.next_id,
            level,
            text: text.into(),
            expires_at: now + NOTIFICATION_LIFETIME_MS,
        });
    }

    /// Drops expired notifications; `true` if any were removed.
    pub fn expire(&mut self, now: Millis) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.expires_at > now);
        self.items.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn last(&self) -> Option<&Notification> {
        self.items.last()
    }
}
