use crate::job::Millis;

/// Fixed delay before re-establishing a lost push connection.
pub const RECONNECT_DELAY_MS: Millis = 3_000;
/// Interval of the pull fallback while the push connection is down.
pub const FALLBACK_POLL_INTERVAL_MS: Millis = 30_000;
/// A connection attempt that has neither opened nor failed by then is
/// treated as failed.
pub const CONNECT_TIMEOUT_MS: Millis = 15_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting { give_up_at: Millis },
    Open,
    Closed { reconnect_at: Millis },
}

/// Lifecycle events reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Opened,
    ConnectionEstablished { connection_id: String },
    /// Error or close; the transport may report both for one failure.
    Closed,
}

/// What the channel wants the runtime to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAction {
    Connect,
    Reconcile,
    Poll,
}

/// Push-connection state machine with reconnect and fallback polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveChannel {
    state: ChannelState,
    connection_id: Option<String>,
    next_poll_at: Option<Millis>,
}

impl Default for LiveChannel {
    fn default() -> Self {
        Self {
            state: ChannelState::Closed { reconnect_at: 0 },
            connection_id: None,
            next_poll_at: None,
        }
    }
}

impl LiveChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ChannelState::Open
    }

    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    pub fn is_polling(&self) -> bool {
        self.next_poll_at.is_some()
    }

    /// Initial connection attempt.
    pub fn start(&mut self, now: Millis) -> Vec<ChannelAction> {
        self.connect(now)
    }

    fn connect(&mut self, now: Millis) -> Vec<ChannelAction> {
        self.state = ChannelState::Connecting {
            give_up_at: now + CONNECT_TIMEOUT_MS,
        };
        vec![ChannelAction::Connect]
    }

    pub fn handle(&mut self, event: ChannelEvent, now: Millis) -> Vec<ChannelAction> {
        match event {
            ChannelEvent::Opened => {
                if self.state == ChannelState::Open {
                    return Vec::new();
                }
                self.state = ChannelState::Open;
                self.next_poll_at = None;
                vec![ChannelAction::Reconcile]
            }
            ChannelEvent::ConnectionEstablished { connection_id } => {
                self.connection_id = Some(connection_id);
                Vec::new()
            }
            ChannelEvent::Closed => {
                if matches!(self.state, ChannelState::Closed { .. }) {
                    return Vec::new();
                }
                self.close(now);
                Vec::new()
            }
        }
    }

    fn close(&mut self, now: Millis) {
        self.state = ChannelState::Closed {
            reconnect_at: now + RECONNECT_DELAY_MS,
        };
        self.connection_id = None;
        if self.next_poll_at.is_none() {
            self.next_poll_at = Some(now + FALLBACK_POLL_INTERVAL_MS);
        }
    }

    /// Fires due connect-timeout, reconnect and poll deadlines.
    pub fn tick(&mut self, now: Millis) -> Vec<ChannelAction> {
        let mut actions = Vec::new();
        if let ChannelState::Connecting { give_up_at } = self.state {
            if now >= give_up_at {
                self.close(now);
            }
        }
        if let ChannelState::Closed { reconnect_at } = self.state {
            if now >= reconnect_at {
                actions.extend(self.connect(now));
            }
        }
        if let Some(poll_at) = self.next_poll_at {
            if now >= poll_at {
                self.next_poll_at = Some(now + FALLBACK_POLL_INTERVAL_MS);
                actions.push(ChannelAction::Poll);
            }
        }
        actions
    }
}
