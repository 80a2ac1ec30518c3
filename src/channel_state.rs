/// file: src/channel_state.rs
/// description: connection state machine for the live update channel
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Close codes after which no reconnect is attempted: normal closure
/// and going-away (server shutdown, page unload analog).
pub const CLEAN_CLOSE_CODES: [u16; 2] = [1000, 1001];

/// Close code used for an intentional local shutdown.
pub const CLEAN_SHUTDOWN_CODE: u16 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    FallbackPolling,
}

/// Bounded exponential backoff between reconnect attempts.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: u32,
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt number `attempts` (zero-based):
    /// `min(base_delay * 2^attempts, max_delay)`.
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let delay = 2u32
            .checked_pow(attempts)
            .map(|factor| self.base_delay.saturating_mul(factor))
            .unwrap_or(self.max_delay);
        delay.min(self.max_delay)
    }
}

/// What the channel driver must do after a connection loss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseDisposition {
    /// Clean close: terminal for this session, no timer.
    Terminal,
    /// Schedule exactly one reconnect after `delay`.
    Reconnect { delay: Duration, attempt: u32 },
    /// Retries exhausted: degrade to polling for the rest of the session.
    Fallback,
}

#[derive(Debug)]
pub struct ChannelState {
    pub connection_id: String,
    pub state: ConnectionState,
    pub attempts: u32,
    policy: ReconnectPolicy,
    polling_active: bool,
    pub last_message_time: Option<Instant>,
    pub messages_received: u64,
    pub events_dispatched: u64,
    pub frames_dropped: u64,
}

impl ChannelState {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            connection_id: uuid::Uuid::new_v4().to_string(),
            state: ConnectionState::Disconnected,
            attempts: 0,
            policy,
            polling_active: false,
            last_message_time: None,
            messages_received: 0,
            events_dispatched: 0,
            frames_dropped: 0,
        }
    }

    /// Begin a connection attempt. Returns false while already
    /// CONNECTING or CONNECTED (overlap guard) and once the session has
    /// degraded to polling, which is permanent.
    pub fn begin_connect(&mut self) -> bool {
        match self.state {
            ConnectionState::Disconnected => {
                self.state = ConnectionState::Connecting;
                true
            }
            ConnectionState::Connecting
            | ConnectionState::Connected
            | ConnectionState::FallbackPolling => false,
        }
    }

    /// The transport is up: reset the attempt counter and stamp a fresh
    /// connection id.
    pub fn connection_established(&mut self) {
        self.connection_id = uuid::Uuid::new_v4().to_string();
        self.state = ConnectionState::Connected;
        self.attempts = 0;
        self.last_message_time = Some(Instant::now());
    }

    /// The transport went down with `code`. Decides between terminal
    /// disconnect, a single scheduled reconnect, and polling fallback.
    pub fn connection_closed(&mut self, code: u16) -> CloseDisposition {
        if CLEAN_CLOSE_CODES.contains(&code) {
            self.state = ConnectionState::Disconnected;
            return CloseDisposition::Terminal;
        }
        if self.attempts < self.policy.max_retries {
            let delay = self.policy.delay_for(self.attempts);
            self.attempts += 1;
            self.state = ConnectionState::Disconnected;
            CloseDisposition::Reconnect {
                delay,
                attempt: self.attempts,
            }
        } else {
            self.state = ConnectionState::FallbackPolling;
            CloseDisposition::Fallback
        }
    }

    /// Arm the polling fallback. Returns true only on the first call so
    /// a second activation can never stack a duplicate refresh timer.
    pub fn activate_polling(&mut self) -> bool {
        if self.polling_active {
            return false;
        }
        self.polling_active = true;
        self.state = ConnectionState::FallbackPolling;
        true
    }

    /// Intentional local shutdown. Idempotent.
    pub fn disconnect(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.polling_active = false;
    }

    pub fn can_send(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn record_message(&mut self) {
        self.last_message_time = Some(Instant::now());
        self.messages_received += 1;
    }

    pub fn record_dispatch(&mut self) {
        self.events_dispatched += 1;
    }

    pub fn record_dropped_frame(&mut self) {
        self.frames_dropped += 1;
    }
}

pub type SharedChannelState = Arc<Mutex<ChannelState>>;

pub fn shared(policy: ReconnectPolicy) -> SharedChannelState {
    Arc::new(Mutex::new(ChannelState::new(policy)))
}
