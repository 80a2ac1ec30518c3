/// file: src/events.rs
/// description: event bus decoupling the live channel from the terminal renderer
use crate::types::{DashboardSnapshot, UpdateEvent};
use std::sync::Arc;
use tokio::sync::mpsc;

// Updates are wrapped in Arc so dispatch never clones payload bodies.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Starting,
    Connecting { url: String },
    Connected { connection_id: String },
    SyncRequested,
    Update(Arc<UpdateEvent>),
    ConnectionFailed(String),
    Reconnecting { attempt: u32, delay_ms: u64 },
    FallbackActivated { interval_secs: u64 },
    SnapshotRefreshed(Arc<DashboardSnapshot>),
    Disconnected,
    Stopping,
}

// Bounded so a stalled renderer cannot grow memory without limit; the
// dashboard's update rate is low, so the buffer covers long stalls.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

pub type EventSender = mpsc::Sender<ChannelEvent>;
pub type EventReceiver = mpsc::Receiver<ChannelEvent>;

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}
