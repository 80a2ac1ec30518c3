// file: src/channel.rs
// description: live update channel driver with backoff reconnect and polling fallback

use crate::{
    channel_state::{CloseDisposition, SharedChannelState, CLEAN_SHUTDOWN_CODE},
    config::Config,
    error::DashboardError,
    events::{ChannelEvent, EventSender},
    monitoring,
    poller::DashboardPoller,
    types::{OutboundCommand, UpdateEvent},
};
use anyhow::Result;
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use std::sync::Arc;
use tokio::{
    net::TcpStream,
    sync::{mpsc, watch},
    time::sleep,
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::{frame::coding::CloseCode, CloseFrame},
    tungstenite::Message,
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};

/// Synthetic code for transport failures that never produced a close frame.
const ABNORMAL_CLOSE_CODE: u16 = 1006;

const COMMAND_CHANNEL_CAPACITY: usize = 64;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

enum StreamOutcome {
    /// The connection ended; the code decides clean vs unclean handling.
    Closed(u16),
    /// Local intentional shutdown.
    Shutdown,
}

/// Caller-side handle to a running [`RealtimeChannel`].
#[derive(Clone)]
pub struct ChannelHandle {
    state: SharedChannelState,
    command_tx: mpsc::Sender<OutboundCommand>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl ChannelHandle {
    /// Queue a command for the live channel. Returns `Ok(false)` without
    /// touching the transport when the channel is not connected; callers
    /// must not assume delivery.
    pub async fn send(&self, command: OutboundCommand) -> Result<bool> {
        let connected = { self.state.lock().await.can_send() };
        if !connected {
            warn!("send ignored: live channel is not connected");
            return Ok(false);
        }
        self.command_tx
            .send(command)
            .await
            .map_err(|e| DashboardError::EventSendError(e.to_string()))?;
        Ok(true)
    }

    /// Request a clean shutdown: close code 1000, timers cancelled,
    /// state DISCONNECTED. Idempotent.
    pub async fn disconnect(&self) {
        let _ = self.shutdown_tx.send(true);
        self.state.lock().await.disconnect();
    }
}

/// Maintains the push channel to the dashboard backend: connects,
/// normalizes inbound frames into [`UpdateEvent`]s, reconnects with
/// bounded exponential backoff, and degrades to REST polling for the
/// rest of the session once retries are exhausted.
pub struct RealtimeChannel {
    config: Arc<Config>,
    event_sender: EventSender,
    pub state: SharedChannelState,
    command_rx: mpsc::Receiver<OutboundCommand>,
    shutdown_rx: watch::Receiver<bool>,
    // Kept so `shutdown_rx.changed()` can never observe a dropped sender.
    _shutdown_tx: Arc<watch::Sender<bool>>,
    poller: DashboardPoller,
}

impl RealtimeChannel {
    pub fn new(
        config: Arc<Config>,
        event_sender: EventSender,
        state: SharedChannelState,
    ) -> (Self, ChannelHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shutdown_tx = Arc::new(shutdown_tx);
        let poller = DashboardPoller::new(config.clone(), event_sender.clone());

        let handle = ChannelHandle {
            state: state.clone(),
            command_tx,
            shutdown_tx: shutdown_tx.clone(),
        };
        let channel = Self {
            config,
            event_sender,
            state,
            command_rx,
            shutdown_rx,
            _shutdown_tx: shutdown_tx,
            poller,
        };
        (channel, handle)
    }

    /// Drive the channel until a clean close, an explicit shutdown, or
    /// (after fallback activation) the end of the polling loop.
    pub async fn run(&mut self) -> Result<()> {
        let _ = self.send_event(ChannelEvent::Starting).await;

        loop {
            if *self.shutdown_rx.borrow() {
                break;
            }

            let proceed = { self.state.lock().await.begin_connect() };
            if !proceed {
                debug!("connect suppressed: channel already active or degraded");
                break;
            }

            let _ = self
                .send_event(ChannelEvent::Connecting {
                    url: self.config.channel.url.to_string(),
                })
                .await;

            let outcome = self.connect_and_stream().await;

            let disposition = {
                let mut state = self.state.lock().await;
                match outcome {
                    StreamOutcome::Shutdown => {
                        state.disconnect();
                        None
                    }
                    StreamOutcome::Closed(code) => Some(state.connection_closed(code)),
                }
            };

            match disposition {
                None => break,
                Some(CloseDisposition::Terminal) => {
                    info!("live channel closed cleanly; not reconnecting");
                    let _ = self.send_event(ChannelEvent::Disconnected).await;
                    break;
                }
                Some(CloseDisposition::Reconnect { delay, attempt }) => {
                    monitoring::RECONNECT_COUNTER.increment(1);
                    warn!(
                        "live channel lost; reconnecting in {}ms (attempt {}/{})",
                        delay.as_millis(),
                        attempt,
                        self.config.channel.max_retries
                    );
                    let _ = self
                        .send_event(ChannelEvent::Reconnecting {
                            attempt,
                            delay_ms: delay.as_millis() as u64,
                        })
                        .await;
                    // The backoff sleep is the one pending reconnect
                    // timer; shutdown cancels it.
                    tokio::select! {
                        _ = sleep(delay) => {}
                        _ = self.shutdown_rx.changed() => break,
                    }
                }
                Some(CloseDisposition::Fallback) => {
                    self.run_polling().await;
                    break;
                }
            }
        }

        let _ = self.send_event(ChannelEvent::Stopping).await;
        Ok(())
    }

    async fn connect_and_stream(&mut self) -> StreamOutcome {
        let url = self.config.channel.url.as_str();
        let ws_stream = match connect_async(url).await {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => {
                error!("failed to connect live channel: {e}");
                let _ = self
                    .send_event(ChannelEvent::ConnectionFailed(e.to_string()))
                    .await;
                return StreamOutcome::Closed(ABNORMAL_CLOSE_CODE);
            }
        };

        let connection_id = {
            let mut state = self.state.lock().await;
            state.connection_established();
            state.connection_id.clone()
        };
        info!("live channel established to {url}");
        monitoring::CONNECTED_GAUGE.set(1.0);
        let _ = self.send_event(ChannelEvent::Connected { connection_id }).await;

        let (mut write, mut read) = ws_stream.split();

        // Ask the backend for a fresh status push right away, the same
        // handshake the browser dashboard performs on connect.
        if let Err(e) = send_command(&mut write, OutboundCommand::RequestUpdate).await {
            error!("failed to request initial update: {e}");
            monitoring::CONNECTED_GAUGE.set(0.0);
            return StreamOutcome::Closed(ABNORMAL_CLOSE_CODE);
        }
        let _ = self.send_event(ChannelEvent::SyncRequested).await;

        // Locals only inside the select arms: the receiver fields stay
        // mutably borrowed while other arms run.
        let state = self.state.clone();
        let events = self.event_sender.clone();
        let mut commands_open = true;

        let outcome = loop {
            tokio::select! {
                _ = self.shutdown_rx.changed() => {
                    let frame = CloseFrame {
                        code: CloseCode::from(CLEAN_SHUTDOWN_CODE),
                        reason: "client shutdown".into(),
                    };
                    if let Err(e) = write.send(Message::Close(Some(frame))).await {
                        debug!("close frame not delivered: {e}");
                    }
                    break StreamOutcome::Shutdown;
                }
                command = self.command_rx.recv(), if commands_open => {
                    match command {
                        Some(command) => {
                            if let Err(e) = send_command(&mut write, command).await {
                                warn!("outbound send failed: {e}");
                                break StreamOutcome::Closed(ABNORMAL_CLOSE_CODE);
                            }
                        }
                        None => commands_open = false,
                    }
                }
                message = read.next() => {
                    match message {
                        Some(Ok(message)) => {
                            if let Some(outcome) = process_message(&state, &events, message).await {
                                break outcome;
                            }
                        }
                        Some(Err(e)) => {
                            error!("live channel stream error: {e}");
                            break StreamOutcome::Closed(ABNORMAL_CLOSE_CODE);
                        }
                        None => {
                            warn!("live channel ended without a close frame");
                            break StreamOutcome::Closed(ABNORMAL_CLOSE_CODE);
                        }
                    }
                }
            }
        };

        monitoring::CONNECTED_GAUGE.set(0.0);
        outcome
    }

    async fn run_polling(&mut self) {
        let first = { self.state.lock().await.activate_polling() };
        if !first {
            warn!("polling fallback already active; not starting another timer");
            return;
        }
        let interval_secs = self.config.polling.interval.as_secs();
        warn!(
            "live channel abandoned after {} failed attempts; refreshing every {}s instead",
            self.config.channel.max_retries, interval_secs
        );
        monitoring::FALLBACK_GAUGE.set(1.0);
        let _ = self
            .send_event(ChannelEvent::FallbackActivated { interval_secs })
            .await;
        self.poller.run(self.shutdown_rx.clone()).await;
    }

    async fn send_event(&self, event: ChannelEvent) -> Result<()> {
        self.event_sender
            .send(event)
            .await
            .map_err(|e| DashboardError::EventSendError(e.to_string()).into())
    }
}

async fn send_command(write: &mut WsSink, command: OutboundCommand) -> Result<(), DashboardError> {
    let frame = command.to_frame()?;
    write.send(Message::Text(frame)).await?;
    Ok(())
}

/// Single entry point for inbound frames. Returns an outcome only when
/// the stream must end; everything else is handled in place.
async fn process_message(
    state: &SharedChannelState,
    events: &EventSender,
    message: Message,
) -> Option<StreamOutcome> {
    match message {
        Message::Text(text) => {
            {
                let mut state = state.lock().await;
                state.record_message();
            }
            monitoring::MESSAGES_RECEIVED_COUNTER.increment(1);

            match UpdateEvent::from_frame(&text) {
                Ok(update) => {
                    {
                        let mut state = state.lock().await;
                        state.record_dispatch();
                    }
                    monitoring::UPDATES_DISPATCHED_COUNTER.increment(1);
                    let _ = events.send(ChannelEvent::Update(Arc::new(update))).await;
                }
                Err(rejection) => {
                    {
                        let mut state = state.lock().await;
                        state.record_dropped_frame();
                    }
                    monitoring::DROPPED_FRAMES_COUNTER.increment(1);
                    warn!(
                        "dropping inbound frame ({rejection}): {}",
                        text.chars().take(100).collect::<String>()
                    );
                }
            }
            None
        }
        Message::Binary(data) => {
            debug!("ignoring binary frame of {} bytes", data.len());
            None
        }
        Message::Ping(_) => {
            // Pong is handled by the transport.
            debug!("ping received");
            None
        }
        Message::Pong(_) => None,
        Message::Close(frame) => {
            let code = frame
                .as_ref()
                .map(|f| u16::from(f.code))
                .unwrap_or(ABNORMAL_CLOSE_CODE);
            warn!("live channel closed by server (code {code})");
            Some(StreamOutcome::Closed(code))
        }
        Message::Frame(_) => None,
    }
}
