// Lifecycle tests driving the real channel against a local WebSocket
// server: clean close is terminal, unclean closes back off and then
// degrade to polling, and sends require a connected channel.

use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::{frame::coding::CloseCode, CloseFrame};
use tokio_tungstenite::tungstenite::Message;
use url::Url;
use yumi_dashboard::{
    channel::RealtimeChannel,
    channel_state::{self, ConnectionState},
    config::{ChannelConfig, Config, LoggingConfig, MetricsConfig, PollingConfig},
    events::{create_event_channel, ChannelEvent, EventReceiver},
    types::OutboundCommand,
};

fn test_config(ws_port: u16, max_retries: u32) -> Arc<Config> {
    Arc::new(Config {
        channel: ChannelConfig {
            url: Url::parse(&format!("ws://127.0.0.1:{ws_port}")).unwrap(),
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(40),
            max_retries,
        },
        polling: PollingConfig {
            // Nothing listens on port 1; refresh failures are non-fatal.
            api_base: Url::parse("http://127.0.0.1:1/api/").unwrap(),
            interval: Duration::from_millis(50),
        },
        metrics: MetricsConfig {
            enabled: false,
            port: 0,
        },
        logging: LoggingConfig { quiet: true },
    })
}

async fn next_event(receiver: &mut EventReceiver) -> ChannelEvent {
    tokio::time::timeout(Duration::from_secs(5), receiver.recv())
        .await
        .expect("timed out waiting for a channel event")
        .expect("event bus closed unexpectedly")
}

/// Drain the bus until Stopping, returning everything seen.
async fn drain_until_stopping(receiver: &mut EventReceiver) -> Vec<ChannelEvent> {
    let mut events = Vec::new();
    loop {
        let event = next_event(receiver).await;
        let stop = matches!(event, ChannelEvent::Stopping);
        events.push(event);
        if stop {
            return events;
        }
    }
}

#[tokio::test]
async fn clean_close_is_terminal_and_drops_no_valid_update() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    // Server: accept once, push a mix of junk and one valid update,
    // then close cleanly.
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let handshake = ws.next().await.unwrap().unwrap();
        assert_eq!(
            handshake.into_text().unwrap(),
            r#"{"type":"request_update"}"#
        );

        for frame in [
            "not json at all",
            "42",
            r#"{"status":"no kind here"}"#,
            r#"{"type":"mystery_kind","x":1}"#,
            r#"{"type":"bot_status","status":"connected","guilds":2}"#,
        ] {
            ws.send(Message::Text(frame.to_string())).await.unwrap();
        }
        ws.send(Message::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        })))
        .await
        .unwrap();
        while ws.next().await.is_some() {}
    });

    let config = test_config(port, 3);
    let (event_sender, mut event_receiver) = create_event_channel();
    let state = channel_state::shared(config.reconnect_policy());
    let (mut channel, _handle) = RealtimeChannel::new(config, event_sender, state.clone());

    let run = tokio::spawn(async move { channel.run().await });
    let events = drain_until_stopping(&mut event_receiver).await;

    let updates: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ChannelEvent::Update(update) => Some(update.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(updates.len(), 1, "malformed frames must never dispatch");
    assert_eq!(updates[0].kind(), "bot_status");

    assert!(
        !events
            .iter()
            .any(|e| matches!(e, ChannelEvent::Reconnecting { .. })),
        "clean close must not schedule a reconnect"
    );
    assert!(!events
        .iter()
        .any(|e| matches!(e, ChannelEvent::FallbackActivated { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, ChannelEvent::Disconnected)));

    run.await.unwrap().unwrap();
    let state = state.lock().await;
    assert_eq!(state.state, ConnectionState::Disconnected);
    assert_eq!(state.frames_dropped, 4);
    assert_eq!(state.events_dispatched, 1);
}

#[tokio::test]
async fn unclean_closes_back_off_then_fall_back_to_polling() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    // Server: accept forever, immediately close every connection with a
    // non-clean code.
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                let _ = ws
                    .send(Message::Close(Some(CloseFrame {
                        code: CloseCode::Error,
                        reason: "restarting".into(),
                    })))
                    .await;
                while ws.next().await.is_some() {}
            });
        }
    });

    let config = test_config(port, 2);
    let (event_sender, mut event_receiver) = create_event_channel();
    let state = channel_state::shared(config.reconnect_policy());
    let (mut channel, handle) = RealtimeChannel::new(config, event_sender, state.clone());

    let run = tokio::spawn(async move { channel.run().await });

    // Collect until fallback activates, then shut the session down.
    let mut reconnects = Vec::new();
    let mut fallbacks = 0;
    loop {
        match next_event(&mut event_receiver).await {
            ChannelEvent::Reconnecting { attempt, delay_ms } => {
                reconnects.push((attempt, delay_ms));
            }
            ChannelEvent::FallbackActivated { .. } => {
                fallbacks += 1;
                break;
            }
            _ => {}
        }
    }

    assert_eq!(
        reconnects,
        vec![(1, 10), (2, 20)],
        "each failed cycle schedules exactly one reconnect with doubled delay"
    );

    // The fallback poller publishes snapshots even though every request
    // fails against the dead API port.
    loop {
        if let ChannelEvent::SnapshotRefreshed(snapshot) = next_event(&mut event_receiver).await {
            assert!(snapshot.servers.is_empty());
            assert!(snapshot.stats.is_none());
            break;
        }
    }

    handle.disconnect().await;
    let events = drain_until_stopping(&mut event_receiver).await;
    fallbacks += events
        .iter()
        .filter(|e| matches!(e, ChannelEvent::FallbackActivated { .. }))
        .count();
    assert_eq!(fallbacks, 1, "polling fallback must activate exactly once");
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, ChannelEvent::Reconnecting { .. })),
        "no reconnects after the retry budget is spent"
    );

    run.await.unwrap().unwrap();
    assert_eq!(state.lock().await.attempts, 2);
}

#[tokio::test]
async fn send_is_rejected_unless_connected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let mut seen = 0;
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Text(text) = message {
                frames_tx.send(text.to_string()).unwrap();
                seen += 1;
                if seen == 2 {
                    let _ = ws
                        .send(Message::Close(Some(CloseFrame {
                            code: CloseCode::Normal,
                            reason: "".into(),
                        })))
                        .await;
                }
            }
        }
    });

    let config = test_config(port, 3);
    let (event_sender, mut event_receiver) = create_event_channel();
    let state = channel_state::shared(config.reconnect_policy());
    let (mut channel, handle) = RealtimeChannel::new(config, event_sender, state);

    // Before the driver runs the channel is DISCONNECTED: the transport
    // must never see this command.
    assert!(!handle.send(OutboundCommand::RequestUpdate).await.unwrap());

    let run = tokio::spawn(async move { channel.run().await });

    loop {
        if matches!(
            next_event(&mut event_receiver).await,
            ChannelEvent::Connected { .. }
        ) {
            break;
        }
    }
    assert!(handle.send(OutboundCommand::RequestUpdate).await.unwrap());

    // The server saw exactly the connect handshake plus the manual send.
    let first = frames_rx.recv().await.unwrap();
    let second = frames_rx.recv().await.unwrap();
    assert_eq!(first, r#"{"type":"request_update"}"#);
    assert_eq!(second, r#"{"type":"request_update"}"#);

    drain_until_stopping(&mut event_receiver).await;
    run.await.unwrap().unwrap();

    // Terminal again: sends are rejected once more.
    assert!(!handle.send(OutboundCommand::RequestUpdate).await.unwrap());
}
