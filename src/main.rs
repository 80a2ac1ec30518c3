use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use yumi_dashboard::{
    channel::RealtimeChannel,
    channel_state,
    cli::Args,
    config::Config,
    events::create_event_channel,
    formatter::OutputFormat,
    monitoring::setup_metrics,
    poller::DashboardPoller,
    tracing_setup::setup_tracing,
    ui::{UiController, UiOptions},
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_tracing(&args.log_level, args.json_logs)?;

    info!(
        "Starting Yumi dashboard client v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = Arc::new(Config::from_args(&args)?);

    if config.metrics.enabled {
        setup_metrics(config.metrics.port).await?;
        info!("Metrics server started on port {}", config.metrics.port);
    }

    let (event_sender, event_receiver) = create_event_channel();
    let state = channel_state::shared(config.reconnect_policy());
    let (mut channel, handle) = RealtimeChannel::new(config.clone(), event_sender.clone(), state);

    let mut ui = UiController::new(
        event_receiver,
        OutputFormat::from(args.format.as_str()),
        UiOptions {
            colored: !args.no_color,
            quiet: args.quiet,
            max_events: args.max_events,
        },
    );
    let ui_handle = handle.clone();
    let ui_task = tokio::spawn(async move {
        ui.run().await;
        // Renderer finished (max events reached or bus closed): the
        // session has nothing left to show.
        ui_handle.disconnect().await;
    });

    // Initial full load, the way the browser dashboard fills its tabs
    // before the live channel comes up.
    DashboardPoller::new(config.clone(), event_sender.clone())
        .refresh_and_publish()
        .await;

    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received; disconnecting");
            shutdown_handle.disconnect().await;
        }
    });

    if let Err(e) = channel.run().await {
        error!("Dashboard channel error: {e}");
        return Err(e);
    }

    // Close the event bus so the renderer drains and exits.
    drop(channel);
    drop(event_sender);
    let _ = ui_task.await;

    info!("Dashboard client stopped");
    Ok(())
}
