use crate::error::DashboardError;
use anyhow::Result;
use metrics::{counter, gauge, Counter, Gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{net::SocketAddr, sync::LazyLock};
use tracing::{error, info};

// Global metrics
pub static MESSAGES_RECEIVED_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("yumi_dashboard_messages_received_total"));
pub static UPDATES_DISPATCHED_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("yumi_dashboard_updates_dispatched_total"));
pub static DROPPED_FRAMES_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("yumi_dashboard_frames_dropped_total"));
pub static RECONNECT_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("yumi_dashboard_reconnects_total"));
pub static POLL_CYCLES_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("yumi_dashboard_poll_cycles_total"));
pub static CONNECTED_GAUGE: LazyLock<Gauge> =
    LazyLock::new(|| gauge!("yumi_dashboard_connected"));
pub static FALLBACK_GAUGE: LazyLock<Gauge> =
    LazyLock::new(|| gauge!("yumi_dashboard_fallback_polling"));

pub async fn setup_metrics(port: u16) -> Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    let builder = PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", "yumi-dashboard")
        .add_global_label("version", env!("CARGO_PKG_VERSION"));

    match builder.install() {
        Ok(_handle) => {
            info!(
                "Prometheus metrics server started on http://{}/metrics",
                addr
            );

            MESSAGES_RECEIVED_COUNTER.absolute(0);
            UPDATES_DISPATCHED_COUNTER.absolute(0);
            DROPPED_FRAMES_COUNTER.absolute(0);
            RECONNECT_COUNTER.absolute(0);
            POLL_CYCLES_COUNTER.absolute(0);
            CONNECTED_GAUGE.set(0.0);
            FALLBACK_GAUGE.set(0.0);

            Ok(())
        }
        Err(e) => {
            error!("Failed to start metrics server: {e}");
            Err(DashboardError::MetricsError(e.to_string()).into())
        }
    }
}
