use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "yumi-dashboard",
    about = "terminal dashboard for the yumi sugoi discord bot with realtime updates",
    version
)]
pub struct Args {
    /// Live update channel endpoint
    #[arg(short, long, default_value = "ws://127.0.0.1:5000/ws")]
    pub url: String,

    /// Base URL of the dashboard REST API (initial load and polling fallback)
    #[arg(short, long, default_value = "http://127.0.0.1:5000/api/")]
    pub api_base: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,

    /// Enable metrics server
    #[arg(long)]
    pub metrics: bool,

    /// Metrics server port
    #[arg(long, default_value = "9090")]
    pub metrics_port: u16,

    /// Initial reconnect delay in milliseconds
    #[arg(long, default_value = "1000")]
    pub base_delay_ms: u64,

    /// Upper bound on the reconnect delay in milliseconds
    #[arg(long, default_value = "30000")]
    pub max_delay_ms: u64,

    /// Reconnect attempts before degrading to polling for the session
    #[arg(long, default_value = "5")]
    pub max_retries: u32,

    /// Fallback polling period in seconds
    #[arg(long, default_value = "15")]
    pub poll_interval: u64,

    /// Output format: table, json, minimal
    #[arg(long, default_value = "table")]
    pub format: String,

    /// Disable colored output (useful for piping to files)
    #[arg(long)]
    pub no_color: bool,

    /// Quiet mode - connection chatter suppressed, updates only
    #[arg(long)]
    pub quiet: bool,

    /// Maximum number of updates to display before exiting (0 for unlimited)
    #[arg(long, default_value = "0")]
    pub max_events: u64,
}
