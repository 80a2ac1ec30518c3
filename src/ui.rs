/// file: src/ui.rs
/// description: terminal renderer consuming events from the live channel
use crate::{
    events::{ChannelEvent, EventReceiver},
    formatter::{Colors, EventFormatter, OutputFormat},
};
use tracing::info;

pub struct UiController {
    event_receiver: EventReceiver,
    formatter: EventFormatter,
    quiet_mode: bool,
    colored: bool,
    header_printed: bool,
    max_events: Option<u64>,
}

pub struct UiOptions {
    pub colored: bool,
    pub quiet: bool,
    pub max_events: u64,
}

impl UiController {
    pub fn new(event_receiver: EventReceiver, format: OutputFormat, options: UiOptions) -> Self {
        Self {
            event_receiver,
            formatter: EventFormatter::new(format, options.colored),
            quiet_mode: options.quiet,
            colored: options.colored,
            header_printed: false,
            max_events: if options.max_events == 0 {
                None
            } else {
                Some(options.max_events)
            },
        }
    }

    pub async fn run(&mut self) {
        self.print_startup_banner();
        while let Some(event) = self.event_receiver.recv().await {
            if !self.handle_event(event) {
                break;
            }
        }
    }

    fn handle_event(&mut self, event: ChannelEvent) -> bool {
        match event {
            ChannelEvent::Starting => {
                info!("Dashboard client starting...");
            }
            ChannelEvent::Connecting { url } => {
                self.print_status("CONNECTING", &url);
            }
            ChannelEvent::Connected { connection_id } => {
                self.print_status("CONNECTED", &format!("ID: {connection_id}"));
            }
            ChannelEvent::SyncRequested => {
                self.print_status("LISTENING", "Requested fresh status from the bot");
                if !self.header_printed {
                    self.formatter.print_header();
                    self.header_printed = true;
                }
            }
            ChannelEvent::Update(update) => {
                if !self.header_printed {
                    self.formatter.print_header();
                    self.header_printed = true;
                }
                self.formatter.print_update(&update);

                if let Some(max_events) = self.max_events {
                    if self.formatter.event_count() >= max_events {
                        self.print_status(
                            "STOPPING",
                            &format!("Reached configured max events ({max_events})"),
                        );
                        return false;
                    }
                }
            }
            ChannelEvent::ConnectionFailed(error) => {
                self.print_error("CONNECTION FAILED", &error);
            }
            ChannelEvent::Reconnecting { attempt, delay_ms } => {
                self.print_status(
                    "RECONNECTING",
                    &format!("Attempt {attempt} in {delay_ms}ms..."),
                );
            }
            ChannelEvent::FallbackActivated { interval_secs } => {
                self.print_status(
                    "FALLBACK",
                    &format!("Live updates unavailable; refreshing every {interval_secs}s"),
                );
            }
            ChannelEvent::SnapshotRefreshed(snapshot) => {
                self.formatter.print_snapshot(&snapshot);
            }
            ChannelEvent::Disconnected => {
                self.print_status("DISCONNECTED", "Connection closed");
            }
            ChannelEvent::Stopping => {
                self.print_status("STOPPING", "Dashboard client shutting down");
            }
        }

        true
    }

    fn print_startup_banner(&self) {
        if self.quiet_mode {
            return;
        }
        let title = format!(
            "Yumi Sugoi Dashboard v{} — live bot updates",
            env!("CARGO_PKG_VERSION")
        );
        if self.colored {
            println!();
            println!(
                "{}{}{}{}",
                Colors::BOLD,
                Colors::BRIGHT_CYAN,
                title,
                Colors::RESET
            );
            println!();
        } else {
            println!("\n{title}\n");
        }
    }

    fn print_status(&self, status: &str, message: &str) {
        if self.quiet_mode {
            return;
        }

        if !self.colored {
            println!("[{status}] {message}");
            return;
        }

        let color = match status {
            "CONNECTING" => Colors::BRIGHT_YELLOW,
            "CONNECTED" => Colors::BRIGHT_GREEN,
            "LISTENING" => Colors::BRIGHT_BLUE,
            "RECONNECTING" => Colors::BRIGHT_YELLOW,
            "FALLBACK" => Colors::BRIGHT_MAGENTA,
            "DISCONNECTED" => Colors::BRIGHT_RED,
            "STOPPING" => Colors::BRIGHT_MAGENTA,
            _ => Colors::WHITE,
        };

        println!(
            "{}{}[{}]{} {}{}{}",
            Colors::BOLD,
            color,
            status,
            Colors::RESET,
            Colors::WHITE,
            message,
            Colors::RESET
        );
    }

    fn print_error(&self, error_type: &str, message: &str) {
        if !self.colored {
            println!("[{error_type}] {message}");
            return;
        }
        println!(
            "{}{}[{}]{} {}{}{}",
            Colors::BOLD,
            Colors::BRIGHT_RED,
            error_type,
            Colors::RESET,
            Colors::DIM,
            message,
            Colors::RESET
        );
    }
}
