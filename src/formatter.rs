use crate::types::{DashboardSnapshot, UpdateEvent};
use chrono::{DateTime, Local, Utc};

// ANSI color codes
pub struct Colors;

impl Colors {
    pub const RESET: &'static str = "\x1b[0m";
    pub const BOLD: &'static str = "\x1b[1m";
    pub const DIM: &'static str = "\x1b[2m";

    pub const WHITE: &'static str = "\x1b[37m";
    pub const GRAY: &'static str = "\x1b[90m";

    pub const BRIGHT_RED: &'static str = "\x1b[91m";
    pub const BRIGHT_GREEN: &'static str = "\x1b[92m";
    pub const BRIGHT_YELLOW: &'static str = "\x1b[93m";
    pub const BRIGHT_BLUE: &'static str = "\x1b[94m";
    pub const BRIGHT_MAGENTA: &'static str = "\x1b[95m";
    pub const BRIGHT_CYAN: &'static str = "\x1b[96m";
}

#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
    Minimal,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "minimal" => OutputFormat::Minimal,
            _ => OutputFormat::Table,
        }
    }
}

pub struct EventFormatter {
    format: OutputFormat,
    colored: bool,
    event_count: u64,
}

impl EventFormatter {
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        Self {
            format,
            colored,
            event_count: 0,
        }
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    pub fn print_header(&self) {
        if !matches!(self.format, OutputFormat::Table) {
            return;
        }
        let line = format!(
            "{:<8} │ {:<17} │ {:<20} │ {:<18} │ DETAIL",
            "TIME", "KIND", "SERVER", "WHO"
        );
        if self.colored {
            println!("{}{}{}{}", Colors::BOLD, Colors::WHITE, line, Colors::RESET);
            println!("{}{}{}", Colors::GRAY, "─".repeat(96), Colors::RESET);
        } else {
            println!("{line}");
            println!("{}", "─".repeat(96));
        }
    }

    pub fn print_update(&mut self, update: &UpdateEvent) {
        self.event_count += 1;
        match self.format {
            OutputFormat::Json => {
                if let Ok(json) = serde_json::to_string(update) {
                    println!("{json}");
                }
            }
            OutputFormat::Minimal => {
                let row = describe(update);
                println!("{} {}", update.kind(), row.detail);
            }
            OutputFormat::Table => {
                let row = describe(update);
                let time = row_time(update.timestamp());
                let kind = update.kind();
                if self.colored {
                    println!(
                        "{}{:<8}{} │ {}{:<17}{} │ {:<20} │ {:<18} │ {}",
                        Colors::GRAY,
                        time,
                        Colors::RESET,
                        kind_color(kind),
                        kind,
                        Colors::RESET,
                        truncate(&row.server, 20),
                        truncate(&row.who, 18),
                        row.detail
                    );
                } else {
                    println!(
                        "{:<8} │ {:<17} │ {:<20} │ {:<18} │ {}",
                        time,
                        kind,
                        truncate(&row.server, 20),
                        truncate(&row.who, 18),
                        row.detail
                    );
                }
            }
        }
    }

    /// Summary block for a full refresh (initial load or polling cycle).
    pub fn print_snapshot(&self, snapshot: &DashboardSnapshot) {
        if matches!(self.format, OutputFormat::Json) {
            let summary = serde_json::json!({
                "snapshot": {
                    "servers": snapshot.servers.len(),
                    "moderation_logs": snapshot.moderation_logs.len(),
                    "scheduled_tasks": snapshot.scheduled_tasks.len(),
                    "stats": snapshot.stats.is_some(),
                    "fetched_at": snapshot.fetched_at,
                }
            });
            println!("{summary}");
            return;
        }

        let label = if self.colored {
            format!("{}{}[REFRESH]{}", Colors::BOLD, Colors::BRIGHT_BLUE, Colors::RESET)
        } else {
            "[REFRESH]".to_string()
        };
        let mut parts = vec![format!("{} servers", snapshot.servers.len())];
        if let Some(stats) = snapshot.stats.as_ref().and_then(|s| s.bot_stats.as_ref()) {
            parts.push(format!("bot {} ({} guilds, {} users)", stats.status, stats.guilds, stats.users));
        }
        if !snapshot.moderation_logs.is_empty() {
            parts.push(format!("{} moderation entries", snapshot.moderation_logs.len()));
        }
        if !snapshot.scheduled_tasks.is_empty() {
            parts.push(format!("{} scheduled tasks", snapshot.scheduled_tasks.len()));
        }
        if let Some(personas) = &snapshot.personas {
            parts.push(format!(
                "{} personas ({} custom)",
                personas.default.len() + personas.custom.len(),
                personas.custom.len()
            ));
        }
        println!("{label} {}", parts.join(" · "));
    }
}

struct EventRow {
    server: String,
    who: String,
    detail: String,
}

fn describe(update: &UpdateEvent) -> EventRow {
    match update {
        UpdateEvent::UserMessage(msg) => EventRow {
            server: or_dash(msg.guild_id.as_deref()),
            who: msg.user_name.clone().unwrap_or_else(|| msg.user_id.clone()),
            detail: truncate(&msg.content, 60),
        },
        UpdateEvent::CommandUsed(cmd) => EventRow {
            server: or_dash(cmd.guild_id.as_deref()),
            who: cmd.user_id.clone(),
            detail: cmd.command.clone(),
        },
        UpdateEvent::UserJoined(member) => EventRow {
            server: or_dash(member.guild_id.as_deref()),
            who: member
                .user_name
                .clone()
                .unwrap_or_else(|| member.user_id.clone()),
            detail: match member.member_count {
                Some(count) => format!("joined ({count} members)"),
                None => "joined".to_string(),
            },
        },
        UpdateEvent::UserLeft(member) => EventRow {
            server: or_dash(member.guild_id.as_deref()),
            who: member
                .user_name
                .clone()
                .unwrap_or_else(|| member.user_id.clone()),
            detail: match member.member_count {
                Some(count) => format!("left ({count} members)"),
                None => "left".to_string(),
            },
        },
        UpdateEvent::ModerationAction(entry) => EventRow {
            server: or_dash(entry.guild_id.as_deref()),
            who: or_dash(entry.moderator.as_deref()),
            detail: {
                let mut detail = entry.action.clone();
                if let Some(target) = &entry.target {
                    detail.push_str(&format!(" → {target}"));
                }
                if let Some(reason) = &entry.reason {
                    detail.push_str(&format!(" ({reason})"));
                }
                detail
            },
        },
        UpdateEvent::Notification(note) => EventRow {
            server: "-".to_string(),
            who: "-".to_string(),
            detail: match &note.title {
                Some(title) => format!("{title}: {}", note.message),
                None => note.message.clone(),
            },
        },
        UpdateEvent::BotStatus(status) => EventRow {
            server: "-".to_string(),
            who: "-".to_string(),
            detail: match status.guilds {
                Some(guilds) => format!("{} ({guilds} guilds)", status.status),
                None => status.status.clone(),
            },
        },
        UpdateEvent::StatsUpdate(stats) => EventRow {
            server: "-".to_string(),
            who: "-".to_string(),
            detail: match &stats.activity_stats {
                Some(activity) => format!(
                    "{} messages, {} commands, {} active users",
                    activity.total_messages, activity.commands_used, activity.active_users
                ),
                None => "stats refreshed".to_string(),
            },
        },
    }
}

fn kind_color(kind: &str) -> &'static str {
    match kind {
        "user_message" => Colors::BRIGHT_GREEN,
        "command_used" => Colors::BRIGHT_CYAN,
        "user_joined" | "user_left" => Colors::BRIGHT_MAGENTA,
        "moderation_action" => Colors::BRIGHT_RED,
        "notification" => Colors::BRIGHT_YELLOW,
        "bot_status" | "stats_update" => Colors::BRIGHT_BLUE,
        _ => Colors::WHITE,
    }
}

fn or_dash(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or("-").to_string()
}

fn row_time(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp
        .map(|t| t.with_timezone(&Local))
        .unwrap_or_else(Local::now)
        .format("%H:%M:%S")
        .to_string()
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModerationEntry;

    #[test]
    fn moderation_row_includes_target_and_reason() {
        let update = UpdateEvent::ModerationAction(ModerationEntry {
            action: "User Warned".into(),
            moderator: Some("Admin".into()),
            target: Some("User#5678".into()),
            reason: Some("Spam".into()),
            ..Default::default()
        });
        let row = describe(&update);
        assert_eq!(row.who, "Admin");
        assert_eq!(row.detail, "User Warned → User#5678 (Spam)");
    }

    #[test]
    fn long_content_is_truncated() {
        let long = "x".repeat(200);
        let short = truncate(&long, 60);
        assert_eq!(short.chars().count(), 60);
        assert!(short.ends_with('…'));
    }

    #[test]
    fn format_names_parse_case_insensitively() {
        assert!(matches!(OutputFormat::from("JSON"), OutputFormat::Json));
        assert!(matches!(OutputFormat::from("minimal"), OutputFormat::Minimal));
        assert!(matches!(OutputFormat::from("anything"), OutputFormat::Table));
    }
}
