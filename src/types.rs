/// file: src/types.rs
/// description: type definitions for Yumi dashboard push updates and REST resources
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

// Helper for timestamps: the backend mixes RFC 3339, naive isoformat
// (assumed UTC) and epoch milliseconds. Unparseable values become None
// rather than poisoning the whole payload.
mod lenient_timestamp {
    use super::*;
    use chrono::NaiveDateTime;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(parse))
    }

    fn parse(value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                        .map(|naive| naive.and_utc())
                        .ok()
                }),
            Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
            _ => None,
        }
    }
}

// Helper for ids that the backend emits as either strings or numbers
mod lenient_id {
    use super::*;
    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(serde::de::Error::custom(format!(
                "expected string or number id, got {other}"
            ))),
        }
    }
}

/// Update kinds accepted on the live channel. Anything else is dropped.
pub const KNOWN_KINDS: [&str; 8] = [
    "user_message",
    "command_used",
    "user_joined",
    "user_left",
    "moderation_action",
    "notification",
    "bot_status",
    "stats_update",
];

/// A normalized, kind-tagged update received over the live channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateEvent {
    UserMessage(ChatMessage),
    CommandUsed(CommandUsage),
    UserJoined(MemberEvent),
    UserLeft(MemberEvent),
    ModerationAction(ModerationEntry),
    Notification(NotificationBody),
    BotStatus(BotStatus),
    StatsUpdate(StatsUpdate),
}

/// Why a raw frame was rejected instead of becoming an [`UpdateEvent`].
///
/// Rejections are logged and counted by the channel, never propagated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameRejection {
    NotJson(String),
    NotObject,
    MissingKind,
    UnknownKind(String),
    BadPayload { kind: String, reason: String },
}

impl fmt::Display for FrameRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameRejection::NotJson(e) => write!(f, "not valid JSON: {e}"),
            FrameRejection::NotObject => write!(f, "payload is not a JSON object"),
            FrameRejection::MissingKind => write!(f, "payload has no 'type' field"),
            FrameRejection::UnknownKind(k) => write!(f, "unknown update kind '{k}'"),
            FrameRejection::BadPayload { kind, reason } => {
                write!(f, "malformed '{kind}' payload: {reason}")
            }
        }
    }
}

impl UpdateEvent {
    /// Decode a raw text frame into a typed update.
    ///
    /// Two-step on purpose: the kind tag is inspected before the body is
    /// deserialized, so unknown kinds and malformed bodies are reported
    /// as distinct rejections.
    pub fn from_frame(raw: &str) -> Result<Self, FrameRejection> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| FrameRejection::NotJson(e.to_string()))?;
        if !value.is_object() {
            return Err(FrameRejection::NotObject);
        }
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(FrameRejection::MissingKind)?
            .to_string();
        if !KNOWN_KINDS.contains(&kind.as_str()) {
            return Err(FrameRejection::UnknownKind(kind));
        }
        serde_json::from_value(value).map_err(|e| FrameRejection::BadPayload {
            kind,
            reason: e.to_string(),
        })
    }

    /// Timestamp carried by the payload, when the backend sent one.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            UpdateEvent::UserMessage(body) => body.timestamp,
            UpdateEvent::CommandUsed(body) => body.timestamp,
            UpdateEvent::UserJoined(body) | UpdateEvent::UserLeft(body) => body.timestamp,
            UpdateEvent::ModerationAction(body) => body.timestamp,
            UpdateEvent::Notification(body) => body.timestamp,
            UpdateEvent::BotStatus(body) => body.timestamp,
            UpdateEvent::StatsUpdate(_) => None,
        }
    }

    /// The wire name of this update's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            UpdateEvent::UserMessage(_) => "user_message",
            UpdateEvent::CommandUsed(_) => "command_used",
            UpdateEvent::UserJoined(_) => "user_joined",
            UpdateEvent::UserLeft(_) => "user_left",
            UpdateEvent::ModerationAction(_) => "moderation_action",
            UpdateEvent::Notification(_) => "notification",
            UpdateEvent::BotStatus(_) => "bot_status",
            UpdateEvent::StatsUpdate(_) => "stats_update",
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatMessage {
    pub user_id: String,
    pub user_name: Option<String>,
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
    pub content: String,
    #[serde(deserialize_with = "lenient_timestamp::deserialize")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandUsage {
    pub user_id: String,
    pub guild_id: Option<String>,
    pub command: String,
    #[serde(deserialize_with = "lenient_timestamp::deserialize")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberEvent {
    pub user_id: String,
    pub user_name: Option<String>,
    pub guild_id: Option<String>,
    pub member_count: Option<u64>,
    #[serde(deserialize_with = "lenient_timestamp::deserialize")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A moderation action, both as a push update and as a row of the
/// moderation log resource.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationEntry {
    pub action: String,
    pub guild_id: Option<String>,
    pub moderator: Option<String>,
    #[serde(alias = "user_id")]
    pub target: Option<String>,
    pub reason: Option<String>,
    pub severity: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp::deserialize")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationBody {
    pub title: Option<String>,
    pub message: String,
    #[serde(alias = "level")]
    pub severity: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp::deserialize")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotStatus {
    pub status: String,
    pub guilds: Option<u64>,
    #[serde(deserialize_with = "lenient_timestamp::deserialize")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsUpdate {
    pub bot_stats: Option<BotStats>,
    pub activity_stats: Option<ActivityStats>,
    pub system_stats: Option<SystemStats>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotStats {
    pub status: String,
    pub guilds: u64,
    pub users: u64,
    pub channels: u64,
    pub uptime: Option<String>,
    pub version: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityStats {
    pub total_messages: u64,
    pub commands_used: u64,
    pub active_users: u64,
    pub average_xp: u64,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStats {
    pub memory_usage: u64,
    pub cpu_usage: u64,
    pub disk_usage: u64,
    pub response_time: u64,
}

/// Outbound command objects sent over the live channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundCommand {
    RequestUpdate,
}

impl OutboundCommand {
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// --- REST resources consumed by the initial load and polling fallback ---

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSummary {
    #[serde(deserialize_with = "lenient_id::deserialize")]
    pub id: String,
    pub name: String,
    pub member_count: u64,
    pub text_channels: Option<u64>,
    pub voice_channels: Option<u64>,
    pub owner: Option<String>,
}

/// Envelope of the server list resource. The backend emits `guilds` and
/// `servers` as aliases of the same array, sometimes both at once.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerList {
    servers: Option<Vec<ServerSummary>>,
    guilds: Option<Vec<ServerSummary>>,
}

impl ServerList {
    pub fn into_servers(self) -> Vec<ServerSummary> {
        self.servers.or(self.guilds).unwrap_or_default()
    }
}

#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModerationLogList {
    pub logs: Vec<ModerationEntry>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduledTask {
    #[serde(deserialize_with = "lenient_id::deserialize")]
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp::deserialize")]
    pub next_run: Option<DateTime<Utc>>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub task_type: Option<String>,
}

#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduledTaskList {
    pub tasks: Vec<ScheduledTask>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub persona_type: Option<String>,
    pub description: Option<String>,
    pub editable: bool,
}

/// Persona inventory split into built-in and custom names.
#[derive(Default, Debug, Clone, Serialize)]
pub struct PersonaInventory {
    pub default: Vec<String>,
    pub custom: Vec<String>,
}

/// Raw persona resource. Older deployments send `{default, custom}` name
/// arrays; newer ones send a `personas` array of objects tagged with a
/// `type` field. Both normalize into [`PersonaInventory`].
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersonaPayload {
    default: Vec<String>,
    custom: Vec<String>,
    personas: Vec<PersonaInfo>,
}

impl PersonaPayload {
    pub fn into_inventory(self) -> PersonaInventory {
        if !self.default.is_empty() || !self.custom.is_empty() {
            return PersonaInventory {
                default: self.default,
                custom: self.custom,
            };
        }
        let mut inventory = PersonaInventory::default();
        for persona in self.personas {
            match persona.persona_type.as_deref() {
                Some("custom") => inventory.custom.push(persona.name),
                _ => inventory.default.push(persona.name),
            }
        }
        inventory
    }
}

/// Aggregate produced by one full dashboard refresh cycle.
///
/// Every section is best-effort: a failed request leaves its section
/// empty rather than aborting the refresh.
#[derive(Default, Debug, Clone)]
pub struct DashboardSnapshot {
    pub stats: Option<StatsUpdate>,
    pub servers: Vec<ServerSummary>,
    pub moderation_logs: Vec<ModerationEntry>,
    pub scheduled_tasks: Vec<ScheduledTask>,
    pub personas: Option<PersonaInventory>,
    pub fetched_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_kinds() {
        let event = UpdateEvent::from_frame(
            r#"{"type":"command_used","user_id":"42","guild_id":"7","command":"!help"}"#,
        )
        .unwrap();
        match event {
            UpdateEvent::CommandUsed(cmd) => {
                assert_eq!(cmd.user_id, "42");
                assert_eq!(cmd.command, "!help");
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn decodes_bot_status_emitted_by_backend() {
        let event = UpdateEvent::from_frame(
            r#"{"type":"bot_status","status":"connected","guilds":3,"timestamp":"2025-06-01T12:00:00Z"}"#,
        )
        .unwrap();
        match event {
            UpdateEvent::BotStatus(status) => {
                assert_eq!(status.status, "connected");
                assert_eq!(status.guilds, Some(3));
                assert!(status.timestamp.is_some());
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(
            UpdateEvent::from_frame("not json at all"),
            Err(FrameRejection::NotJson(_))
        ));
    }

    #[test]
    fn rejects_json_primitives_and_arrays() {
        assert_eq!(UpdateEvent::from_frame("42"), Err(FrameRejection::NotObject));
        assert_eq!(
            UpdateEvent::from_frame("\"hello\""),
            Err(FrameRejection::NotObject)
        );
        assert_eq!(
            UpdateEvent::from_frame("[{\"type\":\"bot_status\"}]"),
            Err(FrameRejection::NotObject)
        );
    }

    #[test]
    fn rejects_missing_and_unknown_kinds() {
        assert_eq!(
            UpdateEvent::from_frame(r#"{"status":"online"}"#),
            Err(FrameRejection::MissingKind)
        );
        assert_eq!(
            UpdateEvent::from_frame(r#"{"type":"totally_new_kind","x":1}"#),
            Err(FrameRejection::UnknownKind("totally_new_kind".into()))
        );
    }

    #[test]
    fn missing_body_fields_fall_back_to_defaults() {
        let event = UpdateEvent::from_frame(r#"{"type":"user_joined"}"#).unwrap();
        match event {
            UpdateEvent::UserJoined(member) => {
                assert_eq!(member.user_id, "");
                assert!(member.guild_id.is_none());
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn outbound_command_wire_format() {
        let frame = OutboundCommand::RequestUpdate.to_frame().unwrap();
        assert_eq!(frame, r#"{"type":"request_update"}"#);
    }

    #[test]
    fn server_list_accepts_either_alias() {
        let by_servers: ServerList =
            serde_json::from_str(r#"{"servers":[{"id":1,"name":"a","member_count":5}]}"#).unwrap();
        let by_guilds: ServerList =
            serde_json::from_str(r#"{"guilds":[{"id":"2","name":"b","member_count":9}]}"#).unwrap();
        let both: ServerList = serde_json::from_str(
            r#"{"guilds":[{"id":3,"name":"c"}],"servers":[{"id":3,"name":"c"}]}"#,
        )
        .unwrap();

        assert_eq!(by_servers.into_servers()[0].id, "1");
        assert_eq!(by_guilds.into_servers()[0].member_count, 9);
        assert_eq!(both.into_servers().len(), 1);
    }

    #[test]
    fn persona_payload_normalizes_both_shapes() {
        let names: PersonaPayload =
            serde_json::from_str(r#"{"default":["normal","tsundere"],"custom":["pirate"]}"#)
                .unwrap();
        let inventory = names.into_inventory();
        assert_eq!(inventory.default.len(), 2);
        assert_eq!(inventory.custom, vec!["pirate"]);

        let tagged: PersonaPayload = serde_json::from_str(
            r#"{"personas":[{"name":"normal","type":"built-in"},{"name":"pirate","type":"custom","editable":true}]}"#,
        )
        .unwrap();
        let inventory = tagged.into_inventory();
        assert_eq!(inventory.default, vec!["normal"]);
        assert_eq!(inventory.custom, vec!["pirate"]);
    }
}
