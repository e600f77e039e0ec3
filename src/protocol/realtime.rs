use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Channel the assistant publishes its status lines to.
pub const LOG_CHANNEL: &str = "agent_logs";
/// Broadcast event name carried inside the channel.
pub const LOG_EVENT: &str = "log";

const TOPIC_PREFIX: &str = "realtime";
const BROADCAST_KIND: &str = "broadcast";

/// Phoenix-style control and broadcast events on a realtime socket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelEvent {
    #[serde(rename = "phx_join")]
    Join,
    #[serde(rename = "phx_reply")]
    Reply,
    #[serde(rename = "phx_close")]
    Close,
    #[serde(rename = "phx_error")]
    Error,
    #[serde(rename = "phx_leave")]
    Leave,
    Broadcast,
    Heartbeat,
    #[serde(other)]
    Unknown,
}

/// One message on the realtime socket. Payload stays untyped at this level;
/// the event determines which typed payload applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeMessage {
    pub topic: String,
    pub event: ChannelEvent,
    pub payload: Value,
    #[serde(rename = "ref")]
    pub message_ref: Option<String>,
}

/// Channel configuration sent with `phx_join`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JoinConfig {
    pub broadcast: BroadcastOptions,
    pub presence: PresenceOptions,
    pub postgres_changes: Vec<Value>,
}

/// Broadcast behavior for the joined channel. The log channel wants neither
/// delivery acks nor its own messages echoed back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct BroadcastOptions {
    #[serde(rename = "self")]
    pub echo: bool,
    pub ack: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PresenceOptions {
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JoinPayload {
    pub config: JoinConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    Ok,
    Error,
    #[serde(other)]
    Unknown,
}

/// Payload of a `phx_reply`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyPayload {
    pub status: ReplyStatus,
    #[serde(default)]
    pub response: Value,
}

/// Payload of an outbound `broadcast` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub event: String,
    pub payload: Value,
}

/// The log line itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogMessage {
    pub message: String,
}

impl RealtimeMessage {
    /// Topic string for the log channel (`realtime:agent_logs`).
    #[must_use]
    pub fn log_topic() -> String {
        format!("{TOPIC_PREFIX}:{LOG_CHANNEL}")
    }

    /// Join frame for the log channel, broadcast-only, no delivery ack.
    ///
    /// # Errors
    /// Returns an error if the join payload fails to serialize.
    pub fn join_log_channel(
        access_token: &str,
        message_ref: impl Into<String>,
    ) -> crate::Result<Self> {
        let payload = JoinPayload {
            config: JoinConfig::default(),
            access_token: Some(access_token.to_string()),
        };
        Ok(Self {
            topic: Self::log_topic(),
            event: ChannelEvent::Join,
            payload: serde_json::to_value(payload)?,
            message_ref: Some(message_ref.into()),
        })
    }

    /// One `log` broadcast frame carrying `{ "message": .. }`.
    ///
    /// # Errors
    /// Returns an error if the payload fails to serialize.
    pub fn broadcast_log(message: &str, message_ref: impl Into<String>) -> crate::Result<Self> {
        let payload = BroadcastPayload {
            kind: BROADCAST_KIND.to_string(),
            event: LOG_EVENT.to_string(),
            payload: serde_json::to_value(LogMessage { message: message.to_string() })?,
        };
        Ok(Self {
            topic: Self::log_topic(),
            event: ChannelEvent::Broadcast,
            payload: serde_json::to_value(payload)?,
            message_ref: Some(message_ref.into()),
        })
    }

    /// Graceful leave frame for the log channel.
    #[must_use]
    pub fn leave_log_channel(message_ref: impl Into<String>) -> Self {
        Self {
            topic: Self::log_topic(),
            event: ChannelEvent::Leave,
            payload: Value::Object(serde_json::Map::new()),
            message_ref: Some(message_ref.into()),
        }
    }

    /// Parse the payload of a `phx_reply`.
    ///
    /// # Errors
    /// Returns an error if the payload does not match the reply shape.
    pub fn reply_payload(&self) -> crate::Result<ReplyPayload> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}
