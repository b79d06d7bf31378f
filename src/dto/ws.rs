use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::dto::validation::validate_room_id;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, PartialEq)]
/// Wrapper for every real-time message exchanged over the WebSocket.
///
/// The payload stays opaque until the handler matching the type inspects it,
/// so junk bytes under an unrecognized type are never partially parsed.
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Envelope {
    JoinLobby(Value),
    LeaveLobby(Value),
    ChatMessage(Value),
    TypingUpdate(Value),
    GameStart(Value),
    GameEnd(Value),
    Error(Value),
    #[serde(other)]
    Unknown,
}

impl Envelope {
    /// Parse a raw text frame into an envelope.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Canonical serialized form used when publishing to the relay topic.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Stable name of the event type, for logging.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Envelope::JoinLobby(_) => "join_lobby",
            Envelope::LeaveLobby(_) => "leave_lobby",
            Envelope::ChatMessage(_) => "chat_message",
            Envelope::TypingUpdate(_) => "typing_update",
            Envelope::GameStart(_) => "game_start",
            Envelope::GameEnd(_) => "game_end",
            Envelope::Error(_) => "error",
            Envelope::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
/// Payload of a `join_lobby` event.
pub struct JoinLobbyPayload {
    pub user_id: String,
    /// Display name; a guest name is derived from the user id when absent.
    #[serde(default)]
    pub username: Option<String>,
    pub room_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
/// Payload of a `typing_update` event; ephemeral, never persisted.
pub struct TypingUpdatePayload {
    pub user_id: String,
    #[validate(custom(function = validate_room_id))]
    pub room_id: String,
    pub wpm: u32,
    pub accuracy: f64,
    /// Completion percentage of the prompt text.
    #[validate(range(min = 0, max = 100))]
    pub progress: u8,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
/// Payload of a `chat_message` event; ephemeral, never persisted.
pub struct ChatMessagePayload {
    pub user_id: String,
    #[validate(custom(function = validate_room_id))]
    pub room_id: String,
    #[validate(length(min = 1))]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
/// Payload of a `game_end` event carrying the final stats of a race.
///
/// Every stat except the user id may be absent and defaults to zero/empty,
/// matching what lenient clients actually send.
pub struct GameEndPayload {
    pub user_id: String,
    #[serde(default)]
    pub wpm: u32,
    #[serde(default)]
    pub raw_wpm: u32,
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub consistency: f64,
    #[serde(default)]
    pub error_count: u32,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub language: String,
    /// Race duration in seconds.
    #[serde(default)]
    pub duration: u32,
    /// Opaque per-key error statistics; `null` and absent both mean "none".
    #[serde(default)]
    pub bad_keys: Option<Value>,
    #[serde(default)]
    pub improvement_needed: String,
}

impl GameEndPayload {
    /// The bad-keys blob to persist, defaulting to an empty object.
    pub fn bad_keys_or_default(&self) -> Value {
        match &self.bad_keys {
            Some(Value::Null) | None => Value::Object(serde_json::Map::new()),
            Some(value) => value.clone(),
        }
    }
}
