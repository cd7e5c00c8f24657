use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::message::RelayedMessage;
use crate::shared::ChatError;

/// Message types for WebSocket communication
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    // Client -> Server
    Authenticate,
    JoinRoom,
    LeaveRoom,
    SendMessage,
    TypingStart,
    TypingStop,

    // Server -> Client
    Authenticated,
    RoomJoined,
    RoomLeft,
    NewMessage,
    ParticipantJoined,
    ParticipantLeft,
    UserTyping,
    UserStoppedTyping,
    Error,
}

/// Metadata for WebSocket messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketMessageMeta {
    pub timestamp: DateTime<Utc>,
}

/// Base structure for WebSocket messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketMessage {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(default)]
    pub payload: Value,
    pub meta: Option<WebSocketMessageMeta>,
}

/// Client-to-Server message payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatePayload {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPayload {
    pub room_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub room_id: String,
    pub content: String,
}

/// Server-to-Client message payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedPayload {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoinedPayload {
    pub room_id: String,
    /// Users with a live connection in the room
    pub members: Vec<String>,
    /// Persisted roster, including users currently offline
    pub participants: Vec<String>,
}

/// Presence events fire once per connection, so a user with several tabs
/// produces several joins and leaves. `count` is distinct users, and
/// `userConnections` says how many of this user's connections remain; a
/// `participant-left` with a non-zero value means the user is still present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePayload {
    pub room_id: String,
    pub user_id: String,
    pub count: usize,
    pub user_connections: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub room_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

/// A parsed client event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Authenticate { token: String },
    JoinRoom { room_id: String },
    LeaveRoom { room_id: String },
    SendMessage { room_id: String, content: String },
    TypingStart { room_id: String },
    TypingStop { room_id: String },
}

impl ClientEvent {
    pub fn parse(raw: &str) -> Result<Self, ChatError> {
        let message: WebSocketMessage = serde_json::from_str(raw)
            .map_err(|e| ChatError::InvalidPayload(format!("Malformed message: {}", e)))?;

        match message.message_type {
            MessageType::Authenticate => {
                let payload: AuthenticatePayload = from_payload(message.payload)?;
                Ok(ClientEvent::Authenticate {
                    token: payload.token,
                })
            }
            MessageType::JoinRoom => {
                let payload: RoomPayload = from_payload(message.payload)?;
                Ok(ClientEvent::JoinRoom {
                    room_id: payload.room_id,
                })
            }
            MessageType::LeaveRoom => {
                let payload: RoomPayload = from_payload(message.payload)?;
                Ok(ClientEvent::LeaveRoom {
                    room_id: payload.room_id,
                })
            }
            MessageType::SendMessage => {
                let payload: SendMessagePayload = from_payload(message.payload)?;
                Ok(ClientEvent::SendMessage {
                    room_id: payload.room_id,
                    content: payload.content,
                })
            }
            MessageType::TypingStart => {
                let payload: RoomPayload = from_payload(message.payload)?;
                Ok(ClientEvent::TypingStart {
                    room_id: payload.room_id,
                })
            }
            MessageType::TypingStop => {
                let payload: RoomPayload = from_payload(message.payload)?;
                Ok(ClientEvent::TypingStop {
                    room_id: payload.room_id,
                })
            }
            other => Err(ChatError::InvalidPayload(format!(
                "Unsupported client event: {:?}",
                other
            ))),
        }
    }
}

fn from_payload<T: DeserializeOwned>(payload: Value) -> Result<T, ChatError> {
    serde_json::from_value(payload)
        .map_err(|e| ChatError::InvalidPayload(format!("Invalid payload: {}", e)))
}

/// Helper functions for creating messages
impl WebSocketMessage {
    pub fn new(message_type: MessageType, payload: Value) -> Self {
        Self {
            message_type,
            payload,
            meta: Some(WebSocketMessageMeta {
                timestamp: Utc::now(),
            }),
        }
    }

    fn with_payload<T: Serialize>(message_type: MessageType, payload: T) -> Self {
        // Payload structs are plain strings and numbers, serialization cannot fail
        Self::new(
            message_type,
            serde_json::to_value(payload).unwrap_or(Value::Null),
        )
    }

    pub fn to_json(&self) -> Result<String, ChatError> {
        serde_json::to_string(self)
            .map_err(|e| ChatError::Internal(format!("Failed to serialize message: {}", e)))
    }

    /// Create an AUTHENTICATED message
    pub fn authenticated(user_id: &str) -> Self {
        Self::with_payload(
            MessageType::Authenticated,
            AuthenticatedPayload {
                user_id: user_id.to_string(),
            },
        )
    }

    /// Create a ROOM_JOINED acknowledgement for the joining connection
    pub fn room_joined(room_id: &str, members: Vec<String>, participants: Vec<String>) -> Self {
        Self::with_payload(
            MessageType::RoomJoined,
            RoomJoinedPayload {
                room_id: room_id.to_string(),
                members,
                participants,
            },
        )
    }

    pub fn room_left(room_id: &str) -> Self {
        Self::with_payload(
            MessageType::RoomLeft,
            RoomPayload {
                room_id: room_id.to_string(),
            },
        )
    }

    /// Create a NEW_MESSAGE broadcast
    pub fn new_message(message: &RelayedMessage) -> Self {
        Self::with_payload(MessageType::NewMessage, message)
    }

    pub fn participant_joined(
        room_id: &str,
        user_id: &str,
        count: usize,
        user_connections: usize,
    ) -> Self {
        Self::with_payload(
            MessageType::ParticipantJoined,
            PresencePayload {
                room_id: room_id.to_string(),
                user_id: user_id.to_string(),
                count,
                user_connections,
            },
        )
    }

    pub fn participant_left(
        room_id: &str,
        user_id: &str,
        count: usize,
        user_connections: usize,
    ) -> Self {
        Self::with_payload(
            MessageType::ParticipantLeft,
            PresencePayload {
                room_id: room_id.to_string(),
                user_id: user_id.to_string(),
                count,
                user_connections,
            },
        )
    }

    pub fn user_typing(room_id: &str, user_id: &str) -> Self {
        Self::with_payload(
            MessageType::UserTyping,
            TypingPayload {
                room_id: room_id.to_string(),
                user_id: user_id.to_string(),
            },
        )
    }

    pub fn user_stopped_typing(room_id: &str, user_id: &str) -> Self {
        Self::with_payload(
            MessageType::UserStoppedTyping,
            TypingPayload {
                room_id: room_id.to_string(),
                user_id: user_id.to_string(),
            },
        )
    }

    /// Create an ERROR message
    pub fn error(error: &ChatError) -> Self {
        Self::with_payload(
            MessageType::Error,
            ErrorPayload {
                code: error.code().to_string(),
                message: error.to_string(),
            },
        )
    }
}
