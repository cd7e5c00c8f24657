use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned identity of a stored message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedMessage {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// A message as broadcast to a room. Immutable once relayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayedMessage {
    pub id: String,
    pub room_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl RelayedMessage {
    pub fn from_persisted(
        persisted: PersistedMessage,
        room_id: &str,
        user_id: &str,
        content: String,
    ) -> Self {
        Self {
            id: persisted.id,
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            content,
            created_at: persisted.created_at,
        }
    }
}
