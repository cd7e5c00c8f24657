use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A debate as known to the in-memory room directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomModel {
    pub id: String,
    pub title: String,
    /// Persisted participant roster; survives disconnects
    pub participants: BTreeSet<String>,
}

impl RoomModel {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            participants: BTreeSet::new(),
        }
    }
}

/// One live connection's presence in one room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipEntry {
    pub room_id: String,
    pub user_id: String,
    pub connection_id: String,
    pub joined_at: DateTime<Utc>,
}

impl MembershipEntry {
    pub fn new(room_id: &str, user_id: &str, connection_id: &str) -> Self {
        Self {
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            connection_id: connection_id.to_string(),
            joined_at: Utc::now(),
        }
    }
}
