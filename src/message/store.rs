use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::models::{PersistedMessage, RelayedMessage};
use crate::shared::AppError;

/// Durable storage for relayed messages
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn persist(
        &self,
        room_id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<PersistedMessage, AppError>;
}

/// In-memory implementation of MessageStore for development and testing
pub struct InMemoryMessageStore {
    messages: Mutex<Vec<RelayedMessage>>,
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Stored messages for a room, oldest first
    pub fn messages_for(&self, room_id: &str) -> Vec<RelayedMessage> {
        self.messages
            .lock()
            .map(|messages| {
                messages
                    .iter()
                    .filter(|message| message.room_id == room_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn message_count(&self) -> usize {
        self.messages
            .lock()
            .map(|messages| messages.len())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    #[instrument(skip(self, content))]
    async fn persist(
        &self,
        room_id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<PersistedMessage, AppError> {
        let persisted = PersistedMessage {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
        };

        let mut messages = self.messages.lock().map_err(|_| AppError::Internal)?;
        messages.push(RelayedMessage::from_persisted(
            persisted.clone(),
            room_id,
            user_id,
            content.to_string(),
        ));

        debug!(message_id = %persisted.id, room_id = %room_id, "Message stored in memory");
        Ok(persisted)
    }
}

/// PostgreSQL implementation of the message store.
///
/// Expects `messages (id TEXT PRIMARY KEY, debate_id TEXT, user_id TEXT,
/// content TEXT, created_at TIMESTAMPTZ)`.
pub struct PostgresMessageStore {
    pool: PgPool,
}

impl PostgresMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    #[instrument(skip(self, content))]
    async fn persist(
        &self,
        room_id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<PersistedMessage, AppError> {
        let persisted = PersistedMessage {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO messages (id, debate_id, user_id, content, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&persisted.id)
        .bind(room_id)
        .bind(user_id)
        .bind(content)
        .bind(persisted.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, room_id = %room_id, "Failed to store message in database");
            AppError::DatabaseError(e.to_string())
        })?;

        debug!(message_id = %persisted.id, room_id = %room_id, "Message stored in database");
        Ok(persisted)
    }
}
