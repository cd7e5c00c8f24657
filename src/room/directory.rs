use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::RoomModel;
use crate::shared::AppError;

/// Lookup and roster maintenance for debates owned by the storage layer
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    async fn exists(&self, room_id: &str) -> Result<bool, AppError>;

    /// Persisted participant roster, used to repopulate a client after reconnect
    async fn current_participants(&self, room_id: &str) -> Result<HashSet<String>, AppError>;

    /// Adds a user to the roster; adding an existing participant is a no-op
    async fn add_participant(&self, room_id: &str, user_id: &str) -> Result<(), AppError>;

    /// Removes a user from the roster; removing an absent participant is a no-op
    async fn remove_participant(&self, room_id: &str, user_id: &str) -> Result<(), AppError>;
}

/// In-memory implementation of RoomDirectory for development and testing
pub struct InMemoryRoomDirectory {
    rooms: Mutex<HashMap<String, RoomModel>>,
}

impl Default for InMemoryRoomDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRoomDirectory {
    /// Creates a new empty in-memory directory
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a directory with the given debate ids pre-registered
    pub fn with_rooms<I, S>(room_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rooms = room_ids
            .into_iter()
            .map(|id| {
                let id = id.into();
                (id.clone(), RoomModel::new(id.clone(), id))
            })
            .collect();

        Self {
            rooms: Mutex::new(rooms),
        }
    }

    pub fn create_room(&self, room: RoomModel) -> Result<(), AppError> {
        let mut rooms = self.rooms.lock().map_err(|_| AppError::Internal)?;
        if rooms.contains_key(&room.id) {
            warn!(room_id = %room.id, "Room already exists in memory");
            return Err(AppError::DatabaseError("Room already exists".to_string()));
        }
        rooms.insert(room.id.clone(), room);
        Ok(())
    }
}

#[async_trait]
impl RoomDirectory for InMemoryRoomDirectory {
    #[instrument(skip(self))]
    async fn exists(&self, room_id: &str) -> Result<bool, AppError> {
        let rooms = self.rooms.lock().map_err(|_| AppError::Internal)?;
        let exists = rooms.contains_key(room_id);
        debug!(room_id = %room_id, exists, "Room lookup in memory");
        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn current_participants(&self, room_id: &str) -> Result<HashSet<String>, AppError> {
        let rooms = self.rooms.lock().map_err(|_| AppError::Internal)?;
        rooms
            .get(room_id)
            .map(|room| room.participants.iter().cloned().collect())
            .ok_or_else(|| AppError::NotFound(format!("Room {} not found", room_id)))
    }

    #[instrument(skip(self))]
    async fn add_participant(&self, room_id: &str, user_id: &str) -> Result<(), AppError> {
        let mut rooms = self.rooms.lock().map_err(|_| AppError::Internal)?;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| AppError::NotFound(format!("Room {} not found", room_id)))?;
        room.participants.insert(user_id.to_string());
        debug!(room_id = %room_id, user_id = %user_id, "Participant added in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_participant(&self, room_id: &str, user_id: &str) -> Result<(), AppError> {
        let mut rooms = self.rooms.lock().map_err(|_| AppError::Internal)?;
        if let Some(room) = rooms.get_mut(room_id) {
            room.participants.remove(user_id);
            debug!(room_id = %room_id, user_id = %user_id, "Participant removed in memory");
        }
        Ok(())
    }
}

/// PostgreSQL implementation of the room directory.
///
/// Expects `debates (id TEXT PRIMARY KEY, ...)` and
/// `debate_participants (debate_id TEXT, user_id TEXT, joined_at TIMESTAMPTZ,
/// PRIMARY KEY (debate_id, user_id))`.
pub struct PostgresRoomDirectory {
    pool: PgPool,
}

impl PostgresRoomDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomDirectory for PostgresRoomDirectory {
    #[instrument(skip(self))]
    async fn exists(&self, room_id: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM debates WHERE id = $1) AS found")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, room_id = %room_id, "Failed to look up debate");
                AppError::DatabaseError(e.to_string())
            })?;

        Ok(row.get("found"))
    }

    #[instrument(skip(self))]
    async fn current_participants(&self, room_id: &str) -> Result<HashSet<String>, AppError> {
        let rows = sqlx::query("SELECT user_id FROM debate_participants WHERE debate_id = $1")
            .bind(room_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, room_id = %room_id, "Failed to fetch debate participants");
                AppError::DatabaseError(e.to_string())
            })?;

        Ok(rows.iter().map(|row| row.get("user_id")).collect())
    }

    #[instrument(skip(self))]
    async fn add_participant(&self, room_id: &str, user_id: &str) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO debate_participants (debate_id, user_id, joined_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (debate_id, user_id) DO NOTHING",
        )
        .bind(room_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, room_id = %room_id, "Failed to add debate participant");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_participant(&self, room_id: &str, user_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM debate_participants WHERE debate_id = $1 AND user_id = $2")
            .bind(room_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, room_id = %room_id, "Failed to remove debate participant");
                AppError::DatabaseError(e.to_string())
            })?;

        Ok(())
    }
}
