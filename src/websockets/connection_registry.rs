use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::session::AuthVerifier;
use crate::shared::ChatError;

/// Best-effort delivery of serialized events to live connections
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    /// Returns false if the connection is gone or its channel is closed
    async fn send_to_connection(&self, connection_id: &str, message: &str) -> bool;

    /// Returns how many connections accepted the message
    async fn send_to_connections(&self, connection_ids: &[String], message: &str) -> usize {
        let mut delivered = 0;
        for connection_id in connection_ids {
            if self.send_to_connection(connection_id, message).await {
                delivered += 1;
            }
        }
        delivered
    }
}

struct ConnectionEntry {
    user_id: Option<String>,
    rooms: BTreeSet<String>,
    sender: mpsc::UnboundedSender<String>,
    connected_at: DateTime<Utc>,
}

/// What remained of a connection when it was unregistered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectedConnection {
    pub user_id: Option<String>,
    pub rooms: Vec<String>,
}

/// Registry of live connections and their authenticated identity.
///
/// Created once at server start and shared through `AppState`; entries are
/// added on socket upgrade and removed on disconnect.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, ConnectionEntry>>,
    verifier: Arc<dyn AuthVerifier>,
}

impl ConnectionRegistry {
    pub fn new(verifier: Arc<dyn AuthVerifier>) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            verifier,
        }
    }

    /// Registers a freshly opened socket as an unauthenticated connection
    pub async fn connect(&self, sender: mpsc::UnboundedSender<String>) -> String {
        let connection_id = Uuid::new_v4().to_string();
        let mut connections = self.connections.write().await;
        connections.insert(
            connection_id.clone(),
            ConnectionEntry {
                user_id: None,
                rooms: BTreeSet::new(),
                sender,
                connected_at: Utc::now(),
            },
        );

        debug!(
            connection_id = %connection_id,
            live_connections = connections.len(),
            "Connection opened"
        );
        connection_id
    }

    /// Checks a token without touching any connection state
    pub async fn verify(&self, token: &str) -> Result<String, ChatError> {
        self.verifier
            .verify(token)
            .await
            .map_err(|e| ChatError::AuthInvalid(e.to_string()))
    }

    /// Associates the connection with the user the token belongs to.
    ///
    /// A rejected token removes the connection entirely.
    #[instrument(skip(self, token))]
    pub async fn register(&self, connection_id: &str, token: &str) -> Result<String, ChatError> {
        if !self.is_connected(connection_id).await {
            return Err(ChatError::AuthInvalid("Unknown connection".to_string()));
        }
        if self.user_id(connection_id).await.is_some() {
            return Err(ChatError::InvalidPayload(
                "Connection is already authenticated".to_string(),
            ));
        }

        let user_id = match self.verify(token).await {
            Ok(user_id) => user_id,
            Err(e) => {
                warn!(connection_id = %connection_id, error = %e, "Authentication rejected");
                self.connections.write().await.remove(connection_id);
                return Err(e);
            }
        };

        let mut connections = self.connections.write().await;
        match connections.get_mut(connection_id) {
            Some(entry) => {
                entry.user_id = Some(user_id.clone());
                info!(
                    connection_id = %connection_id,
                    user_id = %user_id,
                    "Connection authenticated"
                );
                Ok(user_id)
            }
            None => Err(ChatError::AuthInvalid("Connection closed".to_string())),
        }
    }

    /// Removes the connection, returning the rooms it had joined.
    ///
    /// `None` when it was already gone, so repeated calls are no-ops.
    #[instrument(skip(self))]
    pub async fn unregister(&self, connection_id: &str) -> Option<DisconnectedConnection> {
        let entry = self.connections.write().await.remove(connection_id)?;

        info!(
            connection_id = %connection_id,
            user_id = ?entry.user_id,
            room_count = entry.rooms.len(),
            connected_for_secs = (Utc::now() - entry.connected_at).num_seconds(),
            "Connection unregistered"
        );

        Some(DisconnectedConnection {
            user_id: entry.user_id,
            rooms: entry.rooms.into_iter().collect(),
        })
    }

    pub async fn user_id(&self, connection_id: &str) -> Option<String> {
        self.connections
            .read()
            .await
            .get(connection_id)
            .and_then(|entry| entry.user_id.clone())
    }

    pub async fn is_connected(&self, connection_id: &str) -> bool {
        self.connections.read().await.contains_key(connection_id)
    }

    pub async fn rooms_of(&self, connection_id: &str) -> Vec<String> {
        self.connections
            .read()
            .await
            .get(connection_id)
            .map(|entry| entry.rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Records a joined room on the connection; false if the connection is gone
    pub(crate) async fn track_room(&self, connection_id: &str, room_id: &str) -> bool {
        match self.connections.write().await.get_mut(connection_id) {
            Some(entry) => {
                entry.rooms.insert(room_id.to_string());
                true
            }
            None => false,
        }
    }

    pub(crate) async fn untrack_room(&self, connection_id: &str, room_id: &str) {
        if let Some(entry) = self.connections.write().await.get_mut(connection_id) {
            entry.rooms.remove(room_id);
        }
    }
}

#[async_trait]
impl ConnectionManager for ConnectionRegistry {
    async fn send_to_connection(&self, connection_id: &str, message: &str) -> bool {
        let connections = self.connections.read().await;
        match connections.get(connection_id) {
            Some(entry) => match entry.sender.send(message.to_string()) {
                Ok(()) => true,
                Err(_) => {
                    debug!(connection_id = %connection_id, "Outbound channel closed, dropping message");
                    false
                }
            },
            None => false,
        }
    }
}
