use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    presence::PresenceNotifier,
    room::membership::{Departure, MembershipTracker},
    shared::ChatError,
    websockets::{
        connection_registry::{ConnectionManager, ConnectionRegistry},
        messages::WebSocketMessage,
    },
};

use super::shared::MessageBroadcaster;

pub struct ConnectionEventHandlers {
    registry: Arc<ConnectionRegistry>,
    membership: Arc<MembershipTracker>,
    presence: Arc<PresenceNotifier>,
    connections: Arc<dyn ConnectionManager>,
}

impl ConnectionEventHandlers {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        membership: Arc<MembershipTracker>,
        presence: Arc<PresenceNotifier>,
    ) -> Self {
        let connections: Arc<dyn ConnectionManager> = registry.clone();
        Self {
            registry,
            membership,
            presence,
            connections,
        }
    }

    /// Authenticates the connection and confirms the identity to the client
    pub async fn handle_authenticate(
        &self,
        connection_id: &str,
        token: &str,
    ) -> Result<String, ChatError> {
        let user_id = self.registry.register(connection_id, token).await?;

        MessageBroadcaster::send_to_connection(
            &self.connections,
            connection_id,
            &WebSocketMessage::authenticated(&user_id),
        )
        .await?;

        Ok(user_id)
    }

    /// Removes the connection from every room it joined, announcing each departure.
    ///
    /// The roster is left untouched so the user is still listed after a
    /// reconnect. Returns the number of rooms left; a repeated call leaves none.
    pub async fn handle_disconnect(&self, connection_id: &str) -> usize {
        let Some(disconnected) = self.registry.unregister(connection_id).await else {
            debug!(connection_id = %connection_id, "Connection already cleaned up");
            return 0;
        };

        let mut rooms_left = 0;
        for room_id in &disconnected.rooms {
            if let Some(outcome) = self
                .membership
                .leave(room_id, connection_id, Departure::Disconnect)
                .await
            {
                self.presence
                    .notify_left(room_id, &outcome.entry.user_id)
                    .await;
                rooms_left += 1;
            }
        }

        info!(
            connection_id = %connection_id,
            user_id = ?disconnected.user_id,
            rooms_left,
            "Disconnect processed"
        );
        rooms_left
    }
}
