use std::sync::Arc;
use tracing::{debug, warn};

use crate::room::membership::MembershipTracker;
use crate::websockets::event_handlers::shared::MessageBroadcaster;
use crate::websockets::{ConnectionManager, WebSocketMessage};

/// Broadcasts presence changes to the members of a room.
///
/// Delivery is fire-and-forget: a connection that cannot be reached is skipped
/// and never undoes the membership change being announced.
pub struct PresenceNotifier {
    membership: Arc<MembershipTracker>,
    connections: Arc<dyn ConnectionManager>,
}

impl PresenceNotifier {
    pub fn new(membership: Arc<MembershipTracker>, connections: Arc<dyn ConnectionManager>) -> Self {
        Self {
            membership,
            connections,
        }
    }

    /// Announces a join to every member, the new one included.
    /// Returns the number of connections reached.
    pub async fn notify_joined(&self, room_id: &str, user_id: &str) -> usize {
        let snapshot = self.membership.snapshot(room_id).await;
        let message = WebSocketMessage::participant_joined(
            room_id,
            user_id,
            snapshot.count(),
            snapshot.connections_of_user(user_id),
        );
        let delivered = self.broadcast(&snapshot.connection_ids, &message).await;

        debug!(
            room_id = %room_id,
            user_id = %user_id,
            count = snapshot.count(),
            delivered,
            "participant-joined broadcast"
        );
        delivered
    }

    /// Announces a departure to the remaining members.
    ///
    /// Fires per connection; `userConnections` tells members whether the user
    /// is still present through another connection.
    pub async fn notify_left(&self, room_id: &str, user_id: &str) -> usize {
        let snapshot = self.membership.snapshot(room_id).await;
        let message = WebSocketMessage::participant_left(
            room_id,
            user_id,
            snapshot.count(),
            snapshot.connections_of_user(user_id),
        );
        let delivered = self.broadcast(&snapshot.connection_ids, &message).await;

        debug!(
            room_id = %room_id,
            user_id = %user_id,
            count = snapshot.count(),
            delivered,
            "participant-left broadcast"
        );
        delivered
    }

    /// Relays a typing indicator to every other connection in the room
    pub async fn notify_typing(
        &self,
        room_id: &str,
        user_id: &str,
        origin_connection_id: &str,
        typing: bool,
    ) -> usize {
        let recipients: Vec<String> = self
            .membership
            .connections_of(room_id)
            .await
            .into_iter()
            .filter(|connection_id| connection_id != origin_connection_id)
            .collect();

        let message = if typing {
            WebSocketMessage::user_typing(room_id, user_id)
        } else {
            WebSocketMessage::user_stopped_typing(room_id, user_id)
        };
        self.broadcast(&recipients, &message).await
    }

    async fn broadcast(&self, connection_ids: &[String], message: &WebSocketMessage) -> usize {
        match MessageBroadcaster::broadcast_to_connections(&self.connections, connection_ids, message)
            .await
        {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!(error = %e, "Dropping presence broadcast");
                0
            }
        }
    }
}
