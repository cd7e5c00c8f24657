use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    message::MessageRelay,
    presence::PresenceNotifier,
    room::membership::MembershipTracker,
    shared::ChatError,
    websockets::connection_registry::ConnectionRegistry,
};

pub struct ChatEventHandlers {
    registry: Arc<ConnectionRegistry>,
    membership: Arc<MembershipTracker>,
    presence: Arc<PresenceNotifier>,
    relay: Arc<MessageRelay>,
}

impl ChatEventHandlers {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        membership: Arc<MembershipTracker>,
        presence: Arc<PresenceNotifier>,
        relay: Arc<MessageRelay>,
    ) -> Self {
        Self {
            registry,
            membership,
            presence,
            relay,
        }
    }

    /// Relays a message on its own task and waits for it.
    ///
    /// The connection's next event is not read until this returns, which keeps
    /// one connection's messages in order, while a socket dropping mid-relay
    /// cannot cancel the spawned persistence and broadcast.
    pub async fn handle_send_message(
        &self,
        connection_id: &str,
        room_id: &str,
        content: String,
    ) -> Result<(), ChatError> {
        let relay = Arc::clone(&self.relay);
        let task_connection = connection_id.to_string();
        let task_room = room_id.to_string();

        let handle = tokio::spawn(async move {
            relay.relay(&task_room, &task_connection, &content).await
        });

        match handle.await {
            Ok(result) => result.map(|_| ()),
            Err(e) => {
                warn!(
                    connection_id = %connection_id,
                    room_id = %room_id,
                    error = %e,
                    "Relay task failed"
                );
                Err(ChatError::Internal("Failed to send message".to_string()))
            }
        }
    }

    /// Forwards a typing indicator; ignored unless the connection is a member
    pub async fn handle_typing(
        &self,
        connection_id: &str,
        room_id: &str,
        typing: bool,
    ) -> Result<(), ChatError> {
        if self.registry.user_id(connection_id).await.is_none() {
            debug!(connection_id = %connection_id, "Ignoring typing from unauthenticated connection");
            return Ok(());
        }
        let Some(entry) = self.membership.membership_of(room_id, connection_id).await else {
            debug!(
                connection_id = %connection_id,
                room_id = %room_id,
                "Ignoring typing from non-member"
            );
            return Ok(());
        };

        self.presence
            .notify_typing(room_id, &entry.user_id, connection_id, typing)
            .await;
        Ok(())
    }
}
