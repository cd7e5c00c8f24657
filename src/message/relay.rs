use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{models::RelayedMessage, store::MessageStore};
use crate::room::membership::MembershipTracker;
use crate::shared::ChatError;
use crate::websockets::event_handlers::shared::MessageBroadcaster;
use crate::websockets::{ConnectionManager, WebSocketMessage};

/// Persists inbound messages and fans them out to the room.
///
/// A message is never broadcast unless the store has accepted it.
pub struct MessageRelay {
    membership: Arc<MembershipTracker>,
    store: Arc<dyn MessageStore>,
    connections: Arc<dyn ConnectionManager>,
    max_message_length: usize,
}

impl MessageRelay {
    pub fn new(
        membership: Arc<MembershipTracker>,
        store: Arc<dyn MessageStore>,
        connections: Arc<dyn ConnectionManager>,
        max_message_length: usize,
    ) -> Self {
        Self {
            membership,
            store,
            connections,
            max_message_length,
        }
    }

    #[instrument(skip(self, content), fields(content_length = content.len()))]
    pub async fn relay(
        &self,
        room_id: &str,
        connection_id: &str,
        content: &str,
    ) -> Result<RelayedMessage, ChatError> {
        let entry = self
            .membership
            .membership_of(room_id, connection_id)
            .await
            .ok_or_else(|| {
                debug!(room_id = %room_id, connection_id = %connection_id, "Relay rejected, not a member");
                ChatError::NotAMember(room_id.to_string())
            })?;

        let content = self.validate_content(content)?;

        // No membership lock is held while the store works
        let persisted = self
            .store
            .persist(room_id, &entry.user_id, &content)
            .await
            .map_err(|e| {
                warn!(
                    room_id = %room_id,
                    user_id = %entry.user_id,
                    error = %e,
                    "Message persistence failed, not broadcasting"
                );
                ChatError::PersistenceError(e.to_string())
            })?;

        let message = RelayedMessage::from_persisted(persisted, room_id, &entry.user_id, content);
        let recipients = self.membership.connections_of(room_id).await;
        let delivered = MessageBroadcaster::broadcast_to_connections(
            &self.connections,
            &recipients,
            &WebSocketMessage::new_message(&message),
        )
        .await?;

        info!(
            room_id = %room_id,
            message_id = %message.id,
            user_id = %message.user_id,
            recipients = recipients.len(),
            delivered,
            "Message relayed"
        );

        Ok(message)
    }

    fn validate_content(&self, content: &str) -> Result<String, ChatError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(ChatError::InvalidPayload(
                "Message content is empty".to_string(),
            ));
        }
        if trimmed.chars().count() > self.max_message_length {
            return Err(ChatError::InvalidPayload(format!(
                "Message content exceeds {} characters",
                self.max_message_length
            )));
        }
        Ok(trimmed.to_string())
    }
}
