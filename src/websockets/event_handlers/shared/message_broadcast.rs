use std::sync::Arc;
use tracing::debug;

use crate::{
    shared::ChatError,
    websockets::{connection_registry::ConnectionManager, messages::WebSocketMessage},
};

pub struct MessageBroadcaster;

impl MessageBroadcaster {
    /// Sends one event to a single connection; false if it could not be delivered
    pub async fn send_to_connection(
        connections: &Arc<dyn ConnectionManager>,
        connection_id: &str,
        message: &WebSocketMessage,
    ) -> Result<bool, ChatError> {
        let message_json = message.to_json()?;
        let delivered = connections
            .send_to_connection(connection_id, &message_json)
            .await;
        if !delivered {
            debug!(
                connection_id = %connection_id,
                message_type = ?message.message_type,
                "Connection unreachable, event dropped"
            );
        }
        Ok(delivered)
    }

    pub async fn broadcast_to_connections(
        connections: &Arc<dyn ConnectionManager>,
        connection_ids: &[String],
        message: &WebSocketMessage,
    ) -> Result<usize, ChatError> {
        let message_json = message.to_json()?;
        Ok(connections
            .send_to_connections(connection_ids, &message_json)
            .await)
    }
}
