use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    presence::PresenceNotifier,
    room::{
        directory::RoomDirectory,
        membership::{Departure, MembershipTracker},
    },
    shared::ChatError,
    websockets::{
        connection_registry::{ConnectionManager, ConnectionRegistry},
        messages::WebSocketMessage,
    },
};

use super::shared::MessageBroadcaster;

pub struct RoomEventHandlers {
    registry: Arc<ConnectionRegistry>,
    membership: Arc<MembershipTracker>,
    presence: Arc<PresenceNotifier>,
    room_directory: Arc<dyn RoomDirectory>,
    connections: Arc<dyn ConnectionManager>,
}

impl RoomEventHandlers {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        membership: Arc<MembershipTracker>,
        presence: Arc<PresenceNotifier>,
        room_directory: Arc<dyn RoomDirectory>,
    ) -> Self {
        let connections: Arc<dyn ConnectionManager> = registry.clone();
        Self {
            registry,
            membership,
            presence,
            room_directory,
            connections,
        }
    }

    /// Joins the room, acknowledges the joiner, then announces the new member.
    ///
    /// A repeated join only re-sends the acknowledgement.
    pub async fn handle_join(&self, connection_id: &str, room_id: &str) -> Result<(), ChatError> {
        debug!(
            connection_id = %connection_id,
            room_id = %room_id,
            "Handling join-room event"
        );

        let outcome = self.membership.join(room_id, connection_id).await?;
        let user_id = outcome.entry.user_id.clone();

        let members: Vec<String> = outcome.members.iter().cloned().collect();
        let participants = self.participants_or_members(room_id, &members).await;
        MessageBroadcaster::send_to_connection(
            &self.connections,
            connection_id,
            &WebSocketMessage::room_joined(room_id, members, participants),
        )
        .await?;

        if outcome.newly_joined {
            self.presence.notify_joined(room_id, &user_id).await;
        }

        roster_result(outcome.roster_synced)
    }

    /// Leaves the room; leaving a room the connection is not in is a no-op
    pub async fn handle_leave(&self, connection_id: &str, room_id: &str) -> Result<(), ChatError> {
        debug!(
            connection_id = %connection_id,
            room_id = %room_id,
            "Handling leave-room event"
        );

        if self.registry.user_id(connection_id).await.is_none() {
            return Err(ChatError::AuthRequired);
        }

        let roster_synced = match self
            .membership
            .leave(room_id, connection_id, Departure::Leave)
            .await
        {
            Some(outcome) => {
                let user_id = outcome.entry.user_id;
                self.presence.notify_left(room_id, &user_id).await;
                info!(room_id = %room_id, user_id = %user_id, "Leave request processed");
                outcome.roster_synced
            }
            None => {
                debug!(
                    room_id = %room_id,
                    connection_id = %connection_id,
                    "Connection was not in room"
                );
                true
            }
        };

        MessageBroadcaster::send_to_connection(
            &self.connections,
            connection_id,
            &WebSocketMessage::room_left(room_id),
        )
        .await?;

        roster_result(roster_synced)
    }

    async fn participants_or_members(&self, room_id: &str, members: &[String]) -> Vec<String> {
        match self.room_directory.current_participants(room_id).await {
            Ok(participants) => {
                let mut participants: Vec<String> = participants.into_iter().collect();
                participants.sort();
                participants
            }
            Err(e) => {
                warn!(room_id = %room_id, error = %e, "Roster lookup failed, using live members");
                members.to_vec()
            }
        }
    }
}

/// The membership change stands either way; a roster failure is only reported
fn roster_result(roster_synced: bool) -> Result<(), ChatError> {
    if roster_synced {
        Ok(())
    } else {
        Err(ChatError::Internal(
            "Failed to update participant list".to_string(),
        ))
    }
}
