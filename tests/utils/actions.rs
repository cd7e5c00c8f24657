#![allow(dead_code)]

use serde_json::json;

use db8z::websockets::{ConnectionControl, MessageHandler, MessageType, WebSocketMessage};

use super::setup::TestSetup;

// ============================================================================
// Action Helpers
// ============================================================================

impl TestSetup {
    /// Send a raw frame as the labelled client; returns once it is fully handled
    pub async fn send_raw(&self, label: &str, frame: &str) -> ConnectionControl {
        let connection_id = self.connection_id(label);
        self.state
            .receive_handler
            .handle_message(&connection_id, frame.to_string())
            .await
    }

    pub async fn send_message(&self, label: &str, message: WebSocketMessage) -> ConnectionControl {
        let message_json = serde_json::to_string(&message).unwrap();
        self.send_raw(label, &message_json).await
    }

    /// Simulate the socket closing
    pub async fn disconnect(&self, label: &str) -> usize {
        let connection_id = self.connection_id(label);
        self.state
            .receive_handler
            .handle_disconnect(&connection_id)
            .await
    }

    // ============================================================================
    // Convenience Action Methods
    // ============================================================================

    pub async fn authenticate(&self, label: &str, token: &str) -> ConnectionControl {
        self.send_message(
            label,
            WebSocketMessage::new(MessageType::Authenticate, json!({ "token": token })),
        )
        .await
    }

    pub async fn join(&self, label: &str, room_id: &str) -> ConnectionControl {
        self.send_message(
            label,
            WebSocketMessage::new(MessageType::JoinRoom, json!({ "roomId": room_id })),
        )
        .await
    }

    pub async fn leave(&self, label: &str, room_id: &str) -> ConnectionControl {
        self.send_message(
            label,
            WebSocketMessage::new(MessageType::LeaveRoom, json!({ "roomId": room_id })),
        )
        .await
    }

    pub async fn send_chat(&self, label: &str, room_id: &str, content: &str) -> ConnectionControl {
        self.send_message(
            label,
            WebSocketMessage::new(
                MessageType::SendMessage,
                json!({ "roomId": room_id, "content": content }),
            ),
        )
        .await
    }

    pub async fn typing(&self, label: &str, room_id: &str, started: bool) -> ConnectionControl {
        let message_type = if started {
            MessageType::TypingStart
        } else {
            MessageType::TypingStop
        };
        self.send_message(
            label,
            WebSocketMessage::new(message_type, json!({ "roomId": room_id })),
        )
        .await
    }

    /// Join and discard everything the join produced for every client
    pub async fn join_quietly(&self, label: &str, room_id: &str) {
        self.join(label, room_id).await;
        self.clear_messages();
    }

    /// Clear all queued frames for every client
    pub fn clear_messages(&self) {
        let labels: Vec<String> = self.clients.lock().unwrap().keys().cloned().collect();
        for label in labels {
            self.drain(&label);
        }
    }
}
