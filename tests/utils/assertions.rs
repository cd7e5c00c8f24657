//! Test assertion helpers - fluent API for verifying test expectations
#![allow(dead_code)] // Test utilities may not all be used in every test

use db8z::websockets::{MessageType, WebSocketMessage};

use super::setup::TestSetup;

// ============================================================================
// Assertion Helpers
// ============================================================================

pub struct MessageAssertion<'a> {
    setup: &'a TestSetup,
    clients: Vec<&'a str>,
}

impl<'a> MessageAssertion<'a> {
    pub fn for_client(setup: &'a TestSetup, client: &'a str) -> Self {
        Self {
            setup,
            clients: vec![client],
        }
    }

    pub fn for_clients(setup: &'a TestSetup, clients: Vec<&'a str>) -> Self {
        Self { setup, clients }
    }

    /// Assert each client received exactly one frame, of the given type, all
    /// with the same payload. Consumes the clients' queued frames.
    pub fn received_message_type(self, expected_type: MessageType) -> MessageContent {
        self.received_message_sequence(vec![expected_type])
            .pop()
            .unwrap()
    }

    /// Assert each client received exactly these frame types, in order
    pub fn received_message_sequence(self, expected_types: Vec<MessageType>) -> Vec<MessageContent> {
        let mut first_client_messages: Vec<MessageContent> = vec![];

        for client in &self.clients {
            let messages = parse_all(client, self.setup.drain(client));
            let actual_types: Vec<MessageType> =
                messages.iter().map(|msg| msg.message_type).collect();
            assert_eq!(
                actual_types, expected_types,
                "{} received the wrong sequence of messages",
                client
            );

            if first_client_messages.is_empty() {
                first_client_messages = messages
                    .into_iter()
                    .map(|msg| MessageContent {
                        payload: msg.payload,
                    })
                    .collect();
            } else {
                for (i, msg) in messages.iter().enumerate() {
                    if msg.message_type == MessageType::NewMessage
                        || msg.message_type == MessageType::ParticipantJoined
                        || msg.message_type == MessageType::ParticipantLeft
                    {
                        assert_eq!(
                            msg.payload, first_client_messages[i].payload,
                            "{} saw a different broadcast payload than {}",
                            client, self.clients[0]
                        );
                    }
                }
            }
        }

        first_client_messages
    }

    /// Assert that clients received no messages
    pub fn received_no_messages(self) {
        for client in &self.clients {
            let messages = self.setup.drain(client);
            assert!(
                messages.is_empty(),
                "{} should not have received any messages, got {:?}",
                client,
                messages
            );
        }
    }

    /// Count frames of a type without asserting on the rest; consumes the queue
    pub fn count_message_type(self, msg_type: MessageType) -> usize {
        self.clients
            .iter()
            .map(|client| {
                parse_all(client, self.setup.drain(client))
                    .into_iter()
                    .filter(|msg| msg.message_type == msg_type)
                    .count()
            })
            .sum()
    }
}

fn parse_all(client: &str, frames: Vec<String>) -> Vec<WebSocketMessage> {
    frames
        .iter()
        .map(|frame| {
            serde_json::from_str(frame)
                .unwrap_or_else(|e| panic!("{} got an unparsable frame {}: {}", client, frame, e))
        })
        .collect()
}

// ============================================================================
// Message Content Assertions
// ============================================================================

pub struct MessageContent {
    pub payload: serde_json::Value,
}

impl MessageContent {
    pub fn with_room(self, expected_room: &str) -> Self {
        assert_eq!(self.payload["roomId"], expected_room);
        self
    }

    pub fn with_user(self, expected_user: &str) -> Self {
        assert_eq!(self.payload["userId"], expected_user);
        self
    }

    pub fn with_count(self, expected_count: usize) -> Self {
        assert_eq!(self.payload["count"], expected_count);
        self
    }

    pub fn with_id(self, expected_id: &str) -> Self {
        assert_eq!(self.payload["id"], expected_id);
        self
    }

    pub fn with_content(self, expected_content: &str) -> Self {
        assert_eq!(self.payload["content"], expected_content);
        self
    }

    pub fn with_error_code(self, expected_code: &str) -> Self {
        assert_eq!(self.payload["code"], expected_code);
        self
    }

    pub fn with_members(self, expected_members: Vec<&str>) -> Self {
        let members: Vec<String> = serde_json::from_value(self.payload["members"].clone()).unwrap();
        assert_eq!(members, expected_members);
        self
    }

    pub fn with_participants(self, expected_participants: Vec<&str>) -> Self {
        let participants: Vec<String> =
            serde_json::from_value(self.payload["participants"].clone()).unwrap();
        assert_eq!(participants, expected_participants);
        self
    }
}
