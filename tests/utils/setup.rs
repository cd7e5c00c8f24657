#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use db8z::{
    room::RoomModel, AppState, InMemoryRoomDirectory, JwtAuthVerifier, ServerConfig, TokenConfig,
};

use super::mocks::RecordingMessageStore;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

/// A client socket stand-in: the connection id plus its outbound inbox
pub struct TestClient {
    pub connection_id: String,
    pub inbox: mpsc::UnboundedReceiver<String>,
}

pub struct TestSetup {
    pub state: AppState,
    pub store: Arc<RecordingMessageStore>,
    pub directory: Arc<InMemoryRoomDirectory>,
    pub token_config: TokenConfig,
    pub clients: Mutex<HashMap<String, TestClient>>,
}

pub struct TestSetupBuilder {
    rooms: Vec<String>,
    max_message_length: usize,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            rooms: vec!["r1".to_string()],
            max_message_length: 5000,
        }
    }

    pub fn with_rooms(mut self, rooms: Vec<&str>) -> Self {
        self.rooms = rooms.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_max_message_length(mut self, max_message_length: usize) -> Self {
        self.max_message_length = max_message_length;
        self
    }

    pub fn build(self) -> TestSetup {
        let config = ServerConfig {
            jwt_secret: "integration-secret".to_string(),
            max_message_length: self.max_message_length,
            ..ServerConfig::default()
        };
        let token_config = TokenConfig::new(config.jwt_secret.clone(), 1);

        let directory = Arc::new(InMemoryRoomDirectory::new());
        for room in &self.rooms {
            directory
                .create_room(RoomModel::new(room.as_str(), format!("Debate {}", room)))
                .unwrap();
        }
        let store = Arc::new(RecordingMessageStore::new());

        let state = AppState::new(
            config,
            Arc::new(JwtAuthVerifier::new(token_config.clone())),
            directory.clone(),
            store.clone(),
        );

        TestSetup {
            state,
            store,
            directory,
            token_config,
            clients: Mutex::new(HashMap::new()),
        }
    }
}

impl TestSetup {
    pub fn token_for(&self, user_id: &str) -> String {
        self.token_config.create_token(user_id).unwrap()
    }

    /// Opens a connection labelled `label` without authenticating it
    pub async fn connect_anonymous(&self, label: &str) -> String {
        let (sender, inbox) = mpsc::unbounded_channel();
        let connection_id = self.state.connection_registry.connect(sender).await;
        self.clients.lock().unwrap().insert(
            label.to_string(),
            TestClient {
                connection_id: connection_id.clone(),
                inbox,
            },
        );
        connection_id
    }

    /// Opens a connection for `user_id`, authenticated as if the token had
    /// come with the upgrade request. The `authenticated` ack is discarded.
    pub async fn connect(&self, user_id: &str) -> String {
        self.connect_as(user_id, user_id).await
    }

    /// Like `connect`, for a second socket of the same user under another label
    pub async fn connect_as(&self, label: &str, user_id: &str) -> String {
        let connection_id = self.connect_anonymous(label).await;
        self.state
            .receive_handler
            .authenticate(&connection_id, &self.token_for(user_id))
            .await
            .unwrap();
        self.drain(label);
        connection_id
    }

    pub fn connection_id(&self, label: &str) -> String {
        self.clients
            .lock()
            .unwrap()
            .get(label)
            .map(|client| client.connection_id.clone())
            .unwrap_or_else(|| panic!("no client labelled {}", label))
    }

    /// Takes every queued frame for the client
    pub fn drain(&self, label: &str) -> Vec<String> {
        let mut clients = self.clients.lock().unwrap();
        let client = clients
            .get_mut(label)
            .unwrap_or_else(|| panic!("no client labelled {}", label));
        std::iter::from_fn(|| client.inbox.try_recv().ok()).collect()
    }
}
