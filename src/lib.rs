// Library crate for the debate room server
// This file exposes the public API for integration tests

pub mod config;
pub mod message;
pub mod presence;
pub mod room;
pub mod routes;
pub mod session;
pub mod shared;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use config::ServerConfig;
pub use message::{InMemoryMessageStore, MessageRelay, MessageStore, RelayedMessage};
pub use presence::PresenceNotifier;
pub use room::{InMemoryRoomDirectory, MembershipTracker, RoomDirectory, RoomModel};
pub use routes::create_router;
pub use session::{AuthVerifier, JwtAuthVerifier, TokenConfig};
pub use shared::{AppError, AppState, ChatError};
pub use websockets::{
    ClientEvent, ConnectionControl, ConnectionManager, ConnectionRegistry, MessageHandler,
    MessageType, WebSocketMessage, WebsocketReceiveHandler,
};
