// Public API
pub use connection_registry::{ConnectionManager, ConnectionRegistry, DisconnectedConnection};
pub use handler::{websocket_handler, WebSocketQuery, WebsocketReceiveHandler};
pub use messages::{ClientEvent, MessageType, WebSocketMessage};
pub use socket::{ConnectionControl, MessageHandler, SocketError, SocketWrapper};

// Internal modules
mod connection_registry;
pub mod event_handlers;
mod handler;
mod messages;
mod socket;
