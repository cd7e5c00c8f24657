use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::config::ServerConfig;
use crate::message::{MessageRelay, MessageStore};
use crate::presence::PresenceNotifier;
use crate::room::{directory::RoomDirectory, membership::MembershipTracker};
use crate::session::AuthVerifier;
use crate::websockets::{ConnectionManager, ConnectionRegistry, WebsocketReceiveHandler};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub connection_registry: Arc<ConnectionRegistry>,
    pub membership: Arc<MembershipTracker>,
    pub receive_handler: Arc<WebsocketReceiveHandler>,
}

impl AppState {
    /// Wires the registry, tracker, notifier and relay around the given collaborators
    pub fn new(
        config: ServerConfig,
        verifier: Arc<dyn AuthVerifier>,
        room_directory: Arc<dyn RoomDirectory>,
        message_store: Arc<dyn MessageStore>,
    ) -> Self {
        let connection_registry = Arc::new(ConnectionRegistry::new(verifier));
        let connections: Arc<dyn ConnectionManager> = connection_registry.clone();

        let membership = Arc::new(MembershipTracker::new(
            Arc::clone(&connection_registry),
            Arc::clone(&room_directory),
        ));
        let presence = Arc::new(PresenceNotifier::new(
            Arc::clone(&membership),
            Arc::clone(&connections),
        ));
        let relay = Arc::new(MessageRelay::new(
            Arc::clone(&membership),
            message_store,
            Arc::clone(&connections),
            config.max_message_length,
        ));

        let receive_handler = Arc::new(WebsocketReceiveHandler::new(
            Arc::clone(&connection_registry),
            Arc::clone(&membership),
            presence,
            relay,
            room_directory,
        ));

        Self {
            config: Arc::new(config),
            connection_registry,
            membership,
            receive_handler,
        }
    }
}

/// Errors surfaced over HTTP and returned by the storage collaborators
#[derive(Error, Debug)]
pub enum AppError {
    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::JwtError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", msg),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

/// Errors reported to the originating connection as an `error` event.
///
/// None of these are ever broadcast to a room.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Authentication required")]
    AuthRequired,

    #[error("Invalid token: {0}")]
    AuthInvalid(String),

    #[error("Debate not found: {0}")]
    RoomNotFound(String),

    #[error("Not a member of debate: {0}")]
    NotAMember(String),

    #[error("Failed to send message: {0}")]
    PersistenceError(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// Stable machine-readable code carried in the `error` event
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::AuthRequired => "AUTH_REQUIRED",
            ChatError::AuthInvalid(_) => "AUTH_INVALID",
            ChatError::RoomNotFound(_) => "ROOM_NOT_FOUND",
            ChatError::NotAMember(_) => "NOT_A_MEMBER",
            ChatError::PersistenceError(_) => "PERSISTENCE_ERROR",
            ChatError::InvalidPayload(_) => "INVALID_PAYLOAD",
            ChatError::Internal(_) => "INTERNAL",
        }
    }

    /// Whether the connection should be closed after reporting this error
    pub fn is_fatal_to_connection(&self) -> bool {
        matches!(self, ChatError::AuthInvalid(_))
    }
}
