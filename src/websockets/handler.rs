use async_trait::async_trait;
use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::message::MessageRelay;
use crate::presence::PresenceNotifier;
use crate::room::{directory::RoomDirectory, membership::MembershipTracker};
use crate::shared::{AppError, AppState, ChatError};

use super::connection_registry::{ConnectionManager, ConnectionRegistry};
use super::event_handlers::{
    shared::MessageBroadcaster, ChatEventHandlers, ConnectionEventHandlers, RoomEventHandlers,
};
use super::messages::{ClientEvent, WebSocketMessage};
use super::socket::{Connection, ConnectionControl, MessageHandler, SocketWrapper};

/// Routes parsed client events to the event handlers and reports failures
/// back to the originating connection only
pub struct WebsocketReceiveHandler {
    connections: Arc<dyn ConnectionManager>,
    connection_events: ConnectionEventHandlers,
    room_events: RoomEventHandlers,
    chat_events: ChatEventHandlers,
}

impl WebsocketReceiveHandler {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        membership: Arc<MembershipTracker>,
        presence: Arc<PresenceNotifier>,
        relay: Arc<MessageRelay>,
        room_directory: Arc<dyn RoomDirectory>,
    ) -> Self {
        Self {
            connections: registry.clone(),
            connection_events: ConnectionEventHandlers::new(
                Arc::clone(&registry),
                Arc::clone(&membership),
                Arc::clone(&presence),
            ),
            room_events: RoomEventHandlers::new(
                Arc::clone(&registry),
                Arc::clone(&membership),
                Arc::clone(&presence),
                room_directory,
            ),
            chat_events: ChatEventHandlers::new(registry, membership, presence, relay),
        }
    }

    /// Authenticates a connection whose token arrived with the upgrade request
    pub async fn authenticate(&self, connection_id: &str, token: &str) -> Result<String, ChatError> {
        self.connection_events
            .handle_authenticate(connection_id, token)
            .await
    }

    /// Cascades a closed socket out of every room; safe to call more than once
    pub async fn handle_disconnect(&self, connection_id: &str) -> usize {
        self.connection_events.handle_disconnect(connection_id).await
    }

    async fn dispatch(&self, connection_id: &str, event: ClientEvent) -> Result<(), ChatError> {
        match event {
            ClientEvent::Authenticate { token } => self
                .connection_events
                .handle_authenticate(connection_id, &token)
                .await
                .map(|_| ()),
            ClientEvent::JoinRoom { room_id } => {
                self.room_events.handle_join(connection_id, &room_id).await
            }
            ClientEvent::LeaveRoom { room_id } => {
                self.room_events.handle_leave(connection_id, &room_id).await
            }
            ClientEvent::SendMessage { room_id, content } => {
                self.chat_events
                    .handle_send_message(connection_id, &room_id, content)
                    .await
            }
            ClientEvent::TypingStart { room_id } => {
                self.chat_events
                    .handle_typing(connection_id, &room_id, true)
                    .await
            }
            ClientEvent::TypingStop { room_id } => {
                self.chat_events
                    .handle_typing(connection_id, &room_id, false)
                    .await
            }
        }
    }

    async fn report(&self, connection_id: &str, error: &ChatError) -> ConnectionControl {
        let message = WebSocketMessage::error(error);

        if error.is_fatal_to_connection() {
            // The registry has already dropped the connection, write directly
            return ConnectionControl::Close(message.to_json().ok());
        }

        if let Err(e) =
            MessageBroadcaster::send_to_connection(&self.connections, connection_id, &message).await
        {
            warn!(connection_id = %connection_id, error = %e, "Failed to report error");
        }
        ConnectionControl::Continue
    }
}

#[async_trait]
impl MessageHandler for WebsocketReceiveHandler {
    async fn handle_message(&self, connection_id: &str, message: String) -> ConnectionControl {
        debug!(
            connection_id = %connection_id,
            message_length = message.len(),
            "Received message"
        );

        let result = match ClientEvent::parse(&message) {
            Ok(event) => self.dispatch(connection_id, event).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => ConnectionControl::Continue,
            Err(e) => {
                info!(
                    connection_id = %connection_id,
                    code = e.code(),
                    error = %e,
                    "Client event rejected"
                );
                self.report(connection_id, &e).await
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WebSocketQuery {
    pub token: Option<String>,
}

/// WebSocket endpoint. GET /ws with an optional token in `?token=` or the
/// Sec-WebSocket-Protocol header; without one the connection starts
/// unauthenticated and may send an `authenticate` event.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WebSocketQuery>,
    headers: HeaderMap,
    State(app_state): State<AppState>,
) -> Result<Response, AppError> {
    let offered_protocol = protocol_token(&headers);
    let token = query.token.or_else(|| offered_protocol.clone());

    if let Some(token) = &token {
        app_state
            .connection_registry
            .verify(token)
            .await
            .map_err(|e| {
                warn!(error = %e, "Rejecting WebSocket upgrade");
                AppError::Unauthorized("Invalid token".to_string())
            })?;
    }

    info!(
        authenticated = token.is_some(),
        "WebSocket connection requested"
    );

    // Browsers drop the socket unless the offered subprotocol is echoed
    let ws = match offered_protocol {
        Some(protocol) => ws.protocols([protocol]),
        None => ws,
    };

    Ok(ws.on_upgrade(move |socket| handle_websocket_connection(socket, token, app_state)))
}

/// First offered subprotocol, which carries the token.
///
/// Clients may offer a comma-separated list such as `"<jwt>, chat"`.
fn protocol_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("sec-websocket-protocol")
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|first| first.trim().to_string())
        .filter(|first| !first.is_empty())
}

/// Handle the upgraded WebSocket connection
async fn handle_websocket_connection(
    mut socket: axum::extract::ws::WebSocket,
    token: Option<String>,
    app_state: AppState,
) {
    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();
    let connection_id = app_state
        .connection_registry
        .connect(outbound_sender)
        .await;

    if let Some(token) = token {
        // The token can expire between the upgrade check and here
        if let Err(e) = app_state
            .receive_handler
            .authenticate(&connection_id, &token)
            .await
        {
            warn!(connection_id = %connection_id, error = %e, "Authentication failed after upgrade");
            if let Ok(frame) = WebSocketMessage::error(&e).to_json() {
                let _ = socket.send_message(frame).await;
            }
            let _ = socket.close().await;
            return;
        }
    }

    let connection = Connection::new(
        connection_id.clone(),
        Box::new(socket),
        outbound_receiver,
        app_state.receive_handler.clone(),
    );

    match connection.run().await {
        Ok(()) => {
            info!(connection_id = %connection_id, "WebSocket connection closed cleanly");
        }
        Err(e) => {
            warn!(connection_id = %connection_id, error = %e, "WebSocket connection error");
        }
    }

    app_state
        .receive_handler
        .handle_disconnect(&connection_id)
        .await;
}
