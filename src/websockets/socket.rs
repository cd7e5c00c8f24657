use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Minimal text-frame view of a client socket
#[async_trait]
pub trait SocketWrapper: Send {
    async fn send_message(&mut self, message: String) -> Result<(), SocketError>;

    /// Next text frame from the client, `None` once the client has gone
    async fn receive_message(&mut self) -> Result<Option<String>, SocketError>;

    async fn close(&mut self) -> Result<(), SocketError>;
}

/// What the connection loop should do after an inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionControl {
    Continue,
    /// Write the optional final frame straight to the socket, then close
    Close(Option<String>),
}

/// Handler for incoming WebSocket messages
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle_message(&self, connection_id: &str, message: String) -> ConnectionControl;
}

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

#[async_trait]
impl SocketWrapper for WebSocket {
    async fn send_message(&mut self, message: String) -> Result<(), SocketError> {
        self.send(Message::Text(message))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    async fn receive_message(&mut self) -> Result<Option<String>, SocketError> {
        loop {
            match self.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                // Ping/pong are answered by axum; binary frames carry no events
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(SocketError::ReceiveFailed(e.to_string())),
            }
        }
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.send(Message::Close(None))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }
}

/// A live client socket pumping events in both directions.
///
/// Outbound frames arrive on the channel registered with the
/// `ConnectionRegistry`; inbound frames are handed to the `MessageHandler`
/// one at a time, so a connection's events are processed in order.
pub struct Connection {
    pub connection_id: String,
    socket: Box<dyn SocketWrapper>,
    outbound_receiver: mpsc::UnboundedReceiver<String>,
    message_handler: Arc<dyn MessageHandler>,
}

impl Connection {
    pub fn new(
        connection_id: String,
        socket: Box<dyn SocketWrapper>,
        outbound_receiver: mpsc::UnboundedReceiver<String>,
        message_handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            connection_id,
            socket,
            outbound_receiver,
            message_handler,
        }
    }

    /// Runs until the client disconnects, the handler asks to close, or the
    /// outbound channel is dropped
    pub async fn run(mut self) -> Result<(), SocketError> {
        loop {
            tokio::select! {
                msg = self.outbound_receiver.recv() => {
                    match msg {
                        Some(message) => self.socket.send_message(message).await?,
                        None => break,
                    }
                }

                msg = self.socket.receive_message() => {
                    match msg? {
                        Some(message) => {
                            let control = self
                                .message_handler
                                .handle_message(&self.connection_id, message)
                                .await;
                            if let ConnectionControl::Close(final_frame) = control {
                                self.flush_outbound().await?;
                                if let Some(frame) = final_frame {
                                    self.socket.send_message(frame).await?;
                                }
                                debug!(connection_id = %self.connection_id, "Handler closed connection");
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        let _ = self.socket.close().await;
        Ok(())
    }

    /// Writes whatever was queued for this connection before closing
    async fn flush_outbound(&mut self) -> Result<(), SocketError> {
        while let Ok(message) = self.outbound_receiver.try_recv() {
            self.socket.send_message(message).await?;
        }
        Ok(())
    }
}
