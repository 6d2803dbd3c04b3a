//! WebSocket sessions to individual relays.
//!
//! [`WsConnector`] opens a WebSocket to a relay and hands the stream to a
//! background task that owns it. The returned [`WsSession`] handle talks to
//! that task over a channel, so one session can serve concurrent publishes
//! from many dispatches. The task matches `OK` acknowledgements back to the
//! waiting publisher by event id.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use zapnotify_core::composer::MessageEnvelope;

use crate::error::RelayError;
use crate::messages::{event_frame, parse_relay_message, RelayMessage};

/// Default bound on a single relay handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Queue depth between session handles and the owning task.
const COMMAND_CHANNEL_CAPACITY: usize = 64;

type RelayStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type PublishReply = oneshot::Sender<Result<(), RelayError>>;

/// A live (or recently live) session to one relay endpoint.
#[async_trait]
pub trait RelaySession: Send + Sync {
    fn url(&self) -> &str;

    /// `false` once the underlying connection has ended or been closed.
    fn is_connected(&self) -> bool;

    /// Publish an envelope and wait for the relay's acknowledgement.
    async fn publish(&self, envelope: &MessageEnvelope) -> Result<(), RelayError>;

    async fn close(&self);
}

impl fmt::Debug for dyn RelaySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelaySession")
            .field("url", &self.url())
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Establishes new relay sessions.
#[async_trait]
pub trait RelayConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Arc<dyn RelaySession>, RelayError>;
}

// ---------------------------------------------------------------------------
// WsConnector
// ---------------------------------------------------------------------------

/// Connector opening real WebSocket sessions with a bounded handshake.
pub struct WsConnector {
    connect_timeout: Duration,
}

impl WsConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl RelayConnector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Arc<dyn RelaySession>, RelayError> {
        let (ws_stream, _response) = tokio::time::timeout(self.connect_timeout, connect_async(url))
            .await
            .map_err(|_| RelayError::ConnectTimeout {
                url: url.to_string(),
                timeout: self.connect_timeout,
            })?
            .map_err(|e| RelayError::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(url, "Connected to relay");
        Ok(Arc::new(WsSession::spawn(url.to_string(), ws_stream)))
    }
}

// ---------------------------------------------------------------------------
// WsSession
// ---------------------------------------------------------------------------

enum SessionCommand {
    Publish {
        event_id: String,
        frame: String,
        reply: PublishReply,
    },
}

/// Handle to a WebSocket session owned by a background task.
pub struct WsSession {
    url: String,
    commands: mpsc::Sender<SessionCommand>,
    cancel: CancellationToken,
}

impl WsSession {
    fn spawn(url: String, ws_stream: RelayStream) -> Self {
        let (commands, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        tokio::spawn(run_session(
            url.clone(),
            ws_stream,
            rx,
            cancel.clone(),
            Utc::now(),
        ));

        Self {
            url,
            commands,
            cancel,
        }
    }
}

#[async_trait]
impl RelaySession for WsSession {
    fn url(&self) -> &str {
        &self.url
    }

    fn is_connected(&self) -> bool {
        !self.cancel.is_cancelled() && !self.commands.is_closed()
    }

    async fn publish(&self, envelope: &MessageEnvelope) -> Result<(), RelayError> {
        let frame = event_frame(envelope.event())?;
        let (reply, ack) = oneshot::channel();

        self.commands
            .send(SessionCommand::Publish {
                event_id: envelope.id_hex(),
                frame,
                reply,
            })
            .await
            .map_err(|_| RelayError::Disconnected(self.url.clone()))?;

        ack.await
            .map_err(|_| RelayError::Disconnected(self.url.clone()))?
    }

    async fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for WsSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Own the socket until it closes, the handle is dropped, or `cancel` fires.
///
/// Pending publishes still waiting for an `OK` when the loop exits observe
/// [`RelayError::Disconnected`].
async fn run_session(
    url: String,
    ws_stream: RelayStream,
    mut commands: mpsc::Receiver<SessionCommand>,
    cancel: CancellationToken,
    connected_at: DateTime<Utc>,
) {
    let (mut sink, mut stream) = ws_stream.split();
    let mut pending: HashMap<String, PublishReply> = HashMap::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                tracing::info!(url = %url, "Closed relay session");
                break;
            }
            command = commands.recv() => match command {
                Some(SessionCommand::Publish { event_id, frame, reply }) => {
                    // Drop entries whose publisher stopped waiting.
                    pending.retain(|_, waiting| !waiting.is_closed());

                    if let Err(e) = sink.send(Message::Text(frame)).await {
                        tracing::warn!(url = %url, error = %e, "Failed to write to relay");
                        let _ = reply.send(Err(RelayError::Send {
                            url: url.clone(),
                            reason: e.to_string(),
                        }));
                        break;
                    }
                    pending.insert(event_id, reply);
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    handle_text_frame(&url, &text, &mut pending);
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                    // Handled automatically by tungstenite.
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(url = %url, ?frame, "Relay closed WebSocket");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(url = %url, error = %e, "Relay receive error");
                    break;
                }
                None => {
                    tracing::info!(url = %url, "Relay stream exhausted");
                    break;
                }
            },
        }
    }

    commands.close();
    tracing::debug!(
        url = %url,
        uptime_secs = (Utc::now() - connected_at).num_seconds(),
        "Relay session ended",
    );
    if !pending.is_empty() {
        tracing::debug!(url = %url, pending = pending.len(), "Dropping unacknowledged publishes");
    }
}

fn handle_text_frame(url: &str, text: &str, pending: &mut HashMap<String, PublishReply>) {
    match parse_relay_message(text) {
        Ok(RelayMessage::Ok {
            event_id,
            accepted,
            message,
        }) => {
            let Some(reply) = pending.remove(&event_id) else {
                tracing::debug!(url, event_id = %event_id, "OK for unknown event");
                return;
            };
            let result = if accepted {
                Ok(())
            } else {
                Err(RelayError::Rejected {
                    url: url.to_string(),
                    reason: message,
                })
            };
            let _ = reply.send(result);
        }
        Ok(RelayMessage::Notice { message }) => {
            tracing::info!(url, notice = %message, "Relay notice");
        }
        Ok(RelayMessage::Auth { .. }) => {
            tracing::debug!(url, "Relay requested authentication; ignoring");
        }
        Ok(other) => {
            tracing::trace!(url, message = ?other, "Ignoring relay message");
        }
        Err(e) => {
            tracing::warn!(url, error = %e, raw_message = %text, "Failed to parse relay message");
        }
    }
}
