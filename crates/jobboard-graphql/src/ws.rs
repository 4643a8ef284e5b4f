// Persistent channel: GraphQL subscriptions over a `graphql-transport-ws`
// WebSocket connection.
//
// The connection is opened lazily by the first subscription and shared by
// every subscription that starts while it is open. It is owned by a single
// driver task; subscriptions talk to the driver over mpsc channels. When the
// last subscription ends the driver closes the socket, so the next
// subscription opens a new connection and reads the session token afresh.
// There is no reconnection: a dropped connection fails its subscriptions.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures_util::{SinkExt, Stream, StreamExt};
use jobboard_core::Session;
use serde_json::{Map, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::document::Operation;
use crate::error::TransportError;
use crate::protocol::{connection_params, ClientMessage, Response, ServerMessage, WS_SUBPROTOCOL};
use crate::selector::PersistentChannel;

/// Items delivered to a subscriber.
pub type SubscriptionItem = Result<Response, TransportError>;

// ---------------------------------------------------------------------------
// Subscription handle
// ---------------------------------------------------------------------------

enum Command {
    Subscribe { id: String, payload: Value },
    Complete { id: String },
}

/// A running subscription. Yields one item per server `next` message and ends
/// when the server completes it, reports an error, or the connection closes.
/// Dropping it asks the server to stop.
pub struct Subscription {
    id: String,
    events: mpsc::UnboundedReceiver<SubscriptionItem>,
    completer: Option<mpsc::UnboundedSender<Command>>,
}

impl Subscription {
    /// A subscription fed by `events` and not tied to any connection, for
    /// custom [`PersistentChannel`] implementations.
    pub fn from_receiver(
        id: impl Into<String>,
        events: mpsc::UnboundedReceiver<SubscriptionItem>,
    ) -> Self {
        Self {
            id: id.into(),
            events,
            completer: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.completer.is_some())
            .finish()
    }
}

impl Stream for Subscription {
    type Item = SubscriptionItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(completer) = &self.completer {
            // The driver may already be gone; nothing left to stop then.
            let _ = completer.send(Command::Complete {
                id: self.id.clone(),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Route table
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Routes {
    subscribers: HashMap<String, mpsc::UnboundedSender<SubscriptionItem>>,
    closed: bool,
}

/// Subscribers of one connection, keyed by subscription id. Once `closed` is
/// set no new subscriber can join and the connection is on its way out.
///
/// Subscriber channels are unbounded: the driver never waits on a slow
/// reader, so one unread subscription cannot hold up the others.
#[derive(Default)]
struct RouteTable(Mutex<Routes>);

impl RouteTable {
    fn lock(&self) -> MutexGuard<'_, Routes> {
        self.0.lock().expect("route table mutex poisoned")
    }

    fn register(&self, id: &str, tx: mpsc::UnboundedSender<SubscriptionItem>) -> bool {
        let mut routes = self.lock();
        if routes.closed {
            return false;
        }
        routes.subscribers.insert(id.to_string(), tx);
        true
    }

    fn sender(&self, id: &str) -> Option<mpsc::UnboundedSender<SubscriptionItem>> {
        self.lock().subscribers.get(id).cloned()
    }

    /// Remove `id`. Returns its sender (if it was active) and whether the
    /// connection became idle, in which case it is marked closed.
    fn finish(&self, id: &str) -> (Option<mpsc::UnboundedSender<SubscriptionItem>>, bool) {
        let mut routes = self.lock();
        let sender = routes.subscribers.remove(id);
        let idle = routes.subscribers.is_empty();
        if idle {
            routes.closed = true;
        }
        (sender, idle)
    }

    fn close_all(&self) -> Vec<mpsc::UnboundedSender<SubscriptionItem>> {
        let mut routes = self.lock();
        routes.closed = true;
        routes.subscribers.drain().map(|(_, tx)| tx).collect()
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

struct Connection {
    outgoing: mpsc::UnboundedSender<Command>,
    routes: Arc<RouteTable>,
}

impl Connection {
    /// Hand an acknowledged socket to a new driver task.
    fn spawn<S>(ws: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (outgoing, commands) = mpsc::unbounded_channel();
        let routes = Arc::new(RouteTable::default());
        tokio::spawn(drive(ws, commands, Arc::clone(&routes)));
        Self { outgoing, routes }
    }

    /// Register a subscriber. `None` when the connection is closing.
    fn register(
        &self,
        id: &str,
        tx: mpsc::UnboundedSender<SubscriptionItem>,
    ) -> Option<mpsc::UnboundedSender<Command>> {
        if self.outgoing.is_closed() || !self.routes.register(id, tx) {
            return None;
        }
        Some(self.outgoing.clone())
    }
}

/// Persistent channel over `graphql-transport-ws`.
pub struct WsChannel {
    endpoint: String,
    session: Session,
    connection: tokio::sync::Mutex<Option<Connection>>,
}

impl WsChannel {
    pub fn new(endpoint: impl Into<String>, session: Session) -> Self {
        Self {
            endpoint: endpoint.into(),
            session,
            connection: tokio::sync::Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Open a socket and complete the `connection_init` handshake with the
    /// token the session holds right now.
    async fn connect(&self) -> Result<Connection, TransportError> {
        let params = connection_params(self.session.bearer());
        let mut request = self.endpoint.as_str().into_client_request()?;
        request
            .headers_mut()
            .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(WS_SUBPROTOCOL));

        info!(
            endpoint = %self.endpoint,
            authenticated = params.contains_key("authorization"),
            "opening subscription connection"
        );
        let (mut ws, _response) = tokio_tungstenite::connect_async(request).await?;
        handshake(&mut ws, params).await?;
        Ok(Connection::spawn(ws))
    }
}

#[async_trait]
impl PersistentChannel for WsChannel {
    async fn subscribe(&self, operation: &Operation) -> Result<Subscription, TransportError> {
        let payload = serde_json::to_value(operation.payload())?;
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();

        let outgoing = {
            let mut slot = self.connection.lock().await;
            match slot.as_ref().and_then(|c| c.register(&id, tx.clone())) {
                Some(outgoing) => outgoing,
                None => {
                    let connection = self.connect().await?;
                    let outgoing = connection
                        .register(&id, tx)
                        .ok_or(TransportError::ConnectionClosed)?;
                    *slot = Some(connection);
                    outgoing
                }
            }
        };

        debug!(
            %id,
            operation = operation.name().unwrap_or("<anonymous>"),
            "starting subscription"
        );
        outgoing
            .send(Command::Subscribe {
                id: id.clone(),
                payload,
            })
            .map_err(|_| TransportError::ConnectionClosed)?;

        Ok(Subscription {
            id,
            events: rx,
            completer: Some(outgoing),
        })
    }
}

// ---------------------------------------------------------------------------
// Handshake and driver
// ---------------------------------------------------------------------------

async fn send_message<S>(
    ws: &mut WebSocketStream<S>,
    message: &ClientMessage,
) -> Result<(), TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let text = serde_json::to_string(message)?;
    ws.send(Message::Text(text.into())).await?;
    Ok(())
}

/// Send `connection_init` with `params` and wait for `connection_ack`,
/// answering pings meanwhile.
pub async fn handshake<S>(
    ws: &mut WebSocketStream<S>,
    params: Map<String, Value>,
) -> Result<(), TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    send_message(ws, &ClientMessage::ConnectionInit { payload: params }).await?;

    while let Some(frame) = ws.next().await {
        match frame? {
            Message::Text(text) => match serde_json::from_str::<ServerMessage>(text.as_str())? {
                ServerMessage::ConnectionAck { .. } => {
                    debug!("connection acknowledged");
                    return Ok(());
                }
                ServerMessage::Ping { .. } => send_message(ws, &ClientMessage::Pong {}).await?,
                other => {
                    return Err(TransportError::Protocol(format!(
                        "expected connection_ack, got {other:?}"
                    )))
                }
            },
            Message::Close(frame) => {
                let reason = match frame {
                    Some(frame) => format!("{} {}", u16::from(frame.code), frame.reason),
                    None => "closed before acknowledgement".to_string(),
                };
                warn!("subscription connection rejected: {reason}");
                return Err(TransportError::ConnectionRejected(reason));
            }
            _ => {
                // Binary, Ping, Pong, Frame carry nothing for the handshake.
            }
        }
    }
    Err(TransportError::ConnectionClosed)
}

/// What the driver does after handling a server message.
enum Flow {
    Continue,
    Idle,
}

/// Own the socket until it closes or goes idle, routing server messages to
/// subscribers and client commands to the server.
async fn drive<S>(
    mut ws: WebSocketStream<S>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    routes: Arc<RouteTable>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let failure: Option<TransportError> = loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    break None;
                };
                match command {
                    Command::Subscribe { id, payload } => {
                        if let Err(e) = send_message(&mut ws, &ClientMessage::Subscribe { id, payload }).await {
                            break Some(e);
                        }
                    }
                    Command::Complete { id } => {
                        let (active, idle) = routes.finish(&id);
                        if active.is_some() {
                            debug!(%id, "stopping subscription");
                            if let Err(e) = send_message(&mut ws, &ClientMessage::Complete { id }).await {
                                break Some(e);
                            }
                        }
                        if idle {
                            break None;
                        }
                    }
                }
            }
            frame = ws.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match handle_server_text(&mut ws, text.as_str(), &routes).await {
                            Ok(Flow::Continue) => {}
                            Ok(Flow::Idle) => break None,
                            Err(e) => break Some(e),
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!(?frame, "server closed subscription connection");
                        break Some(TransportError::ConnectionClosed);
                    }
                    Some(Ok(_)) => {
                        // Ignore Binary, Ping, Pong, Frame variants.
                    }
                    Some(Err(e)) => break Some(e.into()),
                    None => break Some(TransportError::ConnectionClosed),
                }
            }
        }
    };

    let orphans = routes.close_all();
    match failure {
        None => {
            debug!("subscription connection idle, closing");
            let _ = ws.close(None).await;
        }
        Some(e) => {
            warn!(subscribers = orphans.len(), "subscription connection lost: {e}");
            for tx in orphans {
                let _ = tx.send(Err(TransportError::ConnectionClosed));
            }
        }
    }
}

async fn handle_server_text<S>(
    ws: &mut WebSocketStream<S>,
    text: &str,
    routes: &RouteTable,
) -> Result<Flow, TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let message: ServerMessage = serde_json::from_str(text)
        .map_err(|e| TransportError::Protocol(format!("unreadable server message: {e}")))?;

    match message {
        ServerMessage::Next { id, payload } => {
            match routes.sender(&id) {
                Some(tx) => {
                    if tx.send(Ok(payload)).is_err() {
                        debug!(%id, "subscriber dropped before completion");
                    }
                }
                None => debug!(%id, "next for unknown subscription"),
            }
            Ok(Flow::Continue)
        }
        ServerMessage::Error { id, payload } => {
            let (sender, idle) = routes.finish(&id);
            if let Some(tx) = sender {
                let _ = tx.send(Err(TransportError::Graphql(payload)));
            }
            Ok(if idle { Flow::Idle } else { Flow::Continue })
        }
        ServerMessage::Complete { id } => {
            let (_, idle) = routes.finish(&id);
            debug!(%id, "server completed subscription");
            Ok(if idle { Flow::Idle } else { Flow::Continue })
        }
        ServerMessage::Ping { .. } => {
            send_message(ws, &ClientMessage::Pong {}).await?;
            Ok(Flow::Continue)
        }
        ServerMessage::Pong { .. } => Ok(Flow::Continue),
        ServerMessage::ConnectionAck { .. } => Err(TransportError::Protocol(
            "duplicate connection_ack".to_string(),
        )),
    }
}
