//! WebSocket connection handler
//!
//! Upgrades `GET /ws`, registers the peer with the hub, then runs the two
//! pumps of a connection: the inbound pump hands every text frame to the
//! hub for routing, the outbound pump drains the connection's mailbox to
//! the socket and keeps it alive with pings.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::connection::{mailbox, Connection, ConnectionEvent, ConnectionState, Frame};
use crate::error::AppError;
use crate::hub::HubHandle;
use crate::routes::AppState;
use crate::types::{ClientId, RoomCode, Username};

/// Query parameters of the WebSocket endpoint
#[derive(Debug, Deserialize)]
pub struct JoinQuery {
    pub username: String,
    pub room: String,
    #[serde(default)]
    pub color: i32,
}

/// Handle `GET /ws?username=..&room=..&color=..`
///
/// The connection is registered before the upgrade is accepted so that a
/// taken username can still be answered with `409 Conflict`.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<JoinQuery>,
) -> Result<Response, AppError> {
    let username = Username::parse(query.username)?;
    let room_code = RoomCode::parse(query.room)?;

    let client_id = ClientId::new();
    let (tx, rx) = mailbox(state.session.mailbox_capacity);
    state
        .hub
        .register(Connection::new(
            client_id,
            username,
            query.color,
            room_code,
            tx,
        ))
        .await?;

    let hub = state.hub.clone();
    let failed_hub = state.hub.clone();
    let session = state.session.clone();

    Ok(ws
        .on_failed_upgrade(move |e| {
            warn!("WebSocket upgrade failed for {}: {}", client_id, e);
            tokio::spawn(async move {
                let _ = failed_hub.unregister(client_id).await;
            });
        })
        .on_upgrade(move |socket| run_session(socket, hub, client_id, rx, session)))
}

/// Drive one upgraded connection until both pumps have stopped
async fn run_session(
    socket: WebSocket,
    hub: HubHandle,
    client_id: ClientId,
    mailbox: mpsc::Receiver<Frame>,
    session: SessionConfig,
) {
    let mut state = ConnectionState::Connecting.transition(ConnectionEvent::HandshakeCompleted);
    info!("Client {} is {:?}", client_id, state);

    let (ws_sender, ws_receiver) = socket.split();

    let mut inbound = tokio::spawn(inbound_pump(
        ws_receiver,
        hub.clone(),
        client_id,
        session.idle_timeout,
    ));
    let mut outbound = tokio::spawn(outbound_pump(
        ws_sender,
        mailbox,
        hub,
        client_id,
        session.heartbeat_interval,
    ));

    tokio::select! {
        _ = &mut inbound => {
            state = state.transition(ConnectionEvent::Disconnected);
            debug!("Client {} is {:?}, flushing mailbox", client_id, state);
            // The hub closes the mailbox once it processes the unregister.
            let _ = outbound.await;
        }
        _ = &mut outbound => {
            state = state.transition(ConnectionEvent::Disconnected);
            debug!("Client {} is {:?}, mailbox closed", client_id, state);
            inbound.abort();
        }
    }

    state = state.transition(ConnectionEvent::Drained);
    if state.is_closed() {
        info!("Client {} is {:?}", client_id, state);
    } else {
        warn!("Client {} session ended while {:?}", client_id, state);
    }
}

/// Socket -> hub
///
/// Ends on read error, close frame, end of stream, or when nothing at all
/// (pongs included) arrives within `idle_timeout`. Always unregisters.
async fn inbound_pump(
    mut ws_receiver: SplitStream<WebSocket>,
    hub: HubHandle,
    client_id: ClientId,
    idle_timeout: Duration,
) {
    loop {
        let next = match timeout(idle_timeout, ws_receiver.next()).await {
            Ok(next) => next,
            Err(_) => {
                warn!("Client {} idle for {:?}, dropping", client_id, idle_timeout);
                break;
            }
        };

        match next {
            Some(Ok(Message::Text(text))) => {
                debug!("Frame from {}: {} bytes", client_id, text.as_str().len());
                if hub.route(client_id, text.as_str().to_owned()).await.is_err() {
                    debug!("Hub closed, ending inbound pump for {}", client_id);
                    break;
                }
            }
            Some(Ok(Message::Close(_))) => {
                debug!("Client {} sent close frame", client_id);
                break;
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                debug!("Heartbeat from {}", client_id);
            }
            Some(Ok(Message::Binary(_))) => {
                debug!("Ignoring binary frame from {}", client_id);
            }
            Some(Err(e)) => {
                warn!("WebSocket error for {}: {}", client_id, e);
                break;
            }
            None => break,
        }
    }

    let _ = hub.unregister(client_id).await;
    debug!("Inbound pump ended for {}", client_id);
}

/// Mailbox -> socket
///
/// Ends when the hub closes the mailbox (then sends a close frame) or on a
/// write error (then unregisters).
async fn outbound_pump(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut mailbox: mpsc::Receiver<Frame>,
    hub: HubHandle,
    client_id: ClientId,
    heartbeat: Duration,
) {
    let mut ticker = interval_at(Instant::now() + heartbeat, heartbeat);

    loop {
        let outgoing = tokio::select! {
            frame = mailbox.recv() => match frame {
                Some(frame) => Message::Text(frame.to_string().into()),
                None => break,
            },
            _ = ticker.tick() => Message::Ping(Bytes::new()),
        };

        if let Err(e) = ws_sender.send(outgoing).await {
            debug!("Write to {} failed: {}", client_id, e);
            let _ = hub.unregister(client_id).await;
            return;
        }
    }

    debug!("Mailbox closed for {}", client_id);
    let _ = ws_sender.close().await;
}
