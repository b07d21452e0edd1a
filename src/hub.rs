//! Hub actor implementation
//!
//! The central actor that owns the active connection set. Registration,
//! deregistration, routing and directory reads all arrive as commands on
//! one ordered channel and are processed one at a time, so the set is
//! never touched concurrently and needs no lock.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::connection::{Connection, Frame};
use crate::directory::{self, DirectoryEntry};
use crate::error::{AppError, PersistError, RegisterError, RouteError};
use crate::message::ChatEvent;
use crate::store::MessageStore;
use crate::types::{ClientId, RoomCode};

/// Channel buffer size for hub commands
pub const COMMAND_BUFFER_SIZE: usize = 1024;

/// Hub behaviour switches
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Reject a registration whose username is already active in its room
    pub unique_usernames: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            unique_usernames: true,
        }
    }
}

/// Commands sent from handlers to the Hub actor
#[derive(Debug)]
pub enum HubCommand {
    /// Add a connection to the active set
    Register {
        connection: Connection,
        reply: oneshot::Sender<Result<(), RegisterError>>,
    },
    /// Remove a connection and close its mailbox
    Unregister { client_id: ClientId },
    /// Decode, persist and fan out a raw frame
    ///
    /// With `from` set, the frame is stamped with that connection's
    /// username and room before it is persisted.
    Route {
        from: Option<ClientId>,
        payload: String,
        reply: Option<oneshot::Sender<Result<RouteReport, RouteError>>>,
    },
    /// Online users of a room
    Directory {
        room_code: RoomCode,
        reply: oneshot::Sender<Vec<DirectoryEntry>>,
    },
    /// Whether a username is free in a room right now
    CheckUsername {
        room_code: RoomCode,
        username: String,
        reply: oneshot::Sender<bool>,
    },
    /// Counters snapshot
    Stats { reply: oneshot::Sender<HubStats> },
}

/// Outcome of routing one frame
#[derive(Debug)]
pub struct RouteReport {
    /// Result of the history append; fan-out happens either way
    pub persisted: Result<(), PersistError>,
    /// Mailboxes the frame was queued in
    pub delivered: usize,
    /// Connections dropped because their mailbox was full or closed
    pub evicted: usize,
}

/// Running counters kept by the hub
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub active_connections: usize,
    pub routed: u64,
    pub dropped_payloads: u64,
    pub persist_failures: u64,
    pub evicted: u64,
}

/// The Hub actor
///
/// Owns the active set exclusively and processes commands from
/// connection handlers and HTTP routes.
pub struct Hub {
    /// Active connections: ClientId -> Connection
    connections: HashMap<ClientId, Connection>,
    store: Arc<dyn MessageStore>,
    config: HubConfig,
    stats: HubStats,
    /// Command receiver channel
    receiver: mpsc::Receiver<HubCommand>,
}

impl Hub {
    /// Create a new Hub with the given command receiver
    pub fn new(
        receiver: mpsc::Receiver<HubCommand>,
        store: Arc<dyn MessageStore>,
        config: HubConfig,
    ) -> Self {
        Self {
            connections: HashMap::new(),
            store,
            config,
            stats: HubStats::default(),
            receiver,
        }
    }

    /// Create the command channel, spawn the hub loop and return a handle
    pub fn spawn(store: Arc<dyn MessageStore>, config: HubConfig) -> (HubHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        let task = tokio::spawn(Hub::new(rx, store, config).run());
        (HubHandle::new(tx), task)
    }

    /// Run the Hub event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("Hub started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("Hub shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Register { connection, reply } => {
                let _ = reply.send(self.register(connection));
            }
            HubCommand::Unregister { client_id } => {
                self.unregister(client_id);
            }
            HubCommand::Route {
                from,
                payload,
                reply,
            } => {
                let outcome = match from {
                    Some(client_id) => self.route_from(client_id, &payload),
                    None => self.route(&payload),
                };
                if let Some(reply) = reply {
                    let _ = reply.send(outcome);
                }
            }
            HubCommand::Directory { room_code, reply } => {
                let _ = reply.send(self.directory(&room_code));
            }
            HubCommand::CheckUsername {
                room_code,
                username,
                reply,
            } => {
                let free = directory::is_available(self.connections.values(), &room_code, &username);
                let _ = reply.send(free);
            }
            HubCommand::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
        }
    }

    /// Add a connection to the active set
    pub fn register(&mut self, connection: Connection) -> Result<(), RegisterError> {
        if self.config.unique_usernames
            && !directory::is_available(
                self.connections.values(),
                &connection.room_code,
                connection.username.as_str(),
            )
        {
            warn!(
                "Rejected {}: username '{}' already active in room {}",
                connection.id, connection.username, connection.room_code
            );
            return Err(RegisterError::UsernameTaken {
                username: connection.username.to_string(),
                room_code: connection.room_code.to_string(),
            });
        }

        info!(
            "Client {} registered as '{}' in room {}",
            connection.id, connection.username, connection.room_code
        );
        self.connections.insert(connection.id, connection);
        debug!("Active connections: {}", self.connections.len());
        Ok(())
    }

    /// Remove a connection, dropping its mailbox sender
    ///
    /// Returns false when the connection was not registered; that is not
    /// an error.
    pub fn unregister(&mut self, client_id: ClientId) -> bool {
        match self.connections.remove(&client_id) {
            Some(conn) => {
                info!(
                    "Client {} ('{}') left room {}",
                    client_id, conn.username, conn.room_code
                );
                debug!("Active connections: {}", self.connections.len());
                true
            }
            None => {
                debug!("Unregister for unknown client {} ignored", client_id);
                false
            }
        }
    }

    /// Decode, persist, then fan out one frame
    ///
    /// Persistence runs before delivery and blocks the loop, so history
    /// order equals processing order. A persistence failure is reported in
    /// the returned [`RouteReport`] but does not stop delivery.
    pub fn route(&mut self, payload: &str) -> Result<RouteReport, RouteError> {
        let event = self.decode(payload)?;
        self.dispatch(event)
    }

    /// Route a frame read from a registered connection
    ///
    /// The sender's username and room always come from the registration,
    /// never from the frame.
    pub fn route_from(
        &mut self,
        client_id: ClientId,
        payload: &str,
    ) -> Result<RouteReport, RouteError> {
        let Some(conn) = self.connections.get(&client_id) else {
            self.stats.dropped_payloads += 1;
            debug!("Dropping frame from unregistered client {}", client_id);
            return Err(RouteError::UnknownSender(client_id));
        };
        let username = conn.username.to_string();
        let room_code = conn.room_code.to_string();

        let mut event = self.decode(payload)?;
        let message = event.message_mut();
        if message.username != username || message.room_code != room_code {
            warn!(
                "Client {} claimed '{}' in room {}, sending as '{}' in room {}",
                client_id, message.username, message.room_code, username, room_code
            );
            message.username = username;
            message.room_code = room_code;
        }
        self.dispatch(event)
    }

    fn decode(&mut self, payload: &str) -> Result<ChatEvent, RouteError> {
        ChatEvent::decode(payload).map_err(|e| {
            self.stats.dropped_payloads += 1;
            warn!("Dropping payload: {}", e);
            e
        })
    }

    fn dispatch(&mut self, event: ChatEvent) -> Result<RouteReport, RouteError> {
        let frame: Frame = match event.encode() {
            Ok(json) => Frame::from(json),
            Err(e) => {
                self.stats.dropped_payloads += 1;
                warn!("Dropping payload that cannot be re-encoded: {}", e);
                return Err(RouteError::Decode(e));
            }
        };

        let persisted = self.store.append(&event);
        if let Err(e) = &persisted {
            self.stats.persist_failures += 1;
            warn!("Failed to persist {} event: {}", event.kind(), e);
        }

        let message = event.message();
        let mut delivered = 0;
        let mut slow = Vec::new();
        for (id, conn) in &self.connections {
            if !message.is_visible_to(conn.room_code.as_str(), conn.username.as_str()) {
                continue;
            }
            match conn.try_deliver(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!("Evicting client {} ('{}'): {}", id, conn.username, e);
                    slow.push(*id);
                }
            }
        }

        let evicted = slow.len();
        for id in slow {
            self.connections.remove(&id);
        }

        self.stats.routed += 1;
        self.stats.evicted += evicted as u64;
        debug!(
            "Routed {} from '{}' in room {}: delivered={}, evicted={}",
            event.kind(),
            message.username,
            message.room_code,
            delivered,
            evicted
        );

        Ok(RouteReport {
            persisted,
            delivered,
            evicted,
        })
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            active_connections: self.connections.len(),
            ..self.stats.clone()
        }
    }

    /// Online users of a room
    pub fn directory(&self, room_code: &RoomCode) -> Vec<DirectoryEntry> {
        directory::snapshot(self.connections.values(), room_code)
    }
}

/// Cloneable front door to a running hub
#[derive(Debug, Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    pub fn new(sender: mpsc::Sender<HubCommand>) -> Self {
        Self { sender }
    }

    async fn send(&self, cmd: HubCommand) -> Result<(), AppError> {
        self.sender.send(cmd).await.map_err(|_| AppError::HubClosed)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> HubCommand,
    ) -> Result<T, AppError> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await.map_err(|_| AppError::HubClosed)
    }

    /// Register a connection and wait for the hub's verdict
    pub async fn register(&self, connection: Connection) -> Result<(), AppError> {
        self.request(|reply| HubCommand::Register { connection, reply })
            .await?
            .map_err(AppError::from)
    }

    /// Ask the hub to drop a connection; safe to call more than once
    pub async fn unregister(&self, client_id: ClientId) -> Result<(), AppError> {
        self.send(HubCommand::Unregister { client_id }).await
    }

    /// Queue a frame read from `from` without waiting for the outcome
    pub async fn route(&self, from: ClientId, payload: String) -> Result<(), AppError> {
        self.send(HubCommand::Route {
            from: Some(from),
            payload,
            reply: None,
        })
        .await
    }

    /// Route a raw frame and wait for the report
    pub async fn route_with_report(
        &self,
        payload: String,
    ) -> Result<Result<RouteReport, RouteError>, AppError> {
        self.request(|reply| HubCommand::Route {
            from: None,
            payload,
            reply: Some(reply),
        })
        .await
    }

    pub async fn directory(&self, room_code: RoomCode) -> Result<Vec<DirectoryEntry>, AppError> {
        self.request(|reply| HubCommand::Directory { room_code, reply })
            .await
    }

    pub async fn is_username_available(
        &self,
        room_code: RoomCode,
        username: String,
    ) -> Result<bool, AppError> {
        self.request(|reply| HubCommand::CheckUsername {
            room_code,
            username,
            reply,
        })
        .await
    }

    pub async fn stats(&self) -> Result<HubStats, AppError> {
        self.request(|reply| HubCommand::Stats { reply }).await
    }
}
