//! Room-scoped WebSocket chat relay
//!
//! Clients connect over WebSocket, join a room, and exchange broadcast or
//! direct messages. Presence (join/leave) travels on the same channel as
//! tagged events.
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - [`Hub`] is the single owner of the active connection set; register,
//!   unregister and route commands are processed one at a time
//! - Each connection runs an inbound pump (socket -> hub) and an outbound
//!   pump (bounded mailbox -> socket)
//! - A full mailbox gets its connection dropped instead of stalling the hub
//! - Every routed event is persisted before it is fanned out, so history
//!   order matches delivery order
//!
//! # Example
//! ```ignore
//! use chat_relay::{run_server, config::ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     run_server(ServerConfig::default()).await.unwrap();
//! }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod directory;
pub mod error;
pub mod handler;
pub mod hub;
pub mod logger;
pub mod message;
pub mod routes;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use connection::{Connection, ConnectionState};
pub use directory::DirectoryEntry;
pub use error::{AppError, ClientError, PersistError, RegisterError, RouteError};
pub use hub::{Hub, HubCommand, HubConfig, HubHandle, HubStats, RouteReport};
pub use message::{ChatEvent, Message};
pub use routes::{router, run_server, serve, AppState};
pub use store::{InMemoryStore, MessageStore, SqliteStore};
pub use types::{ClientId, RoomCode, Username};
