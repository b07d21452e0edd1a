//! Command line configuration for the relay server and terminal client.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use crate::error::PersistError;
use crate::hub::HubConfig;
use crate::store::{InMemoryStore, MessageStore, SqliteStore};

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Default per-connection mailbox capacity
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;

/// Room the terminal client joins without `--room`
pub const DEFAULT_ROOM: &str = "lobby";

const DEFAULT_HEARTBEAT_SECS: u64 = 20;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

#[derive(Parser, Debug)]
#[command(name = "chat_relay")]
#[command(about = "Room-scoped WebSocket chat relay", long_about = None)]
pub struct ServerArgs {
    /// HTTP service address, e.g. localhost:5000
    #[arg(short = 'a', long, default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// SQLite file for message history (in-memory when omitted)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Frames buffered per connection before it is dropped as too slow
    #[arg(long, default_value_t = DEFAULT_MAILBOX_CAPACITY)]
    pub mailbox_capacity: usize,

    /// Seconds between server pings
    #[arg(long, default_value_t = DEFAULT_HEARTBEAT_SECS)]
    pub heartbeat_secs: u64,

    /// Seconds of silence after which a connection is dropped
    #[arg(long, default_value_t = DEFAULT_IDLE_TIMEOUT_SECS)]
    pub idle_timeout_secs: u64,

    /// Let several connections in one room share a username
    #[arg(long)]
    pub allow_duplicate_usernames: bool,
}

/// Per-connection session settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub mailbox_capacity: usize,
    pub heartbeat_interval: Duration,
    pub idle_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }
}

/// Resolved server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    pub db: Option<PathBuf>,
    pub hub: HubConfig,
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            db: None,
            hub: HubConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl From<ServerArgs> for ServerConfig {
    fn from(args: ServerArgs) -> Self {
        Self {
            addr: args.addr,
            db: args.db,
            hub: HubConfig {
                unique_usernames: !args.allow_duplicate_usernames,
            },
            session: SessionConfig {
                // tokio refuses zero-capacity channels
                mailbox_capacity: args.mailbox_capacity.max(1),
                heartbeat_interval: Duration::from_secs(args.heartbeat_secs.max(1)),
                idle_timeout: Duration::from_secs(args.idle_timeout_secs.max(1)),
            },
        }
    }
}

impl ServerConfig {
    /// Open the configured history store
    pub fn open_store(&self) -> Result<Arc<dyn MessageStore>, PersistError> {
        Ok(match &self.db {
            Some(path) => Arc::new(SqliteStore::open(path)?),
            None => Arc::new(InMemoryStore::new()),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "relay-client")]
#[command(about = "Terminal client for the chat relay", long_about = None)]
pub struct ClientArgs {
    /// HTTP service address, e.g. localhost:5000
    #[arg(short = 'a', long, default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// Username for chat, e.g. aksh
    #[arg(short = 'u', long, default_value = "Newbie")]
    pub user: String,

    /// Room code: 3 to 6 lowercase letters
    #[arg(short = 'r', long, default_value = DEFAULT_ROOM)]
    pub room: String,
}
