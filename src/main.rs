//! Chat relay server - Entry Point
//!
//! Starts the Hub actor and the HTTP/WebSocket listener.
//!
//! ```not_rust
//! chat_relay --addr localhost:5000 --db chat.sqlite3
//! ```

use clap::Parser;
use tracing::error;

use chat_relay::config::{ServerArgs, ServerConfig};
use chat_relay::logger::setup_logger;
use chat_relay::run_server;

#[tokio::main]
async fn main() {
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_relay=trace
    setup_logger("chat_relay=info,tower_http=info");

    let config = ServerConfig::from(ServerArgs::parse());

    if let Err(e) = run_server(config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
