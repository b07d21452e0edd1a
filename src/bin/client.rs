//! Terminal chat client - Entry Point
//!
//! ```not_rust
//! relay-client --addr localhost:8080 --user aksh --room private
//! ```
//!
//! Type a line to talk to the room, `>name message` to talk to one
//! person, `/users` to see who is online. Ctrl+C or `/quit` leaves.

use clap::Parser;

use chat_relay::client::run_client;
use chat_relay::config::ClientArgs;
use chat_relay::logger::setup_logger;

#[tokio::main]
async fn main() {
    setup_logger("warn");

    let args = ClientArgs::parse();

    if let Err(e) = run_client(args).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
