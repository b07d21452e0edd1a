//! Terminal chat client.

pub mod api;
pub mod input;
pub mod presence;
pub mod render;
mod session;

pub use api::RelayApi;
pub use session::run_client;
