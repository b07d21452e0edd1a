//! Error types for the chat relay
//!
//! Defines application-level errors plus the narrower errors each
//! component reports. Uses thiserror for ergonomic error definitions.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::types::ClientId;

/// Application-level errors
///
/// Covers process setup failures and the failures an HTTP handler
/// turns into a status code.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad username or room code in a request
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Hub refused the registration
    #[error(transparent)]
    Register(#[from] RegisterError),

    /// History store failure
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// The hub task has stopped and no longer accepts commands
    #[error("Hub is not running")]
    HubClosed,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Register(RegisterError::UsernameTaken { .. }) => StatusCode::CONFLICT,
            AppError::HubClosed => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Io(_) | AppError::Persist(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Username / room code validation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("username must not be empty")]
    EmptyUsername,

    #[error("username must not contain any space")]
    UsernameContainsSpace,

    #[error("username already taken!")]
    UsernameTaken,

    #[error("room code must be 3 to 6 lowercase letters (a-z), got '{0}'")]
    InvalidRoomCode(String),
}

/// Registration failures reported by the hub
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("username '{username}' is already active in room '{room_code}'")]
    UsernameTaken { username: String, room_code: String },
}

/// Payload rejected by the hub before fan-out
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("payload has an empty roomCode")]
    MissingRoom,

    #[error("client {0} is not registered")]
    UnknownSender(ClientId),
}

/// Message history store failures
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Non-blocking mailbox delivery failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Mailbox at capacity: the reader is too slow
    #[error("mailbox full")]
    MailboxFull,

    /// The receiving end of the mailbox has been dropped
    #[error("mailbox closed")]
    MailboxClosed,
}

/// Terminal client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid server address {0}")]
    InvalidAddress(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
