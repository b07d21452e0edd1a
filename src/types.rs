//! Basic type definitions for the chat relay
//!
//! Provides newtype wrappers for type safety:
//! - `ClientId`: UUID-based unique connection handle
//! - `RoomCode`: 3 to 6 lowercase ASCII letters
//! - `Username`: non-empty, space-free display name

use uuid::Uuid;

use crate::error::ValidationError;

/// Unique connection handle (newtype pattern)
///
/// Wraps a UUID v4 for type-safe connection identification.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room code (3 to 6 lowercase letters)
///
/// Scopes which connections see a broadcast. Only constructed through
/// [`RoomCode::parse`], so a `RoomCode` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomCode(String);

impl RoomCode {
    pub const MIN_LEN: usize = 3;
    pub const MAX_LEN: usize = 6;

    /// Validate and wrap a room code
    pub fn parse(code: impl Into<String>) -> Result<Self, ValidationError> {
        let code = code.into();
        let len_ok = (Self::MIN_LEN..=Self::MAX_LEN).contains(&code.len());
        if !len_ok || !code.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(ValidationError::InvalidRoomCode(code));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chat display name
///
/// Must be non-empty and must not contain a space; the space rule keeps
/// `>name message` direct addressing unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    pub fn parse(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::EmptyUsername);
        }
        if name.contains(' ') {
            return Err(ValidationError::UsernameContainsSpace);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
