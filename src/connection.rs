//! Connection struct definition
//!
//! Represents one registered peer as the hub sees it: identity, room,
//! and the sending half of its bounded mailbox.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::directory::DirectoryEntry;
use crate::error::DeliveryError;
use crate::types::{ClientId, RoomCode, Username};

/// An encoded text frame, shared between every mailbox it is fanned out to
pub type Frame = Arc<str>;

/// Create a bounded mailbox
///
/// The sender goes into the [`Connection`] handed to the hub; the receiver
/// belongs to the connection's outbound pump.
pub fn mailbox(capacity: usize) -> (mpsc::Sender<Frame>, mpsc::Receiver<Frame>) {
    mpsc::channel(capacity)
}

/// Registered peer
///
/// The hub holds the only sender of the mailbox, so dropping a
/// `Connection` closes the mailbox and lets the outbound pump finish.
#[derive(Debug)]
pub struct Connection {
    /// Unique handle for this connection
    pub id: ClientId,
    pub username: Username,
    pub color: i32,
    pub room_code: RoomCode,
    mailbox: mpsc::Sender<Frame>,
}

impl Connection {
    pub fn new(
        id: ClientId,
        username: Username,
        color: i32,
        room_code: RoomCode,
        mailbox: mpsc::Sender<Frame>,
    ) -> Self {
        Self {
            id,
            username,
            color,
            room_code,
            mailbox,
        }
    }

    /// Queue a frame without waiting; a full mailbox is an error
    pub fn try_deliver(&self, frame: Frame) -> Result<(), DeliveryError> {
        self.mailbox.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::MailboxFull,
            TrySendError::Closed(_) => DeliveryError::MailboxClosed,
        })
    }

    pub fn in_room(&self, room_code: &RoomCode) -> bool {
        &self.room_code == room_code
    }

    pub fn directory_entry(&self) -> DirectoryEntry {
        DirectoryEntry {
            username: self.username.to_string(),
            color: self.color,
        }
    }
}

/// Lifecycle of a connection as seen by its session task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Active,
    Draining,
    Closed,
}

/// Things that move a connection through its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    HandshakeCompleted,
    /// Read error, close frame, idle timeout, write error or interrupt
    Disconnected,
    /// Mailbox closed and socket shut down
    Drained,
}

impl ConnectionState {
    /// Apply an event. Events that do not apply in the current state leave
    /// it unchanged, and `Closed` is terminal.
    pub fn transition(self, event: ConnectionEvent) -> Self {
        use ConnectionEvent::*;
        use ConnectionState::*;

        match (self, event) {
            (Connecting, HandshakeCompleted) => Active,
            (Connecting | Active, Disconnected) => Draining,
            (Draining, Drained) => Closed,
            (state, _) => state,
        }
    }

    pub fn is_closed(self) -> bool {
        self == ConnectionState::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(capacity: usize) -> (Connection, mpsc::Receiver<Frame>) {
        let (tx, rx) = mailbox(capacity);
        let conn = Connection::new(
            ClientId::new(),
            Username::parse("alice").unwrap(),
            7,
            RoomCode::parse("alpha").unwrap(),
            tx,
        );
        (conn, rx)
    }

    #[tokio::test]
    async fn test_try_deliver_reports_full_mailbox() {
        let (conn, mut rx) = connection(1);

        assert_eq!(conn.try_deliver(Frame::from("one")), Ok(()));
        assert_eq!(
            conn.try_deliver(Frame::from("two")),
            Err(DeliveryError::MailboxFull)
        );
        assert_eq!(rx.recv().await.as_deref(), Some("one"));
    }

    #[tokio::test]
    async fn test_try_deliver_reports_closed_mailbox() {
        let (conn, rx) = connection(4);
        drop(rx);
        assert_eq!(
            conn.try_deliver(Frame::from("one")),
            Err(DeliveryError::MailboxClosed)
        );
    }

    #[tokio::test]
    async fn test_dropping_connection_closes_mailbox() {
        let (conn, mut rx) = connection(4);
        conn.try_deliver(Frame::from("last")).unwrap();
        drop(conn);

        assert_eq!(rx.recv().await.as_deref(), Some("last"));
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_directory_entry() {
        let (conn, _rx) = connection(1);
        let entry = conn.directory_entry();
        assert_eq!(entry.username, "alice");
        assert_eq!(entry.color, 7);
    }

    #[test]
    fn test_state_machine_happy_path() {
        let state = ConnectionState::Connecting
            .transition(ConnectionEvent::HandshakeCompleted)
            .transition(ConnectionEvent::Disconnected)
            .transition(ConnectionEvent::Drained);
        assert!(state.is_closed());
    }

    #[test]
    fn test_state_machine_closed_is_terminal() {
        let closed = ConnectionState::Closed;
        for event in [
            ConnectionEvent::HandshakeCompleted,
            ConnectionEvent::Disconnected,
            ConnectionEvent::Drained,
        ] {
            assert_eq!(closed.transition(event), ConnectionState::Closed);
        }
    }

    #[test]
    fn test_state_machine_ignores_out_of_order_events() {
        assert_eq!(
            ConnectionState::Active.transition(ConnectionEvent::Drained),
            ConnectionState::Active
        );
        assert_eq!(
            ConnectionState::Draining.transition(ConnectionEvent::HandshakeCompleted),
            ConnectionState::Draining
        );
        assert_eq!(
            ConnectionState::Connecting.transition(ConnectionEvent::Disconnected),
            ConnectionState::Draining
        );
    }
}
