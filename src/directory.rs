//! Room directory
//!
//! Presence listings derived from the hub's active set. Nothing here is
//! stored: each query is recomputed from the connections it is given,
//! which the hub only does from inside its own loop.

use serde::{Deserialize, Serialize};

use crate::connection::Connection;
use crate::types::RoomCode;

/// One online user, as listed by `GET /online-users/{room}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub username: String,
    pub color: i32,
}

/// Users currently connected to `room_code`, sorted by username.
pub fn snapshot<'a, I>(connections: I, room_code: &RoomCode) -> Vec<DirectoryEntry>
where
    I: IntoIterator<Item = &'a Connection>,
{
    let mut entries: Vec<DirectoryEntry> = connections
        .into_iter()
        .filter(|c| c.in_room(room_code))
        .map(Connection::directory_entry)
        .collect();
    entries.sort_by(|a, b| a.username.cmp(&b.username));
    entries
}

/// True when nobody in `room_code` currently uses `username`.
///
/// Point-in-time answer only; it reserves nothing.
pub fn is_available<'a, I>(connections: I, room_code: &RoomCode, username: &str) -> bool
where
    I: IntoIterator<Item = &'a Connection>,
{
    !connections
        .into_iter()
        .any(|c| c.in_room(room_code) && c.username.as_str() == username)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::mailbox;
    use crate::types::{ClientId, Username};

    fn conn(name: &str, color: i32, room: &str) -> Connection {
        let (tx, _rx) = mailbox(1);
        Connection::new(
            ClientId::new(),
            Username::parse(name).unwrap(),
            color,
            RoomCode::parse(room).unwrap(),
            tx,
        )
    }

    #[test]
    fn test_snapshot_filters_by_room() {
        let conns = vec![
            conn("carol", 3, "alpha"),
            conn("alice", 1, "alpha"),
            conn("bob", 2, "beta"),
        ];
        let alpha = RoomCode::parse("alpha").unwrap();

        let entries = snapshot(&conns, &alpha);
        assert_eq!(
            entries,
            vec![
                DirectoryEntry { username: "alice".into(), color: 1 },
                DirectoryEntry { username: "carol".into(), color: 3 },
            ]
        );
    }

    #[test]
    fn test_snapshot_of_empty_room() {
        let conns = vec![conn("alice", 1, "alpha")];
        let gamma = RoomCode::parse("gamma").unwrap();
        assert!(snapshot(&conns, &gamma).is_empty());
    }

    #[test]
    fn test_availability_is_per_room() {
        let conns = vec![conn("alice", 1, "alpha")];
        let alpha = RoomCode::parse("alpha").unwrap();
        let beta = RoomCode::parse("beta").unwrap();

        assert!(!is_available(&conns, &alpha, "alice"));
        assert!(is_available(&conns, &alpha, "bob"));
        assert!(is_available(&conns, &beta, "alice"));
    }
}
