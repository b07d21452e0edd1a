//! Message history storage
//!
//! The hub appends every routed event here before fanning it out, and the
//! `/chat/{room}` endpoint reads it back. Calls are synchronous: the hub
//! loop waits for each append to finish, which is what keeps history in
//! the same order as delivery.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};
use tracing::info;

use crate::error::PersistError;
use crate::message::{ChatEvent, Message};

/// Append/query store for routed events
pub trait MessageStore: Send + Sync {
    /// Persist one event
    fn append(&self, event: &ChatEvent) -> Result<(), PersistError>;

    /// Every event of `room_code`, oldest first
    fn history(&self, room_code: &str) -> Result<Vec<ChatEvent>, PersistError>;
}

/// Process-local history, lost on restart
#[derive(Debug, Default)]
pub struct InMemoryStore {
    events: Mutex<Vec<ChatEvent>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageStore for InMemoryStore {
    fn append(&self, event: &ChatEvent) -> Result<(), PersistError> {
        let mut events = self.events.lock().map_err(|_| PersistError::Poisoned)?;
        events.push(event.clone());
        Ok(())
    }

    fn history(&self, room_code: &str) -> Result<Vec<ChatEvent>, PersistError> {
        let events = self.events.lock().map_err(|_| PersistError::Poisoned)?;
        Ok(events
            .iter()
            .filter(|e| e.message().room_code == room_code)
            .cloned()
            .collect())
    }
}

/// SQLite-backed history
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let store = Self::with_connection(conn)?;
        info!("Message history stored in {}", path.display());
        Ok(store)
    }

    /// Private database that disappears with the store
    pub fn open_in_memory() -> Result<Self, PersistError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, PersistError> {
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn initialize_schema(conn: &Connection) -> Result<(), PersistError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            username TEXT NOT NULL,
            content TEXT NOT NULL,
            color INTEGER NOT NULL,
            time TEXT NOT NULL,
            recipient TEXT NOT NULL,
            room_code TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_messages_room ON messages(room_code, id)",
        [],
    )?;
    Ok(())
}

impl MessageStore for SqliteStore {
    fn append(&self, event: &ChatEvent) -> Result<(), PersistError> {
        let conn = self.conn.lock().map_err(|_| PersistError::Poisoned)?;
        let m = event.message();
        conn.execute(
            "INSERT INTO messages (kind, username, content, color, time, recipient, room_code)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.kind(),
                m.username,
                m.content,
                m.color,
                m.time,
                m.to,
                m.room_code
            ],
        )?;
        Ok(())
    }

    fn history(&self, room_code: &str) -> Result<Vec<ChatEvent>, PersistError> {
        let conn = self.conn.lock().map_err(|_| PersistError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT kind, username, content, color, time, recipient, room_code
             FROM messages WHERE room_code = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![room_code], |row| {
            let kind: String = row.get(0)?;
            let message = Message {
                username: row.get(1)?,
                content: row.get(2)?,
                color: row.get(3)?,
                time: row.get(4)?,
                to: row.get(5)?,
                room_code: row.get(6)?,
            };
            Ok(match kind.as_str() {
                "join" => ChatEvent::Join(message),
                "leave" => ChatEvent::Leave(message),
                _ => ChatEvent::Chat(message),
            })
        })?;
        let events = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: &str, user: &str, content: &str, to: &str, room: &str) -> ChatEvent {
        let message = Message {
            username: user.to_string(),
            content: content.to_string(),
            color: 12,
            time: "14:3:7".to_string(),
            to: to.to_string(),
            room_code: room.to_string(),
        };
        match kind {
            "join" => ChatEvent::Join(message),
            "leave" => ChatEvent::Leave(message),
            _ => ChatEvent::Chat(message),
        }
    }

    fn check_history(store: &dyn MessageStore) {
        let stored = vec![
            event("join", "alice", "alice joined the chat!", "", "alpha"),
            event("chat", "alice", "hi", "", "alpha"),
            event("chat", "bob", "elsewhere", "", "beta"),
            event("chat", "alice", "secret", "bob", "alpha"),
            event("leave", "alice", "alice left the chat!", "", "alpha"),
        ];
        for e in &stored {
            store.append(e).unwrap();
        }

        let alpha = store.history("alpha").unwrap();
        let expected: Vec<ChatEvent> = stored
            .iter()
            .filter(|e| e.message().room_code == "alpha")
            .cloned()
            .collect();
        assert_eq!(alpha, expected);

        assert_eq!(store.history("beta").unwrap().len(), 1);
        assert!(store.history("gamma").unwrap().is_empty());
    }

    #[test]
    fn test_in_memory_history() {
        check_history(&InMemoryStore::new());
    }

    #[test]
    fn test_sqlite_history() {
        check_history(&SqliteStore::open_in_memory().unwrap());
    }
}
