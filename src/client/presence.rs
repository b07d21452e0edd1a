//! The client's own view of who is online.
//!
//! Seeded from `/online-users/{room}` at start-up, then kept current from
//! the join and leave events that arrive on the chat channel.

use crate::directory::DirectoryEntry;
use crate::message::ChatEvent;

#[derive(Debug, Clone, Default)]
pub struct OnlineUsers {
    users: Vec<DirectoryEntry>,
}

impl OnlineUsers {
    pub fn new(initial: Vec<DirectoryEntry>) -> Self {
        let mut view = Self::default();
        for entry in initial {
            view.add(entry);
        }
        view
    }

    /// Update from one incoming event; chat lines are ignored
    pub fn apply(&mut self, event: &ChatEvent) {
        match event {
            ChatEvent::Join(m) => self.add(DirectoryEntry {
                username: m.username.clone(),
                color: m.color,
            }),
            ChatEvent::Leave(m) => self.users.retain(|u| u.username != m.username),
            ChatEvent::Chat(_) => {}
        }
    }

    fn add(&mut self, entry: DirectoryEntry) {
        if entry.username.is_empty() {
            return;
        }
        match self.users.iter_mut().find(|u| u.username == entry.username) {
            Some(existing) => existing.color = entry.color,
            None => self.users.push(entry),
        }
    }

    pub fn users(&self) -> &[DirectoryEntry] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn presence(kind: &str, name: &str) -> ChatEvent {
        let m = Message {
            username: name.to_string(),
            content: String::new(),
            color: 2,
            time: "1:2:3".to_string(),
            to: String::new(),
            room_code: "alpha".to_string(),
        };
        match kind {
            "join" => ChatEvent::Join(m),
            "leave" => ChatEvent::Leave(m),
            _ => ChatEvent::Chat(m),
        }
    }

    #[test]
    fn test_join_and_leave() {
        let mut view = OnlineUsers::new(vec![DirectoryEntry {
            username: "alice".into(),
            color: 1,
        }]);

        view.apply(&presence("join", "bob"));
        view.apply(&presence("chat", "carol"));
        assert_eq!(view.len(), 2);

        view.apply(&presence("leave", "alice"));
        let names: Vec<&str> = view.users().iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["bob"]);
    }

    #[test]
    fn test_repeated_join_does_not_duplicate() {
        let mut view = OnlineUsers::default();
        view.apply(&presence("join", "bob"));
        view.apply(&presence("join", "bob"));
        assert_eq!(view.len(), 1);

        view.apply(&presence("leave", "nobody"));
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn test_empty_names_are_skipped() {
        let view = OnlineUsers::new(vec![DirectoryEntry {
            username: String::new(),
            color: 0,
        }]);
        assert!(view.is_empty());
    }
}
