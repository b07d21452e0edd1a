//! Message protocol definitions
//!
//! JSON text frames exchanged over the relay. Every frame is a chat
//! [`Message`] plus a `type` tag saying whether it is a join, a leave or
//! an ordinary chat line. Frames without a tag are still accepted from
//! older clients that mark presence with a " y" / " x" username prefix.

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::error::RouteError;
use crate::types::{RoomCode, Username};

const LEGACY_JOIN_PREFIX: &str = " y";
const LEGACY_LEAVE_PREFIX: &str = " x";

/// A chat line as it travels on the wire and sits in history.
///
/// `to` is empty for a room-wide broadcast; otherwise it names the one
/// recipient who, together with the sender, may see the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub username: String,
    pub content: String,
    pub color: i32,
    pub time: String,
    #[serde(default)]
    pub to: String,
    #[serde(rename = "roomCode")]
    pub room_code: String,
}

impl Message {
    /// Build a message stamped with the current local time
    pub fn new(
        username: impl Into<String>,
        content: impl Into<String>,
        color: i32,
        to: impl Into<String>,
        room_code: &RoomCode,
    ) -> Self {
        Self {
            username: username.into(),
            content: content.into(),
            color,
            time: clock_time(&chrono::Local::now()),
            to: to.into(),
            room_code: room_code.to_string(),
        }
    }

    pub fn is_direct(&self) -> bool {
        !self.to.is_empty()
    }

    /// Delivery predicate: same room, and either a broadcast or a direct
    /// message where the reader is the recipient or the sender.
    pub fn is_visible_to(&self, room_code: &str, username: &str) -> bool {
        self.room_code == room_code
            && (self.to.is_empty() || self.to == username || self.username == username)
    }
}

/// Format a wall-clock time as `H:M:S` without zero padding (`9:5:0`).
pub fn clock_time<T: Timelike>(t: &T) -> String {
    format!("{}:{}:{}", t.hour(), t.minute(), t.second())
}

/// One frame on the chat channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A user entered the room
    Join(Message),
    /// A user left the room
    Leave(Message),
    /// Ordinary chat line, broadcast or direct
    Chat(Message),
}

impl ChatEvent {
    pub fn join(username: &Username, color: i32, room_code: &RoomCode) -> Self {
        let content = format!("{} joined the chat!", username);
        Self::Join(Message::new(username.as_str(), content, color, "", room_code))
    }

    pub fn leave(username: &Username, color: i32, room_code: &RoomCode) -> Self {
        let content = format!("{} left the chat!", username);
        Self::Leave(Message::new(username.as_str(), content, color, "", room_code))
    }

    pub fn chat(message: Message) -> Self {
        Self::Chat(message)
    }

    pub fn message(&self) -> &Message {
        match self {
            Self::Join(m) | Self::Leave(m) | Self::Chat(m) => m,
        }
    }

    pub fn message_mut(&mut self) -> &mut Message {
        match self {
            Self::Join(m) | Self::Leave(m) | Self::Chat(m) => m,
        }
    }

    /// Wire tag of this event
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::Leave(_) => "leave",
            Self::Chat(_) => "chat",
        }
    }

    pub fn is_presence(&self) -> bool {
        !matches!(self, Self::Chat(_))
    }

    /// Decode a text frame.
    ///
    /// Tagged frames must carry a known `type`. Untagged frames are read
    /// as a bare message and classified by the legacy username prefix,
    /// which is stripped.
    pub fn decode(raw: &str) -> Result<Self, RouteError> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        let event = if value.get("type").is_some() {
            serde_json::from_value(value)?
        } else {
            Self::from_legacy(serde_json::from_value(value)?)
        };
        if event.message().room_code.is_empty() {
            return Err(RouteError::MissingRoom);
        }
        Ok(event)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    fn from_legacy(mut message: Message) -> Self {
        if let Some(name) = message.username.strip_prefix(LEGACY_JOIN_PREFIX) {
            message.username = name.to_string();
            Self::Join(message)
        } else if let Some(name) = message.username.strip_prefix(LEGACY_LEAVE_PREFIX) {
            message.username = name.to_string();
            Self::Leave(message)
        } else {
            Self::Chat(message)
        }
    }
}

/// Body of `POST /valid-username/{room}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsernameCheck {
    pub username: String,
}

/// Answer of `POST /valid-username/{room}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsernameValidity {
    pub valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(username: &str, to: &str, room: &str) -> Message {
        Message {
            username: username.to_string(),
            content: "hi".to_string(),
            color: 4,
            time: "9:5:0".to_string(),
            to: to.to_string(),
            room_code: room.to_string(),
        }
    }

    #[test]
    fn test_message_field_names() {
        let json = serde_json::to_value(sample("alice", "", "alpha")).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        for key in ["username", "content", "color", "time", "to", "roomCode"] {
            assert!(keys.contains(&key), "missing {key}");
        }
        assert_eq!(keys.len(), 6);
    }

    #[test]
    fn test_chat_event_tag() {
        let event = ChatEvent::chat(sample("alice", "bob", "alpha"));
        let json = event.encode().unwrap();
        assert!(json.contains("\"type\":\"chat\""));
        assert!(json.contains("\"roomCode\":\"alpha\""));
        assert!(json.contains("\"to\":\"bob\""));
        assert_eq!(ChatEvent::decode(&json).unwrap(), event);
    }

    #[test]
    fn test_decode_legacy_presence_prefix() {
        let join = serde_json::to_string(&sample(" yalice", "", "alpha")).unwrap();
        match ChatEvent::decode(&join).unwrap() {
            ChatEvent::Join(m) => assert_eq!(m.username, "alice"),
            other => panic!("expected join, got {other:?}"),
        }

        let leave = serde_json::to_string(&sample(" xalice", "", "alpha")).unwrap();
        match ChatEvent::decode(&leave).unwrap() {
            ChatEvent::Leave(m) => assert_eq!(m.username, "alice"),
            other => panic!("expected leave, got {other:?}"),
        }

        let chat = serde_json::to_string(&sample("alice", "", "alpha")).unwrap();
        assert!(matches!(ChatEvent::decode(&chat).unwrap(), ChatEvent::Chat(_)));
    }

    #[test]
    fn test_decode_rejects_bad_frames() {
        assert!(matches!(
            ChatEvent::decode("not json"),
            Err(RouteError::Decode(_))
        ));
        assert!(matches!(
            ChatEvent::decode(r#"{"type":"shout","username":"a"}"#),
            Err(RouteError::Decode(_))
        ));
        let no_room = serde_json::to_string(&sample("alice", "", "")).unwrap();
        assert!(matches!(
            ChatEvent::decode(&no_room),
            Err(RouteError::MissingRoom)
        ));
    }

    #[test]
    fn test_missing_to_means_broadcast() {
        let raw = r#"{"username":"a","content":"c","color":1,"time":"1:2:3","roomCode":"abc"}"#;
        let event = ChatEvent::decode(raw).unwrap();
        assert!(!event.message().is_direct());
    }

    #[test]
    fn test_visibility() {
        let broadcast = sample("alice", "", "alpha");
        assert!(broadcast.is_visible_to("alpha", "alice"));
        assert!(broadcast.is_visible_to("alpha", "carol"));
        assert!(!broadcast.is_visible_to("beta", "carol"));

        let direct = sample("alice", "bob", "alpha");
        assert!(direct.is_visible_to("alpha", "alice"));
        assert!(direct.is_visible_to("alpha", "bob"));
        assert!(!direct.is_visible_to("alpha", "carol"));
        assert!(!direct.is_visible_to("beta", "bob"));
    }

    #[test]
    fn test_clock_time_not_padded() {
        let t = chrono::NaiveTime::from_hms_opt(9, 5, 0).unwrap();
        assert_eq!(clock_time(&t), "9:5:0");
        let t = chrono::NaiveTime::from_hms_opt(23, 59, 59).unwrap();
        assert_eq!(clock_time(&t), "23:59:59");
    }

    #[test]
    fn test_presence_constructors() {
        let name = Username::parse("alice").unwrap();
        let room = RoomCode::parse("alpha").unwrap();
        let join = ChatEvent::join(&name, 3, &room);
        assert_eq!(join.kind(), "join");
        assert_eq!(join.message().content, "alice joined the chat!");
        assert_eq!(join.message().room_code, "alpha");
        let leave = ChatEvent::leave(&name, 3, &room);
        assert!(leave.is_presence());
        assert_eq!(leave.message().content, "alice left the chat!");
    }
}
