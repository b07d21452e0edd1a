//! Terminal rendering of chat events.

use colored::Colorize;
use rand::Rng;

use crate::directory::DirectoryEntry;
use crate::message::ChatEvent;

/// Name colors; a message's `color` indexes into this table
pub const PALETTE: [(u8, u8, u8); 12] = [
    (230, 25, 75),
    (60, 180, 75),
    (255, 225, 25),
    (67, 99, 216),
    (245, 130, 49),
    (145, 30, 180),
    (66, 212, 244),
    (240, 50, 230),
    (191, 239, 69),
    (250, 190, 212),
    (70, 153, 144),
    (220, 190, 255),
];

/// Pick a color for this session
pub fn random_color() -> i32 {
    rand::thread_rng().gen_range(0..PALETTE.len() as i32)
}

fn rgb(color: i32) -> (u8, u8, u8) {
    PALETTE[color.rem_euclid(PALETTE.len() as i32) as usize]
}

/// Formats events for the user running this client
#[derive(Debug, Clone)]
pub struct Renderer {
    me: String,
}

impl Renderer {
    pub fn new(me: impl Into<String>) -> Self {
        Self { me: me.into() }
    }

    /// One display line, or `None` for events with nothing to show
    pub fn render(&self, event: &ChatEvent) -> Option<String> {
        let m = event.message();
        if m.content.is_empty() {
            return None;
        }
        let time = m.time.bright_black();

        if event.is_presence() {
            return Some(format!("{} {}", time, m.content.italic()));
        }

        let mut name = m.username.clone();
        if m.is_direct() {
            if m.username == self.me {
                name = format!("{}({})", name, m.to);
            } else {
                name.push_str("(private)");
            }
        }

        let (r, g, b) = rgb(m.color);
        let name = if m.username == self.me {
            name.black().on_truecolor(r, g, b)
        } else {
            name.truecolor(r, g, b).bold()
        };
        Some(format!("{} {}: {}", time, name, m.content))
    }

    /// Listing for the `/users` command
    pub fn render_users<'a, I>(&self, users: I) -> String
    where
        I: IntoIterator<Item = &'a DirectoryEntry>,
    {
        let names: Vec<String> = users
            .into_iter()
            .map(|u| {
                let (r, g, b) = rgb(u.color);
                if u.username == self.me {
                    format!("{} (me)", u.username.truecolor(r, g, b))
                } else {
                    u.username.truecolor(r, g, b).to_string()
                }
            })
            .collect();
        if names.is_empty() {
            "*** nobody online".to_string()
        } else {
            format!("*** online: {}", names.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn plain() {
        colored::control::set_override(false);
    }

    fn msg(from: &str, to: &str, content: &str) -> Message {
        Message {
            username: from.to_string(),
            content: content.to_string(),
            color: 30,
            time: "9:5:0".to_string(),
            to: to.to_string(),
            room_code: "alpha".to_string(),
        }
    }

    #[test]
    fn test_broadcast_line() {
        plain();
        let r = Renderer::new("me");
        let line = r.render(&ChatEvent::Chat(msg("bob", "", "hi"))).unwrap();
        assert_eq!(line, "9:5:0 bob: hi");
    }

    #[test]
    fn test_direct_lines() {
        plain();
        let r = Renderer::new("me");
        let sent = r.render(&ChatEvent::Chat(msg("me", "bob", "psst"))).unwrap();
        assert_eq!(sent, "9:5:0 me(bob): psst");
        let received = r.render(&ChatEvent::Chat(msg("bob", "me", "psst"))).unwrap();
        assert_eq!(received, "9:5:0 bob(private): psst");
    }

    #[test]
    fn test_presence_and_empty() {
        plain();
        let r = Renderer::new("me");
        let join = r
            .render(&ChatEvent::Join(msg("bob", "", "bob joined the chat!")))
            .unwrap();
        assert_eq!(join, "9:5:0 bob joined the chat!");
        assert!(r.render(&ChatEvent::Chat(msg("bob", "", ""))).is_none());
    }

    #[test]
    fn test_users_listing() {
        plain();
        let r = Renderer::new("me");
        let users = vec![
            DirectoryEntry { username: "me".into(), color: 1 },
            DirectoryEntry { username: "bob".into(), color: 2 },
        ];
        assert_eq!(r.render_users(&users), "*** online: me (me), bob");
        assert_eq!(r.render_users(&Vec::new()), "*** nobody online");
    }

    #[test]
    fn test_palette_wraps() {
        assert_eq!(rgb(0), rgb(12));
        assert_eq!(rgb(-1), rgb(11));
        let c = random_color();
        assert!((0..12).contains(&c));
    }
}
