//! Parsing of lines typed at the client prompt.

/// What a typed line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Nothing to send
    Empty,
    /// `/users`: list who is online
    Users,
    /// `/quit`: leave like Ctrl+C does
    Quit,
    /// A chat line; `to` is empty for a broadcast
    Message { to: String, content: String },
}

/// Interpret one line of user input.
///
/// `>bob see you at 5` is a direct message to `bob`; anything else that
/// is not a command is a broadcast.
pub fn parse_input(line: &str) -> Input {
    let line = line.trim_end_matches(['\r', '\n']);
    match line.trim() {
        "" => return Input::Empty,
        "/users" => return Input::Users,
        "/quit" => return Input::Quit,
        _ => {}
    }

    if line.len() > 2 && line.starts_with('>') {
        let mut parts = line[1..].split(' ');
        let to = parts.next().unwrap_or_default().to_string();
        let content = parts.collect::<Vec<_>>().join(" ");
        return Input::Message { to, content };
    }

    Input::Message {
        to: String::new(),
        content: line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &str, content: &str) -> Input {
        Input::Message {
            to: to.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_broadcast() {
        assert_eq!(parse_input("hello all\n"), message("", "hello all"));
    }

    #[test]
    fn test_direct_message() {
        assert_eq!(parse_input(">bob see you at 5"), message("bob", "see you at 5"));
        assert_eq!(parse_input(">bob"), message("bob", ""));
    }

    #[test]
    fn test_short_arrow_is_broadcast() {
        assert_eq!(parse_input(">b"), message("", ">b"));
    }

    #[test]
    fn test_commands() {
        assert_eq!(parse_input(""), Input::Empty);
        assert_eq!(parse_input("   \r\n"), Input::Empty);
        assert_eq!(parse_input("/users"), Input::Users);
        assert_eq!(parse_input("/quit\n"), Input::Quit);
    }
}
