//! Relay command definitions

/// A single client command line.
///
/// Argument lines (username and password for LOGIN, receiver/subject/body
/// for SEND, the message number for READ and DEL) are not part of the
/// command line itself; the session reads them separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// LOGIN - authenticate; reads username and password lines
    Login,
    /// SEND - store a message; reads receiver, subject, then body lines
    /// until a lone `.`
    Send,
    /// LIST - subjects in the current user's mailbox
    List,
    /// READ - full message by number
    Read,
    /// DEL - delete a message by number
    Del,
    /// QUIT - end the session
    Quit,
    /// Anything else
    Unknown(String),
}

impl Command {
    /// Parse a command line. Tokens are matched exactly; there is no
    /// case folding.
    pub fn parse(line: &str) -> Command {
        match line {
            "LOGIN" => Command::Login,
            "SEND" => Command::Send,
            "LIST" => Command::List,
            "READ" => Command::Read,
            "DEL" => Command::Del,
            "QUIT" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_commands() {
        assert_eq!(Command::parse("LOGIN"), Command::Login);
        assert_eq!(Command::parse("SEND"), Command::Send);
        assert_eq!(Command::parse("LIST"), Command::List);
        assert_eq!(Command::parse("READ"), Command::Read);
        assert_eq!(Command::parse("DEL"), Command::Del);
        assert_eq!(Command::parse("QUIT"), Command::Quit);
    }

    #[test]
    fn test_parse_unknown_commands() {
        assert_eq!(
            Command::parse("NOOP"),
            Command::Unknown("NOOP".to_string())
        );
        // No case folding, no trimming of embedded arguments.
        assert_eq!(
            Command::parse("login"),
            Command::Unknown("login".to_string())
        );
        assert_eq!(
            Command::parse("LIST "),
            Command::Unknown("LIST ".to_string())
        );
        assert_eq!(Command::parse(""), Command::Unknown(String::new()));
    }
}
