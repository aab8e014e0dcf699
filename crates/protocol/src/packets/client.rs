//! Client -> Server text commands.

use std::fmt;

/// A command sent by the radar client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    /// Ask for the next snapshot (`requestInfo`).
    RequestInfo,
    /// Liveness ping carrying the client's average round trip in ms (`ping:<ms>`).
    Ping(u32),
    /// Flip the server-side money reveal option (`toggleMoneyReveal`).
    ToggleMoneyReveal,
}

impl ClientCommand {
    /// Parse a text frame received by the server.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "requestInfo" => Some(Self::RequestInfo),
            "toggleMoneyReveal" => Some(Self::ToggleMoneyReveal),
            _ => {
                let ms = text.strip_prefix("ping:")?;
                // Malformed latency still counts as a ping.
                Some(Self::Ping(ms.trim().parse().unwrap_or(0)))
            }
        }
    }
}

impl fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestInfo => f.write_str("requestInfo"),
            Self::Ping(ms) => write!(f, "ping:{ms}"),
            Self::ToggleMoneyReveal => f.write_str("toggleMoneyReveal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_text() {
        assert_eq!(ClientCommand::RequestInfo.to_string(), "requestInfo");
        assert_eq!(ClientCommand::Ping(0).to_string(), "ping:0");
        assert_eq!(ClientCommand::ToggleMoneyReveal.to_string(), "toggleMoneyReveal");
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ClientCommand::parse("requestInfo"), Some(ClientCommand::RequestInfo));
        assert_eq!(ClientCommand::parse("ping:142"), Some(ClientCommand::Ping(142)));
        assert_eq!(ClientCommand::parse("ping:abc"), Some(ClientCommand::Ping(0)));
        assert_eq!(ClientCommand::parse("hello"), None);
    }
}
