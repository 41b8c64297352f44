//! Wire protocol shared by the chat server and its clients.
//!
//! Every datagram is plain UTF-8 text. Control messages are recognised by a fixed,
//! case-sensitive prefix; anything else is an already formatted chat line
//! (`"<name>: <text>"`) that the server relays verbatim.

use rand::Rng;
use std::fmt;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_BUFFER_SIZE: usize = 100;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_FILTER_PATH: &str = "badwords.txt";

pub const JOIN_PREFIX: &str = "[JOIN]";
pub const EXIT_PREFIX: &str = "[EXIT]";
pub const USER_COUNT_PREFIX: &str = "[USER COUNT]";
pub const SYSTEM_PREFIX: &str = "[SYSTEM]";

pub const BLOCKED_NOTICE: &str = "Your message was blocked for inappropriate content.";

const ANIMAL_NAMES: [&str; 12] = [
    "Dog", "Wombat", "Koala", "Sloth", "Cow", "Dolphin", "Raccoon", "Penguin", "Otter",
    "Kangaroo", "Wolf", "Fox",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("datagram is not valid UTF-8 text: {0}")]
    MalformedMessage(#[from] std::str::Utf8Error),

    #[error("invalid user count: {0:?}")]
    InvalidUserCount(String),
}

/// Messages a client sends to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Join { name: String },
    Exit { name: String },
    /// Pre-formatted `"name: text"` line, relayed as-is
    Chat { text: String },
}

impl ClientMessage {
    /// Decodes a datagram received by the server.
    ///
    /// Only undecodable bytes are an error. Text that carries no known prefix
    /// falls through to [`ClientMessage::Chat`].
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let text = decode_text(bytes)?;

        if let Some(name) = text.strip_prefix(JOIN_PREFIX) {
            return Ok(ClientMessage::Join {
                name: name.trim().to_string(),
            });
        }

        if let Some(name) = text.strip_prefix(EXIT_PREFIX) {
            return Ok(ClientMessage::Exit {
                name: name.trim().to_string(),
            });
        }

        Ok(ClientMessage::Chat {
            text: text.to_string(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientMessage::Join { name } => write!(f, "{} {}", JOIN_PREFIX, name),
            ClientMessage::Exit { name } => write!(f, "{}{}", EXIT_PREFIX, name),
            ClientMessage::Chat { text } => f.write_str(text),
        }
    }
}

/// Messages the server sends to clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    UserCount { count: usize },
    System { text: String },
    Chat { text: String },
}

impl ServerMessage {
    pub fn blocked_notice() -> Self {
        ServerMessage::System {
            text: BLOCKED_NOTICE.to_string(),
        }
    }

    /// Decodes a datagram received by a client
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let text = decode_text(bytes)?;

        if let Some(count) = text.strip_prefix(USER_COUNT_PREFIX) {
            let count = count.trim();
            return count
                .parse()
                .map(|count| ServerMessage::UserCount { count })
                .map_err(|_| ProtocolError::InvalidUserCount(count.to_string()));
        }

        if let Some(notice) = text.strip_prefix(SYSTEM_PREFIX) {
            return Ok(ServerMessage::System {
                text: notice.trim().to_string(),
            });
        }

        Ok(ServerMessage::Chat {
            text: text.to_string(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::UserCount { count } => write!(f, "{}{}", USER_COUNT_PREFIX, count),
            ServerMessage::System { text } => write!(f, "{} {}", SYSTEM_PREFIX, text),
            ServerMessage::Chat { text } => f.write_str(text),
        }
    }
}

/// Interprets raw datagram bytes as text and strips surrounding whitespace.
///
/// Everything up to and including U+0020 is trimmed along with Unicode
/// whitespace, so NUL padding from a fixed-size receive buffer never reaches the
/// prefix matching. A multi-byte character cut off by the end of the buffer is
/// dropped; invalid bytes anywhere else are an error.
pub fn decode_text(bytes: &[u8]) -> Result<&str, ProtocolError> {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) if e.error_len().is_none() => std::str::from_utf8(&bytes[..e.valid_up_to()])?,
        Err(e) => return Err(e.into()),
    };
    Ok(text.trim_matches(|c: char| c <= ' ' || c.is_whitespace()))
}

/// Formats a chat line the way the server expects to relay it
pub fn format_chat(name: &str, text: &str) -> String {
    format!("{}: {}", name, text)
}

/// Colons would make the `"name: text"` framing ambiguous
pub fn sanitize_display_name(name: &str) -> String {
    name.trim().replace(':', "_")
}

/// Picks the name a client chats under.
///
/// A non-empty requested name is sanitized; otherwise a random animal name
/// with a number in `0..100` is generated.
pub fn resolve_display_name<R: Rng + ?Sized>(requested: &str, rng: &mut R) -> String {
    let sanitized = sanitize_display_name(requested);
    if !sanitized.is_empty() {
        return sanitized;
    }

    let animal = ANIMAL_NAMES[rng.gen_range(0..ANIMAL_NAMES.len())];
    format!("{}{}", animal, rng.gen_range(0..100))
}
