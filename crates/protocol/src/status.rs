//! Serde model of the status response document.
//!
//! Servers answer a status request with a JSON document describing the
//! running game: version, player counts, a message of the day, and an
//! optional favicon. The message of the day ("description") is either a
//! plain string or a chat-component tree; [`StatusResponse::motd`] flattens
//! whichever form arrived and strips legacy `§x` formatting codes.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The decoded status document a server returns to a status request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Game version the server reports.
    #[serde(default)]
    pub version: Version,

    /// Player occupancy.
    #[serde(default)]
    pub players: Players,

    /// Message of the day, as a string or a chat-component tree.
    #[serde(default)]
    pub description: Chat,

    /// Base64 PNG icon, when the server ships one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

impl StatusResponse {
    /// Parse a status document from its JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The message of the day as plain text: flattened across chat
    /// components and with `§x` formatting codes removed.
    pub fn motd(&self) -> String {
        strip_formatting(&self.description.flatten())
    }
}

/// Version block of a status document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Version {
    /// Human-readable version, e.g. `"Paper 1.21.4"`.
    #[serde(default)]
    pub name: String,

    /// Numeric protocol version.
    #[serde(default)]
    pub protocol: i32,
}

/// Player occupancy block of a status document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Players {
    /// Players currently connected.
    #[serde(default)]
    pub online: u32,

    /// Connection capacity.
    #[serde(default)]
    pub max: u32,

    /// A sample of connected players, when the server discloses one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<Vec<PlayerSample>>,
}

/// One entry of the player sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSample {
    /// Player name.
    pub name: String,
    /// Player UUID in string form.
    pub id: String,
}

/// A chat value: either a bare string or a component carrying text plus
/// nested children. Components also carry styling keys (color, bold, ...)
/// which the codec ignores.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Chat {
    /// Plain string form.
    Plain(String),
    /// Component-object form.
    Component(ChatComponent),
}

impl Chat {
    /// Concatenates this value's text with all nested children, in order.
    pub fn flatten(&self) -> String {
        match self {
            Chat::Plain(text) => text.clone(),
            Chat::Component(component) => {
                let mut out = component.text.clone();
                for child in &component.extra {
                    out.push_str(&child.flatten());
                }
                out
            }
        }
    }
}

impl Default for Chat {
    fn default() -> Self {
        Chat::Plain(String::new())
    }
}

/// Object form of a chat value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatComponent {
    /// Text carried directly by this component.
    #[serde(default)]
    pub text: String,

    /// Child components appended after `text`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<Chat>,
}

/// Removes legacy `§x` formatting codes: each `§` and the character
/// immediately following it are dropped.
pub fn strip_formatting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '§' {
            chars.next();
        } else {
            out.push(ch);
        }
    }
    out
}
