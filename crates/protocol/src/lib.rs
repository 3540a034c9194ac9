//! # Deckhand Protocol
//!
//! Pure wire codec for the status query protocol spoken by Minecraft-family
//! game servers (the "server list ping"). The daemon's status probe is the
//! consumer; this crate never opens a socket and has no async dependency.
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |  status    StatusResponse model, MOTD flattening and cleanup  |
//! +---------------------------------------------------------------+
//! |  packet    VarInt-framed packets: handshake, status, ping     |
//! +---------------------------------------------------------------+
//! |  varint    7-bits-per-byte integer encoding                   |
//! +---------------------------------------------------------------+
//! |  error     ProtocolError / Result                             |
//! +---------------------------------------------------------------+
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::packet::{handshake, status_request};
//! use protocol::status::StatusResponse;
//!
//! // Bytes that open a status exchange with a server.
//! let mut opening = handshake("play.example.net", 25565).encode();
//! opening.extend_from_slice(&status_request().encode());
//! assert!(!opening.is_empty());
//!
//! // Decode the JSON document the server answered with.
//! let doc = r#"{
//!     "version": {"name": "1.21", "protocol": 767},
//!     "players": {"online": 3, "max": 20},
//!     "description": "§aHello"
//! }"#;
//! let status = StatusResponse::from_json(doc).unwrap();
//! assert_eq!(status.motd(), "Hello");
//! assert_eq!(status.players.max, 20);
//! ```

pub mod error;
pub mod packet;
pub mod status;
pub mod varint;

// Re-export error types for convenience
pub use error::{ProtocolError, Result};

// Re-export the packet and status types most callers want
pub use packet::Packet;
pub use status::StatusResponse;
