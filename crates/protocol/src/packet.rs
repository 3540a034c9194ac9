//! Packet framing and the handful of packets the status flow uses.
//!
//! # Packet Format
//!
//! Every packet is `VarInt(length) VarInt(id) payload`, where `length`
//! counts the id and payload bytes. The status flow needs four of them:
//!
//! | Packet          | Direction | Id   | Payload                        |
//! |-----------------|-----------|------|--------------------------------|
//! | Handshake       | out       | 0x00 | proto, host, port, next state  |
//! | Status request  | out       | 0x00 | empty                          |
//! | Status response | in        | 0x00 | VarInt-prefixed JSON string    |
//! | Ping / Pong     | out / in  | 0x01 | i64 nonce, echoed back         |

use crate::error::{ProtocolError, Result};
use crate::varint::{read_varint, write_varint, MAX_VARINT_BYTES};

/// Packet id shared by the handshake, status request and status response.
pub const PACKET_STATUS: i32 = 0x00;

/// Packet id of the ping/pong latency exchange.
pub const PACKET_PING: i32 = 0x01;

/// Handshake `next state` selector that opens a status exchange.
pub const STATE_STATUS: i32 = 1;

/// Protocol version sent in the handshake. `-1` is the conventional value
/// for a client that does not target a specific game version.
pub const PROTOCOL_VERSION: i32 = -1;

/// Maximum accepted packet size, guarding memory against hostile length
/// prefixes. Status responses carrying a favicon run to ~100 KiB in
/// practice, so 2 MiB leaves generous headroom.
pub const MAX_PACKET_BYTES: usize = 2 * 1024 * 1024;

/// A raw framed packet: an id plus an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet id.
    pub id: i32,
    /// Payload bytes, excluding the id.
    pub payload: Vec<u8>,
}

impl Packet {
    /// Create a packet with the given id and payload.
    pub fn new(id: i32, payload: Vec<u8>) -> Self {
        Self { id, payload }
    }

    /// Encode the packet, length prefix included.
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(self.payload.len() + MAX_VARINT_BYTES);
        write_varint(&mut body, self.id);
        body.extend_from_slice(&self.payload);

        let mut out = Vec::with_capacity(body.len() + MAX_VARINT_BYTES);
        write_varint(&mut out, body.len() as i32);
        out.extend_from_slice(&body);
        out
    }

    /// Decode one packet from the front of `buf`.
    ///
    /// Returns `Ok(None)` while `buf` does not yet hold a complete packet;
    /// callers accumulate bytes from the stream and retry. On success
    /// returns the packet and the total number of bytes consumed.
    pub fn decode(buf: &[u8]) -> Result<Option<(Packet, usize)>> {
        let Some((length, length_bytes)) = read_varint(buf)? else {
            return Ok(None);
        };
        if length <= 0 {
            // A packet body holds at least the id byte.
            return Err(ProtocolError::InvalidLength(length));
        }
        let length = length as usize;
        if length > MAX_PACKET_BYTES {
            return Err(ProtocolError::PacketTooLarge {
                size: length,
                max: MAX_PACKET_BYTES,
            });
        }

        let rest = &buf[length_bytes..];
        if rest.len() < length {
            return Ok(None);
        }

        let body = &rest[..length];
        let Some((id, id_bytes)) = read_varint(body)? else {
            return Err(ProtocolError::Truncated);
        };
        let packet = Packet {
            id,
            payload: body[id_bytes..].to_vec(),
        };
        Ok(Some((packet, length_bytes + length)))
    }

    /// Verify the packet carries the expected id.
    pub fn expect_id(&self, expected: i32) -> Result<()> {
        if self.id == expected {
            Ok(())
        } else {
            Err(ProtocolError::UnexpectedPacket {
                expected,
                got: self.id,
            })
        }
    }
}

/// Build the handshake packet that opens a status exchange with `host:port`.
pub fn handshake(host: &str, port: u16) -> Packet {
    let mut payload = Vec::with_capacity(host.len() + 3 * MAX_VARINT_BYTES + 2);
    write_varint(&mut payload, PROTOCOL_VERSION);
    write_string(&mut payload, host);
    payload.extend_from_slice(&port.to_be_bytes());
    write_varint(&mut payload, STATE_STATUS);
    Packet::new(PACKET_STATUS, payload)
}

/// Build the (empty) status request packet.
pub fn status_request() -> Packet {
    Packet::new(PACKET_STATUS, Vec::new())
}

/// Build a status response packet carrying `json`. Servers send this;
/// it exists here for loopback tests and tooling.
pub fn status_response(json: &str) -> Packet {
    let mut payload = Vec::with_capacity(json.len() + MAX_VARINT_BYTES);
    write_string(&mut payload, json);
    Packet::new(PACKET_STATUS, payload)
}

/// Build a ping packet carrying `nonce`. The server echoes it back as-is.
pub fn ping(nonce: i64) -> Packet {
    Packet::new(PACKET_PING, nonce.to_be_bytes().to_vec())
}

/// Extract the JSON document from a status response payload.
pub fn parse_status_payload(payload: &[u8]) -> Result<String> {
    let (json, _) = read_string(payload)?;
    Ok(json)
}

/// Extract the echoed nonce from a pong payload.
pub fn parse_pong_payload(payload: &[u8]) -> Result<i64> {
    let bytes: [u8; 8] = payload
        .try_into()
        .map_err(|_| ProtocolError::Truncated)?;
    Ok(i64::from_be_bytes(bytes))
}

/// Append a VarInt-length-prefixed UTF-8 string to `buf`.
pub fn write_string(buf: &mut Vec<u8>, value: &str) {
    write_varint(buf, value.len() as i32);
    buf.extend_from_slice(value.as_bytes());
}

/// Read a VarInt-length-prefixed UTF-8 string from the front of `buf`.
///
/// Unlike [`Packet::decode`], this operates on a payload that is already
/// complete, so running out of bytes is an error, not a retry.
pub fn read_string(buf: &[u8]) -> Result<(String, usize)> {
    let Some((length, length_bytes)) = read_varint(buf)? else {
        return Err(ProtocolError::Truncated);
    };
    if length < 0 {
        return Err(ProtocolError::InvalidLength(length));
    }
    let length = length as usize;
    if length > MAX_PACKET_BYTES {
        return Err(ProtocolError::PacketTooLarge {
            size: length,
            max: MAX_PACKET_BYTES,
        });
    }

    let rest = &buf[length_bytes..];
    if rest.len() < length {
        return Err(ProtocolError::Truncated);
    }
    let text = std::str::from_utf8(&rest[..length]).map_err(|_| ProtocolError::InvalidString)?;
    Ok((text.to_string(), length_bytes + length))
}
