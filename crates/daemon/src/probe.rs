//! Live status queries against the managed game server.
//!
//! One [`StatusProbe::probe`] call makes one bounded attempt and always
//! returns a [`StatusSnapshot`]: unreachable, slow, or protocol-breaking
//! servers fold into `online: false` plus an error string instead of an
//! error. Callers poll this continuously and treat "unreachable" as
//! ordinary data, so the call itself must never fail. No retries, no
//! state between calls.

use std::time::{Duration, UNIX_EPOCH};

use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;

use protocol::packet::{self, Packet, PACKET_PING, PACKET_STATUS};
use protocol::status::StatusResponse;

/// Errors internal to a single query attempt. They never leave this
/// module; [`StatusProbe::probe`] folds them into the snapshot.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Network error.
    #[error("network error: {0}")]
    Io(#[from] std::io::Error),

    /// The server broke the wire protocol.
    #[error(transparent)]
    Protocol(#[from] protocol::ProtocolError),

    /// The server closed the connection before answering.
    #[error("server closed the connection mid-response")]
    ConnectionClosed,

    /// The pong did not echo the nonce the ping carried.
    #[error("pong nonce mismatch: sent {sent}, got {got}")]
    NonceMismatch { sent: i64, got: i64 },
}

/// Point-in-time status of the managed server. Not persisted; every probe
/// re-derives it from a fresh query.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    /// Whether the server answered the query.
    pub online: bool,

    /// Players currently connected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub players_online: Option<u32>,

    /// Connection capacity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub players_max: Option<u32>,

    /// Version string the server reports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Message of the day, formatting codes stripped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motd: Option<String>,

    /// Round-trip latency in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,

    /// Why the server counts as offline; only set when `online` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusSnapshot {
    fn offline(error: String) -> Self {
        Self {
            online: false,
            players_online: None,
            players_max: None,
            version: None,
            motd: None,
            latency_ms: None,
            error: Some(error),
        }
    }
}

/// Issues status queries against one configured host and port.
#[derive(Debug, Clone)]
pub struct StatusProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl StatusProbe {
    /// Create a probe for `host:port` with a per-attempt timeout.
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    /// Query the server once. Never returns an error; every failure mode
    /// becomes an `online: false` snapshot.
    pub async fn probe(&self) -> StatusSnapshot {
        match tokio::time::timeout(self.timeout, self.query()).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(err)) => {
                tracing::debug!("status query to {}:{} failed: {}", self.host, self.port, err);
                StatusSnapshot::offline(err.to_string())
            }
            Err(_) => {
                tracing::debug!("status query to {}:{} timed out", self.host, self.port);
                StatusSnapshot::offline(format!("timed out after {:?}", self.timeout))
            }
        }
    }

    async fn query(&self) -> Result<StatusSnapshot, ProbeError> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port)).await?;

        // Handshake and request go out in one write.
        let mut opening = packet::handshake(&self.host, self.port).encode();
        opening.extend_from_slice(&packet::status_request().encode());

        let exchange_started = Instant::now();
        stream.write_all(&opening).await?;

        let response = read_packet(&mut stream).await?;
        let exchange_elapsed = exchange_started.elapsed();
        response.expect_id(PACKET_STATUS)?;

        let document = packet::parse_status_payload(&response.payload)?;
        let status = StatusResponse::from_json(&document)?;

        // The trailing ping/pong is the proper latency measurement. Some
        // server front-ends close the connection right after the status
        // response, so a failed ping falls back to the elapsed time of the
        // status exchange instead of failing the whole probe.
        let latency = match ping(&mut stream).await {
            Ok(rtt) => rtt,
            Err(err) => {
                tracing::trace!("ping after status response failed: {}", err);
                exchange_elapsed
            }
        };

        Ok(StatusSnapshot {
            online: true,
            players_online: Some(status.players.online),
            players_max: Some(status.players.max),
            version: Some(status.version.name.clone()),
            motd: Some(status.motd()),
            latency_ms: Some(latency.as_millis() as u64),
            error: None,
        })
    }
}

/// One ping/pong round trip; returns the measured latency.
async fn ping(stream: &mut TcpStream) -> Result<Duration, ProbeError> {
    let nonce = UNIX_EPOCH
        .elapsed()
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default();

    let started = Instant::now();
    stream.write_all(&packet::ping(nonce).encode()).await?;

    let pong = read_packet(stream).await?;
    pong.expect_id(PACKET_PING)?;
    let echoed = packet::parse_pong_payload(&pong.payload)?;
    if echoed != nonce {
        return Err(ProbeError::NonceMismatch {
            sent: nonce,
            got: echoed,
        });
    }
    Ok(started.elapsed())
}

/// Read one complete packet, accumulating stream bytes until the decoder
/// produces it.
async fn read_packet(stream: &mut TcpStream) -> Result<Packet, ProbeError> {
    let mut buf = Vec::with_capacity(512);
    let mut chunk = [0u8; 4096];
    loop {
        if let Some((packet, _)) = Packet::decode(&buf)? {
            return Ok(packet);
        }
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            return Err(ProbeError::ConnectionClosed);
        }
        buf.extend_from_slice(&chunk[..read]);
    }
}
