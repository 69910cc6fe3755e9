//! Handshake records and their wire forms.
//!
//! A client handshake is one binary blob:
//!
//! ```text
//! pub(32) | uuid(16) | ts(8, i64 BE) | nonce(16) | policy_request
//! ```
//!
//! On the magic path it arrives with a 2-byte policy length between nonce
//! and policy; on the HTTP path it arrives base64-encoded inside a JSON
//! `{"data": ...}` POST body with the policy as the undelimited remainder.
//! The server always answers in HTTP, success or not, so a probe never sees
//! anything but a web server.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::crypto::PublicKey;
use crate::error::{Error, Result};
use crate::HANDSHAKE_FRESHNESS_SECS;

/// Fixed-size prefix of a magic-path handshake, after the magic itself:
/// pub + uuid + ts + nonce + policy length.
pub(crate) const MAGIC_FIXED_LEN: usize = 32 + 16 + 8 + 16 + 2;

/// Minimum decoded blob on the HTTP path (no policy length prefix there).
pub(crate) const MIN_BLOB_LEN: usize = 32 + 16 + 8 + 16;

/// Decoded client handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHandshake {
    /// Client ephemeral X25519 public key
    pub public_key: [u8; 32],
    /// Raw user UUID bytes
    pub user_id: [u8; 16],
    /// Client wall time, seconds since the Unix epoch
    pub timestamp: i64,
    /// Handshake nonce; salts the session-key derivation
    pub nonce: [u8; 16],
    /// Requested policy label, uninterpreted
    pub policy_request: Vec<u8>,
}

impl ClientHandshake {
    /// Parse the fixed block of a magic-path handshake.
    ///
    /// Returns the record (with an empty policy) and the number of policy
    /// bytes that follow on the wire.
    pub(crate) fn parse_fixed(block: &[u8; MAGIC_FIXED_LEN]) -> (Self, usize) {
        let mut offset = 0;
        let mut public_key = [0u8; 32];
        public_key.copy_from_slice(&block[offset..offset + 32]);
        offset += 32;

        let mut user_id = [0u8; 16];
        user_id.copy_from_slice(&block[offset..offset + 16]);
        offset += 16;

        let timestamp = i64::from_be_bytes(
            block[offset..offset + 8]
                .try_into()
                .expect("8-byte timestamp field"),
        );
        offset += 8;

        let mut nonce = [0u8; 16];
        nonce.copy_from_slice(&block[offset..offset + 16]);
        offset += 16;

        let policy_len = u16::from_be_bytes(
            block[offset..offset + 2]
                .try_into()
                .expect("2-byte length field"),
        ) as usize;

        (
            Self {
                public_key,
                user_id,
                timestamp,
                nonce,
                policy_request: Vec::new(),
            },
            policy_len,
        )
    }

    /// Parse an HTTP-path blob: fixed fields plus whatever remains as the
    /// policy request.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        if raw.len() < MIN_BLOB_LEN {
            return Err(Error::handshake("handshake packet too short"));
        }
        let mut fixed = [0u8; MAGIC_FIXED_LEN];
        fixed[..MIN_BLOB_LEN].copy_from_slice(&raw[..MIN_BLOB_LEN]);
        let (mut handshake, _) = Self::parse_fixed(&fixed);
        handshake.policy_request = raw[MIN_BLOB_LEN..].to_vec();
        Ok(handshake)
    }

    /// Whether the timestamp lies within the freshness window of `now`.
    pub fn is_fresh(&self, now: i64) -> bool {
        self.timestamp >= now - HANDSHAKE_FRESHNESS_SECS
            && self.timestamp <= now + HANDSHAKE_FRESHNESS_SECS
    }
}

/// JSON body of an HTTP-path handshake POST.
#[derive(Debug, Deserialize)]
pub(crate) struct HandshakeBody {
    pub data: String,
}

/// Server handshake reply, serialized as the body of the HTTP 200.
#[derive(Debug, Serialize, Deserialize)]
pub struct ServerHandshake {
    /// Server ephemeral public key, base64
    pub public_key: String,
    /// Granted policy label, base64, or null
    pub policy_grant: Option<String>,
}

impl ServerHandshake {
    /// Build a reply from the server's ephemeral public key.
    pub fn new(public_key: &PublicKey, policy_grant: Option<&[u8]>) -> Self {
        Self {
            public_key: BASE64.encode(public_key.as_bytes()),
            policy_grant: policy_grant.map(|grant| BASE64.encode(grant)),
        }
    }
}

/// Current server wall time in Unix seconds.
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Extract a Content-Length value from one CRLF header line.
///
/// Matches when the first 15 bytes equal `content-length:` case
/// insensitively, then takes the first contiguous decimal run. Padded or
/// exotic spellings are missed on purpose; the handshake client sends the
/// plain form.
pub(crate) fn content_length_from_line(line: &[u8]) -> Option<usize> {
    if line.len() < 15 || !line[..15].eq_ignore_ascii_case(b"content-length:") {
        return None;
    }
    let mut value: Option<usize> = None;
    for &byte in &line[15..] {
        match byte {
            b'0'..=b'9' => {
                value = Some(value.unwrap_or(0) * 10 + (byte - b'0') as usize);
            }
            _ if value.is_some() => break,
            _ => {}
        }
    }
    value
}

/// Write the HTTP 200 reply carrying the server handshake.
pub(crate) async fn write_ok<W>(writer: &mut W, reply: &ServerHandshake) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(reply)
        .map_err(|e| Error::handshake(format!("encode server handshake: {e}")))?;
    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
        body.len()
    );
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Write a canned HTTP 403 and shut the connection down.
///
/// Returns `Ok` after a successful reject; only an I/O failure during the
/// reject itself surfaces.
pub(crate) async fn write_forbidden<W>(writer: &mut W, reason: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::json!({ "error": reason }).to_string();
    let header = format!(
        "HTTP/1.1 403 Forbidden\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
        body.len()
    );
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(body.as_bytes()).await?;
    writer.flush().await?;
    let _ = writer.shutdown().await;
    Ok(())
}

/// Decode the base64 payload of an HTTP-path body.
pub(crate) fn decode_http_body(body: &[u8]) -> Result<Vec<u8>> {
    let payload: HandshakeBody = serde_json::from_slice(body)
        .map_err(|e| Error::handshake(format!("invalid handshake body: {e}")))?;
    BASE64
        .decode(payload.data.as_bytes())
        .map_err(|e| Error::handshake(format!("invalid handshake base64: {e}")))
}
