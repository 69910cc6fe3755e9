//! Encrypted session framing.
//!
//! Every frame after the handshake travels as:
//!
//! ```text
//! u16 total_len (BE) | 12-byte nonce | ciphertext (total_len - 12 bytes)
//! ```
//!
//! where the ciphertext is the ChaCha20-Poly1305 sealing of
//! `frame type (1 byte) || payload`. The nonce embeds a per-direction
//! monotonic counter; the reader enforces strict counter growth, which
//! rejects duplicated and reordered frames without a window.

use std::io::ErrorKind;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::crypto::{Aead, AeadKey, Nonce, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
use crate::error::{Error, Result};
use crate::MAX_FRAME_BODY;

/// Frame type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Tunneled application data
    Data,
    /// One-shot packet-size override for the peer's morphing profile
    PaddingCtrl,
    /// One-shot delay override for the peer's morphing profile
    TimingCtrl,
    /// Anything else; ignored by the session loop
    Unknown(u8),
}

impl FrameType {
    /// Decode from the leading plaintext byte.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => FrameType::Data,
            0x01 => FrameType::PaddingCtrl,
            0x02 => FrameType::TimingCtrl,
            other => FrameType::Unknown(other),
        }
    }

    /// Encode as the leading plaintext byte.
    pub fn as_byte(self) -> u8 {
        match self {
            FrameType::Data => 0x00,
            FrameType::PaddingCtrl => 0x01,
            FrameType::TimingCtrl => 0x02,
            FrameType::Unknown(other) => other,
        }
    }
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame type discriminant
    pub frame_type: FrameType,
    /// Decrypted payload (possibly padded by the sender)
    pub payload: Vec<u8>,
}

/// Nonce-counter state, guarded by one lock so that concurrent writers
/// cannot interleave counter reads and a reader cannot race the replay
/// update.
struct Counters {
    write: u64,
    last_read: u64,
    read_seen: bool,
}

/// One authenticated session, created per connection after the handshake.
///
/// Holds the AEAD keyed with the derived 32-byte session key plus the two
/// monotonic counters. Nothing here is shared across connections.
pub struct Session {
    aead: Aead,
    counters: Mutex<Counters>,
}

impl Session {
    /// Create a session from a raw 32-byte key.
    pub fn new(session_key: &[u8]) -> Result<Self> {
        if session_key.len() != KEY_SIZE {
            return Err(Error::crypto("session key must be 32 bytes"));
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(session_key);
        Ok(Self::from_key(AeadKey::from_bytes(key)))
    }

    /// Create a session from an already-derived key.
    pub fn from_key(key: AeadKey) -> Self {
        Self {
            aead: Aead::new(&key),
            counters: Mutex::new(Counters {
                write: 0,
                last_read: 0,
                read_seen: false,
            }),
        }
    }

    /// Seal and write one frame.
    ///
    /// The counter lock is held through the socket write, so frames from
    /// concurrent writers land on the wire in counter order.
    pub async fn write_frame<W>(
        &self,
        writer: &mut W,
        frame_type: FrameType,
        payload: &[u8],
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let mut plaintext = Vec::with_capacity(1 + payload.len());
        plaintext.push(frame_type.as_byte());
        plaintext.extend_from_slice(payload);

        let mut counters = self.counters.lock().await;
        let nonce = Nonce::from_counter(counters.write);
        counters.write += 1;

        let ciphertext = self.aead.encrypt(&nonce, &plaintext, b"")?;
        let body_len = NONCE_SIZE + ciphertext.len();
        if body_len > MAX_FRAME_BODY {
            return Err(Error::frame(format!(
                "frame body {} exceeds length prefix",
                body_len
            )));
        }

        let mut wire = BytesMut::with_capacity(2 + body_len);
        wire.put_u16(body_len as u16);
        wire.put_slice(nonce.as_bytes());
        wire.put_slice(&ciphertext);

        writer.write_all(&wire).await?;
        Ok(())
    }

    /// Read and open one frame.
    ///
    /// Returns [`Error::ConnectionClosed`] on a clean EOF before the length
    /// prefix, [`Error::Replay`] when the embedded counter does not exceed
    /// the last accepted one, and framing/crypto errors otherwise.
    pub async fn read_frame<R>(&self, reader: &mut R) -> Result<Frame>
    where
        R: AsyncRead + Unpin,
    {
        let mut len_buf = [0u8; 2];
        match reader.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Err(Error::ConnectionClosed),
            Err(e) => return Err(Error::Network(e)),
        }

        let total_len = u16::from_be_bytes(len_buf) as usize;
        if total_len < NONCE_SIZE {
            return Err(Error::frame("frame too short"));
        }
        let cipher_len = total_len - NONCE_SIZE;
        if cipher_len < TAG_SIZE {
            return Err(Error::frame("ciphertext too short"));
        }

        let mut nonce_buf = [0u8; NONCE_SIZE];
        reader.read_exact(&mut nonce_buf).await?;
        let mut ciphertext = vec![0u8; cipher_len];
        reader.read_exact(&mut ciphertext).await?;

        let nonce = Nonce::from_bytes(nonce_buf);
        let plaintext = self.aead.decrypt(&nonce, &ciphertext, b"")?;
        if plaintext.is_empty() {
            return Err(Error::frame("empty plaintext"));
        }

        let counter = nonce.counter();
        {
            let mut counters = self.counters.lock().await;
            if counters.read_seen && counter <= counters.last_read {
                return Err(Error::Replay);
            }
            counters.read_seen = true;
            counters.last_read = counter;
        }

        Ok(Frame {
            frame_type: FrameType::from_byte(plaintext[0]),
            payload: plaintext[1..].to_vec(),
        })
    }
}
