//! Authenticated encryption.
//!
//! ChaCha20-Poly1305 seals every session frame. Nonces are never random:
//! each direction stamps a monotonically increasing counter into the nonce,
//! which both guarantees uniqueness under one key and carries the replay
//! ordinal the reader checks.

use chacha20poly1305::{
    aead::{Aead as AeadTrait, KeyInit, Payload},
    ChaCha20Poly1305,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};
use crate::error::{Error, Result};

/// A 32-byte symmetric session key. Zeroized on drop.
#[derive(Clone, Debug, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AeadKey([u8; KEY_SIZE]);

impl AeadKey {
    /// Create a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes. Secret material; handle with care.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// A 12-byte AEAD nonce: 4 zero bytes followed by a u64 big-endian counter.
///
/// The zero prefix is fixed by the wire format; the counter occupies
/// `nonce[4..12]` and is what the replay check reads back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Build a nonce carrying the given counter value.
    pub fn from_counter(counter: u64) -> Self {
        let mut nonce = [0u8; NONCE_SIZE];
        nonce[4..12].copy_from_slice(&counter.to_be_bytes());
        Self(nonce)
    }

    /// Reinterpret raw wire bytes as a nonce.
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw nonce bytes.
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }

    /// Extract the embedded counter.
    pub fn counter(&self) -> u64 {
        u64::from_be_bytes(self.0[4..12].try_into().expect("8-byte counter field"))
    }
}

/// ChaCha20-Poly1305 cipher bound to one session key.
pub struct Aead {
    cipher: ChaCha20Poly1305,
}

impl Aead {
    /// Create an AEAD instance for the given key.
    pub fn new(key: &AeadKey) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(key.as_bytes().into()),
        }
    }

    /// Seal plaintext, returning ciphertext with the 16-byte tag appended.
    pub fn encrypt(&self, nonce: &Nonce, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let payload = Payload {
            msg: plaintext,
            aad,
        };
        self.cipher
            .encrypt(nonce.as_bytes().into(), payload)
            .map_err(|_| Error::crypto("encryption failed"))
    }

    /// Open ciphertext, verifying and stripping the tag.
    ///
    /// Fails if the key, nonce, AAD, or ciphertext do not match the sealing.
    pub fn decrypt(&self, nonce: &Nonce, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < TAG_SIZE {
            return Err(Error::frame(format!(
                "ciphertext shorter than tag: {} bytes",
                ciphertext.len()
            )));
        }
        let payload = Payload {
            msg: ciphertext,
            aad,
        };
        self.cipher
            .decrypt(nonce.as_bytes().into(), payload)
            .map_err(|_| Error::crypto("frame authentication failed"))
    }
}
