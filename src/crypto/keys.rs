//! X25519 key exchange primitives.
//!
//! REFLEX servers hold no long-term identity key: a fresh ephemeral keypair
//! is generated for every accepted handshake, so each session key exists
//! only for the life of its connection.

use x25519_dalek::{
    EphemeralSecret as DalekEphemeral, PublicKey as DalekPublic, SharedSecret as DalekShared,
};

use crate::crypto::PUBLIC_KEY_SIZE;

/// An ephemeral (single-use) X25519 secret key.
///
/// Generated per connection; the dalek type zeroizes itself on drop.
pub struct EphemeralSecret(DalekEphemeral);

impl EphemeralSecret {
    /// Generate a new random ephemeral secret.
    pub fn random() -> Self {
        Self(DalekEphemeral::random_from_rng(rand::thread_rng()))
    }

    /// Perform X25519 Diffie-Hellman key agreement.
    ///
    /// Consumes the secret; a session never reuses its ephemeral.
    pub fn diffie_hellman(self, their_public: &PublicKey) -> SharedSecret {
        SharedSecret(self.0.diffie_hellman(&their_public.0))
    }
}

impl From<&EphemeralSecret> for PublicKey {
    fn from(secret: &EphemeralSecret) -> Self {
        PublicKey(DalekPublic::from(&secret.0))
    }
}

/// An X25519 public key. Safe to put on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey(DalekPublic);

impl PublicKey {
    /// Create from raw bytes (e.g. the 32-byte field of a client handshake).
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(DalekPublic::from(bytes))
    }

    /// Get the raw bytes of this public key.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        self.0.as_bytes()
    }

    /// Convert to raw bytes.
    pub fn to_bytes(self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0.to_bytes()
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// The result of an X25519 Diffie-Hellman exchange.
///
/// Must be fed through the KDF before use as a key. Zeroized on drop by the
/// underlying dalek type.
pub struct SharedSecret(DalekShared);

impl SharedSecret {
    /// Get the raw shared secret bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}
