//! Cryptographic primitives for REFLEX.
//!
//! This module provides:
//! - X25519 Diffie-Hellman key exchange (fresh server ephemeral per connection)
//! - ChaCha20-Poly1305 AEAD encryption
//! - HKDF-SHA256 session-key derivation
//! - Secure random number generation
//!
//! Secret material is zeroized on drop.

mod aead;
mod kdf;
mod keys;
mod random;

pub use aead::{Aead, AeadKey, Nonce};
pub use kdf::{derive_session_key, Hkdf};
pub use keys::{EphemeralSecret, PublicKey, SharedSecret};
pub use random::SecureRandom;

/// Size of the symmetric session key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Size of the AEAD nonce in bytes (96 bits for ChaCha20-Poly1305)
pub const NONCE_SIZE: usize = 12;

/// Size of the AEAD authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Size of X25519 public keys in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_key_agreement() {
        // Client side: ephemeral keypair plus a random handshake nonce.
        let client_secret = EphemeralSecret::random();
        let client_public = PublicKey::from(&client_secret);
        let handshake_nonce: [u8; 16] = SecureRandom::bytes();

        // Server side: fresh ephemeral for this connection.
        let server_secret = EphemeralSecret::random();
        let server_public = PublicKey::from(&server_secret);

        let client_shared = client_secret.diffie_hellman(&server_public);
        let server_shared = server_secret.diffie_hellman(&client_public);
        assert_eq!(client_shared.as_bytes(), server_shared.as_bytes());

        // Both sides must derive the same session key from the same nonce.
        let client_key = derive_session_key(&client_shared, &handshake_nonce);
        let server_key = derive_session_key(&server_shared, &handshake_nonce);
        assert_eq!(client_key, server_key);

        // A frame sealed by one side opens on the other.
        let aead_tx = Aead::new(&client_key);
        let aead_rx = Aead::new(&server_key);
        let nonce = Nonce::from_counter(0);
        let sealed = aead_tx.encrypt(&nonce, b"first frame", b"").unwrap();
        let opened = aead_rx.decrypt(&nonce, &sealed, b"").unwrap();
        assert_eq!(opened, b"first frame");
    }

    #[test]
    fn test_distinct_nonces_derive_distinct_keys() {
        let client_secret = EphemeralSecret::random();
        let server_secret = EphemeralSecret::random();
        let server_public = PublicKey::from(&server_secret);
        let shared = client_secret.diffie_hellman(&server_public);

        let key_a = derive_session_key(&shared, &[0u8; 16]);
        let key_b = derive_session_key(&shared, &[1u8; 16]);
        assert_ne!(key_a, key_b);
    }
}
