//! Key derivation.
//!
//! HKDF with SHA-256 turns the X25519 shared secret into the 32-byte session
//! key. The client's 16-byte handshake nonce is the salt, so two sessions
//! from the same keypair (replayed public keys included) still derive
//! distinct keys.

use hkdf::Hkdf as HkdfImpl;
use sha2::Sha256;

use crate::crypto::{AeadKey, SharedSecret, KEY_SIZE};
use crate::error::{Error, Result};

/// Domain separation string for session-key derivation.
const SESSION_INFO: &[u8] = b"reflex-session";

/// HKDF-SHA256 wrapper.
pub struct Hkdf {
    prk: HkdfImpl<Sha256>,
}

impl Hkdf {
    /// Create a new HKDF instance from input keying material.
    ///
    /// # Arguments
    ///
    /// * `salt` - Optional salt (the handshake nonce, for sessions)
    /// * `ikm` - Input keying material (the DH shared secret)
    pub fn new(salt: Option<&[u8]>, ikm: &[u8]) -> Self {
        Self {
            prk: HkdfImpl::new(salt, ikm),
        }
    }

    /// Expand the PRK to produce output keying material.
    pub fn expand(&self, info: &[u8], len: usize) -> Result<Vec<u8>> {
        let mut okm = vec![0u8; len];
        self.prk
            .expand(info, &mut okm)
            .map_err(|_| Error::crypto("HKDF expansion failed"))?;
        Ok(okm)
    }

    /// Expand to a fixed-size array.
    pub fn expand_fixed<const N: usize>(&self, info: &[u8]) -> Result<[u8; N]> {
        let mut okm = [0u8; N];
        self.prk
            .expand(info, &mut okm)
            .map_err(|_| Error::crypto("HKDF expansion failed"))?;
        Ok(okm)
    }
}

/// Derive the 32-byte session key for one connection.
///
/// `salt` is the client's handshake nonce; the info string pins the output
/// to this protocol. Both directions of a session share this single key and
/// stay distinguishable through their nonce counters.
pub fn derive_session_key(shared: &SharedSecret, client_nonce: &[u8; 16]) -> AeadKey {
    let hkdf = Hkdf::new(Some(client_nonce), shared.as_bytes());
    // KEY_SIZE output from SHA-256 HKDF cannot fail.
    let okm = hkdf
        .expand_fixed::<KEY_SIZE>(SESSION_INFO)
        .expect("32-byte HKDF-SHA256 output");
    AeadKey::from_bytes(okm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{EphemeralSecret, PublicKey};

    #[test]
    fn test_hkdf_expand_deterministic() {
        let ikm = [0x0bu8; 22];
        let salt = [0x00u8; 13];
        let info = [0xf0u8; 10];

        let hkdf = Hkdf::new(Some(&salt), &ikm);
        let okm = hkdf.expand(&info, 42).unwrap();
        assert_eq!(okm.len(), 42);

        let okm2 = hkdf.expand(&info, 42).unwrap();
        assert_eq!(okm, okm2);
    }

    #[test]
    fn test_session_key_matches_across_peers() {
        let client_secret = EphemeralSecret::random();
        let client_public = PublicKey::from(&client_secret);
        let server_secret = EphemeralSecret::random();
        let server_public = PublicKey::from(&server_secret);

        let nonce = [0x5au8; 16];
        let client_key = derive_session_key(&client_secret.diffie_hellman(&server_public), &nonce);
        let server_key = derive_session_key(&server_secret.diffie_hellman(&client_public), &nonce);

        assert_eq!(client_key, server_key);
    }

    #[test]
    fn test_salt_changes_session_key() {
        let a = EphemeralSecret::random();
        let b = EphemeralSecret::random();
        let b_public = PublicKey::from(&b);
        let shared = a.diffie_hellman(&b_public);

        let key1 = derive_session_key(&shared, &[1u8; 16]);
        let key2 = derive_session_key(&shared, &[2u8; 16]);
        assert_ne!(key1, key2);
    }
}
