//! Connection classification.
//!
//! Decides from a non-consumed peek whether a fresh connection speaks
//! REFLEX. Detection must never promote "not enough data" into an error:
//! anything short or ambiguous is OTHER and goes to the fallback server.

use crate::REFLEX_MAGIC;

/// What the peeked prefix of a connection looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Binary REFLEX handshake behind the 4-byte magic
    Magic,
    /// REFLEX handshake dressed as an HTTP POST
    Http,
    /// Anything else; relay to the fallback server
    Other,
}

/// Classify peeked bytes. Magic wins over the HTTP heuristic — it is
/// cheaper and unambiguous.
pub fn classify(peeked: &[u8]) -> Classification {
    if is_reflex_magic(peeked) {
        return Classification::Magic;
    }
    if is_http_post_like(peeked) {
        return Classification::Http;
    }
    Classification::Other
}

fn is_reflex_magic(peeked: &[u8]) -> bool {
    if peeked.len() < 4 {
        return false;
    }
    let magic = u32::from_be_bytes(peeked[..4].try_into().expect("4-byte magic field"));
    magic == REFLEX_MAGIC
}

/// A POST request line with an `HTTP/1.1` marker anywhere in the peeked
/// window. Deliberately lax: the sniff is unanchored.
fn is_http_post_like(peeked: &[u8]) -> bool {
    if peeked.len() < 14 {
        return false;
    }
    if &peeked[..4] != b"POST" {
        return false;
    }
    contains_http_version(peeked)
}

fn contains_http_version(buf: &[u8]) -> bool {
    buf.windows(8).any(|window| window == b"HTTP/1.1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_classifies() {
        let buf = [0x52, 0x46, 0x58, 0x4C, 0xde, 0xad, 0xbe, 0xef];
        assert_eq!(classify(&buf), Classification::Magic);
    }

    #[test]
    fn test_magic_needs_four_bytes() {
        assert_eq!(classify(&[0x52, 0x46, 0x58]), Classification::Other);
    }

    #[test]
    fn test_post_with_version_classifies_http() {
        let buf = b"POST /api/v1/session HTTP/1.1\r\nHost: cdn.example.com\r\n";
        assert_eq!(classify(buf), Classification::Http);
    }

    #[test]
    fn test_post_without_version_is_other() {
        let buf = b"POST /api/v1/session\r\nHost:";
        assert_eq!(classify(buf), Classification::Other);
    }

    #[test]
    fn test_get_request_is_other() {
        let buf = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
        assert_eq!(classify(buf), Classification::Other);
    }

    #[test]
    fn test_short_buffer_is_other() {
        assert_eq!(classify(b""), Classification::Other);
        assert_eq!(classify(b"POST /a HTTP"), Classification::Other);
    }

    #[test]
    fn test_magic_beats_http_lookalike() {
        // Magic prefix followed by an HTTP/1.1 marker still means MAGIC.
        let mut buf = vec![0x52, 0x46, 0x58, 0x4C];
        buf.extend_from_slice(b" junk HTTP/1.1 junk");
        assert_eq!(classify(&buf), Classification::Magic);
    }
}
