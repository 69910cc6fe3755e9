//! Payload padding.

use crate::crypto::SecureRandom;

/// Normalize `data` to exactly `target` bytes.
///
/// A `target` of 0 leaves the payload untouched. A payload longer than the
/// target is truncated to it — outbound lengths are normalized to the
/// sampled bucket, both ways. Shorter payloads are extended with
/// cryptographically random bytes.
pub fn add_padding(data: &[u8], target: usize) -> Vec<u8> {
    if target == 0 {
        return data.to_vec();
    }
    if data.len() >= target {
        return data[..target].to_vec();
    }

    let mut padded = Vec::with_capacity(target);
    padded.extend_from_slice(data);
    let mut padding = vec![0u8; target - data.len()];
    SecureRandom::fill(&mut padding);
    padded.extend_from_slice(&padding);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_target_is_noop() {
        let data = b"abc";
        assert_eq!(add_padding(data, 0), data);
    }

    #[test]
    fn test_exact_target_unchanged() {
        let data = b"abc";
        assert_eq!(add_padding(data, data.len()), data);
    }

    #[test]
    fn test_truncates_to_target() {
        let data = b"abcdefgh";
        let out = add_padding(data, 3);
        assert_eq!(out, b"abc");
    }

    #[test]
    fn test_pads_to_target_preserving_prefix() {
        let data = b"abc";
        let out = add_padding(data, 10);
        assert_eq!(out.len(), 10);
        assert_eq!(&out[..3], data);
    }

    #[test]
    fn test_empty_input_pads_to_target() {
        let out = add_padding(&[], 16);
        assert_eq!(out.len(), 16);
    }
}
