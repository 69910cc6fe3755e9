//! Traffic morphing.
//!
//! Outbound frames are shaped to resemble a chosen cover protocol:
//!
//! 1. **Padding**: each payload is normalized to a size sampled from the
//!    profile's packet-size distribution
//! 2. **Timing**: a delay sampled from the profile's delay distribution is
//!    inserted after each frame
//! 3. **In-band control**: `PADDING_CTRL` / `TIMING_CTRL` frames plant
//!    one-shot overrides for the next sample

mod padding;
mod profile;

pub use padding::add_padding;
pub use profile::{
    DelayBucket, ProfileRegistry, SizeBucket, TrafficProfile, DEFAULT_PROFILE,
};

use std::time::Duration;

use tokio::io::AsyncWrite;

use crate::error::Result;
use crate::session::{FrameType, Session};

/// Write one frame with traffic morphing.
///
/// With a profile, the payload is padded (or truncated) to a sampled target
/// size and the write is followed by a sampled delay. Without one, this is a
/// plain [`Session::write_frame`].
pub async fn write_frame_morphed<W>(
    session: &Session,
    writer: &mut W,
    frame_type: FrameType,
    payload: &[u8],
    profile: Option<&TrafficProfile>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let profile = match profile {
        Some(p) => p,
        None => return session.write_frame(writer, frame_type, payload).await,
    };

    let target = profile.packet_size();
    let morphed = add_padding(payload, target);
    session.write_frame(writer, frame_type, &morphed).await?;

    let delay = profile.delay();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    Ok(())
}

/// Apply a control frame to a profile.
///
/// `PADDING_CTRL` carries a u16 big-endian target size, `TIMING_CTRL` a u64
/// big-endian delay in milliseconds. Truncated payloads and other frame
/// types are no-ops.
pub fn apply_control_frame(profile: &TrafficProfile, frame_type: FrameType, payload: &[u8]) {
    match frame_type {
        FrameType::PaddingCtrl if payload.len() >= 2 => {
            let size = u16::from_be_bytes([payload[0], payload[1]]);
            profile.set_next_packet_size(size as usize);
        }
        FrameType::TimingCtrl if payload.len() >= 8 => {
            let millis = u64::from_be_bytes(payload[..8].try_into().expect("8-byte delay field"));
            profile.set_next_delay(Duration::from_millis(millis));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Frame;

    fn fixed_profile(size: usize) -> TrafficProfile {
        TrafficProfile::new(
            "fixed",
            vec![SizeBucket { size, weight: 1.0 }],
            Vec::new(),
        )
    }

    fn session_pair() -> (Session, Session) {
        let key = [0x42u8; 32];
        (Session::new(&key).unwrap(), Session::new(&key).unwrap())
    }

    async fn read_one(session: &Session, wire: &[u8]) -> Frame {
        let mut cursor = wire;
        session.read_frame(&mut cursor).await.unwrap()
    }

    #[tokio::test]
    async fn test_morphed_write_pads_to_sampled_size() {
        let (tx, rx) = session_pair();
        let profile = fixed_profile(64);

        let mut wire = Vec::new();
        write_frame_morphed(&tx, &mut wire, FrameType::Data, b"short", Some(&profile))
            .await
            .unwrap();

        let frame = read_one(&rx, &wire).await;
        assert_eq!(frame.payload.len(), 64);
        assert_eq!(&frame.payload[..5], b"short");
    }

    #[tokio::test]
    async fn test_morphed_write_without_profile_is_plain() {
        let (tx, rx) = session_pair();

        let mut wire = Vec::new();
        write_frame_morphed(&tx, &mut wire, FrameType::Data, b"short", None)
            .await
            .unwrap();

        let frame = read_one(&rx, &wire).await;
        assert_eq!(frame.payload, b"short");
    }

    #[tokio::test]
    async fn test_morphed_write_truncates_oversized_payload() {
        let (tx, rx) = session_pair();
        let profile = fixed_profile(4);

        let mut wire = Vec::new();
        write_frame_morphed(&tx, &mut wire, FrameType::Data, b"abcdefgh", Some(&profile))
            .await
            .unwrap();

        let frame = read_one(&rx, &wire).await;
        assert_eq!(frame.payload, b"abcd");
    }

    #[test]
    fn test_padding_ctrl_sets_size_override() {
        let profile = fixed_profile(500);
        apply_control_frame(&profile, FrameType::PaddingCtrl, &1234u16.to_be_bytes());
        assert_eq!(profile.packet_size(), 1234);
        assert_eq!(profile.packet_size(), 500);
    }

    #[test]
    fn test_timing_ctrl_sets_delay_override() {
        let profile = fixed_profile(500);
        apply_control_frame(&profile, FrameType::TimingCtrl, &250u64.to_be_bytes());
        assert_eq!(profile.delay(), Duration::from_millis(250));
        assert_eq!(profile.delay(), Duration::ZERO);
    }

    #[test]
    fn test_truncated_control_payload_is_noop() {
        let profile = fixed_profile(500);
        apply_control_frame(&profile, FrameType::PaddingCtrl, &[0x01]);
        assert_eq!(profile.packet_size(), 500);

        apply_control_frame(&profile, FrameType::TimingCtrl, &[0, 0, 0, 1]);
        assert_eq!(profile.delay(), Duration::ZERO);
    }

    #[test]
    fn test_data_frame_is_not_a_control() {
        let profile = fixed_profile(500);
        apply_control_frame(&profile, FrameType::Data, &1234u16.to_be_bytes());
        assert_eq!(profile.packet_size(), 500);
    }
}
