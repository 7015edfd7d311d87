//! Compressed state snapshots, optionally delta-encoded against a basis.
//!
//! Layout: 4-byte little-endian uncompressed length, then a zlib stream of
//! the raw state. When a basis is supplied, the raw state is first rewritten
//! as the 8-bit wrapping difference against the basis, which deflates far
//! better since most of an emulator state barely changes frame to frame.

use std::{
    io::{Read, Write},
    process,
};

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};

/// Compress `raw`, delta-encoding against `basis` when present.
///
/// Codec failure here means a corrupt environment; it is fatal.
pub fn encode_state(raw: &[u8], basis: Option<&[u8]>) -> Vec<u8> {
    let mut delta = raw.to_vec();
    if let Some(basis) = basis {
        for (byte, basis_byte) in delta.iter_mut().zip(basis) {
            *byte = byte.wrapping_sub(*basis_byte);
        }
    }

    let mut out = Vec::with_capacity(delta.len() / 4 + 16);
    out.extend_from_slice(&(raw.len() as u32).to_le_bytes());

    let mut encoder = ZlibEncoder::new(out, Compression::default());
    if let Err(error) = encoder.write_all(&delta) {
        fatal("compression", &error);
    }
    match encoder.finish() {
        Ok(out) => out,
        Err(error) => fatal("compression", &error),
    }
}

/// Undo [encode_state]: inflate `data` and add `basis` back in.
///
/// Returns `None` for inputs shorter than the length prefix (loading such a
/// snapshot is a no-op). A corrupt zlib stream is fatal.
pub fn decode_state(data: &[u8], basis: Option<&[u8]>) -> Option<Vec<u8>> {
    if data.len() < 4 {
        return None;
    }
    let uncomp_len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

    let mut raw = Vec::with_capacity(uncomp_len);
    let mut decoder = ZlibDecoder::new(&data[4..]);
    if let Err(error) = decoder.read_to_end(&mut raw) {
        fatal("decompression", &error);
    }

    if let Some(basis) = basis {
        for (byte, basis_byte) in raw.iter_mut().zip(basis) {
            *byte = byte.wrapping_add(*basis_byte);
        }
    }
    Some(raw)
}

fn fatal(action: &str, error: &dyn std::fmt::Display) -> ! {
    log::error!("{} failed: {}", action, error);
    process::abort();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_prefix_is_the_uncompressed_size() {
        let raw = vec![7u8; 1000];
        let encoded = encode_state(&raw, None);
        assert_eq!(
            u32::from_le_bytes([encoded[0], encoded[1], encoded[2], encoded[3]]),
            1000
        );
        // Constant data deflates well below the raw size.
        assert!(encoded.len() < raw.len());
    }

    #[test]
    fn round_trips_without_a_basis() {
        let raw: Vec<u8> = (0..=255).cycle().take(5000).collect();
        assert_eq!(decode_state(&encode_state(&raw, None), None), Some(raw));
    }

    #[test]
    fn basis_delta_round_trips_with_wrapping() {
        // 0x00 - 0xFF wraps on save and must wrap back on load.
        let raw = vec![0x00u8, 0x10, 0xFF, 0x80];
        let basis = vec![0xFFu8, 0x20, 0x01, 0x80];
        let encoded = encode_state(&raw, Some(&basis));
        assert_eq!(decode_state(&encoded, Some(&basis)), Some(raw));
    }

    #[test]
    fn basis_applies_only_over_the_common_prefix() {
        let raw = vec![10u8, 20, 30, 40];
        let short_basis = vec![1u8, 2];
        let encoded = encode_state(&raw, Some(&short_basis));
        assert_eq!(decode_state(&encoded, Some(&short_basis)), Some(raw.clone()));

        // A basis longer than the state only uses the state-sized prefix.
        let long_basis = vec![5u8; 16];
        let encoded = encode_state(&raw, Some(&long_basis));
        assert_eq!(decode_state(&encoded, Some(&long_basis)), Some(raw));
    }

    #[test]
    fn short_input_is_rejected_quietly() {
        assert_eq!(decode_state(&[], None), None);
        assert_eq!(decode_state(&[1, 2, 3], None), None);
    }
}
