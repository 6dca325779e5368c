//! Integrity-byte arithmetic for BMS packets.
//!
//! The checksum is a 16-bit summation over every packet byte except the
//! trailing checksum itself, sync sequence included, folded to one byte as
//! `low - high`. The formula was reconstructed from captured traffic and
//! holds for every packet in the fixed length table; it is not a CRC and
//! not length-dependent.

use crate::protocol::SYNC;

fn sum(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)))
}

fn fold(sum: u16) -> u8 {
    (sum as u8).wrapping_sub((sum >> 8) as u8)
}

/// Checksum byte for a packet of the given type carrying `payload`.
///
/// The constant sync contribution is folded in, so callers pass only the
/// checksummed variable region.
pub fn compute(type_id: u8, payload: &[u8]) -> u8 {
    fold(sum(&SYNC).wrapping_add(u16::from(type_id)).wrapping_add(sum(payload)))
}

/// Recomputes the checksum of a complete frame (sync through checksum) and
/// compares it against the trailing byte. Pure; safe to call repeatedly.
pub fn verify(frame: &[u8]) -> bool {
    match frame.split_last() {
        Some((&checksum, body)) if body.len() > SYNC.len() => fold(sum(body)) == checksum,
        _ => false,
    }
}

/// Restamps the trailing checksum byte of a frame after a payload mutation.
pub fn seal(frame: &mut [u8]) {
    if let Some((checksum, body)) = frame.split_last_mut() {
        *checksum = fold(sum(body));
    }
}
