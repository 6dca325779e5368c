//! Wire-level constants of the BMS serial protocol.
//!
//! The protocol has no length field. A packet starts with a fixed 3-byte
//! sync sequence, followed by a type byte, a type-dependent payload and a
//! single checksum byte. Packet boundaries are found through the static
//! type-to-length table below; types absent from the table have no a-priori
//! length and are treated as opaque runs by the relay.

use num_enum::{FromPrimitive, IntoPrimitive};
use strum_macros::Display;

/// Marks the start of a candidate packet.
pub const SYNC: [u8; 3] = [0xFF, 0x55, 0xAA];

/// Framing bytes surrounding the payload: sync + type + checksum.
pub const FRAME_OVERHEAD: usize = SYNC.len() + 2;

/// Total on-wire length of a known packet type, sync and checksum included.
///
/// Returns `None` for types that are not in the fixed table.
pub const fn packet_length(type_id: u8) -> Option<usize> {
    match type_id {
        0x00 => Some(7),
        0x02 => Some(38),
        0x03 => Some(7),
        0x04 => Some(11),
        0x05 => Some(8),
        0x06 => Some(10),
        0x07 => Some(13),
        0x08 => Some(7),
        0x09 => Some(7),
        0x0B => Some(8),
        0x0C => Some(8),
        0x0D => Some(9),
        0x0F => Some(11),
        0x10 => Some(16),
        0x11 => Some(10),
        _ => None,
    }
}

/// Packet types with decoded telemetry semantics.
///
/// The length table covers more types than this enum names; those are
/// framed and forwarded correctly but carry no telemetry we interpret
/// (balance status, protection flags and the like), so they all fold into
/// [`PacketType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum PacketType {
    /// Per-cell voltages, 16 big-endian millivolt slots.
    CellVoltages = 0x02,
    /// Reported state of charge in percent.
    Soc = 0x03,
    /// Per-sensor temperatures, one signed byte each.
    Temperatures = 0x04,
    /// Battery current, signed 16-bit big-endian raw register.
    Current = 0x05,
    /// 32-bit BMS serial number, big-endian.
    SerialNumber = 0x06,
    #[num_enum(catch_all)]
    Other(u8),
}
