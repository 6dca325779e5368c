//! Borrowed view over one framed packet.

use num_enum::FromPrimitive;

use crate::checksum;
use crate::error::RelayError;
use crate::protocol::{FRAME_OVERHEAD, PacketType, SYNC, packet_length};

/// Non-owning window over a complete frame (sync through checksum).
///
/// Views alias the relay engine's internal buffer and are only valid for
/// the duration of the observer call that produced them; the storage is
/// recycled as soon as the bytes have been forwarded. The lifetime makes
/// retaining a view past that point a compile error rather than a
/// use-after-free.
#[derive(Debug, Clone, Copy)]
pub struct PacketView<'a> {
    bytes: &'a [u8],
}

impl<'a> PacketView<'a> {
    /// Wraps a byte region, checking only the structural minimum: the sync
    /// prefix and enough room for type and checksum bytes.
    pub fn new(bytes: &'a [u8]) -> Result<Self, RelayError> {
        if bytes.len() < FRAME_OVERHEAD {
            return Err(RelayError::Truncated { len: bytes.len() });
        }
        if bytes[..SYNC.len()] != SYNC {
            return Err(RelayError::BadSync);
        }
        Ok(Self { bytes })
    }

    /// Wraps a region the engine already framed. Callers guarantee the
    /// structural invariants that `new` would check.
    pub(crate) fn over(bytes: &'a [u8]) -> Self {
        debug_assert!(bytes.len() >= FRAME_OVERHEAD && bytes[..SYNC.len()] == SYNC);
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Raw type identifier byte.
    pub fn type_id(&self) -> u8 {
        self.bytes[SYNC.len()]
    }

    pub fn packet_type(&self) -> PacketType {
        PacketType::from_primitive(self.type_id())
    }

    /// Bytes between the type byte and the checksum byte.
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[SYNC.len() + 1..self.bytes.len() - 1]
    }

    /// Trailing integrity byte as found on the wire.
    pub fn checksum(&self) -> u8 {
        self.bytes[self.bytes.len() - 1]
    }

    /// Expected on-wire length for this packet's type, if tabled.
    pub fn expected_length(&self) -> Option<usize> {
        packet_length(self.type_id())
    }

    /// Recomputes the checksum and compares it against the trailing byte.
    ///
    /// Pure: calling this any number of times yields the same result and
    /// mutates nothing.
    pub fn is_valid(&self) -> bool {
        checksum::verify(self.bytes)
    }
}
