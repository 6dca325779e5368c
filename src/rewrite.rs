//! In-flight payload rewriting.

use num_enum::FromPrimitive;

use crate::protocol::PacketType;

/// Width of the big-endian serial-number field at the start of the payload.
const SERIAL_FIELD_LEN: usize = 4;

/// Rewrites the BMS serial number inside serial packets before forwarding.
///
/// With no override configured this is a no-op. The trailing payload byte
/// is never touched; the caller reseals the checksum when a mutation is
/// reported.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialRewriter {
    override_value: Option<u32>,
}

impl SerialRewriter {
    pub fn set_override(&mut self, serial: u32) {
        self.override_value = Some(serial);
    }

    pub fn override_value(&self) -> Option<u32> {
        self.override_value
    }

    /// Mutates `payload` in place; returns whether anything was written.
    pub fn rewrite(&self, type_id: u8, payload: &mut [u8]) -> bool {
        let Some(serial) = self.override_value else {
            return false;
        };
        if PacketType::from_primitive(type_id) != PacketType::SerialNumber
            || payload.len() < SERIAL_FIELD_LEN
        {
            return false;
        }
        payload[..SERIAL_FIELD_LEN].copy_from_slice(&serial.to_be_bytes());
        true
    }
}
