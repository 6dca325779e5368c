//! Decoding known packet types into latest-value battery readings.

use std::fmt;

use zerocopy::byteorder::big_endian::{I16, U16, U32};

use crate::packet::PacketView;
use crate::protocol::PacketType;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Cell-voltage slots exposed to callers. The wire payload encodes one
/// more slot than the pack actually has; the extra one is ignored.
pub const CELL_COUNT: usize = 15;

/// Temperature sensors reported by the BMS.
pub const TEMP_SENSOR_COUNT: usize = 5;

// Scale of the raw current register. Observed: raw -24 reads -1.32 A.
const AMPS_PER_LSB: f32 = 0.055;

/// Latest-value readings extracted from the packet stream.
///
/// Owned by the relay engine for its whole lifetime and overwritten
/// whenever a validated packet of the corresponding type passes through.
/// Read-only to external callers; nothing here survives a power cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Telemetry {
    soc_percent: u8,
    current_amps: f32,
    cell_millivolts: [u16; CELL_COUNT],
    temperatures_celsius: [i8; TEMP_SENSOR_COUNT],
    captured_serial: u32,
}

impl Telemetry {
    /// Folds one validated packet into the latest-value state.
    ///
    /// The engine calls this before any rewrite, so the serial number
    /// captured here is always the one the BMS reported.
    pub(crate) fn record(&mut self, packet: &PacketView<'_>) {
        let payload = packet.payload();
        match packet.packet_type() {
            PacketType::Soc => {
                if let Some(&soc) = payload.first() {
                    self.soc_percent = soc;
                }
            }
            PacketType::Current => {
                if payload.len() >= 2 {
                    let raw = I16::from_bytes([payload[0], payload[1]]).get();
                    self.current_amps = f32::from(raw) * AMPS_PER_LSB;
                }
            }
            PacketType::CellVoltages => {
                if payload.len() >= CELL_COUNT * 2 {
                    for (slot, pair) in self.cell_millivolts.iter_mut().zip(payload.chunks_exact(2)) {
                        *slot = U16::from_bytes([pair[0], pair[1]]).get();
                    }
                }
            }
            PacketType::Temperatures => {
                if payload.len() >= TEMP_SENSOR_COUNT {
                    for (slot, &raw) in self.temperatures_celsius.iter_mut().zip(payload) {
                        *slot = raw as i8;
                    }
                }
            }
            PacketType::SerialNumber => {
                if payload.len() >= 4 {
                    self.captured_serial =
                        U32::from_bytes([payload[0], payload[1], payload[2], payload[3]]).get();
                }
            }
            PacketType::Other(_) => {}
        }
    }

    /// Reported state of charge, 0-100.
    pub fn soc_percent(&self) -> u8 {
        self.soc_percent
    }

    /// Battery current in amps; negative while discharging.
    pub fn current_amps(&self) -> f32 {
        self.current_amps
    }

    /// Per-cell voltages in millivolts.
    pub fn cell_millivolts(&self) -> &[u16; CELL_COUNT] {
        &self.cell_millivolts
    }

    /// Total pack voltage, derived as the sum of the exposed cell
    /// readings. Never parsed from a payload field.
    pub fn total_millivolts(&self) -> u32 {
        self.cell_millivolts.iter().map(|&mv| u32::from(mv)).sum()
    }

    /// Per-sensor temperatures in degrees Celsius.
    pub fn temperatures_celsius(&self) -> &[i8; TEMP_SENSOR_COUNT] {
        &self.temperatures_celsius
    }

    /// Truncated integer mean of the temperature sensors.
    pub fn average_temperature_celsius(&self) -> i8 {
        let sum: i32 = self.temperatures_celsius.iter().map(|&t| i32::from(t)).sum();
        (sum / TEMP_SENSOR_COUNT as i32) as i8
    }

    /// Serial number as reported by the BMS, independent of any override.
    pub fn captured_serial(&self) -> u32 {
        self.captured_serial
    }
}

impl fmt::Display for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SOC: {} %, Current: {:.2} A, Pack: {} mV, Avg temp: {} °C, Serial: {:#010X}",
            self.soc_percent,
            self.current_amps,
            self.total_millivolts(),
            self.average_temperature_celsius(),
            self.captured_serial
        )
    }
}
