//! In-line relay for a proprietary BMS serial protocol.
//!
//! Sits between a battery management system and its downstream consumer
//! (display or charger), forwarding the byte stream unchanged while
//! recognizing known packet types, extracting telemetry (state of charge,
//! current, per-cell voltages, temperatures, serial number) and optionally
//! rewriting the BMS serial number in flight, resealing the checksum
//! before the packet leaves.
//!
//! The core is transport-agnostic: the host supplies a [`RelayPort`]
//! (read-one-byte-or-none, write-one-byte, monotonic clock) and drives the
//! engine by calling [`BmsRelay::service`] at its own cadence.
//!
//! # Example
//!
//! ```rust
//! use bmsrelay_rs::{BmsRelay, MemoryPort};
//!
//! let mut port = MemoryPort::new();
//! // A state-of-charge packet reporting 43 %.
//! port.push_rx(&[0xFF, 0x55, 0xAA, 0x03, 0x2B, 0x02, 0x2C]);
//!
//! let mut relay = BmsRelay::new(port);
//! relay.service().unwrap();
//!
//! assert_eq!(relay.soc_percent(), 43);
//! assert_eq!(relay.port().tx(), &[0xFF, 0x55, 0xAA, 0x03, 0x2B, 0x02, 0x2C]);
//! ```

pub mod checksum;
pub mod error;
pub mod packet;
pub mod protocol;
pub mod relay;
pub mod rewrite;
pub mod telemetry;
pub mod transport;

pub use error::RelayError;
pub use packet::PacketView;
pub use relay::BmsRelay;
pub use telemetry::Telemetry;
pub use transport::{MemoryPort, RelayPort};
