//! Shared harness for relay integration tests.

// Not every helper is used by every test file.
#[allow(unused_imports)]
pub use bmsrelay_rs::{BmsRelay, MemoryPort, PacketView, RelayError, RelayPort, Telemetry};

/// Decode a whitespace-separated hex dump for golden vectors.
#[allow(dead_code)]
pub fn hex_to_bytes(dump: &str) -> Vec<u8> {
    hex::decode(dump.split_whitespace().collect::<String>()).expect("failed to decode hex")
}

/// Fresh engine over an in-memory port.
#[allow(dead_code)]
pub fn relay() -> BmsRelay<MemoryPort> {
    BmsRelay::new(MemoryPort::new())
}

/// Queue bytes and run one service pass.
#[allow(dead_code)]
pub fn feed(relay: &mut BmsRelay<MemoryPort>, bytes: &[u8]) {
    relay.port_mut().push_rx(bytes);
    relay.service().expect("service failed");
}

/// One valid captured packet per entry of the fixed type-length table.
#[allow(dead_code)]
pub const KNOWN_PACKETS: &[&str] = &[
    "ff 55 aa 00 80 02 7e",
    "ff 55 aa 02 0f 28 0f 2c 0f 2b 0f 29 0f 2a 0f 2b 0f 2a 0f 2c 0f 29 0f 2b 0f 29 0f 2a 0f 22 0f 2a 0f 2a 00 2a 05 7b",
    "ff 55 aa 03 29 02 2a",
    "ff 55 aa 04 16 17 17 17 18 02 75",
    "ff 55 aa 05 00 01 02 04",
    "ff 55 aa 06 08 04 02 01 02 13",
    "ff 55 aa 07 10 cc 10 57 09 c4 50 04 65",
    "ff 55 aa 08 06 02 0c",
    "ff 55 aa 09 03 02 0a",
    "ff 55 aa 0b 0b c0 02 d4",
    "ff 55 aa 0c 00 00 02 0a",
    "ff 55 aa 0d 02 da 47 03 2e",
    "ff 55 aa 0f 02 00 00 00 00 02 0f",
    "ff 55 aa 10 03 03 0b 03 03 03 03 03 03 03 02 34",
    "ff 55 aa 11 00 00 00 00 02 0f",
];

/// Serial-number packet used across the framing and rewrite tests.
#[allow(dead_code)]
pub const SERIAL_PACKET: &str = "ff 55 aa 06 01 02 03 04 02 0e";
