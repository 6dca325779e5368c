//! Host-provided transport capabilities.
//!
//! The relay core never touches hardware. Whatever carries the BMS byte
//! stream (a UART, a PTY, a test harness) implements [`RelayPort`] and the
//! engine drives it cooperatively from [`service`](crate::BmsRelay::service).

use std::collections::VecDeque;
use std::io;

/// The three capabilities the relay engine consumes.
///
/// All operations are non-blocking; the engine is driven by repeated
/// `service()` calls and never sleeps or retries internally.
pub trait RelayPort {
    /// Reads one byte if any is available right now.
    ///
    /// `None` means "no data currently available", not end of stream.
    fn read_byte(&mut self) -> Option<u8>;

    /// Writes one byte to the downstream consumer.
    ///
    /// Implementations must report a zero-length write as an error
    /// (`io::ErrorKind::WriteZero`); the engine does not retry.
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;

    /// Monotonic milliseconds. Only used for stall-timeout bookkeeping.
    fn now_millis(&mut self) -> u64;
}

/// In-memory [`RelayPort`] with a manually advanced clock.
///
/// Backs the integration tests and the `replay` binary; deterministic and
/// allocation-only, no hardware involved.
#[derive(Debug, Default)]
pub struct MemoryPort {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    clock_ms: u64,
}

impl MemoryPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues bytes for the engine to read.
    pub fn push_rx(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    /// Everything the engine has forwarded so far.
    pub fn tx(&self) -> &[u8] {
        &self.tx
    }

    /// Takes the forwarded bytes, leaving the output empty.
    pub fn take_tx(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tx)
    }

    /// Number of input bytes not yet consumed by the engine.
    pub fn pending_rx(&self) -> usize {
        self.rx.len()
    }

    /// Moves the monotonic clock forward.
    pub fn advance_clock(&mut self, ms: u64) {
        self.clock_ms += ms;
    }
}

impl RelayPort for MemoryPort {
    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.tx.push(byte);
        Ok(())
    }

    fn now_millis(&mut self) -> u64 {
        self.clock_ms
    }
}
