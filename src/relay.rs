//! The relay engine: framing state machine and packet dispatch.
//!
//! Framing walks SCAN → SYNC1/SYNC2 → TYPE_PENDING → BUFFER_KNOWN or
//! BUFFER_UNKNOWN → dispatch → SCAN. The state is carried implicitly by
//! the accumulation buffer: fewer than three held bytes is a partial sync
//! match, exactly three means the type byte is pending, and past that
//! `expected_len` distinguishes a table hit from an unknown type.
//!
//! Every input byte leaves through the output port exactly once, in order:
//! either inside a validated (possibly rewritten) packet or verbatim the
//! moment it provably cannot belong to one.

use bytes::{Buf, BufMut, BytesMut};
use tracing::{debug, trace};

use crate::checksum;
use crate::error::RelayError;
use crate::packet::PacketView;
use crate::protocol::{SYNC, packet_length};
use crate::rewrite::SerialRewriter;
use crate::telemetry::Telemetry;
use crate::transport::RelayPort;

/// Default hold time for an incomplete candidate before it is flushed as
/// raw bytes. Guards against an upstream that dies mid-packet.
pub const DEFAULT_STALL_TIMEOUT_MS: u64 = 50;

type PacketObserver = Box<dyn FnMut(&Telemetry, &PacketView<'_>)>;

/// In-line relay between a BMS and its downstream consumer.
///
/// Owns the transport port, the internal framing buffer and the extracted
/// [`Telemetry`]. Single-threaded and cooperative: the host calls
/// [`service`](Self::service) at its own cadence, and the engine never
/// blocks, sleeps or retries internally.
pub struct BmsRelay<P: RelayPort> {
    port: P,
    /// Layout: `[committed raw bytes | current candidate]`. The raw prefix
    /// holds output the port refused; it is only non-empty after a failed
    /// write and drains before anything else happens.
    buf: BytesMut,
    raw_len: usize,
    /// Total on-wire length once the type byte hit the length table.
    expected_len: Option<usize>,
    telemetry: Telemetry,
    rewriter: SerialRewriter,
    observers: Vec<PacketObserver>,
    stall_timeout_ms: Option<u64>,
    last_rx_millis: u64,
}

impl<P: RelayPort> BmsRelay<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            buf: BytesMut::new(),
            raw_len: 0,
            expected_len: None,
            telemetry: Telemetry::default(),
            rewriter: SerialRewriter::default(),
            observers: Vec::new(),
            stall_timeout_ms: Some(DEFAULT_STALL_TIMEOUT_MS),
            last_rx_millis: 0,
        }
    }

    /// Sets the stall timeout at construction time; `None` disables it.
    pub fn with_stall_timeout(mut self, timeout_ms: Option<u64>) -> Self {
        self.stall_timeout_ms = timeout_ms;
        self
    }

    pub fn set_stall_timeout(&mut self, timeout_ms: Option<u64>) {
        self.stall_timeout_ms = timeout_ms;
    }

    /// From now on every serial-number packet leaves with this serial, the
    /// checksum resealed to match. The BMS-reported serial is still
    /// captured into telemetry.
    pub fn set_serial_override(&mut self, serial: u32) {
        self.rewriter.set_override(serial);
    }

    pub fn serial_override(&self) -> Option<u32> {
        self.rewriter.override_value()
    }

    /// Registers a packet observer.
    ///
    /// Observers run in registration order, exactly once per validated
    /// packet, after telemetry extraction and any rewrite but before the
    /// bytes are forwarded. The view must not be retained past the call;
    /// the borrow enforces that.
    pub fn register_packet_observer<F>(&mut self, observer: F)
    where
        F: FnMut(&Telemetry, &PacketView<'_>) + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn captured_serial(&self) -> u32 {
        self.telemetry.captured_serial()
    }

    pub fn soc_percent(&self) -> u8 {
        self.telemetry.soc_percent()
    }

    pub fn current_amps(&self) -> f32 {
        self.telemetry.current_amps()
    }

    pub fn cell_millivolts(&self) -> &[u16; crate::telemetry::CELL_COUNT] {
        self.telemetry.cell_millivolts()
    }

    pub fn total_millivolts(&self) -> u32 {
        self.telemetry.total_millivolts()
    }

    pub fn temperatures_celsius(&self) -> &[i8; crate::telemetry::TEMP_SENSOR_COUNT] {
        self.telemetry.temperatures_celsius()
    }

    pub fn average_temperature_celsius(&self) -> i8 {
        self.telemetry.average_temperature_celsius()
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Drains all currently available input, advancing the framing state
    /// machine and forwarding output as boundaries resolve.
    ///
    /// Returns when the port reports no data; partially accumulated state
    /// survives until the next call. A write failure surfaces as
    /// [`RelayError::Io`]; the affected bytes stay queued and the next
    /// call retries them before reading further input.
    pub fn service(&mut self) -> Result<(), RelayError> {
        self.drain_raw()?;
        while let Some(byte) = self.port.read_byte() {
            self.last_rx_millis = self.port.now_millis();
            self.accept(byte)?;
        }
        self.check_stall()
    }

    /// Advances the state machine by one input byte.
    fn accept(&mut self, byte: u8) -> Result<(), RelayError> {
        let held = self.candidate_len();
        if held < SYNC.len() {
            if byte == SYNC[held] {
                self.buf.put_u8(byte);
            } else if byte == SYNC[0] {
                // Abandoned partial match: the held prefix goes out
                // verbatim, this byte restarts the match.
                self.commit_candidate()?;
                self.buf.put_u8(byte);
            } else {
                self.buf.put_u8(byte);
                self.commit_candidate()?;
            }
            return Ok(());
        }
        if held == SYNC.len() {
            // Type byte. A table hit fixes the total length; otherwise we
            // accumulate until a fresh sync marker shows up.
            self.expected_len = packet_length(byte);
            self.buf.put_u8(byte);
            return Ok(());
        }
        self.buf.put_u8(byte);
        match self.expected_len {
            Some(total) if self.candidate_len() == total => self.finish_packet(),
            Some(_) => Ok(()),
            None => self.resync_unknown(),
        }
    }

    /// A known-type candidate reached its tabled length: validate,
    /// extract, rewrite, dispatch, forward.
    fn finish_packet(&mut self) -> Result<(), RelayError> {
        if !checksum::verify(self.candidate()) {
            debug!(
                type_id = self.candidate()[SYNC.len()],
                len = self.candidate_len(),
                "checksum mismatch, forwarding region verbatim"
            );
            return self.commit_candidate();
        }

        let raw_len = self.raw_len;

        // Telemetry sees the packet before any rewrite so the captured
        // serial is the one the BMS reported.
        let view = PacketView::over(&self.buf[raw_len..]);
        self.telemetry.record(&view);

        let frame_end = self.buf.len();
        let frame = &mut self.buf[raw_len..frame_end];
        let type_id = frame[SYNC.len()];
        let payload_end = frame.len() - 1;
        if self.rewriter.rewrite(type_id, &mut frame[SYNC.len() + 1..payload_end]) {
            checksum::seal(frame);
            trace!(type_id, "serial field rewritten, checksum resealed");
        }

        let view = PacketView::over(&self.buf[raw_len..]);
        trace!(packet_type = %view.packet_type(), len = view.len(), "dispatching packet");
        let telemetry = &self.telemetry;
        for observer in self.observers.iter_mut() {
            observer(telemetry, &view);
        }

        self.commit_candidate()
    }

    /// Unknown-type accumulation: watch the trailing window for a fresh
    /// sync occurrence and split the run there.
    fn resync_unknown(&mut self) -> Result<(), RelayError> {
        let candidate = self.candidate();
        if candidate.len() > SYNC.len() && candidate.ends_with(&SYNC) {
            let run = candidate.len() - SYNC.len();
            trace!(run, "unknown-type run ended by a fresh sync marker");
            self.commit_front(run)?;
            // The matched sync bytes stay held; the next byte is the new
            // candidate's type byte.
        }
        Ok(())
    }

    /// Flushes an incomplete candidate once the upstream has been silent
    /// for longer than the configured threshold.
    fn check_stall(&mut self) -> Result<(), RelayError> {
        let Some(timeout) = self.stall_timeout_ms else {
            return Ok(());
        };
        if self.candidate_len() == 0 {
            return Ok(());
        }
        let now = self.port.now_millis();
        if now.saturating_sub(self.last_rx_millis) >= timeout {
            debug!(held = self.candidate_len(), "stalled mid-packet, flushing held bytes");
            return self.commit_candidate();
        }
        Ok(())
    }

    fn candidate(&self) -> &[u8] {
        &self.buf[self.raw_len..]
    }

    fn candidate_len(&self) -> usize {
        self.buf.len() - self.raw_len
    }

    /// Commits the first `n` candidate bytes as raw output and writes them.
    fn commit_front(&mut self, n: usize) -> Result<(), RelayError> {
        self.raw_len += n;
        self.drain_raw()
    }

    /// Commits the whole candidate; framing restarts at SCAN.
    fn commit_candidate(&mut self) -> Result<(), RelayError> {
        self.expected_len = None;
        let n = self.candidate_len();
        self.commit_front(n)
    }

    /// Writes out the committed raw prefix one byte at a time. On failure
    /// the unwritten remainder stays queued for the next `service()` call.
    fn drain_raw(&mut self) -> Result<(), RelayError> {
        while self.raw_len > 0 {
            let byte = self.buf[0];
            self.port.write_byte(byte)?;
            self.buf.advance(1);
            self.raw_len -= 1;
        }
        Ok(())
    }
}
