//! Framing state machine: forwarding order, boundary detection, recovery.

mod common;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

use common::*;

#[test]
fn unknown_bytes_forwarded_immediately() {
    let mut relay = relay();
    feed(&mut relay, &[0x01, 0x02, 0x03]);
    assert_eq!(relay.port().pending_rx(), 0);
    assert_eq!(relay.port().tx(), &[0x01, 0x02, 0x03]);
}

#[test]
fn known_packet_forwarded_unchanged() {
    let packet = hex_to_bytes(SERIAL_PACKET);
    let mut relay = relay();
    feed(&mut relay, &packet);
    assert_eq!(relay.port().tx(), packet.as_slice());
    assert_eq!(relay.captured_serial(), 0x0102_0304);
}

#[test]
fn noise_after_known_packet_flushed_in_same_call() {
    let mut stream = hex_to_bytes(SERIAL_PACKET);
    stream.push(0x01);
    let mut relay = relay();
    feed(&mut relay, &stream);
    assert_eq!(relay.port().tx(), stream.as_slice());
}

#[test]
fn noise_before_known_packet_forwarded_first() {
    let mut stream = vec![0x01, 0x02, 0x03];
    stream.extend(hex_to_bytes(SERIAL_PACKET));

    let dispatched: Rc<RefCell<Vec<Vec<u8>>>> = Rc::default();
    let log = Rc::clone(&dispatched);

    let mut relay = relay();
    relay.register_packet_observer(move |_, packet| {
        assert!(packet.is_valid());
        log.borrow_mut().push(packet.as_bytes().to_vec());
    });
    feed(&mut relay, &stream);

    assert_eq!(relay.port().tx(), stream.as_slice());
    assert_eq!(dispatched.borrow().as_slice(), &[hex_to_bytes(SERIAL_PACKET)]);
}

#[test]
fn every_tabled_type_round_trips() {
    let dispatched: Rc<RefCell<Vec<Vec<u8>>>> = Rc::default();
    let log = Rc::clone(&dispatched);

    let mut relay = relay();
    relay.register_packet_observer(move |_, packet| {
        assert!(packet.is_valid());
        log.borrow_mut().push(packet.as_bytes().to_vec());
    });

    for dump in KNOWN_PACKETS {
        let packet = hex_to_bytes(dump);
        feed(&mut relay, &packet);
        assert_eq!(
            dispatched.borrow().last().expect("no packet dispatched"),
            &packet,
            "packet {dump} did not round-trip"
        );
        assert_eq!(relay.port_mut().take_tx(), packet, "forwarded bytes differ for {dump}");
    }
    assert_eq!(dispatched.borrow().len(), KNOWN_PACKETS.len());
}

#[test]
fn partial_header_retained_across_calls() {
    let mut relay = relay();
    feed(&mut relay, &[0xFF, 0x55, 0xAA]);
    assert!(relay.port().tx().is_empty());

    // The held sync bytes stay attached to the packet they begin.
    feed(&mut relay, &hex_to_bytes("03 2b 02 2c"));
    assert_eq!(relay.port().tx(), hex_to_bytes("ff 55 aa 03 2b 02 2c").as_slice());
    assert_eq!(relay.soc_percent(), 43);
}

#[test]
fn abandoned_partial_sync_reemitted_in_order() {
    let mut relay = relay();
    feed(&mut relay, &[0xFF, 0x55, 0x01]);
    assert_eq!(relay.port().tx(), &[0xFF, 0x55, 0x01]);
}

#[test]
fn mismatching_byte_can_restart_the_match() {
    // The second 0xFF both abandons the first candidate and starts the
    // real one.
    let mut stream = vec![0xFF];
    stream.extend(hex_to_bytes("ff 55 aa 03 2b 02 2c"));

    let mut relay = relay();
    feed(&mut relay, &stream);
    assert_eq!(relay.port().tx(), stream.as_slice());
    assert_eq!(relay.soc_percent(), 43);
}

#[test]
fn unknown_type_flushed_up_to_next_sync() {
    // 0x01 is not in the length table; the run ends when the next sync
    // marker appears and the following packet frames normally.
    let stream = hex_to_bytes("ff 55 aa 01 aa bb cc ff 55 aa 03 2b 02 2c");

    let dispatched = Rc::new(RefCell::new(0usize));
    let count = Rc::clone(&dispatched);

    let mut relay = relay();
    relay.register_packet_observer(move |_, _| *count.borrow_mut() += 1);
    feed(&mut relay, &stream);

    assert_eq!(relay.port().tx(), stream.as_slice());
    assert_eq!(*dispatched.borrow(), 1);
    assert_eq!(relay.soc_percent(), 43);
}

#[test]
fn unknown_type_sync_can_reuse_type_byte() {
    // Type 0xFF is unknown and doubles as the first byte of the next
    // sync marker.
    let stream = hex_to_bytes("ff 55 aa ff 55 aa 03 2b 02 2c");
    let mut relay = relay();
    feed(&mut relay, &stream);
    assert_eq!(relay.port().tx(), stream.as_slice());
    assert_eq!(relay.soc_percent(), 43);
}

#[test]
fn unknown_type_accumulates_until_resync() {
    let mut relay = relay();
    feed(&mut relay, &hex_to_bytes("ff 55 aa 01 de ad be ef"));
    // No boundary yet: nothing can be forwarded.
    assert!(relay.port().tx().is_empty());

    feed(&mut relay, &hex_to_bytes("ff 55 aa 03 2b 02 2c"));
    assert_eq!(
        relay.port().tx(),
        hex_to_bytes("ff 55 aa 01 de ad be ef ff 55 aa 03 2b 02 2c").as_slice()
    );
}

#[test]
fn invalid_checksum_forwarded_without_dispatch() {
    let corrupted = hex_to_bytes("ff 55 aa 03 2b 02 ff");

    let dispatched = Rc::new(RefCell::new(0usize));
    let count = Rc::clone(&dispatched);

    let mut relay = relay();
    relay.register_packet_observer(move |_, _| *count.borrow_mut() += 1);
    feed(&mut relay, &corrupted);

    assert_eq!(relay.port().tx(), corrupted.as_slice());
    assert_eq!(*dispatched.borrow(), 0);
    assert_eq!(relay.soc_percent(), 0, "telemetry must not update from a corrupt packet");
}

#[test]
fn observers_run_in_registration_order_before_forwarding() {
    let order: Rc<RefCell<Vec<&'static str>>> = Rc::default();
    let first = Rc::clone(&order);
    let second = Rc::clone(&order);

    let mut relay = relay();
    relay.register_packet_observer(move |_, _| first.borrow_mut().push("first"));
    relay.register_packet_observer(move |telemetry, packet| {
        second.borrow_mut().push("second");
        // Telemetry is already up to date when observers run.
        assert_eq!(telemetry.captured_serial(), 0x0102_0304);
        assert!(packet.is_valid());
    });
    feed(&mut relay, &hex_to_bytes(SERIAL_PACKET));

    assert_eq!(order.borrow().as_slice(), &["first", "second"]);
}

#[test]
fn stalled_candidate_flushed_after_timeout() {
    let mut relay = relay();
    feed(&mut relay, &hex_to_bytes("ff 55 aa 06 01"));
    assert!(relay.port().tx().is_empty());

    relay.port_mut().advance_clock(49);
    relay.service().unwrap();
    assert!(relay.port().tx().is_empty(), "held below the threshold");

    relay.port_mut().advance_clock(1);
    relay.service().unwrap();
    assert_eq!(relay.port().tx(), hex_to_bytes("ff 55 aa 06 01").as_slice());
}

#[test]
fn stall_timeout_can_be_disabled() {
    let mut relay = BmsRelay::new(MemoryPort::new()).with_stall_timeout(None);
    feed(&mut relay, &hex_to_bytes("ff 55 aa 06 01"));
    relay.port_mut().advance_clock(60_000);
    relay.service().unwrap();
    assert!(relay.port().tx().is_empty());
}

#[test]
fn framing_resumes_after_stall_flush() {
    let mut relay = relay();
    feed(&mut relay, &hex_to_bytes("ff 55 aa 06 01"));
    relay.port_mut().advance_clock(50);
    relay.service().unwrap();

    feed(&mut relay, &hex_to_bytes(SERIAL_PACKET));
    let mut expected = hex_to_bytes("ff 55 aa 06 01");
    expected.extend(hex_to_bytes(SERIAL_PACKET));
    assert_eq!(relay.port().tx(), expected.as_slice());
    assert_eq!(relay.captured_serial(), 0x0102_0304);
}

/// Port whose writes can be made to fail, for error-path coverage.
#[derive(Default)]
struct FlakyPort {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    fail_writes: bool,
}

impl RelayPort for FlakyPort {
    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::ErrorKind::WriteZero.into());
        }
        self.tx.push(byte);
        Ok(())
    }

    fn now_millis(&mut self) -> u64 {
        0
    }
}

#[test]
fn write_failure_propagates_and_bytes_are_not_lost() {
    let mut port = FlakyPort::default();
    port.rx.extend([0x01, 0x02, 0x03]);
    port.fail_writes = true;

    let mut relay = BmsRelay::new(port);
    assert!(matches!(relay.service(), Err(RelayError::Io(_))));
    assert!(relay.port().tx.is_empty());

    relay.port_mut().fail_writes = false;
    relay.service().unwrap();
    assert_eq!(relay.port().tx, &[0x01, 0x02, 0x03]);
}
