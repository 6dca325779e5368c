use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use bmsrelay_rs::{BmsRelay, MemoryPort};
use clap::Parser;

/// Replay a captured BMS byte stream through the relay.
///
/// Reads a hex dump (whitespace ignored), runs it through the framing
/// engine and prints the forwarded stream plus the extracted telemetry.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Hex dump to replay; reads stdin when omitted.
    input: Option<PathBuf>,

    /// Rewrite the BMS serial number in the forwarded stream
    /// (decimal, or hex with an 0x prefix).
    #[arg(long, value_parser = parse_serial)]
    serial_override: Option<u32>,

    /// Print every validated packet as it is dispatched.
    #[arg(long)]
    show_packets: bool,
}

fn parse_serial(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid serial number {s:?}: {e}"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let raw = match &args.input {
        Some(path) => fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buffered = String::new();
            std::io::stdin().read_to_string(&mut buffered)?;
            buffered
        }
    };
    let stream = hex::decode(raw.split_whitespace().collect::<String>())
        .context("input is not a valid hex dump")?;

    let mut port = MemoryPort::new();
    port.push_rx(&stream);

    let mut relay = BmsRelay::new(port);
    if let Some(serial) = args.serial_override {
        relay.set_serial_override(serial);
    }
    if args.show_packets {
        relay.register_packet_observer(|_, packet| {
            println!("{:>13}  {}", packet.packet_type().to_string(), hex::encode(packet.as_bytes()));
        });
    }

    relay.service()?;

    let forwarded = relay.port_mut().take_tx();
    println!("forwarded: {}", hex::encode(&forwarded));
    println!("{}", relay.telemetry());
    Ok(())
}
