//! Build with `cargo run --release --bin frame_dump -- <file>`.
//! Prints every frame of a recorded request or response stream.

use clap::Parser;
use prost::Message;
use shared::constants::{FRAME_HEADER_LEN, MAX_FRAME_LEN};
use shared::events::{event_context::Operation, CreateInformation, EventContext, EventInformation};
use std::{fs, path::PathBuf, process::ExitCode};

#[derive(Debug, Parser)]
#[command(name = "frame_dump", about = "Decode a length-prefixed frame file")]
struct Args {
    /// Frame file to decode.
    file: PathBuf,

    /// Frames are `EventContext` requests (default: `EventInformation` responses).
    #[arg(long)]
    requests: bool,
}

fn print_request(bytes: &[u8]) -> Result<(), prost::DecodeError> {
    let evt = EventContext::decode(bytes)?;
    match &evt.operation {
        Some(Operation::Create(c)) => println!(
            "REQ {:6} pid={:5} flags={:#04x} disp={} opts={:#08x} attrs={:#x}  {}",
            evt.serial_number,
            evt.process_id,
            evt.flags,
            c.disposition(),
            c.options(),
            c.file_attributes,
            c.file_name
        ),
        Some(Operation::Other(major)) => {
            println!("REQ {:6} pid={:5} major={:#x}", evt.serial_number, evt.process_id, major)
        }
        None => println!("REQ {:6} <empty>", evt.serial_number),
    }
    Ok(())
}

fn print_response(bytes: &[u8]) -> Result<(), prost::DecodeError> {
    let info = EventInformation::decode(bytes)?;
    let outcome = CreateInformation::from_u32(info.information)
        .map_or_else(|| format!("{}", info.information), |i| format!("{i:?}"));
    println!(
        "RSP {:6} {:?} {}{} token={:#x}",
        info.serial_number,
        info.nt_status(),
        outcome,
        if info.is_directory() { " DIR" } else { "" },
        info.context
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    /*── read file ──────────────────────────────*/
    let raw = match fs::read(&args.file) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("❌ cannot read {}: {e}", args.file.display());
            return ExitCode::FAILURE;
        }
    };

    let mut cursor = 0usize;
    let mut frames = 0usize;

    while cursor < raw.len() {
        /* 1 ▸ length prefix */
        if cursor + FRAME_HEADER_LEN > raw.len() {
            eprintln!("❌ trailing {} byte(s) at {}", raw.len() - cursor, cursor);
            return ExitCode::FAILURE;
        }
        let mut header = [0u8; FRAME_HEADER_LEN];
        header.copy_from_slice(&raw[cursor..cursor + FRAME_HEADER_LEN]);
        let len = u32::from_le_bytes(header) as usize;
        cursor += FRAME_HEADER_LEN;

        if len > MAX_FRAME_LEN || cursor + len > raw.len() {
            eprintln!(
                "❌ incomplete frame at {}: need {} bytes, only {} available",
                cursor,
                len,
                raw.len() - cursor
            );
            return ExitCode::FAILURE;
        }

        /* 2 ▸ decode */
        let bytes = &raw[cursor..cursor + len];
        let decoded = if args.requests { print_request(bytes) } else { print_response(bytes) };
        if let Err(e) = decoded {
            eprintln!("❌ frame {frames} at {cursor}: {e}");
        }

        /* 3 ▸ advance cursor */
        cursor += len;
        frames += 1;
    }

    println!("✅ {frames} frame(s)");
    ExitCode::SUCCESS
}
