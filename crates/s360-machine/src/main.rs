//! Headless System/360 runner binary.
//!
//! The SDL panel GUI, its switches/dials/lamps, and the disassembler
//! pretty-printer are out of scope here (external collaborators); this
//! binary runs a configured machine for a fixed number of macro-cycles or
//! until it halts, for diagnostics and batch program execution.

use device_1050_console::Console1050;
use device_1442_reader_punch::CardReaderPunch;
use device_1443_printer::{fcb::Fcb, Printer1443};
use device_2415_tape::{Record, Tape2415};
use s360_channel::Device;
use s360_cpu2030::Store;
use s360_machine::config::DeviceConfig;
use s360_machine::{config, System360};
use std::process;

/// Build and return one attachable device from a `DEV` directive, reading
/// its backing media from `cfg.file` if given. Unrecognized `TYPE` values
/// are reported to the caller rather than silently skipped.
fn build_device(cfg: &DeviceConfig) -> Result<Box<dyn Device>, String> {
    match cfg.device_type.as_str() {
        "1443" => Ok(Box::new(Printer1443::new(cfg.address, Fcb::single_spaced()))),
        "1442" => {
            let deck = match &cfg.file {
                Some(path) => load_card_deck(path)?,
                None => Vec::new(),
            };
            Ok(Box::new(CardReaderPunch::new(cfg.address, deck)))
        }
        "2415" => {
            let reel = match &cfg.file {
                Some(path) => vec![Record::Data(
                    std::fs::read(path).map_err(|e| format!("{path}: {e}"))?,
                )],
                None => Vec::new(),
            };
            Ok(Box::new(Tape2415::new(cfg.address, reel)))
        }
        "1050" => {
            let mut console = Console1050::new(cfg.address);
            if let Some(path) = &cfg.file {
                let text = std::fs::read_to_string(path).map_err(|e| format!("{path}: {e}"))?;
                for line in text.lines() {
                    console.key_in(line.bytes().collect());
                }
            }
            Ok(Box::new(console))
        }
        other => Err(format!(
            "DEV ADDR={:03X}: unknown TYPE {other:?}",
            cfg.address
        )),
    }
}

/// One 80-column card per non-empty text line, space-padded/truncated,
/// raw bytes rather than EBCDIC-translated (this binary's config loader
/// doesn't carry a host-charset translation table; devices are agnostic
/// to what the bytes mean).
fn load_card_deck(path: &str) -> Result<Vec<[u8; 80]>, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("{path}: {e}"))?;
    Ok(text
        .lines()
        .map(|line| {
            let mut card = [0x20u8; 80];
            for (i, b) in line.bytes().enumerate().take(80) {
                card[i] = b;
            }
            card
        })
        .collect())
}

struct CliArgs {
    config_path: Option<String>,
    max_cycles: u64,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        config_path: None,
        max_cycles: 1_000_000,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                cli.config_path = args.get(i).cloned();
            }
            "--max-cycles" => {
                i += 1;
                cli.max_cycles = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(cli.max_cycles);
            }
            other => {
                eprintln!("unrecognized argument: {other}");
                process::exit(2);
            }
        }
        i += 1;
    }
    cli
}

fn main() {
    let cli = parse_args();

    let Some(config_path) = cli.config_path else {
        eprintln!("usage: s360 --config <path> [--max-cycles <n>]");
        process::exit(2);
    };

    let text = match std::fs::read_to_string(&config_path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("failed to read {config_path}: {e}");
            process::exit(1);
        }
    };

    let cfg = match config::parse(&text) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("configuration error: {e}");
            process::exit(1);
        }
    };

    let store = Store::new(cfg.mem_kb * 1024);
    let mut system = System360::new(store);

    for dev_cfg in &cfg.devices {
        match build_device(dev_cfg) {
            Ok(device) => system.channels.attach(device),
            Err(e) => {
                eprintln!("device configuration error: {e}");
                process::exit(1);
            }
        }
    }

    let mut cycles = 0u64;
    while !system.halted && cycles < cli.max_cycles {
        system.macro_cycle();
        cycles += 1;
    }

    println!("halted after {cycles} cycles at IA={:#08X}", system.engine.psw.ia);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(device_type: &str) -> DeviceConfig {
        DeviceConfig {
            address: 0x00B,
            device_type: device_type.to_string(),
            file: None,
            start: false,
        }
    }

    #[test]
    fn builds_one_device_per_known_type() {
        for t in ["1443", "1442", "2415", "1050"] {
            let device = build_device(&dev(t)).unwrap();
            assert_eq!(device.address(), 0x00B);
        }
    }

    #[test]
    fn unknown_type_is_a_configuration_error() {
        assert!(build_device(&dev("9999")).is_err());
    }

    #[test]
    fn loading_a_card_deck_pads_short_lines() {
        let dir = std::env::temp_dir();
        let path = dir.join("s360_test_deck.txt");
        std::fs::write(&path, "HI\n").unwrap();
        let deck = load_card_deck(path.to_str().unwrap()).unwrap();
        assert_eq!(deck.len(), 1);
        assert_eq!(&deck[0][..2], b"HI");
        assert_eq!(deck[0][2], 0x20);
        std::fs::remove_file(&path).unwrap();
    }
}
