mod emulator;

use std::path::PathBuf;

use chip8_vm::config::{DEFAULT_FRAME_RATE, DEFAULT_INSTRUCTIONS_PER_SECOND};
use chip8_vm::{Quirks, Settings};
use clap::Parser;

/// Run a CHIP-8 program in the terminal.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to the program to run.
    rom: PathBuf,

    /// Screen refreshes and timer ticks per second.
    #[arg(long, default_value_t = DEFAULT_FRAME_RATE)]
    frame_rate: u64,

    /// Instructions executed per second.
    #[arg(long, default_value_t = DEFAULT_INSTRUCTIONS_PER_SECOND)]
    ips: u64,

    /// Seed for the random number instruction.
    #[arg(long)]
    seed: Option<u64>,

    /// Shift VY into VX on 8XY6/8XYE.
    #[arg(long)]
    shift_uses_vy: bool,

    /// Reset VF on 8XY1/8XY2/8XY3.
    #[arg(long)]
    logic_resets_vf: bool,

    /// Advance I past the bytes moved by FX55/FX65.
    #[arg(long)]
    memory_increments_index: bool,
}

impl From<Args> for Settings {
    fn from(args: Args) -> Self {
        Settings {
            frame_rate: args.frame_rate,
            ips: args.ips,
            rom: args.rom,
            seed: args.seed,
            quirks: Quirks {
                shift_uses_vy: args.shift_uses_vy,
                logic_resets_vf: args.logic_resets_vf,
                memory_increments_index: args.memory_increments_index,
            },
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut emulator = emulator::Emulator::new(Settings::from(args));
    emulator.run()?;

    Ok(())
}
