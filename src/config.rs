use std::path::PathBuf;

pub const DEFAULT_FRAME_RATE: u64 = 60;
pub const DEFAULT_INSTRUCTIONS_PER_SECOND: u64 = 700;

/// Behaviors that differ between CHIP-8 interpreters. The default is the
/// canonical instruction set with every quirk switched off.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Quirks {
    /// `8xy6`/`8xyE` shift `Vy` into `Vx` instead of shifting `Vx` in place.
    pub shift_uses_vy: bool,
    /// `8xy1`/`8xy2`/`8xy3` reset `VF` to 0.
    pub logic_resets_vf: bool,
    /// `Fx55`/`Fx65` leave `I` pointing past the last byte transferred.
    pub memory_increments_index: bool,
}

pub struct Settings {
    pub frame_rate: u64,
    pub ips: u64,
    pub rom: PathBuf,
    pub seed: Option<u64>,
    pub quirks: Quirks,
}
impl Settings {
    pub fn new(rom: PathBuf) -> Self {
        Settings {
            frame_rate: DEFAULT_FRAME_RATE,
            ips: DEFAULT_INSTRUCTIONS_PER_SECOND,
            rom,
            seed: None,
            quirks: Quirks::default(),
        }
    }

    /// Number of instructions run between two timer ticks; at least one.
    pub fn instructions_per_frame(&self) -> u64 {
        (self.ips / self.frame_rate.max(1)).max(1)
    }
}
