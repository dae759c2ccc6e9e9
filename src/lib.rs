//! A CHIP-8 virtual machine.
//!
//! [`Chip8`] owns the whole machine. Hosts drive it through two independent
//! entry points: [`Chip8::step`] runs one instruction, [`Chip8::tick_timers`]
//! counts the delay and sound timers down and is meant to be called at 60 Hz.

pub mod chip8;
pub mod config;
pub mod display;
pub mod error;
pub mod instruction;
pub mod state;

pub use chip8::{Chip8, Outcome};
pub use config::{Quirks, Settings};
pub use display::{DISPLAY_HEIGHT, DISPLAY_WIDTH, Framebuffer};
pub use error::{Error, Result};
pub use state::Key;
