use log::{debug, error, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::Quirks;
use crate::display::Framebuffer;
use crate::error::{Error, Result};
use crate::instruction::{Instruction, decode};
use crate::state::{Address, Chip8State, FONT_ADDR, FONT_HEIGHT, Key, Register};

const INSTRUCTION_SIZE: Address = 2;

/// What a call to [`Chip8::step`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// One instruction ran.
    Advanced,
    /// The machine is blocked on `Fx0A` until a key is pressed.
    Waiting,
    /// The instruction failed. Recoverable errors have already been skipped
    /// over; a fatal error halts the machine until [`Chip8::reset`].
    Error(Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Running,
    WaitingForKey(Register),
    Halted(Error),
}

pub struct Chip8 {
    state: Chip8State,
    quirks: Quirks,
    mode: Mode,
    rng: StdRng,
}

impl Chip8 {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// A machine whose `Cxnn` results are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Chip8 {
            state: Chip8State::new(),
            quirks: Quirks::default(),
            mode: Mode::Running,
            rng,
        }
    }

    pub fn with_quirks(mut self, quirks: Quirks) -> Self {
        self.quirks = quirks;
        self
    }

    /// Writes `program` into memory at 0x200.
    pub fn load(&mut self, program: &[u8]) -> Result<()> {
        self.state.memory.load_program(program)?;
        debug!("Loaded program [size: {}]", program.len());
        Ok(())
    }

    /// Returns to the power-on state. The program has to be loaded again.
    pub fn reset(&mut self) {
        self.state = Chip8State::new();
        self.mode = Mode::Running;
        debug!("Machine reset");
    }

    /// Runs exactly one instruction cycle.
    pub fn step(&mut self) -> Outcome {
        match &self.mode {
            Mode::Halted(reason) => return Outcome::Error(reason.clone()),
            Mode::WaitingForKey(x) => {
                let x = *x;
                return match self.state.keypad.take_latched() {
                    Some(key) => {
                        self.state.registers.write(x, key.index());
                        self.state.pc = self.state.pc.wrapping_add(INSTRUCTION_SIZE);
                        self.mode = Mode::Running;
                        Outcome::Advanced
                    }
                    None => Outcome::Waiting,
                };
            }
            Mode::Running => {}
        }

        let pc = self.state.pc;
        match self.cycle(pc) {
            Ok(next_pc) => {
                self.state.pc = next_pc;
                match self.mode {
                    Mode::WaitingForKey(_) => Outcome::Waiting,
                    _ => Outcome::Advanced,
                }
            }
            Err(err) if !err.is_fatal() => {
                warn!("Skipping instruction at {pc:#05X}: {err}");
                self.state.pc = pc.wrapping_add(INSTRUCTION_SIZE);
                Outcome::Error(err)
            }
            Err(err) => {
                error!("Halting at {pc:#05X}: {err}");
                self.mode = Mode::Halted(err.clone());
                Outcome::Error(err)
            }
        }
    }

    /// Counts both timers down by one. Hosts call this at 60 Hz regardless of
    /// how fast they call [`Chip8::step`].
    pub fn tick_timers(&mut self) {
        self.state.timers.tick();
    }

    pub fn press_key(&mut self, key: Key) {
        self.state.keypad.press_key(key);
    }

    pub fn release_key(&mut self, key: Key) {
        self.state.keypad.release_key(key);
    }

    pub fn display(&self) -> &Framebuffer {
        &self.state.display
    }

    /// Whether the screen changed since the last call.
    pub fn take_redraw(&mut self) -> bool {
        self.state.display.take_dirty()
    }

    pub fn sound_active(&self) -> bool {
        self.state.timers.sound_active()
    }

    pub fn is_waiting_for_key(&self) -> bool {
        matches!(self.mode, Mode::WaitingForKey(_))
    }

    /// The fatal error that stopped the machine, if any.
    pub fn halt_reason(&self) -> Option<&Error> {
        match &self.mode {
            Mode::Halted(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn state(&self) -> &Chip8State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut Chip8State {
        &mut self.state
    }

    fn cycle(&mut self, pc: Address) -> Result<Address> {
        let raw = self.state.memory.read_word(pc)?;
        let instruction = decode(raw)?;
        trace!("{pc:#05X}: {raw:04X} {instruction:?}");
        self.execute(instruction, raw, pc)
    }

    /// Applies `instruction`, fetched from `pc`, and returns the address of
    /// the next instruction.
    fn execute(&mut self, instruction: Instruction, raw: u16, pc: Address) -> Result<Address> {
        let next = pc.wrapping_add(INSTRUCTION_SIZE);
        let skip = next.wrapping_add(INSTRUCTION_SIZE);
        let skip_if = |condition: bool| if condition { skip } else { next };

        let state = &mut self.state;
        let regs = &mut state.registers;

        let next_pc = match instruction {
            Instruction::ClearScreen => {
                state.display.clear();
                next
            }
            Instruction::Return => state.stack.pop(pc)?,
            Instruction::MachineCall { .. } => return Err(Error::UnsupportedOpcode(raw)),
            Instruction::Jump { addr } => addr,
            Instruction::Call { addr } => {
                state.stack.push(next, pc)?;
                addr
            }
            Instruction::SkipEqImm { x, nn } => skip_if(regs.read(x) == nn),
            Instruction::SkipNeqImm { x, nn } => skip_if(regs.read(x) != nn),
            Instruction::SkipEqReg { x, y } => skip_if(regs.read(x) == regs.read(y)),
            Instruction::SkipNeqReg { x, y } => skip_if(regs.read(x) != regs.read(y)),
            Instruction::SetImm { x, nn } => {
                regs.write(x, nn);
                next
            }
            Instruction::AddImm { x, nn } => {
                regs.write(x, regs.read(x).wrapping_add(nn));
                next
            }
            Instruction::Move { x, y } => {
                regs.write(x, regs.read(y));
                next
            }
            Instruction::Or { x, y } => {
                regs.write(x, regs.read(x) | regs.read(y));
                if self.quirks.logic_resets_vf {
                    regs.write(Register::VF, 0);
                }
                next
            }
            Instruction::And { x, y } => {
                regs.write(x, regs.read(x) & regs.read(y));
                if self.quirks.logic_resets_vf {
                    regs.write(Register::VF, 0);
                }
                next
            }
            Instruction::Xor { x, y } => {
                regs.write(x, regs.read(x) ^ regs.read(y));
                if self.quirks.logic_resets_vf {
                    regs.write(Register::VF, 0);
                }
                next
            }
            Instruction::AddReg { x, y } => {
                let (sum, carry) = regs.read(x).overflowing_add(regs.read(y));
                regs.write(x, sum);
                regs.write(Register::VF, u8::from(carry));
                next
            }
            Instruction::Sub { x, y } => {
                let (value_x, value_y) = (regs.read(x), regs.read(y));
                regs.write(x, value_x.wrapping_sub(value_y));
                regs.write(Register::VF, u8::from(value_x >= value_y));
                next
            }
            Instruction::SubReverse { x, y } => {
                let (value_x, value_y) = (regs.read(x), regs.read(y));
                regs.write(x, value_y.wrapping_sub(value_x));
                regs.write(Register::VF, u8::from(value_y >= value_x));
                next
            }
            Instruction::ShiftRight { x, y } => {
                let source = if self.quirks.shift_uses_vy { y } else { x };
                let value = regs.read(source);
                regs.write(x, value >> 1);
                regs.write(Register::VF, value & 0x01);
                next
            }
            Instruction::ShiftLeft { x, y } => {
                let source = if self.quirks.shift_uses_vy { y } else { x };
                let value = regs.read(source);
                regs.write(x, value << 1);
                regs.write(Register::VF, (value >> 7) & 0x01);
                next
            }
            Instruction::SetIndex { addr } => {
                state.index = addr;
                next
            }
            Instruction::JumpWithOffset { addr } => {
                addr.wrapping_add(u16::from(regs.read(Register::V0)))
            }
            Instruction::Random { x, nn } => {
                regs.write(x, self.rng.random::<u8>() & nn);
                next
            }
            Instruction::Draw { x, y, n } => {
                let (origin_x, origin_y) = (regs.read(x), regs.read(y));
                let sprite = state.memory.slice(state.index, usize::from(n))?;
                let collision = state.display.draw_sprite(origin_x, origin_y, sprite);
                regs.write(Register::VF, u8::from(collision));
                next
            }
            Instruction::SkipIfKeyPressed { x } => {
                skip_if(state.keypad.is_key_pressed(Key::from_nibble(regs.read(x))))
            }
            Instruction::SkipIfKeyNotPressed { x } => {
                skip_if(!state.keypad.is_key_pressed(Key::from_nibble(regs.read(x))))
            }
            Instruction::ReadDelayTimer { x } => {
                regs.write(x, state.timers.delay);
                next
            }
            Instruction::WaitForKey { x } => {
                // Only presses that happen from now on count. pc stays on this
                // instruction until one arrives.
                state.keypad.clear_latched();
                self.mode = Mode::WaitingForKey(x);
                pc
            }
            Instruction::SetDelayTimer { x } => {
                state.timers.delay = regs.read(x);
                next
            }
            Instruction::SetSoundTimer { x } => {
                state.timers.sound = regs.read(x);
                next
            }
            Instruction::AddToIndex { x } => {
                state.index = state.index.wrapping_add(u16::from(regs.read(x)));
                next
            }
            Instruction::FontChar { x } => {
                let digit = u16::from(regs.read(x) & 0x0F);
                state.index = FONT_ADDR + digit * FONT_HEIGHT as u16;
                next
            }
            Instruction::BinaryCodedDecimal { x } => {
                let value = regs.read(x);
                let digits = [value / 100, (value / 10) % 10, value % 10];
                state
                    .memory
                    .slice_mut(state.index, digits.len())?
                    .copy_from_slice(&digits);
                next
            }
            Instruction::Store { x } => {
                let values = regs.through(x);
                state
                    .memory
                    .slice_mut(state.index, values.len())?
                    .copy_from_slice(values);
                if self.quirks.memory_increments_index {
                    state.index = state.index.wrapping_add(values.len() as u16);
                }
                next
            }
            Instruction::Load { x } => {
                let len = x.index() + 1;
                let values = state.memory.slice(state.index, len)?;
                regs.through_mut(x).copy_from_slice(values);
                if self.quirks.memory_increments_index {
                    state.index = state.index.wrapping_add(len as u16);
                }
                next
            }
        };
        Ok(next_pc)
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}
