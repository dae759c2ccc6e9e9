use crate::display::Framebuffer;
use crate::error::{Error, Result};

pub type Timer = u8;
pub type Address = u16;

pub const MEM_SIZE: usize = 4096;
pub const FONT_ADDR: Address = 0x50;
pub const FONT_HEIGHT: usize = 5;
pub const PC_START_ADDR: Address = 0x200;
pub const NUM_REGISTERS: usize = 16;
pub const NUM_KEYS: usize = 16;
pub const STACK_DEPTH: usize = 16;

pub const FONT_DATA: [u8; 16 * FONT_HEIGHT] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

pub struct Memory {
    data: [u8; MEM_SIZE],
}
impl Memory {
    pub fn new() -> Self {
        let data = {
            let mut data = [0; MEM_SIZE];
            let font = usize::from(FONT_ADDR);
            data[font..font + FONT_DATA.len()].copy_from_slice(&FONT_DATA);
            data
        };

        Memory { data }
    }

    pub fn read(&self, addr: Address) -> Result<u8> {
        self.data
            .get(usize::from(addr))
            .copied()
            .ok_or(Error::MemoryOutOfRange {
                addr: usize::from(addr),
            })
    }

    pub fn write(&mut self, addr: Address, value: u8) -> Result<()> {
        let cell = self
            .data
            .get_mut(usize::from(addr))
            .ok_or(Error::MemoryOutOfRange {
                addr: usize::from(addr),
            })?;
        *cell = value;
        Ok(())
    }

    /// Reads the big-endian instruction word at `addr`.
    pub fn read_word(&self, addr: Address) -> Result<u16> {
        let bytes = self.slice(addr, 2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn slice(&self, addr: Address, len: usize) -> Result<&[u8]> {
        let range = Self::checked_range(addr, len)?;
        Ok(&self.data[range])
    }

    pub fn slice_mut(&mut self, addr: Address, len: usize) -> Result<&mut [u8]> {
        let range = Self::checked_range(addr, len)?;
        Ok(&mut self.data[range])
    }

    pub fn load_program(&mut self, program: &[u8]) -> Result<()> {
        let start = usize::from(PC_START_ADDR);
        let max = MEM_SIZE - start;
        if program.len() > max {
            return Err(Error::LoadTooLarge {
                size: program.len(),
                max,
            });
        }
        self.data[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }

    fn checked_range(addr: Address, len: usize) -> Result<std::ops::Range<usize>> {
        let start = usize::from(addr);
        let end = start + len;
        if end > MEM_SIZE {
            // Report the first byte that falls outside memory.
            return Err(Error::MemoryOutOfRange {
                addr: start.max(MEM_SIZE),
            });
        }
        Ok(start..end)
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Register {
    V0,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
    V7,
    V8,
    V9,
    VA,
    VB,
    VC,
    VD,
    VE,
    VF,
}
impl Register {
    /// Maps the low nibble of `value` to its register.
    pub fn from_nibble(value: u16) -> Self {
        match value & 0x0F {
            0x0 => Register::V0,
            0x1 => Register::V1,
            0x2 => Register::V2,
            0x3 => Register::V3,
            0x4 => Register::V4,
            0x5 => Register::V5,
            0x6 => Register::V6,
            0x7 => Register::V7,
            0x8 => Register::V8,
            0x9 => Register::V9,
            0xA => Register::VA,
            0xB => Register::VB,
            0xC => Register::VC,
            0xD => Register::VD,
            0xE => Register::VE,
            _ => Register::VF,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

pub struct RegisterBank {
    registers: [u8; NUM_REGISTERS],
}
impl RegisterBank {
    pub fn new() -> Self {
        RegisterBank {
            registers: [0; NUM_REGISTERS],
        }
    }

    pub fn read(&self, reg: Register) -> u8 {
        self.registers[reg.index()]
    }

    pub fn write(&mut self, reg: Register, value: u8) {
        self.registers[reg.index()] = value;
    }

    /// Registers `V0` through `last`, inclusive.
    pub fn through(&self, last: Register) -> &[u8] {
        &self.registers[..=last.index()]
    }

    pub fn through_mut(&mut self, last: Register) -> &mut [u8] {
        &mut self.registers[..=last.index()]
    }
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new()
    }
}

/// Saved return addresses, bounded to [`STACK_DEPTH`] frames.
#[derive(Default)]
pub struct CallStack {
    frames: Vec<Address>,
}
impl CallStack {
    pub fn new() -> Self {
        CallStack {
            frames: Vec::with_capacity(STACK_DEPTH),
        }
    }

    /// `pc` is the address of the call instruction, used for error reporting.
    pub fn push(&mut self, return_addr: Address, pc: Address) -> Result<()> {
        if self.frames.len() >= STACK_DEPTH {
            return Err(Error::StackOverflow { pc });
        }
        self.frames.push(return_addr);
        Ok(())
    }

    pub fn pop(&mut self, pc: Address) -> Result<Address> {
        self.frames.pop().ok_or(Error::StackUnderflow { pc })
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// The delay and sound counters. Only [`Timers::tick`] counts them down.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timers {
    pub delay: Timer,
    pub sound: Timer,
}
impl Timers {
    pub fn tick(&mut self) {
        self.delay = self.delay.saturating_sub(1);
        self.sound = self.sound.saturating_sub(1);
    }

    pub fn sound_active(&self) -> bool {
        self.sound > 0
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Key {
    Key0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF,
}
impl Key {
    /// Maps the low nibble of `value` to its key.
    pub fn from_nibble(value: u8) -> Key {
        match value & 0x0F {
            0x0 => Key::Key0,
            0x1 => Key::Key1,
            0x2 => Key::Key2,
            0x3 => Key::Key3,
            0x4 => Key::Key4,
            0x5 => Key::Key5,
            0x6 => Key::Key6,
            0x7 => Key::Key7,
            0x8 => Key::Key8,
            0x9 => Key::Key9,
            0xA => Key::KeyA,
            0xB => Key::KeyB,
            0xC => Key::KeyC,
            0xD => Key::KeyD,
            0xE => Key::KeyE,
            _ => Key::KeyF,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}

/// Sixteen key slots written by the host. A key going from released to
/// pressed is latched so a waiting `Fx0A` can pick it up on a later cycle.
#[derive(Default)]
pub struct Keypad {
    pressed: [bool; NUM_KEYS],
    latched: Option<Key>,
}
impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press_key(&mut self, key: Key) {
        let slot = &mut self.pressed[usize::from(key.index())];
        if !*slot {
            self.latched = Some(key);
        }
        *slot = true;
    }

    pub fn release_key(&mut self, key: Key) {
        self.pressed[usize::from(key.index())] = false;
    }

    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.pressed[usize::from(key.index())]
    }

    pub fn take_latched(&mut self) -> Option<Key> {
        self.latched.take()
    }

    pub fn clear_latched(&mut self) {
        self.latched = None;
    }
}

pub struct Chip8State {
    pub memory: Memory,
    pub registers: RegisterBank,
    pub pc: Address,
    pub index: Address,
    pub stack: CallStack,
    pub timers: Timers,
    pub display: Framebuffer,
    pub keypad: Keypad,
}
impl Chip8State {
    pub fn new() -> Self {
        Chip8State {
            memory: Memory::new(),
            registers: RegisterBank::new(),
            pc: PC_START_ADDR,
            index: 0,
            stack: CallStack::new(),
            timers: Timers::default(),
            display: Framebuffer::new(),
            keypad: Keypad::new(),
        }
    }
}

impl Default for Chip8State {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_is_loaded_at_creation() {
        let memory = Memory::new();
        assert_eq!(memory.slice(FONT_ADDR, 5).unwrap(), &[0xF0, 0x90, 0x90, 0x90, 0xF0]);
        // Glyph F is the last one.
        assert_eq!(memory.read(FONT_ADDR + 75).unwrap(), 0xF0);
        assert_eq!(memory.read(FONT_ADDR + 79).unwrap(), 0x80);
        assert_eq!(memory.slice(PC_START_ADDR, 8).unwrap(), &[0; 8]);
    }

    #[test]
    fn program_is_loaded_at_0x200() {
        let mut memory = Memory::new();
        memory.load_program(&[0x00, 0xE0, 0x12, 0x00]).unwrap();
        assert_eq!(memory.read_word(0x200).unwrap(), 0x00E0);
        assert_eq!(memory.read_word(0x202).unwrap(), 0x1200);
    }

    #[test]
    fn program_filling_memory_exactly_loads() {
        let mut memory = Memory::new();
        let program = vec![0xAB; MEM_SIZE - 0x200];
        memory.load_program(&program).unwrap();
        assert_eq!(memory.read(0xFFF).unwrap(), 0xAB);
    }

    #[test]
    fn oversized_program_is_rejected() {
        let mut memory = Memory::new();
        let program = vec![0xAB; MEM_SIZE - 0x200 + 1];
        assert_eq!(
            memory.load_program(&program),
            Err(Error::LoadTooLarge {
                size: 3585,
                max: 3584
            })
        );
        assert_eq!(memory.read(0x200).unwrap(), 0);
    }

    #[test]
    fn accesses_past_the_end_fail() {
        let mut memory = Memory::new();
        assert_eq!(
            memory.read(0x1000),
            Err(Error::MemoryOutOfRange { addr: 0x1000 })
        );
        assert_eq!(
            memory.write(0x1234, 1),
            Err(Error::MemoryOutOfRange { addr: 0x1234 })
        );
        assert_eq!(
            memory.read_word(0xFFF),
            Err(Error::MemoryOutOfRange { addr: 0x1000 })
        );
        assert!(memory.slice(0xFFD, 3).is_ok());
        assert!(memory.slice_mut(0xFFE, 3).is_err());
    }

    #[test]
    fn register_nibbles() {
        assert_eq!(Register::from_nibble(0x0), Register::V0);
        assert_eq!(Register::from_nibble(0xA), Register::VA);
        assert_eq!(Register::from_nibble(0x1F), Register::VF);
        assert_eq!(Register::VF.index(), 15);
    }

    #[test]
    fn register_ranges_are_inclusive() {
        let mut registers = RegisterBank::new();
        registers.through_mut(Register::V2).copy_from_slice(&[1, 2, 3]);
        assert_eq!(registers.through(Register::V2), &[1, 2, 3]);
        assert_eq!(registers.read(Register::V3), 0);
        assert_eq!(registers.through(Register::VF).len(), 16);
    }

    #[test]
    fn stack_is_bounded() {
        let mut stack = CallStack::new();
        for i in 0..STACK_DEPTH as u16 {
            stack.push(0x200 + 2 * i, 0x300).unwrap();
        }
        assert_eq!(
            stack.push(0x400, 0x300),
            Err(Error::StackOverflow { pc: 0x300 })
        );
        assert_eq!(stack.depth(), STACK_DEPTH);
        assert_eq!(stack.pop(0x300), Ok(0x21E));
    }

    #[test]
    fn empty_stack_underflows() {
        let mut stack = CallStack::new();
        assert_eq!(stack.pop(0x204), Err(Error::StackUnderflow { pc: 0x204 }));
    }

    #[test]
    fn timers_floor_at_zero() {
        let mut timers = Timers { delay: 5, sound: 1 };
        timers.tick();
        assert_eq!(timers, Timers { delay: 4, sound: 0 });
        assert!(!timers.sound_active());
        for _ in 0..10 {
            timers.tick();
        }
        assert_eq!(timers, Timers::default());
    }

    #[test]
    fn keypad_latches_fresh_presses_only() {
        let mut keypad = Keypad::new();
        keypad.press_key(Key::KeyA);
        assert!(keypad.is_key_pressed(Key::KeyA));
        assert!(!keypad.is_key_pressed(Key::KeyB));
        assert_eq!(keypad.take_latched(), Some(Key::KeyA));

        // Holding a key down does not latch it again.
        keypad.press_key(Key::KeyA);
        assert_eq!(keypad.take_latched(), None);

        keypad.release_key(Key::KeyA);
        keypad.press_key(Key::KeyA);
        assert_eq!(keypad.take_latched(), Some(Key::KeyA));
    }

    #[test]
    fn key_nibbles() {
        assert_eq!(Key::from_nibble(0x3), Key::Key3);
        assert_eq!(Key::from_nibble(0x1C), Key::KeyC);
        assert_eq!(Key::KeyF.index(), 15);
    }
}
