use crate::error::{Error, Result};
use crate::state::{Address, Register};

/// A decoded CHIP-8 instruction. Operands are pulled out of the raw word once,
/// at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// `00E0`
    ClearScreen,
    /// `00EE`
    Return,
    /// `0nnn`, a call into native code on the COSMAC VIP.
    MachineCall { addr: Address },
    /// `1nnn`
    Jump { addr: Address },
    /// `2nnn`
    Call { addr: Address },
    /// `3xnn`
    SkipEqImm { x: Register, nn: u8 },
    /// `4xnn`
    SkipNeqImm { x: Register, nn: u8 },
    /// `5xy0`
    SkipEqReg { x: Register, y: Register },
    /// `6xnn`
    SetImm { x: Register, nn: u8 },
    /// `7xnn`
    AddImm { x: Register, nn: u8 },
    /// `8xy0`
    Move { x: Register, y: Register },
    /// `8xy1`
    Or { x: Register, y: Register },
    /// `8xy2`
    And { x: Register, y: Register },
    /// `8xy3`
    Xor { x: Register, y: Register },
    /// `8xy4`
    AddReg { x: Register, y: Register },
    /// `8xy5`
    Sub { x: Register, y: Register },
    /// `8xy6`
    ShiftRight { x: Register, y: Register },
    /// `8xy7`
    SubReverse { x: Register, y: Register },
    /// `8xyE`
    ShiftLeft { x: Register, y: Register },
    /// `9xy0`
    SkipNeqReg { x: Register, y: Register },
    /// `Annn`
    SetIndex { addr: Address },
    /// `Bnnn`
    JumpWithOffset { addr: Address },
    /// `Cxnn`
    Random { x: Register, nn: u8 },
    /// `Dxyn`
    Draw { x: Register, y: Register, n: u8 },
    /// `Ex9E`
    SkipIfKeyPressed { x: Register },
    /// `ExA1`
    SkipIfKeyNotPressed { x: Register },
    /// `Fx07`
    ReadDelayTimer { x: Register },
    /// `Fx0A`
    WaitForKey { x: Register },
    /// `Fx15`
    SetDelayTimer { x: Register },
    /// `Fx18`
    SetSoundTimer { x: Register },
    /// `Fx1E`
    AddToIndex { x: Register },
    /// `Fx29`
    FontChar { x: Register },
    /// `Fx33`
    BinaryCodedDecimal { x: Register },
    /// `Fx55`
    Store { x: Register },
    /// `Fx65`
    Load { x: Register },
}

pub fn decode(raw: u16) -> Result<Instruction> {
    let decoded = DecodedInstruction::new(raw);
    let (x, y, n, nn, nnn) = (decoded.x, decoded.y, decoded.n, decoded.nn, decoded.nnn);

    let instruction = match decoded.opcode {
        0x0 => match nnn {
            0x0E0 => Instruction::ClearScreen,
            0x0EE => Instruction::Return,
            addr => Instruction::MachineCall { addr },
        },
        0x1 => Instruction::Jump { addr: nnn },
        0x2 => Instruction::Call { addr: nnn },
        0x3 => Instruction::SkipEqImm { x, nn },
        0x4 => Instruction::SkipNeqImm { x, nn },
        0x5 => match n {
            0x0 => Instruction::SkipEqReg { x, y },
            _ => return Err(Error::UnknownOpcode(raw)),
        },
        0x6 => Instruction::SetImm { x, nn },
        0x7 => Instruction::AddImm { x, nn },
        0x8 => match n {
            0x0 => Instruction::Move { x, y },
            0x1 => Instruction::Or { x, y },
            0x2 => Instruction::And { x, y },
            0x3 => Instruction::Xor { x, y },
            0x4 => Instruction::AddReg { x, y },
            0x5 => Instruction::Sub { x, y },
            0x6 => Instruction::ShiftRight { x, y },
            0x7 => Instruction::SubReverse { x, y },
            0xE => Instruction::ShiftLeft { x, y },
            _ => return Err(Error::UnknownOpcode(raw)),
        },
        0x9 => match n {
            0x0 => Instruction::SkipNeqReg { x, y },
            _ => return Err(Error::UnknownOpcode(raw)),
        },
        0xA => Instruction::SetIndex { addr: nnn },
        0xB => Instruction::JumpWithOffset { addr: nnn },
        0xC => Instruction::Random { x, nn },
        0xD => Instruction::Draw { x, y, n },
        0xE => match nn {
            0x9E => Instruction::SkipIfKeyPressed { x },
            0xA1 => Instruction::SkipIfKeyNotPressed { x },
            _ => return Err(Error::UnknownOpcode(raw)),
        },
        // 0xF, the only class left in a single nibble.
        _ => match nn {
            0x07 => Instruction::ReadDelayTimer { x },
            0x0A => Instruction::WaitForKey { x },
            0x15 => Instruction::SetDelayTimer { x },
            0x18 => Instruction::SetSoundTimer { x },
            0x1E => Instruction::AddToIndex { x },
            0x29 => Instruction::FontChar { x },
            0x33 => Instruction::BinaryCodedDecimal { x },
            0x55 => Instruction::Store { x },
            0x65 => Instruction::Load { x },
            _ => return Err(Error::UnknownOpcode(raw)),
        },
    };
    Ok(instruction)
}

struct DecodedInstruction {
    /// First nibble. Selects the instruction class.
    opcode: u8,
    /// Second nibble. Used to look up one of the 16 registers.
    x: Register,
    /// Third nibble. Used to look up one of the 16 registers.
    y: Register,
    /// Fourth nibble. A 4-bit number.
    n: u8,
    /// The second byte (third and fourth nibbles). An 8-bit immediate number.
    nn: u8,
    /// The second, third, and fourth nibbles. A 12-bit immediate address.
    nnn: Address,
}
impl DecodedInstruction {
    fn new(raw: u16) -> Self {
        DecodedInstruction {
            opcode: (raw >> 12) as u8,
            x: Register::from_nibble(raw >> 8),
            y: Register::from_nibble(raw >> 4),
            n: (raw & 0x000F) as u8,
            nn: (raw & 0x00FF) as u8,
            nnn: raw & 0x0FFF,
        }
    }
}
