use chip8_vm::state::{PC_START_ADDR, Register};
use chip8_vm::{Chip8, Error, Key, Outcome};

fn assemble(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_be_bytes()).collect()
}

fn load(words: &[u16]) -> Chip8 {
    let mut chip = Chip8::with_seed(1);
    chip.load(&assemble(words)).unwrap();
    chip
}

fn reg(chip: &Chip8, register: Register) -> u8 {
    chip.state().registers.read(register)
}

#[test]
fn counting_loop_runs_to_completion() {
    let mut chip = load(&[
        0x6000, // 200: V0 = 0
        0x7001, // 202: V0 += 1
        0x300A, // 204: skip if V0 == 10
        0x1202, // 206: jump 202
        0x120A, // 208: jump 20A
        0x120A, // 20A: spin
    ]);
    for _ in 0..100 {
        assert_eq!(chip.step(), Outcome::Advanced);
    }
    assert_eq!(reg(&chip, Register::V0), 10);
    assert_eq!(chip.state().pc, 0x20A);
}

#[test]
fn subroutine_draws_a_digit() {
    let mut chip = load(&[
        0x6107, // 200: V1 = 7
        0x2208, // 202: call 208
        0x1204, // 204: spin
        0x0000, // 206
        0xF129, // 208: I = glyph(V1)
        0x6A00, // 20A: VA = 0
        0xDAA5, // 20C: draw at (VA, VA)
        0x00EE, // 20E: return
    ]);
    for _ in 0..6 {
        assert_eq!(chip.step(), Outcome::Advanced);
    }
    assert_eq!(chip.state().pc, 0x204);
    assert_eq!(chip.state().stack.depth(), 0);
    assert!(chip.take_redraw());

    // Glyph 7: F0 10 20 40 40
    let display = chip.display();
    assert!((0..4).all(|x| display.pixel(x, 0)));
    assert!(display.pixel(3, 1));
    assert!(display.pixel(2, 2));
    assert!(display.pixel(1, 3));
    assert!(display.pixel(1, 4));
    assert_eq!(display.lit_pixels(), 8);
    assert_eq!(reg(&chip, Register::VF), 0);
}

#[test]
fn score_is_drawn_from_its_decimal_digits() {
    let mut chip = load(&[
        0x6A9C, // 200: VA = 156
        0xA300, // 202: I = 300
        0xFA33, // 204: BCD VA
        0xF265, // 206: V0..V2 = digits
        0xF029, // 208: I = glyph(V0)
        0x6300, // 20A: V3 = 0
        0xD335, // 20C: draw at (0, 0)
        0xF129, // 20E: I = glyph(V1)
        0x6305, // 210: V3 = 5
        0x6400, // 212: V4 = 0
        0xD345, // 214: draw at (5, 0)
    ]);
    for _ in 0..11 {
        assert_eq!(chip.step(), Outcome::Advanced);
    }
    assert_eq!(reg(&chip, Register::V0), 1);
    assert_eq!(reg(&chip, Register::V1), 5);
    assert_eq!(reg(&chip, Register::V2), 6);
    assert_eq!(chip.state().memory.slice(0x300, 3).unwrap(), &[1, 5, 6]);
    // Top row of "1" (0x20) and "5" (0xF0) side by side.
    let display = chip.display();
    assert!(display.pixel(2, 0));
    assert!((5..9).all(|x| display.pixel(x, 0)));
}

#[test]
fn delay_timer_paces_a_busy_wait() {
    let mut chip = load(&[
        0x6003, // 200: V0 = 3
        0xF015, // 202: delay = V0
        0xF107, // 204: V1 = delay
        0x3100, // 206: skip if V1 == 0
        0x1204, // 208: jump 204
        0x6201, // 20A: V2 = 1
        0x120C, // 20C: spin
    ]);
    for _ in 0..2 {
        chip.step();
    }
    // Without timer ticks the loop never exits.
    for _ in 0..30 {
        chip.step();
    }
    assert_eq!(reg(&chip, Register::V2), 0);

    for _ in 0..3 {
        chip.tick_timers();
        for _ in 0..3 {
            chip.step();
        }
    }
    for _ in 0..3 {
        chip.step();
    }
    assert_eq!(reg(&chip, Register::V2), 1);
    assert_eq!(chip.state().pc, 0x20C);
}

#[test]
fn wait_for_key_resumes_on_press() {
    let mut chip = load(&[
        0xF30A, // 200: V3 = next key
        0x6401, // 202: V4 = 1
    ]);
    assert_eq!(chip.step(), Outcome::Waiting);
    assert_eq!(chip.step(), Outcome::Waiting);
    chip.tick_timers();
    assert_eq!(chip.step(), Outcome::Waiting);
    assert_eq!(chip.state().pc, PC_START_ADDR);

    chip.press_key(Key::KeyE);
    assert_eq!(chip.step(), Outcome::Advanced);
    assert_eq!(chip.state().pc, PC_START_ADDR + 2);
    assert_eq!(chip.step(), Outcome::Advanced);
    assert_eq!(reg(&chip, Register::V3), 0xE);
    assert_eq!(reg(&chip, Register::V4), 1);
}

#[test]
fn unknown_opcodes_do_not_stop_the_program() {
    let mut chip = load(&[
        0xFFFF, // 200: unknown
        0x0ABC, // 202: machine call
        0x6042, // 204: V0 = 42
    ]);
    assert_eq!(chip.step(), Outcome::Error(Error::UnknownOpcode(0xFFFF)));
    assert_eq!(chip.step(), Outcome::Error(Error::UnsupportedOpcode(0x0ABC)));
    assert_eq!(chip.step(), Outcome::Advanced);
    assert_eq!(reg(&chip, Register::V0), 0x42);
}

#[test]
fn runaway_recursion_halts_the_machine() {
    let mut chip = load(&[0x2200]);
    for _ in 0..16 {
        assert_eq!(chip.step(), Outcome::Advanced);
    }
    let overflow = Outcome::Error(Error::StackOverflow { pc: PC_START_ADDR });
    assert_eq!(chip.step(), overflow);
    assert_eq!(chip.step(), overflow);
    assert!(chip.halt_reason().is_some_and(Error::is_fatal));
}

#[test]
fn oversized_program_is_refused() {
    let mut chip = Chip8::with_seed(1);
    let program = vec![0x12; 4096 - 0x200 + 2];
    assert_eq!(
        chip.load(&program),
        Err(Error::LoadTooLarge {
            size: 3586,
            max: 3584
        })
    );
}

#[test]
fn machines_are_independent() {
    let program = [0x7001, 0x1200];
    let mut first = load(&program);
    let mut second = load(&program);
    for _ in 0..10 {
        first.step();
    }
    second.step();
    first.tick_timers();
    assert_eq!(reg(&first, Register::V0), 5);
    assert_eq!(reg(&second, Register::V0), 1);
}
