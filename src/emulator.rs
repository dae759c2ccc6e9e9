use std::io::Stdout;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use chip8_vm::{Chip8, DISPLAY_HEIGHT, DISPLAY_WIDTH, Key, Outcome, Settings};
use crossterm::{
    event,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use log::{debug, error, info, warn};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
};
use rdev::EventType;
use rodio::{OutputStream, Sink, Source, source::SineWave};

const TONE_HZ: f32 = 440.0;

/// Host keys laid out the way they sit on a QWERTY keyboard, next to the
/// keypad key each one stands for.
const KEYPAD_LAYOUT: [[(char, rdev::Key, Key); 4]; 4] = [
    [
        ('1', rdev::Key::Num1, Key::Key1),
        ('2', rdev::Key::Num2, Key::Key2),
        ('3', rdev::Key::Num3, Key::Key3),
        ('4', rdev::Key::Num4, Key::KeyC),
    ],
    [
        ('Q', rdev::Key::KeyQ, Key::Key4),
        ('W', rdev::Key::KeyW, Key::Key5),
        ('E', rdev::Key::KeyE, Key::Key6),
        ('R', rdev::Key::KeyR, Key::KeyD),
    ],
    [
        ('A', rdev::Key::KeyA, Key::Key7),
        ('S', rdev::Key::KeyS, Key::Key8),
        ('D', rdev::Key::KeyD, Key::Key9),
        ('F', rdev::Key::KeyF, Key::KeyE),
    ],
    [
        ('Z', rdev::Key::KeyZ, Key::KeyA),
        ('X', rdev::Key::KeyX, Key::Key0),
        ('C', rdev::Key::KeyC, Key::KeyB),
        ('V', rdev::Key::KeyV, Key::KeyF),
    ],
];

/// A sine tone that plays while the sound timer runs.
struct Beeper {
    sink: Sink,
    _stream: OutputStream,
    playing: bool,
}

impl Beeper {
    fn open() -> anyhow::Result<Self> {
        let (stream, handle) = OutputStream::try_default()?;
        let sink = Sink::try_new(&handle)?;
        sink.append(SineWave::new(TONE_HZ).repeat_infinite());
        sink.pause();
        Ok(Beeper {
            sink,
            _stream: stream,
            playing: false,
        })
    }

    fn set(&mut self, on: bool) {
        if on == self.playing {
            return;
        }
        if on {
            self.sink.play();
        } else {
            self.sink.pause();
        }
        self.playing = on;
    }
}

enum Input {
    Press(Key),
    Release(Key),
    Quit,
}

fn map_key(key: rdev::Key) -> Option<Key> {
    KEYPAD_LAYOUT
        .iter()
        .flatten()
        .find(|(_, host, _)| *host == key)
        .map(|&(_, _, keypad)| keypad)
}

fn keypad_legend() -> String {
    let mut legend = String::from("Key Mapping:");
    for row in &KEYPAD_LAYOUT {
        let host: Vec<String> = row.iter().map(|(label, _, _)| label.to_string()).collect();
        let keypad: Vec<String> = row
            .iter()
            .map(|(_, _, key)| format!("{:X}", key.index()))
            .collect();
        legend.push_str(&format!("\n{}  →  {}", host.join(" "), keypad.join(" ")));
    }
    legend
}

/// Sends the keypad input for `event`, if any. Returns false once the
/// receiving end is gone.
fn forward(tx: &Sender<Input>, event: EventType) -> bool {
    let input = match event {
        EventType::KeyPress(rdev::Key::Escape) => Some(Input::Quit),
        EventType::KeyPress(key) => map_key(key).map(Input::Press),
        EventType::KeyRelease(key) => map_key(key).map(Input::Release),
        _ => None,
    };
    match input {
        Some(input) => tx.send(input).is_ok(),
        None => true,
    }
}

// Terminals only report key presses, so press and release events come from a
// global listener running on its own thread.
fn spawn_keyboard_listener() -> Receiver<Input> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut connected = true;
        // rdev cannot stop listening, so the callback goes quiet instead.
        let result = rdev::listen(move |event| {
            if connected && !forward(&tx, event.event_type) {
                debug!("Emulator stopped, ignoring further key events");
                connected = false;
            }
        });
        if let Err(err) = result {
            error!("Keyboard listener stopped: {err:?}");
        }
    });
    rx
}

pub struct Emulator {
    chip8: Chip8,
    settings: Settings,
    beeper: Option<Beeper>,
}

impl Emulator {
    pub fn new(settings: Settings) -> Self {
        let chip8 = match settings.seed {
            Some(seed) => Chip8::with_seed(seed),
            None => Chip8::new(),
        }
        .with_quirks(settings.quirks);

        let beeper = match Beeper::open() {
            Ok(beeper) => Some(beeper),
            Err(err) => {
                warn!("No audio output, running silently: {err}");
                None
            }
        };

        Emulator {
            chip8,
            settings,
            beeper,
        }
    }

    fn draw(&self, frame: &mut Frame, area: Rect, rom_name: &str, legend: &str) {
        // One terminal cell per pixel, inside a border.
        let screen_width = DISPLAY_WIDTH as u16 + 2;
        let screen_height = DISPLAY_HEIGHT as u16 + 2;
        let legend_height = KEYPAD_LAYOUT.len() as u16 + 3;

        let [screen_row, legend_row, _] = Layout::vertical([
            Constraint::Length(screen_height),
            Constraint::Length(legend_height),
            Constraint::Min(0),
        ])
        .areas(area);
        let [screen_area] = Layout::horizontal([Constraint::Length(screen_width)])
            .flex(Flex::Center)
            .areas(screen_row);

        let display = self.chip8.display();
        let lines: Vec<String> = (0..DISPLAY_HEIGHT)
            .map(|y| {
                (0..DISPLAY_WIDTH)
                    .map(|x| if display.pixel(x, y) { '█' } else { ' ' })
                    .collect()
            })
            .collect();

        let title = if self.chip8.is_waiting_for_key() {
            format!("{rom_name} (press a key)")
        } else {
            rom_name.to_string()
        };
        let screen = Paragraph::new(lines.join("\n"))
            .block(Block::default().borders(Borders::ALL).title(title))
            .style(Style::default().fg(Color::White));
        frame.render_widget(screen, screen_area);

        let keypad = Paragraph::new(legend)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Keypad (Esc quits)"))
            .style(Style::default().fg(Color::Yellow));
        frame.render_widget(keypad, legend_row);
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        let rom_data = std::fs::read(&self.settings.rom)
            .with_context(|| format!("Failed to read ROM {}", self.settings.rom.display()))?;
        self.chip8.load(&rom_data)?;
        info!("Running {}", self.settings.rom.display());

        let input = spawn_keyboard_listener();

        enable_raw_mode()?;
        let backend = CrosstermBackend::new(std::io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.main_loop(&mut terminal, &input);

        if let Some(beeper) = self.beeper.as_mut() {
            beeper.set(false);
        }
        let cleared = terminal.clear();
        disable_raw_mode()?;
        cleared?;

        result
    }

    fn main_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        input: &Receiver<Input>,
    ) -> anyhow::Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.settings.frame_rate.max(1) as f64);
        let instructions_per_frame = self.settings.instructions_per_frame();
        let rom_stem: String = self
            .settings
            .rom
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Unknown ROM".to_string());
        let legend = keypad_legend();
        let mut redraw = true;

        'mainloop: loop {
            let frame_start = Instant::now();

            // Consume and discard any crossterm events to prevent echoing
            while event::poll(Duration::ZERO)? {
                let _ = event::read()?;
            }

            loop {
                match input.try_recv() {
                    Ok(Input::Press(key)) => self.chip8.press_key(key),
                    Ok(Input::Release(key)) => self.chip8.release_key(key),
                    Ok(Input::Quit) => break 'mainloop,
                    Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
                }
            }

            let was_waiting = self.chip8.is_waiting_for_key();
            for _ in 0..instructions_per_frame {
                match self.chip8.step() {
                    Outcome::Advanced => {}
                    Outcome::Waiting => break,
                    Outcome::Error(err) if err.is_fatal() => return Err(err.into()),
                    // Already reported by the machine; it moved past the instruction.
                    Outcome::Error(_) => {}
                }
            }
            redraw |= was_waiting != self.chip8.is_waiting_for_key();

            self.chip8.tick_timers();
            if let Some(beeper) = self.beeper.as_mut() {
                beeper.set(self.chip8.sound_active());
            }

            if self.chip8.take_redraw() || redraw {
                terminal.draw(|frame| {
                    let area = frame.area();
                    self.draw(frame, area, &rom_stem, &legend);
                })?;
                redraw = false;
            }

            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                thread::sleep(frame_duration - elapsed);
            }
        }

        Ok(())
    }
}
