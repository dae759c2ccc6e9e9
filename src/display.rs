use bitvec::{BitArr, array::BitArray};

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// The 64x32 monochrome screen.
///
/// Sprites are XORed onto the grid. The origin of a sprite wraps around the
/// screen, while the pixels of a sprite that run past the right or bottom edge
/// are clipped.
pub struct Framebuffer {
    pixels: BitArr!(for DISPLAY_WIDTH * DISPLAY_HEIGHT),
    dirty: bool,
}

impl Framebuffer {
    pub fn new() -> Self {
        Framebuffer {
            pixels: BitArray::ZERO,
            dirty: false,
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(false);
        self.dirty = true;
    }

    /// Draws `sprite` with its top-left corner at `(x, y)`, one byte per row,
    /// most significant bit leftmost. Returns `true` if any lit pixel was
    /// turned off.
    pub fn draw_sprite(&mut self, x: u8, y: u8, sprite: &[u8]) -> bool {
        let origin_x = usize::from(x) % DISPLAY_WIDTH;
        let origin_y = usize::from(y) % DISPLAY_HEIGHT;
        let mut collision = false;

        for (row, &byte) in sprite.iter().enumerate() {
            let pixel_y = origin_y + row;
            if pixel_y >= DISPLAY_HEIGHT {
                break;
            }

            for bit in 0..8 {
                let pixel_x = origin_x + bit;
                if pixel_x >= DISPLAY_WIDTH {
                    break;
                }
                if (byte >> (7 - bit)) & 1 == 0 {
                    continue;
                }

                let index = pixel_y * DISPLAY_WIDTH + pixel_x;
                let current_pixel = self.pixels[index];
                collision |= current_pixel;
                self.pixels.set(index, !current_pixel);
                self.dirty = true;
            }
        }
        collision
    }

    /// Pixel state at `(x, y)`; coordinates outside the screen read as off.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        x < DISPLAY_WIDTH && y < DISPLAY_HEIGHT && self.pixels[y * DISPLAY_WIDTH + x]
    }

    pub fn lit_pixels(&self) -> usize {
        self.pixels.count_ones()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the dirty flag and clears it.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}
