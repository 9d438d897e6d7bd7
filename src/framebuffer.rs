/// # framebuffer
///
/// Logical pixel grid for both resolutions. Three things are tracked per
/// cell:
///
/// * `data`: the logical pixel. sprite XOR and collision detection only ever
///   look at this
/// * `render`: whether a renderer should still show the pixel. a pixel that
///   gets XORed off stays rendered until its decay timer runs out, which
///   gives the afterglow that hides CHIP-8 flicker
/// * `timers`: per-cell decay countdown, armed when a pixel goes 1->0
///
/// The grids are one row taller than the visible screen. sprite rows wrap
/// modulo `height + 1`, so a sprite running off the bottom lands in that
/// hidden row first; it is logically set (and can collide) but never
/// rendered.
pub const STANDARD_WIDTH: usize = 64;
pub const STANDARD_HEIGHT: usize = 32;
pub const EXTENDED_WIDTH: usize = 128;
pub const EXTENDED_HEIGHT: usize = 64;

/// decay delay (in scheduler loops) with blurred pixels
pub const BLUR_DECAY_DELAY: u32 = 60;
/// decay delay with plain tiles
pub const PLAIN_DECAY_DELAY: u32 = 15;

/// how many single-column shifts one SCHIP scroll-left/right performs
pub const HORIZONTAL_SCROLL_REPEAT: usize = 4;

/// renderer scale at 64 pixels across
const BASE_SCALE: usize = 12;

#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    scale: usize,
    extended: bool,
    data: Vec<u8>,
    render: Vec<u8>,
    pending_delete: Vec<bool>,
    timers: Vec<Option<u32>>,
    reduce_flicker: bool,
    decay_delay: u32,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    pub fn new() -> Self {
        let mut fb = FrameBuffer {
            width: 0,
            height: 0,
            scale: 0,
            extended: false,
            data: Vec::new(),
            render: Vec::new(),
            pending_delete: Vec::new(),
            timers: Vec::new(),
            reduce_flicker: true,
            decay_delay: BLUR_DECAY_DELAY,
        };
        fb.init(STANDARD_WIDTH, STANDARD_HEIGHT);
        fb
    }

    fn init(&mut self, width: usize, height: usize) {
        let cells = width * (height + 1);
        self.width = width;
        self.height = height;
        self.scale = (STANDARD_WIDTH * BASE_SCALE) / width;
        self.data = vec![0; cells];
        self.render = vec![0; cells];
        self.pending_delete = vec![false; cells];
        self.timers = vec![None; cells];
    }

    /// switch between 64x32 and 128x64. always reallocates, so the screen is
    /// blank afterwards
    pub fn set_extended(&mut self, extended: bool) {
        self.extended = extended;
        if extended {
            self.init(EXTENDED_WIDTH, EXTENDED_HEIGHT);
        } else {
            self.init(STANDARD_WIDTH, STANDARD_HEIGHT);
        }
    }

    pub fn is_extended(&self) -> bool {
        self.extended
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// renderer hint: screen pixels per CHIP-8 pixel
    pub fn scale(&self) -> usize {
        self.scale
    }

    pub fn set_reduce_flicker(&mut self, reduce_flicker: bool) {
        self.reduce_flicker = reduce_flicker;
    }

    pub fn set_decay_delay(&mut self, delay: u32) {
        self.decay_delay = delay.max(1);
    }

    pub fn decay_delay(&self) -> u32 {
        self.decay_delay
    }

    /// XOR a single pixel. a `bit` of 0 never changes anything. returns true
    /// when a lit pixel was turned off
    pub fn set_pixel(&mut self, row: usize, col: usize, bit: u8) -> bool {
        if bit == 0 || col >= self.width {
            return false;
        }
        let index = row * self.width + col;
        if index >= self.data.len() {
            return false;
        }

        if self.data[index] == 1 {
            self.data[index] = 0;
            self.pending_delete[index] = true;
            self.timers[index] = Some(self.decay_delay);
            if !self.reduce_flicker {
                self.render[index] = 0;
            }
            true
        } else {
            self.data[index] = 1;
            self.pending_delete[index] = false;
            if row < self.height {
                self.render[index] = 1;
            }
            self.timers[index] = None;
            false
        }
    }

    /// overwrite a cell outright, bypassing XOR and decay
    pub fn set_absolute(&mut self, index: usize, value: u8) {
        if index < self.data.len() {
            self.data[index] = value;
            self.render[index] = value;
            self.pending_delete[index] = false;
            self.timers[index] = None;
        }
    }

    /// XOR `pixels` (row-major, `row_width` wide) onto the screen at
    /// (`x`, `y`), wrapping both axes
    pub fn draw_sprite(&mut self, x: usize, y: usize, row_width: usize, pixels: &[u8]) -> bool {
        if row_width == 0 {
            return false;
        }
        let mut collision = false;
        for (i, &bit) in pixels.iter().enumerate() {
            let col = (x + i % row_width) % self.width;
            let row = (y + i / row_width) % (self.height + 1);
            if self.set_pixel(row, col, bit) {
                collision = true;
            }
        }
        collision
    }

    /// SCHIP 00CN
    pub fn scroll_down(&mut self, lines: usize) {
        let shift = (self.width * lines).min(self.data.len());
        for i in (0..self.data.len() - shift).rev() {
            self.set_absolute(i + shift, self.data[i]);
        }
        for i in 0..shift {
            self.set_absolute(i, 0);
        }
    }

    /// SCHIP 00FC
    pub fn scroll_left(&mut self) {
        for _ in 0..HORIZONTAL_SCROLL_REPEAT {
            for row in 0..self.height {
                let start = row * self.width;
                for k in 0..self.width - 1 {
                    self.set_absolute(start + k, self.data[start + k + 1]);
                }
                self.set_absolute(start + self.width - 1, 0);
            }
        }
    }

    /// SCHIP 00FB
    pub fn scroll_right(&mut self) {
        for _ in 0..HORIZONTAL_SCROLL_REPEAT {
            for row in 0..self.height {
                let start = row * self.width;
                for k in (1..self.width).rev() {
                    self.set_absolute(start + k, self.data[start + k - 1]);
                }
                self.set_absolute(start, 0);
            }
        }
    }

    /// age every pending decay timer by one; expired pixels stop rendering
    pub fn update_decay(&mut self) {
        for i in 0..self.timers.len() {
            if !self.pending_delete[i] {
                continue;
            }
            if let Some(t) = self.timers[i] {
                let t = t.saturating_sub(1);
                if t == 0 {
                    self.pending_delete[i] = false;
                    self.render[i] = 0;
                    self.timers[i] = None;
                } else {
                    self.timers[i] = Some(t);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
        self.render.fill(0);
        self.pending_delete.fill(false);
        self.timers.fill(None);
    }

    /// logical pixel
    pub fn pixel(&self, row: usize, col: usize) -> u8 {
        self.data[row * self.width + col]
    }

    /// whether a renderer should draw this pixel
    pub fn is_rendered(&self, row: usize, col: usize) -> bool {
        row < self.height && self.render[row * self.width + col] == 1
    }

    /// visible rows of the render grid, row-major
    pub fn render_data(&self) -> &[u8] {
        &self.render[..self.width * self.height]
    }

    /// decay timers for the visible rows; `Some` while a pixel is fading
    pub fn decay_timers(&self) -> &[Option<u32>] {
        &self.timers[..self.width * self.height]
    }

    /// logical state of the visible rows
    pub fn logical_data(&self) -> &[u8] {
        &self.data[..self.width * self.height]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph_zero() -> Vec<u8> {
        // 0xF0, 0x90, 0x90, 0x90, 0xF0 unpacked to 8-wide rows
        [0xF0u8, 0x90, 0x90, 0x90, 0xF0]
            .iter()
            .flat_map(|row| (0..8).rev().map(move |b| (row >> b) & 1))
            .collect()
    }

    #[test]
    fn test_dimensions() {
        let mut fb = FrameBuffer::new();
        assert_eq!((fb.width(), fb.height(), fb.scale()), (64, 32, 12));
        assert_eq!(fb.render_data().len(), 2048);
        fb.set_extended(true);
        assert_eq!((fb.width(), fb.height(), fb.scale()), (128, 64, 6));
        assert!(fb.is_extended());
        assert_eq!(fb.render_data().len(), 8192);
    }

    #[test]
    fn test_set_pixel_toggles_and_collides() {
        let mut fb = FrameBuffer::new();
        assert!(!fb.set_pixel(3, 4, 1));
        assert_eq!(fb.pixel(3, 4), 1);
        assert!(fb.is_rendered(3, 4));
        assert!(fb.set_pixel(3, 4, 1));
        assert_eq!(fb.pixel(3, 4), 0);
    }

    #[test]
    fn test_zero_bit_is_noop() {
        let mut fb = FrameBuffer::new();
        fb.set_pixel(0, 0, 1);
        assert!(!fb.set_pixel(0, 0, 0));
        assert_eq!(fb.pixel(0, 0), 1);
    }

    #[test]
    fn test_cleared_pixel_lingers_until_decay() {
        let mut fb = FrameBuffer::new();
        fb.set_decay_delay(3);
        fb.set_pixel(1, 1, 1);
        fb.set_pixel(1, 1, 1);
        // logically off, still rendered
        assert_eq!(fb.pixel(1, 1), 0);
        assert!(fb.is_rendered(1, 1));
        assert_eq!(fb.decay_timers()[64 + 1], Some(3));
        fb.update_decay();
        fb.update_decay();
        assert!(fb.is_rendered(1, 1));
        fb.update_decay();
        assert!(!fb.is_rendered(1, 1));
        assert_eq!(fb.decay_timers()[64 + 1], None);
    }

    #[test]
    fn test_no_reduce_flicker_clears_render_immediately() {
        let mut fb = FrameBuffer::new();
        fb.set_reduce_flicker(false);
        fb.set_pixel(1, 1, 1);
        fb.set_pixel(1, 1, 1);
        assert!(!fb.is_rendered(1, 1));
    }

    #[test]
    fn test_redraw_cancels_decay() {
        let mut fb = FrameBuffer::new();
        fb.set_pixel(2, 2, 1);
        fb.set_pixel(2, 2, 1);
        fb.set_pixel(2, 2, 1);
        assert_eq!(fb.decay_timers()[2 * 64 + 2], None);
        for _ in 0..BLUR_DECAY_DELAY {
            fb.update_decay();
        }
        assert!(fb.is_rendered(2, 2));
    }

    #[test]
    fn test_draw_twice_restores_state() {
        let mut fb = FrameBuffer::new();
        fb.set_pixel(4, 3, 1);
        let before = fb.logical_data().to_vec();
        let glyph = glyph_zero();
        fb.draw_sprite(2, 3, 8, &glyph);
        assert!(fb.draw_sprite(2, 3, 8, &glyph));
        assert_eq!(fb.logical_data(), &before[..]);
    }

    #[test]
    fn test_sprite_wraps_horizontally() {
        let mut fb = FrameBuffer::new();
        assert!(!fb.draw_sprite(62, 0, 8, &[1, 1, 1, 1, 0, 0, 0, 0]));
        assert_eq!(fb.pixel(0, 62), 1);
        assert_eq!(fb.pixel(0, 63), 1);
        assert_eq!(fb.pixel(0, 0), 1);
        assert_eq!(fb.pixel(0, 1), 1);
    }

    #[test]
    fn test_zero_width_sprite_draws_nothing() {
        let mut fb = FrameBuffer::new();
        assert!(!fb.draw_sprite(0, 0, 0, &[1, 1, 1]));
        assert!(fb.logical_data().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_sprite_wraps_through_hidden_row() {
        let mut fb = FrameBuffer::new();
        // rows 31, 32 (hidden), then 0
        fb.draw_sprite(0, 31, 1, &[1, 1, 1]);
        assert!(fb.is_rendered(31, 0));
        assert_eq!(fb.pixel(32, 0), 1);
        assert!(!fb.is_rendered(32, 0));
        assert_eq!(fb.pixel(0, 0), 1);
    }

    #[test]
    fn test_scroll_down() {
        let mut fb = FrameBuffer::new();
        fb.set_pixel(0, 5, 1);
        fb.scroll_down(2);
        assert_eq!(fb.pixel(0, 5), 0);
        assert_eq!(fb.pixel(2, 5), 1);
        assert!(fb.is_rendered(2, 5));
    }

    #[test]
    fn test_scroll_down_past_bottom_clears() {
        let mut fb = FrameBuffer::new();
        fb.set_pixel(10, 10, 1);
        fb.scroll_down(40);
        assert!(fb.logical_data().iter().all(|&p| p == 0));
    }

    // NB. one SCHIP scroll left/right moves 4 columns here, not 1
    #[test]
    fn test_scroll_right_moves_four_columns() {
        let mut fb = FrameBuffer::new();
        fb.set_pixel(7, 10, 1);
        fb.scroll_right();
        assert_eq!(fb.pixel(7, 10), 0);
        assert_eq!(fb.pixel(7, 14), 1);
    }

    #[test]
    fn test_scroll_left_moves_four_columns() {
        let mut fb = FrameBuffer::new();
        fb.set_pixel(7, 10, 1);
        fb.set_pixel(7, 1, 1);
        fb.scroll_left();
        assert_eq!(fb.pixel(7, 6), 1);
        assert_eq!(fb.pixel(7, 10), 0);
        // pushed off the left edge
        let lit: Vec<usize> = (0..64).filter(|&c| fb.pixel(7, c) == 1).collect();
        assert_eq!(lit, vec![6]);
    }

    #[test]
    fn test_clear() {
        let mut fb = FrameBuffer::new();
        fb.draw_sprite(0, 0, 8, &glyph_zero());
        fb.set_pixel(0, 0, 1);
        fb.clear();
        assert!(fb.logical_data().iter().all(|&p| p == 0));
        assert!(fb.render_data().iter().all(|&p| p == 0));
        assert!(fb.decay_timers().iter().all(Option::is_none));
    }

    #[test]
    fn test_resolution_switch_blanks() {
        let mut fb = FrameBuffer::new();
        fb.set_pixel(0, 0, 1);
        fb.set_extended(true);
        fb.set_extended(false);
        assert_eq!(fb.pixel(0, 0), 0);
    }
}
