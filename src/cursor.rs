//! Component C — cursor and scrolling-region state.
//!
//! Pure position/latch data. The motion primitives that couple this state
//! to the cell buffer (`cursor_right`, `cursor_down`, `echo`) live on
//! [`crate::emulator::Emulator`], since they mutate the screen too (see
//! `SPEC_FULL.md` §4.C).

/// Cursor position, save/restore slot, EOL latch, visibility, and the
/// vertical scrolling region.
#[derive(Clone, Copy, Debug)]
pub struct CursorState {
    pub x: usize,
    pub y: usize,
    pub bak_x: usize,
    pub bak_y: usize,
    /// True only when `x == right_most` and the next print should wrap.
    pub eol: bool,
    pub visible: bool,
    pub top_most: usize,
    pub bottom_most: usize,
    pub left_most: usize,
    pub right_most: usize,
}

impl CursorState {
    #[must_use]
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            x: 0,
            y: 0,
            bak_x: 0,
            bak_y: 0,
            eol: false,
            visible: true,
            top_most: 0,
            bottom_most: rows.saturating_sub(1),
            left_most: 0,
            right_most: cols.saturating_sub(1),
        }
    }

    pub fn reset(&mut self, rows: usize, cols: usize) {
        *self = Self::new(rows, cols);
    }

    pub fn save(&mut self) {
        self.bak_x = self.x;
        self.bak_y = self.y;
    }

    pub fn restore(&mut self) {
        self.x = self.bak_x;
        self.y = self.bak_y;
        self.eol = self.x == self.right_most;
    }
}
