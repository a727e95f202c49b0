//! The top-level session object: wires the cell buffer, rendition state,
//! cursor, capability table, and parser together into the one type hosts
//! actually construct.

use crate::capability::{Capability, CapabilityTable};
use crate::cell::{Attrs, Cell};
use crate::cursor::CursorState;
use crate::error::ConfigError;
use crate::parser::{Action, Parser};
use crate::screen::Screen;
use crate::sgr::SgrState;

const TAB_WIDTH: usize = 8;

/// A single terminal session: one screen, one rendition, one cursor, one
/// capability table, one parser. No locking, no background threads — the
/// host owns an `Emulator` per session and calls into it from whatever
/// thread reads that session's byte stream (see `SPEC_FULL.md` §5).
#[derive(Debug)]
pub struct Emulator {
    screen: Screen,
    sgr: SgrState,
    cursor: CursorState,
    table: CapabilityTable,
    parser: Parser,
    pending_reply: Option<String>,
}

impl Emulator {
    /// Build a session with a `rows x cols` screen, loading the embedded
    /// capability table. Fails only if that table is malformed — a defect
    /// in this crate's build, not something a host can cause at runtime.
    pub fn new(rows: usize, cols: usize) -> Result<Self, ConfigError> {
        Ok(Self {
            screen: Screen::new(rows, cols),
            sgr: SgrState::default(),
            cursor: CursorState::new(rows, cols),
            table: CapabilityTable::default_table()?,
            parser: Parser::new(),
            pending_reply: None,
        })
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.screen.rows()
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.screen.cols()
    }

    /// Resize the session. This reallocates a blank screen and resets the
    /// cursor and scrolling region to full-screen home, rather than
    /// reflowing existing content — the source this core is grounded on
    /// does the same on a resize event (see `SPEC_FULL.md`, Open
    /// Questions). The capability table is untouched; only construction
    /// can fail on configuration.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        self.screen = Screen::new(rows, cols);
        self.cursor.reset(rows, cols);
        self.sgr.default_rendition();
        self.pending_reply = None;
    }

    /// Feed a chunk of bytes from the child process into the session.
    /// Safe to call with any chunking, including one byte at a time.
    pub fn feed_bytes(&mut self, bytes: &[u8]) {
        let actions = self.parser.feed(bytes, &self.table);
        for action in actions {
            match action {
                Action::Print(c) => self.echo(c),
                Action::Cap(cap) => self.dispatch(cap),
            }
        }
    }

    /// Take (and clear) any reply this session owes the child process —
    /// currently only populated by a device-attributes query (`da`). The
    /// core never writes to the PTY itself; that is the host's job.
    pub fn take_pending_reply(&mut self) -> Option<String> {
        self.pending_reply.take()
    }

    /// Render the visible screen to the HTML-like markup described in
    /// `SPEC_FULL.md` §4.G.
    #[must_use]
    pub fn render(&self) -> String {
        crate::render::render(&self.screen, &self.cursor)
    }

    // -- cursor motion primitives -------------------------------------

    fn cursor_right(&mut self) {
        if self.cursor.x < self.cursor.right_most {
            self.cursor.x += 1;
            self.cursor.eol = false;
        } else {
            self.cursor.eol = true;
        }
    }

    fn cursor_down(&mut self) {
        if self.cursor.y < self.cursor.top_most || self.cursor.y > self.cursor.bottom_most {
            return;
        }
        self.cursor.eol = false;
        if self.cursor.y == self.cursor.bottom_most {
            self.screen
                .scroll_up(self.cursor.top_most + 1, self.cursor.bottom_most);
        } else {
            self.cursor.y += 1;
        }
    }

    fn cursor_up(&mut self) {
        if self.cursor.y > self.cursor.top_most {
            self.cursor.y -= 1;
        } else {
            self.screen.scroll_down(self.cursor.top_most, self.cursor.bottom_most);
            self.cursor.y = self.cursor.top_most;
        }
    }

    /// Print one decoded scalar at the cursor, wrapping first if the
    /// previous `echo` left the end-of-line latch set.
    fn echo(&mut self, c: char) {
        if self.cursor.eol {
            self.cursor.x = self.cursor.left_most;
            self.cursor.eol = false;
            self.cursor_down();
        }
        let bits = self.sgr.bits() | u64::from(c as u32);
        self.screen.poke(self.cursor.x, self.cursor.y, &[Cell::from_raw(bits)]);
        self.cursor_right();
    }

    fn tab_stop(&self) -> usize {
        let next = (self.cursor.x / TAB_WIDTH + 1) * TAB_WIDTH;
        next.min(self.cursor.right_most)
    }

    // -- capability dispatch --------------------------------------------

    fn dispatch(&mut self, cap: Capability) {
        match cap {
            Capability::Ignore | Capability::Kb2 | Capability::Smir | Capability::Rmir => {}

            Capability::Cr => {
                self.cursor.x = self.cursor.left_most;
                self.cursor.eol = false;
            }
            Capability::Ind => self.cursor_down(),
            Capability::Ri => self.cursor_up(),
            Capability::Cub1 | Capability::Kcub1 => {
                if self.cursor.x > self.cursor.left_most {
                    self.cursor.x -= 1;
                    self.cursor.eol = false;
                }
            }
            Capability::Kcuf1 => self.cursor_right(),
            Capability::Kcuu1 => {
                if self.cursor.y > self.cursor.top_most {
                    self.cursor.y -= 1;
                }
            }
            Capability::Kcud1 => {
                if self.cursor.y < self.cursor.bottom_most {
                    self.cursor.y += 1;
                }
            }
            Capability::Ht => self.cursor.x = self.tab_stop(),

            Capability::Cuf(n) => {
                self.cursor.x = (self.cursor.x + n as usize).min(self.cursor.right_most);
                self.cursor.eol = false;
            }
            Capability::Cud(n) => {
                self.cursor.y = (self.cursor.y + n as usize).min(self.cursor.bottom_most);
            }

            Capability::Home => {
                self.cursor.x = self.cursor.left_most;
                self.cursor.y = self.cursor.top_most;
                self.cursor.eol = false;
            }
            Capability::Cup(row, col) => {
                self.cursor.y = (row.saturating_sub(1) as usize).min(self.cursor.bottom_most);
                self.cursor.x = (col.saturating_sub(1) as usize).min(self.cursor.right_most);
                self.cursor.eol = false;
            }
            Capability::Vpa(row) => {
                self.cursor.y = (row.saturating_sub(1) as usize).min(self.cursor.bottom_most);
            }
            Capability::Hpa(col) => {
                self.cursor.x = (col.saturating_sub(1) as usize).min(self.cursor.right_most);
                self.cursor.eol = false;
            }

            Capability::Sc => self.cursor.save(),
            Capability::Rc => self.cursor.restore(),

            Capability::Csr(top, bottom) => {
                // Both requested edges clamp against the *current* bottom
                // margin, then the bottom margin is pulled back up to the
                // new top if the request inverted them — the region can
                // only shrink within a session; only a resize (a full
                // reset) restores it to the whole screen.
                let old_bottom = self.cursor.bottom_most;
                let top = (top.saturating_sub(1) as usize).min(old_bottom);
                let bottom = (bottom.saturating_sub(1) as usize).min(old_bottom);
                self.cursor.top_most = top;
                self.cursor.bottom_most = bottom.max(top);
                self.cursor.x = self.cursor.left_most;
                self.cursor.y = self.cursor.top_most;
                self.cursor.eol = false;
            }

            Capability::El => {
                self.screen
                    .zero(self.cursor.x, self.cursor.y, self.cursor.right_most, self.cursor.y, true);
            }
            Capability::El1 => {
                self.screen
                    .zero(self.cursor.left_most, self.cursor.y, self.cursor.x, self.cursor.y, true);
            }
            Capability::Ed => {
                self.screen.zero(
                    self.cursor.x,
                    self.cursor.y,
                    self.cursor.right_most,
                    self.cursor.y,
                    true,
                );
                if self.cursor.y < self.cursor.bottom_most {
                    self.screen.zero(
                        self.cursor.left_most,
                        self.cursor.y + 1,
                        self.cursor.right_most,
                        self.cursor.bottom_most,
                        true,
                    );
                }
            }
            Capability::Ech(n) => {
                let end = (self.cursor.x + n.max(1) as usize - 1).min(self.cursor.right_most);
                self.screen.zero(self.cursor.x, self.cursor.y, end, self.cursor.y, true);
            }

            Capability::Ich1 => self.screen.scroll_right(self.cursor.x, self.cursor.y),
            Capability::Ich(n) => self.screen.insert_chars(self.cursor.x, self.cursor.y, n as usize),
            Capability::Dch1 => self.screen.delete_chars(self.cursor.x, self.cursor.y, 1),
            Capability::Dch(n) => self.screen.delete_chars(self.cursor.x, self.cursor.y, n as usize),

            Capability::Il1 => self.insert_lines(1),
            Capability::Il(n) => self.insert_lines(n as usize),
            Capability::Dl1 => self.delete_lines(1),
            Capability::Dl(n) => self.delete_lines(n as usize),

            Capability::Civis => self.cursor.visible = false,
            Capability::Cvvis => self.cursor.visible = true,

            Capability::Sgr0 => self.sgr.default_rendition(),
            Capability::Op => self.sgr.set_color_pair(39, 49),
            Capability::Bold => self.sgr.set_bit(Attrs::BOLD),
            Capability::Dim => self.sgr.set_bit(Attrs::DIM),
            Capability::Smul => self.sgr.set_bit(Attrs::UNDERLINE),
            Capability::Rmul => self.sgr.clear_bit(Attrs::UNDERLINE),
            Capability::Rev => self.sgr.set_bit(Attrs::REVERSE),
            Capability::Blink => self.sgr.set_bit(Attrs::BLINK),
            Capability::Smso => self.sgr.set_bit(Attrs::STANDOUT),
            Capability::Rmso => self.sgr.clear_bit(Attrs::STANDOUT),
            Capability::Smpch => self.sgr.set_bit(Attrs::ALTCHARSET),
            Capability::Rmpch => self.sgr.clear_bit(Attrs::ALTCHARSET),
            Capability::SetColor(n) => self.sgr.set_color(n),
            Capability::SetColorPair(p1, p2) => self.sgr.set_color_pair(p1, p2),

            Capability::Da => {
                self.pending_reply = Some("\u{1b}[?1;2c".to_string());
            }
        }
    }

    fn insert_lines(&mut self, n: usize) {
        for _ in 0..n {
            if self.cursor.y < self.cursor.bottom_most {
                self.screen.scroll_down(self.cursor.y, self.cursor.bottom_most);
            }
        }
    }

    fn delete_lines(&mut self, n: usize) {
        for _ in 0..n {
            if self.cursor.y >= self.cursor.top_most && self.cursor.y <= self.cursor.bottom_most {
                self.screen.scroll_up(self.cursor.y + 1, self.cursor.bottom_most);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_advances_cursor_and_writes_cells() {
        let mut emulator = Emulator::new(5, 10).unwrap();
        emulator.feed_bytes(b"hi");
        let markup = emulator.render();
        assert!(markup.contains('h'));
        assert!(markup.contains('i'));
    }

    #[test]
    fn wrap_at_end_of_line_then_echo_writes_next_row() {
        let mut emulator = Emulator::new(3, 3).unwrap();
        emulator.feed_bytes(b"abc");
        assert!(emulator.cursor.eol);
        emulator.feed_bytes(b"d");
        assert_eq!(emulator.screen.cell_at(0, 1).code_point(), Some('d'));
    }

    #[test]
    fn cursor_home_then_echo_writes_top_left() {
        let mut emulator = Emulator::new(5, 5).unwrap();
        emulator.feed_bytes(b"\x1b[H");
        emulator.feed_bytes(b"x");
        assert_eq!(emulator.screen.cell_at(0, 0).code_point(), Some('x'));
    }

    #[test]
    fn erase_to_end_of_screen_clears_rest_of_line_and_below() {
        let mut emulator = Emulator::new(3, 3).unwrap();
        emulator.feed_bytes(b"abc\r\nabc\r\nabc");
        emulator.feed_bytes(b"\x1b[2;2H"); // row 2, col 2 (1-based)
        emulator.feed_bytes(b"\x1b[J");
        assert_eq!(emulator.screen.cell_at(2, 2).code_point(), None);
        assert_eq!(emulator.screen.cell_at(0, 0).code_point(), Some('a'));
    }

    #[test]
    fn bold_plus_setaf_green_renders_bright_green() {
        let mut emulator = Emulator::new(1, 1).unwrap();
        emulator.feed_bytes(b"\x1b[1;32mx");
        let (_, _, color) = emulator.screen.cell_at(0, 0).unpack();
        let (_, fg) = crate::cell::unpack_color(color);
        assert_eq!(fg, 10);
    }

    #[test]
    fn scroll_region_confines_linefeed_scrolling() {
        let mut emulator = Emulator::new(5, 3).unwrap();
        emulator.feed_bytes(b"\x1b[H");
        emulator.feed_bytes(b"top"); // row 0, left outside the region below
        emulator.feed_bytes(b"\x1b[2;4r"); // rows 2..4 (1-based) scroll region
        for _ in 0..10 {
            emulator.feed_bytes(b"\n");
        }
        // row 0 sits outside the scrolling region and must survive any
        // number of linefeeds confined to rows 1..=3.
        assert_eq!(emulator.screen.cell_at(0, 0).code_point(), Some('t'));
        assert_eq!(emulator.screen.cell_at(2, 0).code_point(), Some('p'));
    }

    #[test]
    fn delete_line_removes_row_and_pulls_region_up() {
        let mut emulator = Emulator::new(3, 3).unwrap();
        emulator.feed_bytes(b"aaa\r\nbbb\r\nccc");
        emulator.feed_bytes(b"\x1b[H"); // cursor to row 0
        emulator.feed_bytes(b"\x1b[M"); // dl1
        assert_eq!(emulator.screen.cell_at(0, 0).code_point(), Some('b'));
        assert_eq!(emulator.screen.cell_at(0, 1).code_point(), Some('c'));
        assert_eq!(emulator.screen.cell_at(0, 2).code_point(), None);
    }

    #[test]
    fn absolute_cursor_move_ignores_a_narrowed_scroll_region() {
        // A status line above an active scrolling region, then an absolute
        // move back up to it, must land on row 0 — not row `top_most`.
        let mut emulator = Emulator::new(5, 5).unwrap();
        emulator.feed_bytes(b"\x1b[2;5r"); // region rows 2..5 (1-based)
        emulator.feed_bytes(b"\x1b[1;1H"); // cup back to absolute row 0, col 0
        emulator.feed_bytes(b"x");
        assert_eq!(emulator.screen.cell_at(0, 0).code_point(), Some('x'));
    }

    #[test]
    fn insert_line_at_bottom_margin_is_a_no_op() {
        let mut emulator = Emulator::new(3, 3).unwrap();
        emulator.feed_bytes(b"aaa\r\nbbb\r\nccc");
        emulator.feed_bytes(b"\x1b[H\x1b[2;3r"); // region rows 2..3, cursor -> row 1
        emulator.feed_bytes(b"\x1b[B"); // cursor-down to row 2 (bottom margin)
        emulator.feed_bytes(b"\x1b[L"); // il1 at the bottom margin: no-op
        assert_eq!(emulator.screen.cell_at(0, 2).code_point(), Some('c'));
    }

    #[test]
    fn delete_line_above_scroll_region_is_a_no_op() {
        let mut emulator = Emulator::new(3, 3).unwrap();
        emulator.feed_bytes(b"aaa\r\nbbb\r\nccc");
        emulator.feed_bytes(b"\x1b[2;3r"); // region rows 2..3 (1-based) -> top_most=1
        emulator.feed_bytes(b"\x1b[1;1H"); // cursor to row 0, above the region
        emulator.feed_bytes(b"\x1b[M"); // dl1 above top_most: no-op
        assert_eq!(emulator.screen.cell_at(0, 0).code_point(), Some('a'));
        assert_eq!(emulator.screen.cell_at(0, 1).code_point(), Some('b'));
        assert_eq!(emulator.screen.cell_at(0, 2).code_point(), Some('c'));
    }

    #[test]
    fn device_attributes_query_queues_a_reply() {
        let mut emulator = Emulator::new(5, 5).unwrap();
        assert_eq!(emulator.take_pending_reply(), None);
        emulator.feed_bytes(b"\x1b[c");
        assert!(emulator.take_pending_reply().is_some());
        assert_eq!(emulator.take_pending_reply(), None);
    }

    #[test]
    fn resize_reallocates_a_blank_screen_at_home() {
        let mut emulator = Emulator::new(5, 5).unwrap();
        emulator.feed_bytes(b"hello");
        emulator.resize(10, 20);
        assert_eq!((emulator.rows(), emulator.cols()), (10, 20));
        assert_eq!(emulator.screen.cell_at(0, 0).code_point(), None);
    }
}
