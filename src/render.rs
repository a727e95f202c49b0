//! Component G — the markup renderer.
//!
//! Turns the screen buffer into the HTML-like markup a browser-based host
//! displays: maximal runs of cells sharing the same effective background,
//! foreground, and attributes become one `<span>`; a `<br>` follows every
//! row, including the last. Two deliberate departures from a literal
//! readout of [`Cell`]
//! bits, both grounded in the source this core descends from:
//!
//! - [`Attrs::REVERSE`] is applied once, here, by swapping the effective
//!   fg/bg before grouping, then cleared from the attribute set that
//!   drives the CSS class — ECMA-48 treats reverse video as a persistent
//!   rendition bit, but the markup only ever needs its *effect*.
//! - The cell the cursor sits on (when visible) is forced to bg=1/fg=7
//!   regardless of its own rendition, so the cursor is always visible
//!   against whatever the application drew underneath it.

use crate::cell::{unpack_color, Attrs};
use crate::cursor::CursorState;
use crate::screen::Screen;

/// Background/foreground index pair the cursor is painted with,
/// independent of the cell's own rendition.
const CURSOR_BG: u8 = 1;
const CURSOR_FG: u8 = 7;

#[derive(Clone, PartialEq, Eq)]
struct Run {
    bg: u8,
    fg: u8,
    attrs: Attrs,
    text: String,
}

impl Run {
    fn class(&self) -> String {
        let mut class = format!("f{} b{}", self.fg, self.bg);
        if self.attrs.contains(Attrs::BOLD) {
            class.push_str(" bold");
        }
        if self.attrs.contains(Attrs::DIM) {
            class.push_str(" dim");
        }
        if self.attrs.contains(Attrs::UNDERLINE) {
            class.push_str(" underline");
        }
        if self.attrs.contains(Attrs::BLINK) {
            class.push_str(" blink");
        }
        if self.attrs.contains(Attrs::STANDOUT) {
            class.push_str(" standout");
        }
        if self.attrs.contains(Attrs::ALTCHARSET) {
            class.push_str(" altcharset");
        }
        class
    }

    fn render_into(&self, out: &mut String) {
        out.push_str("<span class=\"");
        out.push_str(&self.class());
        out.push_str("\">");
        out.push_str(&self.text);
        out.push_str("</span>");
    }
}

fn escape_char(c: char, out: &mut String) {
    match c {
        ' ' => out.push('\u{a0}'),
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        c => out.push(c),
    }
}

/// Render `screen` to markup, with `cursor` overriding its own cell's
/// colors when visible.
#[must_use]
pub fn render(screen: &Screen, cursor: &CursorState) -> String {
    let cols = screen.cols();
    let rows = screen.rows();
    let cells = screen.cells();
    let mut out = String::new();

    for y in 0..rows {
        let mut current: Option<Run> = None;
        for x in 0..cols {
            let cell = cells[y * cols + x];
            let (code, attrs, color) = cell.unpack();
            let (bg, fg) = unpack_color(color);
            let reverse = attrs.contains(Attrs::REVERSE);
            let (mut eff_bg, mut eff_fg) = if reverse { (fg, bg) } else { (bg, fg) };
            let eff_attrs = attrs & !Attrs::REVERSE;

            if cursor.visible && cursor.x == x && cursor.y == y {
                eff_bg = CURSOR_BG;
                eff_fg = CURSOR_FG;
            }

            let ch = if code == 0 {
                ' '
            } else {
                char::from_u32(code).unwrap_or(' ')
            };
            let mut escaped = String::new();
            escape_char(ch, &mut escaped);

            match &mut current {
                Some(run) if run.bg == eff_bg && run.fg == eff_fg && run.attrs == eff_attrs => {
                    run.text.push_str(&escaped);
                }
                _ => {
                    if let Some(run) = current.take() {
                        run.render_into(&mut out);
                    }
                    current = Some(Run {
                        bg: eff_bg,
                        fg: eff_fg,
                        attrs: eff_attrs,
                        text: escaped,
                    });
                }
            }
        }
        if let Some(run) = current.take() {
            run.render_into(&mut out);
        }
        out.push_str("<br>\n");
    }

    out
}
