//! Component B — Select Graphic Rendition state.
//!
//! The "pending" attribute/color bits merged into every character the
//! cursor prints. Its field layout mirrors [`Cell`]'s attribute/color
//! regions so [`SgrState::bits`] can be OR'd directly with a code point on
//! `echo` (see `crate::emulator::Emulator::echo`).

use crate::cell::{pack_color, unpack_color, Attrs, Cell, DEFAULT_BG, DEFAULT_FG};

/// Current graphic rendition: pending attribute bits plus fg/bg indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SgrState {
    attrs: Attrs,
    fg: u8,
    bg: u8,
}

impl SgrState {
    #[must_use]
    pub fn fg(&self) -> u8 {
        self.fg
    }

    #[must_use]
    pub fn bg(&self) -> u8 {
        self.bg
    }

    #[must_use]
    pub fn attrs(&self) -> Attrs {
        self.attrs
    }

    /// Reset to the default cell's rendition: fg=7, bg=0, no attributes.
    pub fn default_rendition(&mut self) {
        self.attrs = Attrs::empty();
        self.fg = DEFAULT_FG;
        self.bg = DEFAULT_BG;
    }

    pub fn set_bit(&mut self, bit: Attrs) {
        self.attrs.insert(bit);
    }

    pub fn clear_bit(&mut self, bit: Attrs) {
        self.attrs.remove(bit);
    }

    #[must_use]
    pub fn is_bit_set(&self, bit: Attrs) -> bool {
        self.attrs.contains(bit)
    }

    /// Set the foreground color index, biased +8 (the bright palette) when
    /// [`Attrs::BOLD`] is already set — ECMA-48 bold-implies-bright as
    /// adopted by the source this core is grounded on (see
    /// `SPEC_FULL.md` §4.B).
    fn set_fg(&mut self, index: u8) {
        let bias = if self.attrs.contains(Attrs::BOLD) { 8 } else { 0 };
        self.fg = (index & 0x07) | bias;
    }

    /// Set the background color index. Bold never biases the background;
    /// the renderer masks it back to the normal 3-bit range regardless
    /// (see `crate::render`).
    fn set_bg(&mut self, index: u8) {
        self.bg = index & 0x0F;
    }

    /// Apply a single numeric SGR parameter, `n`, per the domain in
    /// `SPEC_FULL.md` §4.B: `{0, 1, 2, 4, 5, 7, 10, 11, 24, 27, 30..37, 39,
    /// 40..47, 49}`. Values outside that domain are silently ignored —
    /// callers unsure whether to treat an unmapped SGR parameter as an
    /// error should not; real shells emit plenty of SGR codes this subset
    /// never claims to implement.
    pub fn set_color(&mut self, n: u32) {
        match n {
            0 => self.default_rendition(),
            1 => self.set_bit(Attrs::BOLD),
            2 => self.set_bit(Attrs::DIM),
            4 => self.set_bit(Attrs::UNDERLINE),
            5 => self.set_bit(Attrs::BLINK),
            7 => self.set_bit(Attrs::REVERSE),
            10 => self.clear_bit(Attrs::ALTCHARSET),
            11 => self.set_bit(Attrs::ALTCHARSET),
            24 => self.clear_bit(Attrs::UNDERLINE),
            27 => self.clear_bit(Attrs::REVERSE),
            30..=37 => self.set_fg((n - 30) as u8),
            39 => self.fg = DEFAULT_FG,
            40..=47 => self.set_bg((n - 40) as u8),
            49 => self.bg = DEFAULT_BG,
            _ => {}
        }
    }

    /// Apply the two-argument SGR form (`ESC [ p1 ; p2 m`). `(0,10)` and
    /// `(39,49)` are the two spellings of "reset to default" seen in the
    /// wild; everything else dispatches each argument to [`Self::set_color`]
    /// independently.
    pub fn set_color_pair(&mut self, p1: u32, p2: u32) {
        match (p1, p2) {
            (0, 10) | (39, 49) => self.default_rendition(),
            _ => {
                self.set_color(p1);
                self.set_color(p2);
            }
        }
    }

    /// The bits to OR with a code point when printing a character with this
    /// rendition in effect.
    #[must_use]
    pub fn bits(&self) -> u64 {
        Cell::pack(0, self.attrs, pack_color(self.bg, self.fg)).raw()
    }
}

impl Default for SgrState {
    fn default() -> Self {
        let mut sgr = Self {
            attrs: Attrs::empty(),
            fg: DEFAULT_FG,
            bg: DEFAULT_BG,
        };
        sgr.default_rendition();
        sgr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_default_cell() {
        let sgr = SgrState::default();
        assert_eq!((sgr.bg(), sgr.fg()), (DEFAULT_BG, DEFAULT_FG));
        assert!(sgr.attrs().is_empty());
    }

    #[test]
    fn bold_then_green_yields_bright_green() {
        let mut sgr = SgrState::default();
        sgr.set_color(1); // bold
        sgr.set_color(32); // setaf green
        assert!(sgr.is_bit_set(Attrs::BOLD));
        assert_eq!(sgr.fg(), 10);
    }

    #[test]
    fn green_then_bold_also_biases_because_fg_was_reapplied() {
        // Order matters: bold must be set *before* the fg write it biases.
        let mut sgr = SgrState::default();
        sgr.set_color(32); // green, not yet bold
        assert_eq!(sgr.fg(), 2);
        sgr.set_color(1); // bold alone does not retroactively bias fg
        assert_eq!(sgr.fg(), 2);
    }

    #[test]
    fn sgr0_resets_bold_bias() {
        let mut sgr = SgrState::default();
        sgr.set_color(1);
        sgr.set_color(31);
        assert_eq!(sgr.fg(), 9);
        sgr.set_color_pair(0, 10);
        assert_eq!((sgr.bg(), sgr.fg()), (DEFAULT_BG, DEFAULT_FG));
        assert!(sgr.attrs().is_empty());
    }

    #[test]
    fn op_resets_colors_only() {
        let mut sgr = SgrState::default();
        sgr.set_bit(Attrs::BOLD);
        sgr.set_color_pair(39, 49);
        assert_eq!((sgr.bg(), sgr.fg()), (DEFAULT_BG, DEFAULT_FG));
        assert!(sgr.attrs().is_empty());
    }

    #[test]
    fn unpack_color_masks_bg_to_three_bits_for_rendering() {
        let mut sgr = SgrState::default();
        sgr.set_color(47); // bright-adjacent bg index via raw byte
        let (bg, _fg) = unpack_color(pack_color(sgr.bg(), sgr.fg()));
        assert!(bg <= 0x0F);
    }
}
