//! Packed cell representation (component A's primitive — see [`crate::screen`]
//! for the buffer that holds these).
//!
//! A [`Cell`] is a single `u64` carrying three disjoint fields, densest-first
//! so the whole screen stays cache-friendly as one flat `Vec<Cell>`:
//!
//! ```text
//! bit  36                 29 28           21 20                    0
//!      | color (8 bits)     | attrs (8 bits) | code point (21 bits) |
//! ```
//!
//! The code point field is wide enough for any Unicode scalar value
//! (`0x10FFFF` needs 21 bits); `0` means "blank". The color field packs
//! `bg << 4 | fg`, each a 4-bit index into a 16-color palette — bright
//! variants (8..15) are reachable only through [`Attrs::BOLD`] biasing a
//! subsequent foreground write, never written to directly (see
//! [`crate::sgr::SgrState::set_color`]).

use bitflags::bitflags;

bitflags! {
    /// Graphic-rendition attribute bits merged into every printed cell.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Attrs: u8 {
        const UNDERLINE  = 1 << 0;
        const REVERSE    = 1 << 1;
        const BLINK      = 1 << 2;
        const BOLD       = 1 << 3;
        const DIM        = 1 << 4;
        const STANDOUT   = 1 << 5;
        const ALTCHARSET = 1 << 6;
    }
}

const CODE_BITS: u32 = 21;
const CODE_MASK: u64 = (1 << CODE_BITS) - 1;
const ATTR_SHIFT: u32 = CODE_BITS;
const ATTR_MASK: u64 = 0xFF;
const COLOR_SHIFT: u32 = ATTR_SHIFT + 8;
const COLOR_MASK: u64 = 0xFF;

/// Default foreground index (light grey).
pub const DEFAULT_FG: u8 = 7;
/// Default background index (black).
pub const DEFAULT_BG: u8 = 0;

/// Pack a `(bg, fg)` pair into the cell's 8-bit color field.
#[must_use]
pub const fn pack_color(bg: u8, fg: u8) -> u8 {
    ((bg & 0x0F) << 4) | (fg & 0x0F)
}

/// Unpack a color byte into `(bg, fg)`.
#[must_use]
pub const fn unpack_color(color: u8) -> (u8, u8) {
    (color >> 4, color & 0x0F)
}

/// One screen position: a Unicode scalar value plus graphic rendition.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Cell(u64);

impl Cell {
    /// Build a cell from its three fields.
    #[must_use]
    pub const fn pack(code_point: u32, attrs: Attrs, color: u8) -> Self {
        let code = (code_point as u64) & CODE_MASK;
        let attr = (attrs.bits() as u64 & ATTR_MASK) << ATTR_SHIFT;
        let col = (color as u64 & COLOR_MASK) << COLOR_SHIFT;
        Self(code | attr | col)
    }

    /// Split the cell back into `(code_point, attrs, color)`.
    #[must_use]
    pub const fn unpack(self) -> (u32, Attrs, u8) {
        let code = (self.0 & CODE_MASK) as u32;
        let attr = ((self.0 >> ATTR_SHIFT) & ATTR_MASK) as u8;
        let color = ((self.0 >> COLOR_SHIFT) & COLOR_MASK) as u8;
        (code, Attrs::from_bits_truncate(attr), color)
    }

    /// The decoded Unicode scalar value, or `None` for a blank cell.
    #[must_use]
    pub fn code_point(self) -> Option<char> {
        let (code, _, _) = self.unpack();
        if code == 0 {
            None
        } else {
            char::from_u32(code)
        }
    }

    #[must_use]
    pub fn attrs(self) -> Attrs {
        self.unpack().1
    }

    #[must_use]
    pub fn color(self) -> u8 {
        self.unpack().2
    }

    /// Raw bits merged into a freshly printed character (see
    /// [`crate::sgr::SgrState::bits`]).
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Wrap a pre-merged `sgr_bits | codepoint` value, as produced by
    /// [`crate::sgr::SgrState::bits`] OR'd with a scalar value.
    #[must_use]
    pub const fn from_raw(bits: u64) -> Self {
        Self(bits & (CODE_MASK | (ATTR_MASK << ATTR_SHIFT) | (COLOR_MASK << COLOR_SHIFT)))
    }
}

impl Default for Cell {
    /// The default cell: fg=7 (light grey), bg=0 (black), no attributes,
    /// code point 0. All clears write this value.
    fn default() -> Self {
        Self::pack(0, Attrs::empty(), pack_color(DEFAULT_BG, DEFAULT_FG))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cell_matches_spec() {
        let cell = Cell::default();
        let (code, attrs, color) = cell.unpack();
        assert_eq!(code, 0);
        assert!(attrs.is_empty());
        assert_eq!(unpack_color(color), (DEFAULT_BG, DEFAULT_FG));
    }

    #[test]
    fn pack_unpack_round_trip() {
        let attrs = Attrs::BOLD | Attrs::UNDERLINE;
        let color = pack_color(3, 10);
        let cell = Cell::pack('x' as u32, attrs, color);
        let (code, got_attrs, got_color) = cell.unpack();
        assert_eq!(char::from_u32(code), Some('x'));
        assert_eq!(got_attrs, attrs);
        assert_eq!(got_color, color);
    }

    #[test]
    fn color_pack_masks_to_nibbles() {
        assert_eq!(pack_color(0xFF, 0xFF), 0xFF);
        assert_eq!(unpack_color(0xFF), (0x0F, 0x0F));
    }

    #[test]
    fn bold_biases_high_nibble_of_color_is_independent_of_attr_field() {
        // The attribute bit for bold lives in its own field; it is the
        // *handler* (set_color) that folds bold into the fg nibble before
        // packing, not the cell layout itself.
        let bright_green = pack_color(0, 8 | 2);
        assert_eq!(unpack_color(bright_green), (0, 10));
    }
}
