//! Component E — the byte-stream state machine.
//!
//! Bytes arrive in arbitrary chunks (`Emulator::feed_bytes` may be called
//! with a single byte or a full PTY read); this module owns the two things
//! that make that safe: buffering a UTF-8 scalar value that straddles two
//! calls, and accumulating an in-progress escape sequence until it matches
//! a capability, grows past the accumulation cap, or the sequence is
//! abandoned by a fresh ESC.

use crate::capability::{Capability, CapabilityTable};

/// Longest escape sequence the accumulator will hold before giving up and
/// discarding it (`SPEC_FULL.md` §4.E). Every sequence in the capability
/// table is well under this.
const MAX_ACCUMULATION: usize = 32;

/// One decoded unit of work handed back to the emulator: either a plain
/// printable scalar to echo, or a recognized capability to dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Print(char),
    Cap(Capability),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Normal,
    Accumulating,
}

/// Buffers a partial UTF-8 scalar across `feed` calls, decoding as much of
/// `bytes` as is currently valid and holding back any trailing incomplete
/// sequence for the next call. Bytes that are flatly invalid UTF-8 are
/// discarded (logged) rather than surfaced as an error — this core has no
/// caller-visible fault beyond table construction (`SPEC_FULL.md` §7).
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn feed(&mut self, bytes: &[u8], out: &mut Vec<char>) {
        self.pending.extend_from_slice(bytes);
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    out.extend(valid.chars());
                    self.pending.clear();
                    return;
                }
                Err(error) => {
                    let valid_up_to = error.valid_up_to();
                    // SAFETY-free: `valid_up_to` is exactly the boundary
                    // `from_utf8` reported, so this prefix is valid UTF-8.
                    let valid = std::str::from_utf8(&self.pending[..valid_up_to]).unwrap();
                    out.extend(valid.chars());
                    match error.error_len() {
                        Some(bad_len) => {
                            log::warn!("discarding {bad_len} byte(s) of invalid UTF-8");
                            self.pending = self.pending[valid_up_to + bad_len..].to_vec();
                            // loop again: more valid bytes may follow.
                        }
                        None => {
                            // Trailing bytes are a valid-so-far partial
                            // scalar; keep them for the next feed.
                            self.pending = self.pending[valid_up_to..].to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// The escape-sequence accumulator and UTF-8 reassembler.
#[derive(Debug, Default)]
pub struct Parser {
    state: State,
    buffer: String,
    decoder: Utf8Decoder,
}

impl Default for State {
    fn default() -> Self {
        State::Normal
    }
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `bytes` against `table`, returning the actions to apply in
    /// order. Safe to call with any chunking, including a single byte at a
    /// time or a slice spanning many sequences.
    pub fn feed(&mut self, bytes: &[u8], table: &CapabilityTable) -> Vec<Action> {
        let mut scalars = Vec::new();
        self.decoder.feed(bytes, &mut scalars);

        let mut actions = Vec::with_capacity(scalars.len());
        for c in scalars {
            self.feed_scalar(c, table, &mut actions);
        }
        actions
    }

    fn feed_scalar(&mut self, c: char, table: &CapabilityTable, actions: &mut Vec<Action>) {
        match self.state {
            State::Normal => self.feed_normal(c, table, actions),
            State::Accumulating => self.feed_accumulating(c, table, actions),
        }
    }

    fn feed_normal(&mut self, c: char, table: &CapabilityTable, actions: &mut Vec<Action>) {
        if c == '\u{1b}' {
            self.buffer.clear();
            self.buffer.push(c);
            self.state = State::Accumulating;
            return;
        }
        if (c as u32) < 0x20 || c == '\u{7f}' {
            match table.lookup_control(c as u8) {
                Some(cap) => actions.push(Action::Cap(cap)),
                None => log::trace!("unrecognized control byte {:#04x}", c as u32),
            }
            return;
        }
        actions.push(Action::Print(c));
    }

    fn feed_accumulating(&mut self, c: char, table: &CapabilityTable, actions: &mut Vec<Action>) {
        // A fresh ESC abandons whatever was being accumulated and starts a
        // new sequence; real shells never interleave two in flight, but a
        // dropped byte upstream could desync us, and restarting here keeps
        // the parser from wedging on a single corrupt byte.
        if c == '\u{1b}' {
            log::debug!("abandoning incomplete sequence {:?} for a new one", self.buffer);
            self.buffer.clear();
            self.buffer.push(c);
            return;
        }

        // A control byte arriving mid-sequence interrupts accumulation the
        // same way it would in Normal state — an embedded `\r`/`\n`/etc.
        // can never be part of a real escape sequence, and letting it join
        // the buffer just breaks the anchored regex later on.
        if (c as u32) < 0x20 || c == '\u{7f}' {
            log::debug!("control byte interrupts incomplete sequence {:?}", self.buffer);
            self.buffer.clear();
            self.state = State::Normal;
            match table.lookup_control(c as u8) {
                Some(cap) => actions.push(Action::Cap(cap)),
                None => log::trace!("unrecognized control byte {:#04x}", c as u32),
            }
            return;
        }

        self.buffer.push(c);

        if self.buffer.chars().count() > MAX_ACCUMULATION {
            log::warn!("discarding overlong escape sequence {:?}", self.buffer);
            self.buffer.clear();
            self.state = State::Normal;
            return;
        }

        if let Some(cap) = table.lookup_sequence(&self.buffer) {
            actions.push(Action::Cap(cap));
            self.buffer.clear();
            self.state = State::Normal;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityTable;

    fn table() -> CapabilityTable {
        CapabilityTable::default_table().unwrap()
    }

    #[test]
    fn plain_ascii_prints() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"hi", &table());
        assert_eq!(actions, vec![Action::Print('h'), Action::Print('i')]);
    }

    #[test]
    fn control_byte_dispatches_capability() {
        let mut parser = Parser::new();
        let actions = parser.feed(b"\r", &table());
        assert_eq!(actions, vec![Action::Cap(Capability::Cr)]);
    }

    #[test]
    fn escape_sequence_accumulates_across_multiple_feeds() {
        let mut parser = Parser::new();
        let t = table();
        let mut actions = parser.feed(b"\x1b[1", &t);
        assert!(actions.is_empty());
        actions.extend(parser.feed(b"2;34H", &t));
        assert_eq!(actions, vec![Action::Cap(Capability::Cup(12, 34))]);
    }

    #[test]
    fn utf8_scalar_splits_across_feed_calls() {
        let mut parser = Parser::new();
        let t = table();
        // "é" = 0xC3 0xA9
        let first = parser.feed(&[0xC3], &t);
        assert!(first.is_empty());
        let second = parser.feed(&[0xA9], &t);
        assert_eq!(second, vec![Action::Print('é')]);
    }

    #[test]
    fn overlong_sequence_is_discarded_and_parser_recovers() {
        let mut parser = Parser::new();
        let t = table();
        let mut garbage = vec![b'\x1b', b'['];
        garbage.extend(std::iter::repeat(b'9').take(40));
        let actions = parser.feed(&garbage, &t);
        assert!(actions.is_empty());
        // parser should be back in Normal and able to print again.
        let actions = parser.feed(b"x", &t);
        assert_eq!(actions, vec![Action::Print('x')]);
    }

    #[test]
    fn fresh_escape_abandons_incomplete_accumulation() {
        let mut parser = Parser::new();
        let t = table();
        parser.feed(b"\x1b[1", &t);
        let actions = parser.feed(b"\x1bH", &t);
        assert_eq!(actions, vec![Action::Cap(Capability::Home)]);
    }

    #[test]
    fn control_byte_mid_sequence_interrupts_accumulation() {
        let mut parser = Parser::new();
        let t = table();
        let mut actions = parser.feed(b"\x1b[1", &t);
        actions.extend(parser.feed(b"\r", &t));
        assert_eq!(actions, vec![Action::Cap(Capability::Cr)]);
        let actions = parser.feed(b"2;34H", &t);
        assert_eq!(
            actions,
            vec![
                Action::Print('2'),
                Action::Print(';'),
                Action::Print('3'),
                Action::Print('4'),
                Action::Print('H'),
            ]
        );
    }

    #[test]
    fn invalid_utf8_byte_is_discarded() {
        let mut parser = Parser::new();
        let actions = parser.feed(&[0xFF, b'x'], &table());
        assert_eq!(actions, vec![Action::Print('x')]);
    }
}
