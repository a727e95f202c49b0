//! Component D — the capability table.
//!
//! Three declarative tables, loaded once per [`crate::Emulator::new`] call
//! from the embedded TOML file at `assets/capabilities.toml`: control
//! characters (single byte -> id), exact escape sequences (literal string ->
//! id), and parametric escape sequences (`%d`-templated string -> id,
//! compiled to a regular expression). The core never hard-codes a sequence
//! outside this file (`SPEC_FULL.md` §4.D).

use std::collections::HashMap;

use regex::Regex;
use serde::Deserialize;

use crate::error::ConfigError;

/// The capability table embedded in the crate. Swapping this file (and
/// rebuilding) is the only supported way to change the recognized sequence
/// set — there is no runtime file path, consistent with the core doing no
/// filesystem I/O (`SPEC_FULL.md`, Ambient Stack / Configuration).
pub const DEFAULT_TABLE_SOURCE: &str = include_str!("../assets/capabilities.toml");

/// A decoded terminal operation with its integer arguments already parsed
/// out of the matched sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    Cr,
    Ind,
    Ri,
    Cub1,
    Ht,
    Ignore,
    Cuf(u32),
    Cud(u32),
    Kcuu1,
    Kcub1,
    Kcuf1,
    Kcud1,
    Home,
    Cup(u32, u32),
    Vpa(u32),
    Hpa(u32),
    Sc,
    Rc,
    Csr(u32, u32),
    El,
    El1,
    Ed,
    Ech(u32),
    Dch(u32),
    Dch1,
    Ich(u32),
    Ich1,
    Il(u32),
    Il1,
    Dl(u32),
    Dl1,
    Civis,
    Cvvis,
    Sgr0,
    Op,
    Bold,
    Dim,
    Smul,
    Rmul,
    Rev,
    Blink,
    Smso,
    Rmso,
    Rmpch,
    Smpch,
    Smir,
    Rmir,
    SetColor(u32),
    SetColorPair(u32, u32),
    /// Keypad-center: intentionally a no-op, preserved from the source this
    /// core is grounded on (see `SPEC_FULL.md`, Open Questions).
    Kb2,
    /// Device-attributes query: queues a pending reply for the host to
    /// write back to the child (see `Emulator::take_pending_reply`).
    Da,
}

/// Build a [`Capability`] from its declarative id and captured arguments.
/// Returns `None` for an id/arity combination this build does not
/// implement — a configuration fault at table-build time, a silent
/// diagnostic at dispatch time (sequences can't change arity after the
/// table validated them).
fn capability_from_id(id: &str, args: &[u32]) -> Option<Capability> {
    use Capability::{
        Blink, Bold, Civis, Csr, Cub1, Cud, Cuf, Cup, Cvvis, Da, Dch, Dch1, Dim, Dl, Dl1, Ech, Ed,
        El, El1, Hpa, Ht, Ich, Ich1, Ignore, Il, Il1, Ind, Kb2, Kcub1, Kcud1, Kcuf1, Kcuu1, Op,
        Rc, Rev, Ri, Rmir, Rmpch, Rmso, Rmul, Sc, SetColor, SetColorPair, Sgr0, Smir, Smpch, Smso,
        Smul, Vpa,
    };
    Some(match (id, args) {
        ("cr", []) => Capability::Cr,
        ("ind", []) => Ind,
        ("ri", []) => Ri,
        ("cub1", []) => Cub1,
        ("ht", []) => Ht,
        ("ignore", _) => Ignore,
        ("cuf", [n]) => Cuf(*n),
        ("cud", [n]) => Cud(*n),
        ("kcuu1", []) => Kcuu1,
        ("kcub1", []) => Kcub1,
        ("kcuf1", []) => Kcuf1,
        ("kcud1", []) => Kcud1,
        ("home", []) => Capability::Home,
        ("cup", [y, x]) => Cup(*y, *x),
        ("vpa", [y]) => Vpa(*y),
        ("hpa", [x]) => Hpa(*x),
        ("sc", []) => Sc,
        ("rc", []) => Rc,
        ("csr", [top, bottom]) => Csr(*top, *bottom),
        ("el", []) => El,
        ("el1", []) => El1,
        ("ed", []) => Ed,
        ("ech", [n]) => Ech(*n),
        ("dch", [n]) => Dch(*n),
        ("dch1", []) => Dch1,
        ("ich", [n]) => Ich(*n),
        ("ich1", []) => Ich1,
        ("il", [n]) => Il(*n),
        ("il1", []) => Il1,
        ("dl", [n]) => Dl(*n),
        ("dl1", []) => Dl1,
        ("civis", []) => Civis,
        ("cvvis", []) => Cvvis,
        ("sgr0", []) => Sgr0,
        ("op", []) => Op,
        ("bold", []) => Bold,
        ("dim", []) => Dim,
        ("smul", []) => Smul,
        ("rmul", []) => Rmul,
        ("rev", []) => Rev,
        ("blink", []) => Blink,
        ("smso", []) => Smso,
        ("rmso", []) => Rmso,
        ("rmpch", []) => Rmpch,
        ("smpch", []) => Smpch,
        ("smir", []) => Smir,
        ("rmir", []) => Rmir,
        ("set_color", [n]) => SetColor(*n),
        ("set_color_pair", [p1, p2]) => SetColorPair(*p1, *p2),
        ("kb2", _) => Kb2,
        ("da", []) => Da,
        _ => return None,
    })
}

/// True if `id` is recognized at *some* arity 0..=2 — used only to validate
/// a freshly loaded table at construction time.
fn known_capability(id: &str) -> bool {
    (0..=2).any(|arity| capability_from_id(id, &vec![0u32; arity]).is_some())
}

#[derive(Deserialize)]
struct RawTable {
    control_characters: HashMap<String, String>,
    escape_sequences: HashMap<String, String>,
    escape_sequences_re: HashMap<String, String>,
}

/// Turn `\E` (the two literal characters backslash-E) into the ESC byte,
/// per `SPEC_FULL.md`'s declarative-file notation.
fn expand_esc(template: &str) -> String {
    template.replace("\\E", "\u{1b}")
}

/// Compile a `%d`-templated sequence into an anchored regular expression.
/// `[` is matched literally (escaped along with every other literal
/// segment); each `%d` becomes a `([0-9]+)` capture.
fn compile_parametric(template: &str) -> Result<Regex, regex::Error> {
    let mut pattern = String::from("^");
    for (i, part) in template.split("%d").enumerate() {
        if i > 0 {
            pattern.push_str("([0-9]+)");
        }
        pattern.push_str(&regex::escape(part));
    }
    pattern.push('$');
    Regex::new(&pattern)
}

/// The compiled capability table: control bytes, exact sequences, and
/// parametric patterns, all resolved to capability ids.
#[derive(Debug)]
pub struct CapabilityTable {
    control_characters: HashMap<u8, String>,
    exact: HashMap<String, String>,
    parametric: Vec<(Regex, String)>,
}

impl CapabilityTable {
    /// Parse and validate a declarative table. Every id named by the table
    /// must be one this build implements; every parametric template must
    /// compile.
    pub fn build(source: &str) -> Result<Self, ConfigError> {
        let raw: RawTable = toml::from_str(source)?;

        let mut control_characters = HashMap::with_capacity(raw.control_characters.len());
        for (byte, id) in raw.control_characters {
            if !known_capability(&id) {
                return Err(ConfigError::UnknownCapability { id });
            }
            let byte: u8 = byte.parse().map_err(|_| ConfigError::UnknownCapability {
                id: format!("control byte {byte:?} is not a valid u8"),
            })?;
            control_characters.insert(byte, id);
        }

        let mut exact = HashMap::with_capacity(raw.escape_sequences.len());
        for (seq, id) in raw.escape_sequences {
            if !known_capability(&id) {
                return Err(ConfigError::UnknownCapability { id });
            }
            exact.insert(expand_esc(&seq), id);
        }

        // A BTreeMap iteration gives deterministic (alphabetical) ordering;
        // the patterns below are pairwise non-overlapping once anchored
        // (`^...$`), so match order never actually disambiguates two
        // candidates — determinism is kept for reproducibility, not
        // correctness.
        let mut ordered: Vec<_> = raw.escape_sequences_re.into_iter().collect();
        ordered.sort_by(|a, b| a.0.cmp(&b.0));

        let mut parametric = Vec::with_capacity(ordered.len());
        for (template, id) in ordered {
            if !known_capability(&id) {
                return Err(ConfigError::UnknownCapability { id });
            }
            let expanded = expand_esc(&template);
            let regex = compile_parametric(&expanded).map_err(|source| ConfigError::Pattern {
                pattern: expanded,
                source,
            })?;
            parametric.push((regex, id));
        }

        Ok(Self {
            control_characters,
            exact,
            parametric,
        })
    }

    /// Build the table embedded in this crate (`assets/capabilities.toml`).
    pub fn default_table() -> Result<Self, ConfigError> {
        Self::build(DEFAULT_TABLE_SOURCE)
    }

    /// Look up a control byte (e.g. `0x0A` for LF).
    #[must_use]
    pub fn lookup_control(&self, byte: u8) -> Option<Capability> {
        let id = self.control_characters.get(&byte)?;
        capability_from_id(id, &[])
    }

    /// Try an exact match first, then each parametric pattern in order.
    /// Returns `None` if nothing matches (caller discards or keeps
    /// accumulating, per `SPEC_FULL.md` §4.E).
    #[must_use]
    pub fn lookup_sequence(&self, seq: &str) -> Option<Capability> {
        if let Some(id) = self.exact.get(seq) {
            return capability_from_id(id, &[]);
        }
        for (regex, id) in &self.parametric {
            if let Some(captures) = regex.captures(seq) {
                let args: Vec<u32> = captures
                    .iter()
                    .skip(1)
                    .filter_map(|m| m.and_then(|m| m.as_str().parse().ok()))
                    .collect();
                if let Some(cap) = capability_from_id(id, &args) {
                    return Some(cap);
                }
                log::warn!("capability id {id:?} matched but has no handler for arity {}", args.len());
                return None;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_builds() {
        CapabilityTable::default_table().expect("embedded table must be valid");
    }

    #[test]
    fn control_character_lookup() {
        let table = CapabilityTable::default_table().unwrap();
        assert_eq!(table.lookup_control(0x0A), Some(Capability::Ind));
        assert_eq!(table.lookup_control(0x0D), Some(Capability::Cr));
        assert_eq!(table.lookup_control(0x08), Some(Capability::Cub1));
    }

    #[test]
    fn exact_sequence_lookup() {
        let table = CapabilityTable::default_table().unwrap();
        assert_eq!(table.lookup_sequence("\x1b[H"), Some(Capability::Home));
        assert_eq!(table.lookup_sequence("\x1b[?25l"), Some(Capability::Civis));
    }

    #[test]
    fn parametric_sequence_lookup_parses_args() {
        let table = CapabilityTable::default_table().unwrap();
        assert_eq!(
            table.lookup_sequence("\x1b[12;34H"),
            Some(Capability::Cup(12, 34))
        );
        assert_eq!(table.lookup_sequence("\x1b[32m"), Some(Capability::SetColor(32)));
        assert_eq!(table.lookup_sequence("\x1b[3@"), Some(Capability::Ich(3)));
        assert_eq!(
            table.lookup_sequence("\x1b[1;32m"),
            Some(Capability::SetColorPair(1, 32))
        );
    }

    #[test]
    fn unknown_sequence_returns_none() {
        let table = CapabilityTable::default_table().unwrap();
        assert_eq!(table.lookup_sequence("\x1b[999zzz"), None);
    }

    #[test]
    fn malformed_table_reports_unknown_capability() {
        let bad = r#"
            [control_characters]
            10 = "not_a_real_capability"
            [escape_sequences]
            [escape_sequences_re]
        "#;
        assert!(matches!(
            CapabilityTable::build(bad),
            Err(ConfigError::UnknownCapability { .. })
        ));
    }

    #[test]
    fn malformed_toml_reports_parse_error() {
        assert!(matches!(
            CapabilityTable::build("not valid toml {{{"),
            Err(ConfigError::Toml(_))
        ));
    }
}
