//! Construction-time error taxonomy.
//!
//! Every other failure mode the core can hit — an undecodable UTF-8 byte, an
//! unknown or overlong escape sequence, a parameter clamped against screen
//! bounds — is recovered locally and never surfaces here (see §7 of
//! `SPEC_FULL.md`). Only a malformed capability table is a caller-visible
//! fault, and it can only happen at `Emulator::new` time: `resize` never
//! re-parses the table, so it is infallible.

use thiserror::Error;

/// A fault in the capability table loaded at construction.
///
/// Fatal for the instance being constructed; never raised after
/// construction succeeds.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The embedded capability table is not valid TOML.
    #[error("capability table is not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// A parametric (`escape_sequences_re`) template failed to compile into
    /// a regular expression.
    #[error("parametric sequence {pattern:?} does not compile: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A table entry names a capability id this build does not implement.
    #[error("capability table references unknown capability id {id:?}")]
    UnknownCapability { id: String },
}
