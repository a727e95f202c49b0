//! Server-side terminal emulator core.
//!
//! An [`Emulator`] turns a byte stream from a child process's PTY into a
//! screen buffer and, on request, an HTML-like markup rendering of it. It
//! does not own a PTY, does not spawn a process, and does not write
//! anything back to the child beyond queuing the occasional reply (see
//! [`Emulator::take_pending_reply`]) for the host to deliver. One instance
//! serves exactly one session; nothing here is shared or synchronized.

pub mod capability;
pub mod cell;
pub mod cursor;
pub mod emulator;
pub mod error;
pub mod parser;
pub mod render;
pub mod screen;
pub mod sgr;

pub use cell::{Attrs, Cell};
pub use emulator::Emulator;
pub use error::ConfigError;
