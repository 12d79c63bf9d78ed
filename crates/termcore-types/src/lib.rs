//! Foundation types for termcore.
//!
//! This crate holds what every other termcore crate agrees on: the error
//! enum with its closed set of user-facing error kinds, and the terminal
//! configuration model.

pub mod config;
pub mod error;

pub use config::{ListenerConfig, TerminalConfig};
pub use error::{ErrorKind, Result, TermError};
