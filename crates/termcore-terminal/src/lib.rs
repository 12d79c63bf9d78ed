//! Command processing core.
//!
//! A line goes through the [`Processor`]: it is tokenized, resolved to a
//! registered [`Command`] by exact name or, failing that, by one pass of
//! the rule-based [`Translator`], checked against the command's [`Arity`],
//! dispatched with an [`Environment`] borrowed from the caller's
//! [`Session`], and recorded in that session's [`History`].

mod commands;
mod file_commands;
mod history;
mod processor;
mod registry;
mod rules;
mod session;
mod system_commands;
#[cfg(test)]
mod testutil;
mod tokenizer;
pub mod translator;

/// Register every built-in command and alias into a registry.
pub use commands::register_builtins;
/// Register ls, cd, mkdir, rm, cat, grep, find, wc, cp, mv.
pub use file_commands::register_file_commands;
/// Bounded per-session history with stable sequence numbers.
pub use history::{History, HistoryEntry};
/// Line processing and its outcome.
pub use processor::{
    CommandResult, Processor, ProcessorOptions, Resolution, Signal, exit_code_for,
};
/// Command trait, output, execution environment and the registry.
pub use registry::{Arity, Command, CommandOutput, CommandRegistry, Environment};
/// Session state and the front-end facing session manager.
pub use session::{Session, SessionContext, SessionManager};
/// Register ps, kill, top, df, free.
pub use system_commands::register_system_commands;
/// Shell-like line splitting.
pub use tokenizer::{ParsedInput, join_line, quote, split_tokens, tokenize};
/// Rule-based phrase translation.
pub use translator::{Translation, TranslationRule, Translator};
