//! Command trait, argument-count descriptor and the command registry.

use std::collections::HashMap;
use std::fmt;

use termcore_platform::SystemService;
use termcore_types::error::{Result, TermError};
use termcore_vfs::Vfs;

use crate::history::History;
use crate::session::SessionContext;

/// Output produced by a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    /// Plain text lines.
    Text(String),
    /// Tabular data (header row + data rows).
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Command produced no visible output.
    None,
    /// Ask the front-end to clear its screen.
    Clear,
    /// Ask the front-end to end the session.
    Exit,
}

impl CommandOutput {
    /// Render to plain text. Signals render as nothing.
    pub fn render(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Table { headers, rows } => render_table(headers, rows),
            Self::None | Self::Clear | Self::Exit => String::new(),
        }
    }
}

/// Left-aligned columns separated by two spaces; the last column is not
/// padded.
fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let cols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(cols) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }
    let fmt_row = |cells: &[String]| -> String {
        let mut line = String::new();
        for (i, cell) in cells.iter().enumerate().take(cols) {
            if i + 1 == cols {
                line.push_str(cell);
            } else {
                line.push_str(&format!("{cell:<w$}  ", w = widths[i]));
            }
        }
        line.trim_end().to_string()
    };
    let mut out = vec![fmt_row(headers)];
    out.extend(rows.iter().map(|r| fmt_row(r)));
    out.join("\n")
}

/// Everything a handler may touch while it runs.
///
/// Built fresh by the processor for every dispatch; one session's state
/// is never visible to another session's handlers.
pub struct Environment<'a> {
    /// Working directory and variables of the calling session.
    pub context: &'a mut SessionContext,
    /// The session's file system.
    pub vfs: &'a mut dyn Vfs,
    /// The session's history (read by `history`, cleared by `history clear`).
    pub history: &'a mut History,
    /// The command set, for `help`.
    pub registry: &'a CommandRegistry,
    /// Host process/memory/disk services, when available.
    pub system: Option<&'a dyn SystemService>,
}

/// Accepted argument count for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    /// `None` means unbounded.
    pub max: Option<usize>,
}

impl Arity {
    pub const fn exactly(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    pub const fn at_least(n: usize) -> Self {
        Self { min: n, max: None }
    }

    pub const fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub const fn none() -> Self {
        Self::exactly(0)
    }

    pub const fn any() -> Self {
        Self::at_least(0)
    }

    pub fn accepts(&self, n: usize) -> bool {
        n >= self.min && self.max.is_none_or(|max| n <= max)
    }

    /// Fail with `ArgumentCount` when `got` is out of range.
    pub fn check(&self, command: &str, got: usize) -> Result<()> {
        if self.accepts(got) {
            Ok(())
        } else {
            Err(TermError::ArgumentCount {
                command: command.to_string(),
                expected: self.to_string(),
                got,
            })
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "exactly {max}"),
            Some(max) => write!(f, "{} to {max}", self.min),
            None => write!(f, "at least {}", self.min),
        }
    }
}

/// A single executable command.
///
/// Implementations are shared between sessions, so they hold no
/// per-session state; everything mutable arrives through [`Environment`].
pub trait Command: Send + Sync {
    /// The command name (what the user types).
    fn name(&self) -> &str;

    /// One-line description for `help`.
    fn description(&self) -> &str;

    /// Usage string (e.g. "ls \[path\]").
    fn usage(&self) -> &str;

    /// Command category for grouping in `help` output.
    fn category(&self) -> &str {
        "general"
    }

    /// Accepted argument count, checked before `execute` is called.
    fn arity(&self) -> Arity {
        Arity::any()
    }

    /// Execute the command with the given arguments and environment.
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput>;
}

/// Name -> command mapping, filled once at startup.
///
/// Names and aliases share one namespace; neither may be registered twice.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Box<dyn Command>>,
    index: HashMap<String, usize>,
    aliases: Vec<(String, String)>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. Fails if the name is already taken.
    pub fn register(&mut self, cmd: Box<dyn Command>) -> Result<()> {
        let name = cmd.name().to_string();
        if self.index.contains_key(&name) {
            return Err(TermError::AlreadyRegistered(name));
        }
        self.index.insert(name, self.commands.len());
        self.commands.push(cmd);
        Ok(())
    }

    /// Make `alias` resolve to the already-registered `target`.
    pub fn register_alias(&mut self, alias: &str, target: &str) -> Result<()> {
        if self.index.contains_key(alias) {
            return Err(TermError::AlreadyRegistered(alias.to_string()));
        }
        let idx = *self
            .index
            .get(target)
            .ok_or_else(|| TermError::NotFound(format!("command {target}")))?;
        self.index.insert(alias.to_string(), idx);
        self.aliases.push((alias.to_string(), target.to_string()));
        Ok(())
    }

    /// Exact, case-sensitive lookup of a name or alias.
    pub fn lookup(&self, name: &str) -> Option<&dyn Command> {
        self.index.get(name).map(|&i| self.commands[i].as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All commands in registration order.
    pub fn list_all(&self) -> impl Iterator<Item = &dyn Command> {
        self.commands.iter().map(|c| c.as_ref())
    }

    /// `(alias, target)` pairs in registration order.
    pub fn aliases(&self) -> &[(String, String)] {
        &self.aliases
    }

    /// Names, then aliases, starting with `partial`.
    pub fn completions(&self, partial: &str) -> Vec<String> {
        self.commands
            .iter()
            .map(|c| c.name())
            .chain(self.aliases.iter().map(|(a, _)| a.as_str()))
            .filter(|n| n.starts_with(partial))
            .map(str::to_string)
            .collect()
    }

    /// Number of registered commands (aliases excluded).
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
