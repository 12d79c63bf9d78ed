//! Error types for termcore.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};

/// The closed set of error kinds a front-end ever sees.
///
/// The first four are raised by the command-processing core itself; the
/// rest are relayed unchanged from command handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The tokenizer could not split the line (unterminated quote).
    MalformedInput,
    /// The argument count is outside the command's declared range.
    ArgumentCountMismatch,
    /// No exact command matched and no translation rule fired.
    UnrecognizedInput,
    /// A command name was registered twice.
    AlreadyRegistered,
    /// A file, directory, process or history entry does not exist.
    NotFound,
    /// The operating system refused the operation.
    PermissionDenied,
    /// An argument was syntactically valid but unusable.
    InvalidArgument,
    /// Anything else.
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MalformedInput => "malformed input",
            Self::ArgumentCountMismatch => "argument count mismatch",
            Self::UnrecognizedInput => "unrecognized input",
            Self::AlreadyRegistered => "already registered",
            Self::NotFound => "not found",
            Self::PermissionDenied => "permission denied",
            Self::InvalidArgument => "invalid argument",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Errors produced by termcore.
#[derive(Debug, thiserror::Error)]
pub enum TermError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("{command}: expected {expected} argument(s), got {got}")]
    ArgumentCount {
        command: String,
        expected: String,
        got: usize,
    },

    #[error("command not found: {0} (type 'help' for available commands)")]
    Unrecognized(String),

    #[error("command already registered: {0}")]
    AlreadyRegistered(String),

    #[error("{0}: no such file, directory or entry")]
    NotFound(String),

    #[error("{0}: event not found")]
    EventNotFound(String),

    #[error("{0}: permission denied")]
    PermissionDenied(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Command(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),
}

impl TermError {
    /// Classify this error into the user-facing kind enumeration.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedInput(_) => ErrorKind::MalformedInput,
            Self::ArgumentCount { .. } => ErrorKind::ArgumentCountMismatch,
            Self::Unrecognized(_) => ErrorKind::UnrecognizedInput,
            Self::AlreadyRegistered(_) => ErrorKind::AlreadyRegistered,
            Self::NotFound(_) | Self::EventNotFound(_) => ErrorKind::NotFound,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::InvalidArgument(_) | Self::Regex(_) => ErrorKind::InvalidArgument,
            Self::Io(e) => io_kind(e.kind()),
            Self::Command(_) | Self::Config(_) | Self::TomlParse(_) | Self::Json(_) => {
                ErrorKind::Unknown
            },
        }
    }

    /// Wrap an I/O error that occurred on `path`, keeping the path in the
    /// message and the classification of the underlying error.
    pub fn from_io(path: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_string()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_string()),
            io::ErrorKind::AlreadyExists => Self::InvalidArgument(format!("{path}: file exists")),
            _ => Self::Io(io::Error::new(err.kind(), format!("{path}: {err}"))),
        }
    }
}

fn io_kind(kind: io::ErrorKind) -> ErrorKind {
    match kind {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
        io::ErrorKind::InvalidInput
        | io::ErrorKind::InvalidData
        | io::ErrorKind::AlreadyExists
        | io::ErrorKind::NotADirectory
        | io::ErrorKind::IsADirectory
        | io::ErrorKind::DirectoryNotEmpty => ErrorKind::InvalidArgument,
        _ => ErrorKind::Unknown,
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, TermError>;
