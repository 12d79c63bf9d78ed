//! Terminal configuration loaded from `config.toml`.
//!
//! Every key is optional; missing keys take the defaults below.
//!
//! ```toml
//! history_size = 1000
//! translation_enabled = true
//! prompt_format = "{user}:{cwd}$ "
//! max_output_lines = 1000
//! log_level = "info"
//! rules_file = "/home/me/.config/termcore/rules.toml"
//! root = "/home/me"
//!
//! [listener]
//! bind = "127.0.0.1"
//! port = 9000
//! max_connections = 4
//! idle_timeout_secs = 300
//! sandboxed = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TermError};

/// File name looked up inside the per-user config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Directory (under the platform config dir) holding termcore files.
pub const CONFIG_DIR_NAME: &str = "termcore";

/// Top-level terminal configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Maximum number of history entries kept per session.
    pub history_size: usize,
    /// Fall back to phrase translation when no command name matches.
    pub translation_enabled: bool,
    /// Prompt template with `{user}`, `{cwd}` and `{session}` placeholders.
    pub prompt_format: String,
    /// Output lines beyond this count are dropped with a marker line.
    pub max_output_lines: usize,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Extra translation rules, evaluated before the built-in set.
    pub rules_file: Option<PathBuf>,
    /// Host directory exposed as `/`. `None` exposes the filesystem root.
    pub root: Option<PathBuf>,
    /// Remote terminal listener settings.
    pub listener: ListenerConfig,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            history_size: 1000,
            translation_enabled: true,
            prompt_format: "{user}:{cwd}$ ".to_string(),
            max_output_lines: 1000,
            log_level: "info".to_string(),
            rules_file: None,
            root: None,
            listener: ListenerConfig::default(),
        }
    }
}

/// Configuration for the remote terminal listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Address to bind.
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
    /// Maximum simultaneous connections.
    pub max_connections: usize,
    /// Idle connection timeout in seconds (0 = no timeout).
    pub idle_timeout_secs: u64,
    /// Give each remote session its own in-memory filesystem instead of
    /// the host directory.
    pub sandboxed: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 9000,
            max_connections: 4,
            idle_timeout_secs: 300,
            sandboxed: true,
        }
    }
}

impl TerminalConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a configuration file. A missing file yields the defaults; a
    /// file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                log::debug!("Loading config from {}", path.display());
                Self::from_toml(&text)
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            },
            Err(e) => Err(TermError::from_io(&path.display().to_string(), e)),
        }
    }

    /// Default location: `<platform config dir>/termcore/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    fn validate(&self) -> Result<()> {
        if self.history_size == 0 {
            return Err(TermError::Config("history_size must be at least 1".into()));
        }
        if self.max_output_lines == 0 {
            return Err(TermError::Config(
                "max_output_lines must be at least 1".into(),
            ));
        }
        if self.listener.max_connections == 0 {
            return Err(TermError::Config(
                "listener.max_connections must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Render the prompt for a user, working directory and session id.
    pub fn render_prompt(&self, user: &str, cwd: &str, session: &str) -> String {
        self.prompt_format
            .replace("{user}", user)
            .replace("{cwd}", cwd)
            .replace("{session}", session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_sensible() {
        let cfg = TerminalConfig::default();
        assert_eq!(cfg.history_size, 1000);
        assert!(cfg.translation_enabled);
        assert_eq!(cfg.max_output_lines, 1000);
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.rules_file.is_none());
        assert!(cfg.root.is_none());
        assert_eq!(cfg.listener.port, 9000);
        assert_eq!(cfg.listener.bind, "127.0.0.1");
        assert_eq!(cfg.listener.max_connections, 4);
        assert!(cfg.listener.sandboxed);
    }

    #[test]
    fn empty_toml_is_default() {
        let cfg = TerminalConfig::from_toml("").unwrap();
        assert_eq!(cfg, TerminalConfig::default());
    }

    #[test]
    fn partial_toml_overrides_only_given_keys() {
        let cfg = TerminalConfig::from_toml(
            r#"
history_size = 5
translation_enabled = false

[listener]
port = 7000
"#,
        )
        .unwrap();
        assert_eq!(cfg.history_size, 5);
        assert!(!cfg.translation_enabled);
        assert_eq!(cfg.listener.port, 7000);
        assert_eq!(cfg.listener.max_connections, 4);
        assert_eq!(cfg.prompt_format, "{user}:{cwd}$ ");
    }

    #[test]
    fn zero_history_rejected() {
        let err = TerminalConfig::from_toml("history_size = 0").unwrap_err();
        assert!(matches!(err, TermError::Config(_)));
    }

    #[test]
    fn malformed_toml_is_error() {
        let err = TerminalConfig::from_toml("history_size = [").unwrap_err();
        assert!(matches!(err, TermError::TomlParse(_)));
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TerminalConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, TerminalConfig::default());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "max_output_lines = 12\n").unwrap();
        let cfg = TerminalConfig::load(&path).unwrap();
        assert_eq!(cfg.max_output_lines, 12);
    }

    #[test]
    fn prompt_placeholders_replaced() {
        let cfg = TerminalConfig::default();
        assert_eq!(cfg.render_prompt("ana", "/tmp", "s1"), "ana:/tmp$ ");
        let cfg = TerminalConfig {
            prompt_format: "[{session}] {cwd}> ".into(),
            ..TerminalConfig::default()
        };
        assert_eq!(cfg.render_prompt("ana", "/", "abc"), "[abc] /> ");
    }
}
