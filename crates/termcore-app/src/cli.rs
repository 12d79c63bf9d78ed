//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use termcore_types::config::TerminalConfig;

/// Terminal that understands plain-language requests as well as commands.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "termcore", version)]
pub struct Cli {
    /// Configuration file (default: <config dir>/termcore/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Run one line, print its result and exit with its status
    #[arg(short = 'c', long)]
    pub command: Option<String>,

    /// Print each result as a JSON object
    #[arg(long)]
    pub json: bool,

    /// Serve remote sessions over TCP instead of reading stdin
    #[arg(long)]
    pub listen: bool,

    /// Port for --listen
    #[arg(long)]
    pub port: Option<u16>,

    /// Only accept exact command names
    #[arg(long)]
    pub no_translate: bool,

    /// Log filter (e.g. debug, info, termcore_terminal=debug)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Append log output to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Host directory exposed as `/`
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Use a throwaway in-memory file system
    #[arg(long)]
    pub sandbox: bool,
}

impl Cli {
    /// Explicit `--config`, else the per-user default location.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(TerminalConfig::default_path)
    }

    /// Override file settings with the flags that were given.
    pub fn apply(&self, config: &mut TerminalConfig) {
        if self.no_translate {
            config.translation_enabled = false;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(root) = &self.root {
            config.root = Some(root.clone());
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if self.sandbox {
            config.listener.sandboxed = true;
        }
    }
}
