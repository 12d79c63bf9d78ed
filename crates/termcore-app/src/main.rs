//! termcore entry point.
//!
//! Without flags, runs an interactive prompt on stdin over the host file
//! system. `-c` runs a single line, `--listen` serves remote sessions.

mod cli;
mod repl;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use cli::Cli;
use repl::Console;
use termcore_net::RemoteListener;
use termcore_platform::{DesktopPlatform, SystemService};
use termcore_terminal::{Processor, Session};
use termcore_types::config::TerminalConfig;
use termcore_vfs::{HostVfs, MemoryVfs, Vfs};

fn init_logging(cli: &Cli, config: &TerminalConfig) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_str()),
    );
    // An explicit flag beats RUST_LOG.
    if let Some(level) = &cli.log_level {
        builder.parse_filters(level);
    }
    if let Some(path) = &cli.log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn load_config(cli: &Cli) -> Result<TerminalConfig> {
    let mut config = match cli.config_path() {
        Some(path) => TerminalConfig::load(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TerminalConfig::default(),
    };
    cli.apply(&mut config);
    Ok(config)
}

fn open_vfs(config: &TerminalConfig, sandbox: bool) -> Result<Box<dyn Vfs>> {
    if sandbox {
        return Ok(Box::new(MemoryVfs::new()));
    }
    let root = config.root.clone().unwrap_or_else(|| PathBuf::from("/"));
    let vfs = HostVfs::new(&root).with_context(|| format!("opening root {}", root.display()))?;
    Ok(Box::new(vfs))
}

fn read_rules(path: Option<&Path>) -> Result<Option<String>> {
    path.map(|p| {
        fs::read_to_string(p).with_context(|| format!("reading rules file {}", p.display()))
    })
    .transpose()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&cli, &config)?;
    log::info!("Starting termcore {}", env!("CARGO_PKG_VERSION"));

    let user_rules = read_rules(config.rules_file.as_deref())?;
    let system: Arc<dyn SystemService> = Arc::new(DesktopPlatform::new());
    let processor = Processor::standard(&config, user_rules.as_deref(), Some(system))?;

    if cli.listen {
        let listener = RemoteListener::bind(config, processor)?;
        listener.serve()?;
        return Ok(());
    }

    let vfs = open_vfs(&config, cli.sandbox)?;
    let mut session = Session::new(vfs, config.history_size);
    let mut console = Console {
        out: io::stdout().lock(),
        err: io::stderr().lock(),
        json: cli.json,
    };
    let status = match &cli.command {
        Some(line) => repl::run_once(&processor, &mut session, line, &mut console)?,
        None => {
            let stdin = io::stdin().lock();
            repl::run_interactive(&processor, &mut session, &config, stdin, &mut console)?
        },
    };
    log::info!("Session {} ended with status {status}", session.id);
    if status != 0 {
        drop(console);
        std::process::exit(status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_rules_file_is_an_error() {
        assert!(read_rules(None).unwrap().is_none());
        assert!(read_rules(Some(Path::new("/nonexistent/rules.toml"))).is_err());
    }

    #[test]
    fn sandbox_uses_memory_vfs() {
        let vfs = open_vfs(&TerminalConfig::default(), true).unwrap();
        assert_eq!(vfs.label(), "memory");
        assert!(vfs.host_root().is_none());
    }

    #[test]
    fn config_file_is_loaded_and_flags_win() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "history_size = 5\ntranslation_enabled = true\n").unwrap();
        let cli = Cli::try_parse_from([
            "termcore",
            "--config",
            path.to_str().unwrap(),
            "--no-translate",
        ])
        .unwrap();
        let cfg = load_config(&cli).unwrap();
        assert_eq!(cfg.history_size, 5);
        assert!(!cfg.translation_enabled);
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "history_size = \"many\"\n").unwrap();
        let cli = Cli::try_parse_from(["termcore", "--config", path.to_str().unwrap()]).unwrap();
        assert!(load_config(&cli).is_err());
    }
}
