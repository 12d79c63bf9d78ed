//! Session commands: help, history, set, unset, env, echo, pwd, clear,
//! exit. Also the entry point registering every built-in command.

use std::collections::BTreeMap;

use termcore_types::error::{Result, TermError};

use crate::registry::{Arity, Command, CommandOutput, CommandRegistry, Environment};

/// Register every built-in command and alias.
pub fn register_builtins(reg: &mut CommandRegistry) -> Result<()> {
    reg.register(Box::new(HelpCmd))?;
    reg.register(Box::new(HistoryCmd))?;
    reg.register(Box::new(EchoCmd))?;
    reg.register(Box::new(PwdCmd))?;
    reg.register(Box::new(SetCmd))?;
    reg.register(Box::new(UnsetCmd))?;
    reg.register(Box::new(EnvCmd))?;
    reg.register(Box::new(ClearCmd))?;
    reg.register(Box::new(ExitCmd))?;
    reg.register_alias("quit", "exit")?;
    crate::file_commands::register_file_commands(reg)?;
    crate::system_commands::register_system_commands(reg)?;
    log::debug!("Registered {} built-in commands", reg.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

struct HelpCmd;
impl Command for HelpCmd {
    fn name(&self) -> &str {
        "help"
    }
    fn description(&self) -> &str {
        "List commands or show usage"
    }
    fn usage(&self) -> &str {
        "help [command]"
    }
    fn arity(&self) -> Arity {
        Arity::range(0, 1)
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let reg = env.registry;
        if let Some(&name) = args.first() {
            let cmd = reg
                .lookup(name)
                .ok_or_else(|| TermError::InvalidArgument(format!("help: no such command: {name}")))?;
            let mut out = format!("{} ({})\n  {}\n  Usage: {}", cmd.name(), cmd.category(), cmd.description(), cmd.usage());
            let aliases: Vec<&str> = reg
                .aliases()
                .iter()
                .filter(|(_, target)| target == cmd.name())
                .map(|(alias, _)| alias.as_str())
                .collect();
            if !aliases.is_empty() {
                out.push_str(&format!("\n  Aliases: {}", aliases.join(", ")));
            }
            return Ok(CommandOutput::Text(out));
        }

        let mut categories: BTreeMap<&str, Vec<&dyn Command>> = BTreeMap::new();
        for cmd in reg.list_all() {
            categories.entry(cmd.category()).or_default().push(cmd);
        }
        let mut out = format!("Commands ({}):\n", reg.len());
        for (cat, cmds) in &categories {
            out.push_str(&format!("\n  [{cat}]\n"));
            for cmd in cmds {
                out.push_str(&format!("    {:12} {}\n", cmd.name(), cmd.description()));
            }
        }
        out.push_str(
            "\nType 'help <command>' for details. Plain requests such as \
             'show me all files' are understood too.",
        );
        Ok(CommandOutput::Text(out))
    }
}

// ---------------------------------------------------------------------------
// history
// ---------------------------------------------------------------------------

struct HistoryCmd;
impl Command for HistoryCmd {
    fn name(&self) -> &str {
        "history"
    }
    fn description(&self) -> &str {
        "Show, search or clear command history"
    }
    fn usage(&self) -> &str {
        "history [n] | history search <text> | history clear"
    }
    fn arity(&self) -> Arity {
        Arity::range(0, 2)
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let entries = match args {
            [] => env.history.recent(usize::MAX),
            ["clear"] => {
                env.history.clear();
                return Ok(CommandOutput::Text("History cleared.".to_string()));
            },
            ["search", needle] => env.history.search(needle),
            [n] => {
                let n: usize = n.parse().map_err(|_| {
                    TermError::InvalidArgument(format!("history: {n}: numeric argument required"))
                })?;
                env.history.recent(n)
            },
            _ => {
                return Err(TermError::InvalidArgument(format!(
                    "usage: {}",
                    self.usage()
                )));
            },
        };
        let lines: Vec<String> = entries
            .iter()
            .map(|e| format!("{:>5}  {}", e.sequence, e.text))
            .collect();
        Ok(CommandOutput::Text(lines.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// echo / pwd
// ---------------------------------------------------------------------------

struct EchoCmd;
impl Command for EchoCmd {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Print arguments"
    }
    fn usage(&self) -> &str {
        "echo [text...]"
    }
    fn execute(&self, args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::Text(args.join(" ")))
    }
}

struct PwdCmd;
impl Command for PwdCmd {
    fn name(&self) -> &str {
        "pwd"
    }
    fn description(&self) -> &str {
        "Print working directory"
    }
    fn usage(&self) -> &str {
        "pwd"
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn arity(&self) -> Arity {
        Arity::none()
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::Text(env.context.cwd.clone()))
    }
}

// ---------------------------------------------------------------------------
// set / unset / env
// ---------------------------------------------------------------------------

fn valid_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn list_variables(env: &Environment<'_>) -> CommandOutput {
    let lines: Vec<String> = env
        .context
        .variables
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    CommandOutput::Text(lines.join("\n"))
}

struct SetCmd;
impl Command for SetCmd {
    fn name(&self) -> &str {
        "set"
    }
    fn description(&self) -> &str {
        "Set a session variable"
    }
    fn usage(&self) -> &str {
        "set [NAME=value]"
    }
    fn category(&self) -> &str {
        "session"
    }
    fn arity(&self) -> Arity {
        Arity::range(0, 1)
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let Some(&assignment) = args.first() else {
            return Ok(list_variables(env));
        };
        let Some((name, value)) = assignment.split_once('=') else {
            return Err(TermError::InvalidArgument(format!(
                "usage: {}",
                self.usage()
            )));
        };
        if !valid_var_name(name) {
            return Err(TermError::InvalidArgument(format!(
                "set: invalid variable name: {name}"
            )));
        }
        env.context.set_var(name, value);
        Ok(CommandOutput::None)
    }
}

struct UnsetCmd;
impl Command for UnsetCmd {
    fn name(&self) -> &str {
        "unset"
    }
    fn description(&self) -> &str {
        "Remove session variables"
    }
    fn usage(&self) -> &str {
        "unset <NAME>..."
    }
    fn category(&self) -> &str {
        "session"
    }
    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        for name in args {
            env.context.unset_var(name);
        }
        Ok(CommandOutput::None)
    }
}

struct EnvCmd;
impl Command for EnvCmd {
    fn name(&self) -> &str {
        "env"
    }
    fn description(&self) -> &str {
        "List session variables"
    }
    fn usage(&self) -> &str {
        "env"
    }
    fn category(&self) -> &str {
        "session"
    }
    fn arity(&self) -> Arity {
        Arity::none()
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(list_variables(env))
    }
}

// ---------------------------------------------------------------------------
// clear / exit
// ---------------------------------------------------------------------------

struct ClearCmd;
impl Command for ClearCmd {
    fn name(&self) -> &str {
        "clear"
    }
    fn description(&self) -> &str {
        "Clear the screen"
    }
    fn usage(&self) -> &str {
        "clear"
    }
    fn category(&self) -> &str {
        "session"
    }
    fn arity(&self) -> Arity {
        Arity::none()
    }
    fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::Clear)
    }
}

struct ExitCmd;
impl Command for ExitCmd {
    fn name(&self) -> &str {
        "exit"
    }
    fn description(&self) -> &str {
        "End the session"
    }
    fn usage(&self) -> &str {
        "exit"
    }
    fn category(&self) -> &str {
        "session"
    }
    fn arity(&self) -> Arity {
        Arity::none()
    }
    fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::Exit)
    }
}
