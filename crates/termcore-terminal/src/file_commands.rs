//! File system commands: ls, cd, mkdir, rm, cat, grep, find, wc, cp, mv.
//!
//! All paths are resolved against the session's working directory and go
//! through the session's [`Vfs`](termcore_vfs::Vfs), so the same handlers
//! serve sandboxed and host-backed sessions.

use regex::Regex;
use termcore_types::error::{Result, TermError};
use termcore_vfs::{EntryKind, file_name, join, resolve_path};

use crate::registry::{Arity, Command, CommandOutput, CommandRegistry, Environment};

/// Register the file system commands.
pub fn register_file_commands(reg: &mut CommandRegistry) -> Result<()> {
    reg.register(Box::new(LsCmd))?;
    reg.register(Box::new(CdCmd))?;
    reg.register(Box::new(MkdirCmd))?;
    reg.register(Box::new(RmCmd))?;
    reg.register(Box::new(CatCmd))?;
    reg.register(Box::new(GrepCmd))?;
    reg.register(Box::new(FindCmd))?;
    reg.register(Box::new(WcCmd))?;
    reg.register(Box::new(CpCmd))?;
    reg.register(Box::new(MvCmd))?;
    Ok(())
}

/// Read a file as UTF-8 text, refusing binary content.
fn read_text(env: &Environment<'_>, cmd: &str, arg: &str) -> Result<String> {
    let path = resolve_path(&env.context.cwd, arg);
    let data = env.vfs.read(&path)?;
    String::from_utf8(data)
        .map_err(|_| TermError::InvalidArgument(format!("{cmd}: {arg}: binary file (not displayed)")))
}

// ---------------------------------------------------------------------------
// ls
// ---------------------------------------------------------------------------

struct LsCmd;
impl Command for LsCmd {
    fn name(&self) -> &str {
        "ls"
    }
    fn description(&self) -> &str {
        "List directory contents"
    }
    fn usage(&self) -> &str {
        "ls [path]"
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn arity(&self) -> Arity {
        Arity::range(0, 1)
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let path = match args.first() {
            Some(p) => resolve_path(&env.context.cwd, p),
            None => env.context.cwd.clone(),
        };
        if !env.vfs.stat(&path)?.is_dir() {
            return Ok(CommandOutput::Text(file_name(&path).to_string()));
        }
        let mut entries = env.vfs.readdir(&path)?;
        if entries.is_empty() {
            return Ok(CommandOutput::Text("(empty)".to_string()));
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        let lines: Vec<String> = entries
            .iter()
            .map(|e| {
                let suffix = if e.kind == EntryKind::Directory { "/" } else { "" };
                format!("{}{suffix}", e.name)
            })
            .collect();
        Ok(CommandOutput::Text(lines.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// cd
// ---------------------------------------------------------------------------

struct CdCmd;
impl Command for CdCmd {
    fn name(&self) -> &str {
        "cd"
    }
    fn description(&self) -> &str {
        "Change working directory"
    }
    fn usage(&self) -> &str {
        "cd [path]"
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn arity(&self) -> Arity {
        Arity::range(0, 1)
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let target = match args.first() {
            Some(p) => resolve_path(&env.context.cwd, p),
            None => resolve_path("/", env.context.var("HOME").unwrap_or("/")),
        };
        if !env.vfs.stat(&target)?.is_dir() {
            return Err(TermError::InvalidArgument(format!("cd: {target}: not a directory")));
        }
        env.context.cwd = target;
        Ok(CommandOutput::None)
    }
}

// ---------------------------------------------------------------------------
// mkdir / rm
// ---------------------------------------------------------------------------

struct MkdirCmd;
impl Command for MkdirCmd {
    fn name(&self) -> &str {
        "mkdir"
    }
    fn description(&self) -> &str {
        "Create directories"
    }
    fn usage(&self) -> &str {
        "mkdir <dir>..."
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        for arg in args {
            let path = resolve_path(&env.context.cwd, arg);
            if env.vfs.exists(&path) {
                return Err(TermError::InvalidArgument(format!(
                    "mkdir: cannot create directory '{arg}': File exists"
                )));
            }
            env.vfs.mkdir_all(&path)?;
        }
        Ok(CommandOutput::None)
    }
}

struct RmCmd;
impl Command for RmCmd {
    fn name(&self) -> &str {
        "rm"
    }
    fn description(&self) -> &str {
        "Remove files"
    }
    fn usage(&self) -> &str {
        "rm <file>..."
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        for arg in args {
            let path = resolve_path(&env.context.cwd, arg);
            if env.vfs.stat(&path)?.is_dir() {
                return Err(TermError::InvalidArgument(format!(
                    "rm: cannot remove '{arg}': Is a directory"
                )));
            }
            env.vfs.remove(&path)?;
        }
        Ok(CommandOutput::None)
    }
}

// ---------------------------------------------------------------------------
// cat / grep / wc
// ---------------------------------------------------------------------------

struct CatCmd;
impl Command for CatCmd {
    fn name(&self) -> &str {
        "cat"
    }
    fn description(&self) -> &str {
        "Display file contents"
    }
    fn usage(&self) -> &str {
        "cat <file>..."
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let parts = args
            .iter()
            .map(|arg| read_text(env, "cat", arg))
            .collect::<Result<Vec<_>>>()?;
        Ok(CommandOutput::Text(parts.join("\n")))
    }
}

struct GrepCmd;
impl Command for GrepCmd {
    fn name(&self) -> &str {
        "grep"
    }
    fn description(&self) -> &str {
        "Search files for a regex"
    }
    fn usage(&self) -> &str {
        "grep <pattern> <file>..."
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn arity(&self) -> Arity {
        Arity::at_least(2)
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let re = Regex::new(args[0])?;
        let files = &args[1..];
        let mut out = Vec::new();
        for file in files {
            // Unreadable files are reported inline; the rest are still searched.
            let text = match read_text(env, "grep", file) {
                Ok(t) => t,
                Err(e) => {
                    out.push(format!("grep: {e}"));
                    continue;
                },
            };
            for (n, line) in text.lines().enumerate().filter(|(_, l)| re.is_match(l)) {
                if files.len() > 1 {
                    out.push(format!("{file}:{}:{line}", n + 1));
                } else {
                    out.push(format!("{}:{line}", n + 1));
                }
            }
        }
        Ok(CommandOutput::Text(out.join("\n")))
    }
}

/// Line, word and character counts of one text.
fn counts(text: &str) -> (usize, usize, usize) {
    (
        text.matches('\n').count(),
        text.split_whitespace().count(),
        text.chars().count(),
    )
}

struct WcCmd;
impl Command for WcCmd {
    fn name(&self) -> &str {
        "wc"
    }
    fn description(&self) -> &str {
        "Count lines, words and characters"
    }
    fn usage(&self) -> &str {
        "wc <file>..."
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let mut out = Vec::new();
        let (mut tl, mut tw, mut tc) = (0, 0, 0);
        for arg in args {
            let (l, w, c) = counts(&read_text(env, "wc", arg)?);
            out.push(format!("{l:>8} {w:>8} {c:>8} {arg}"));
            tl += l;
            tw += w;
            tc += c;
        }
        if args.len() > 1 {
            out.push(format!("{tl:>8} {tw:>8} {tc:>8} total"));
        }
        Ok(CommandOutput::Text(out.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// find
// ---------------------------------------------------------------------------

/// Compile a `*`/`?` name glob into an anchored regex.
fn glob_regex(pattern: &str) -> Result<Regex> {
    let mut re = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Ok(Regex::new(&re)?)
}

struct FindCmd;
impl FindCmd {
    fn walk(env: &Environment<'_>, dir: &str, name: &Regex, out: &mut Vec<String>) -> Result<()> {
        for entry in env.vfs.readdir(dir)? {
            let path = join(dir, &entry.name);
            if name.is_match(&entry.name) {
                out.push(path.clone());
            }
            if entry.kind == EntryKind::Directory {
                Self::walk(env, &path, name, out)?;
            }
        }
        Ok(())
    }
}

impl Command for FindCmd {
    fn name(&self) -> &str {
        "find"
    }
    fn description(&self) -> &str {
        "Find files by name"
    }
    fn usage(&self) -> &str {
        "find [path] [-name pattern]"
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn arity(&self) -> Arity {
        Arity::range(0, 3)
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let (path, pattern) = match args {
            [] => (".", "*"),
            ["-name", pat] => (".", *pat),
            [path] => (*path, "*"),
            [path, "-name", pat] => (*path, *pat),
            _ => {
                return Err(TermError::InvalidArgument(format!(
                    "usage: {}",
                    self.usage()
                )));
            },
        };
        let root = resolve_path(&env.context.cwd, path);
        if !env.vfs.stat(&root)?.is_dir() {
            return Ok(CommandOutput::Text(root));
        }
        let name = glob_regex(pattern)?;
        let mut found = Vec::new();
        Self::walk(env, &root, &name, &mut found)?;
        found.sort();
        Ok(CommandOutput::Text(found.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// cp / mv
// ---------------------------------------------------------------------------

/// Destination path for `src`: into `dest` when it is a directory.
fn target_path(env: &Environment<'_>, src: &str, dest: &str) -> String {
    let dest = resolve_path(&env.context.cwd, dest);
    match env.vfs.stat(&dest) {
        Ok(meta) if meta.is_dir() => join(&dest, file_name(src)),
        _ => dest,
    }
}

struct CpCmd;
impl Command for CpCmd {
    fn name(&self) -> &str {
        "cp"
    }
    fn description(&self) -> &str {
        "Copy a file"
    }
    fn usage(&self) -> &str {
        "cp <src> <dest>"
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn arity(&self) -> Arity {
        Arity::exactly(2)
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let src = resolve_path(&env.context.cwd, args[0]);
        if env.vfs.stat(&src)?.is_dir() {
            return Err(TermError::InvalidArgument(format!(
                "cp: omitting directory '{}'",
                args[0]
            )));
        }
        let dest = target_path(env, &src, args[1]);
        if dest == src {
            return Err(TermError::InvalidArgument(format!(
                "cp: '{}' and '{}' are the same file",
                args[0], args[1]
            )));
        }
        let data = env.vfs.read(&src)?;
        env.vfs.write(&dest, &data)?;
        Ok(CommandOutput::None)
    }
}

struct MvCmd;
impl Command for MvCmd {
    fn name(&self) -> &str {
        "mv"
    }
    fn description(&self) -> &str {
        "Move or rename a file or directory"
    }
    fn usage(&self) -> &str {
        "mv <src> <dest>"
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn arity(&self) -> Arity {
        Arity::exactly(2)
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let src = resolve_path(&env.context.cwd, args[0]);
        env.vfs.stat(&src)?;
        let dest = target_path(env, &src, args[1]);
        env.vfs.rename(&src, &dest)?;
        Ok(CommandOutput::None)
    }
}
