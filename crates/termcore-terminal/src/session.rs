//! Per-session state and the front-end facing session manager.

use std::collections::{BTreeMap, HashMap};

use termcore_types::error::{Result, TermError};
use termcore_vfs::{EntryKind, Vfs, resolve_path};
use uuid::Uuid;

use crate::history::{History, HistoryEntry};
use crate::processor::{CommandResult, Processor};
use crate::registry::CommandRegistry;

// ---------------------------------------------------------------------------
// SessionContext
// ---------------------------------------------------------------------------

/// Working directory and variables of one session.
///
/// Only handlers change `cwd`, and only after validating the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub cwd: String,
    pub variables: BTreeMap<String, String>,
}

impl SessionContext {
    /// Start at `/` with `HOME=/` and `USER` taken from the process
    /// environment.
    pub fn new() -> Self {
        let user = std::env::var("USER").unwrap_or_else(|_| "user".to_string());
        let mut variables = BTreeMap::new();
        variables.insert("HOME".to_string(), "/".to_string());
        variables.insert("USER".to_string(), user);
        Self {
            cwd: "/".to_string(),
            variables,
        }
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn set_var(&mut self, name: &str, value: &str) {
        self.variables.insert(name.to_string(), value.to_string());
    }

    pub fn unset_var(&mut self, name: &str) -> Option<String> {
        self.variables.remove(name)
    }

    /// The user name shown in prompts.
    pub fn user(&self) -> &str {
        self.var("USER").unwrap_or("user")
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One independent terminal: its own context, history and file system.
pub struct Session {
    pub id: Uuid,
    pub context: SessionContext,
    pub history: History,
    pub vfs: Box<dyn Vfs>,
}

impl Session {
    pub fn new(vfs: Box<dyn Vfs>, history_size: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            context: SessionContext::new(),
            history: History::new(history_size),
            vfs,
        }
    }

    /// Completion candidates for a partially typed line.
    ///
    /// The first word completes against command names and aliases; later
    /// words complete against directory entries (directories get a `/`).
    pub fn completions(&self, registry: &CommandRegistry, partial: &str) -> Vec<String> {
        let starts_new_word = partial.ends_with(char::is_whitespace);
        let mut words = partial.split_whitespace();
        let first = words.next().unwrap_or("");
        if words.next().is_none() && !starts_new_word {
            return registry.completions(first);
        }
        let last = if starts_new_word {
            ""
        } else {
            partial.split_whitespace().last().unwrap_or("")
        };
        self.path_completions(last)
    }

    fn path_completions(&self, token: &str) -> Vec<String> {
        let (dir_part, prefix) = match token.rfind('/') {
            Some(i) => (&token[..=i], &token[i + 1..]),
            None => ("", token),
        };
        let dir = if dir_part.is_empty() {
            self.context.cwd.clone()
        } else {
            resolve_path(&self.context.cwd, dir_part)
        };
        let Ok(entries) = self.vfs.readdir(&dir) else {
            return Vec::new();
        };
        entries
            .into_iter()
            .filter(|e| e.name.starts_with(prefix))
            .map(|e| {
                let slash = if e.kind == EntryKind::Directory { "/" } else { "" };
                format!("{dir_part}{}{slash}", e.name)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

/// Owns the live sessions of a front-end and routes lines to them.
pub struct SessionManager {
    processor: Processor,
    sessions: HashMap<Uuid, Session>,
    history_size: usize,
}

impl SessionManager {
    pub fn new(processor: Processor, history_size: usize) -> Self {
        Self {
            processor,
            sessions: HashMap::new(),
            history_size,
        }
    }

    /// Start a session over `vfs` and return its id.
    pub fn open_session(&mut self, vfs: Box<dyn Vfs>) -> Uuid {
        let session = Session::new(vfs, self.history_size);
        let id = session.id;
        log::info!("Opened session {id}");
        self.sessions.insert(id, session);
        id
    }

    /// Process one line in a session.
    pub fn submit(&mut self, id: Uuid, line: &str) -> Result<CommandResult> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| TermError::NotFound(format!("session {id}")))?;
        Ok(self.processor.submit(session, line))
    }

    /// The last `n` history entries of a session, oldest first.
    pub fn history(&self, id: Uuid, n: usize) -> Result<Vec<HistoryEntry>> {
        let session = self.get(id)?;
        Ok(session.history.recent(n).into_iter().cloned().collect())
    }

    pub fn completions(&self, id: Uuid, partial: &str) -> Result<Vec<String>> {
        let session = self.get(id)?;
        Ok(session.completions(self.processor.registry(), partial))
    }

    /// Close a session; returns whether it existed.
    pub fn close_session(&mut self, id: Uuid) -> bool {
        let existed = self.sessions.remove(&id).is_some();
        if existed {
            log::info!("Closed session {id}");
        }
        existed
    }

    pub fn session(&self, id: Uuid) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    fn get(&self, id: Uuid) -> Result<&Session> {
        self.sessions
            .get(&id)
            .ok_or_else(|| TermError::NotFound(format!("session {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::ProcessorOptions;
    use crate::{Translator, register_builtins};
    use std::sync::Arc;
    use termcore_types::ErrorKind;
    use termcore_vfs::MemoryVfs;

    fn manager() -> SessionManager {
        let mut reg = CommandRegistry::new();
        register_builtins(&mut reg).unwrap();
        let translator = Translator::builtin(&reg).unwrap();
        let processor = Processor::new(
            Arc::new(reg),
            Arc::new(translator),
            None,
            ProcessorOptions::default(),
        );
        SessionManager::new(processor, 100)
    }

    #[test]
    fn context_defaults() {
        let ctx = SessionContext::new();
        assert_eq!(ctx.cwd, "/");
        assert_eq!(ctx.var("HOME"), Some("/"));
        assert!(ctx.var("USER").is_some());
    }

    #[test]
    fn context_variables() {
        let mut ctx = SessionContext::new();
        ctx.set_var("EDITOR", "vi");
        assert_eq!(ctx.var("EDITOR"), Some("vi"));
        assert_eq!(ctx.unset_var("EDITOR").as_deref(), Some("vi"));
        assert!(ctx.var("EDITOR").is_none());
    }

    #[test]
    fn sessions_are_isolated() {
        let mut mgr = manager();
        let a = mgr.open_session(Box::new(MemoryVfs::new()));
        let b = mgr.open_session(Box::new(MemoryVfs::new()));
        assert_ne!(a, b);

        assert!(mgr.submit(a, "mkdir /work").unwrap().success);
        assert!(mgr.submit(a, "cd /work").unwrap().success);
        assert_eq!(mgr.session(a).unwrap().context.cwd, "/work");
        assert_eq!(mgr.session(b).unwrap().context.cwd, "/");
        assert_eq!(mgr.history(a, 10).unwrap().len(), 2);
        assert!(mgr.history(b, 10).unwrap().is_empty());
        // b has its own file system.
        assert!(!mgr.submit(b, "cd /work").unwrap().success);
    }

    #[test]
    fn unknown_session_is_not_found() {
        let mut mgr = manager();
        let err = mgr.submit(Uuid::new_v4(), "ls").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn close_session_removes_it() {
        let mut mgr = manager();
        let id = mgr.open_session(Box::new(MemoryVfs::new()));
        assert_eq!(mgr.session_count(), 1);
        assert!(mgr.close_session(id));
        assert!(!mgr.close_session(id));
        assert!(mgr.history(id, 1).is_err());
    }

    #[test]
    fn completes_command_names() {
        let mut mgr = manager();
        let id = mgr.open_session(Box::new(MemoryVfs::new()));
        let c = mgr.completions(id, "c").unwrap();
        assert!(c.contains(&"cd".to_string()));
        assert!(c.contains(&"cat".to_string()));
        assert!(c.iter().all(|n| n.starts_with('c')));
        assert_eq!(mgr.completions(id, "qu").unwrap(), vec!["quit"]);
    }

    #[test]
    fn completes_paths_after_first_word() {
        let mut vfs = MemoryVfs::new();
        vfs.mkdir("/docs").unwrap();
        vfs.write("/data.txt", b"x").unwrap();
        vfs.write("/docs/readme.md", b"x").unwrap();
        let mut mgr = manager();
        let id = mgr.open_session(Box::new(vfs));

        assert_eq!(mgr.completions(id, "cat d").unwrap(), vec!["data.txt", "docs/"]);
        assert_eq!(mgr.completions(id, "cat docs/r").unwrap(), vec!["docs/readme.md"]);
        assert_eq!(mgr.completions(id, "ls ").unwrap(), vec!["data.txt", "docs/"]);
        assert!(mgr.completions(id, "cat nothing/x").unwrap().is_empty());
    }
}
