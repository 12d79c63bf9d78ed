//! The command processor: one line in, one [`CommandResult`] out.
//!
//! Per line: trim, expand `!!`/`!n`, tokenize, look the command up, fall
//! back to the translator once, check the argument count, dispatch, and
//! record the line in the session's history. Every failure is folded into
//! the result; nothing here can end the session.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};
use termcore_platform::SystemService;
use termcore_types::config::TerminalConfig;
use termcore_types::error::{ErrorKind, Result, TermError};

use crate::history::History;
use crate::registry::{Command, CommandOutput, CommandRegistry, Environment};
use crate::session::Session;
use crate::tokenizer::{ParsedInput, tokenize};
use crate::translator::Translator;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Request from a handler to the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Clear,
    Exit,
}

/// How a line found its command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// Blank line; nothing ran.
    Empty,
    /// The first word named a command.
    Exact,
    /// A translation rule produced `line`.
    Translated { rule: String, line: String },
    /// No command was found (or the line never got that far).
    Unresolved,
}

/// Outcome of one submitted line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResult {
    pub success: bool,
    pub output: String,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    /// Shell-style status: 0, 1, 2 (usage) or 127 (not found).
    pub exit_code: i32,
    pub signal: Option<Signal>,
    pub resolution: Resolution,
    /// The line as recorded in history (after `!` recall).
    pub line: String,
    /// History sequence number, `None` for blank lines.
    pub sequence: Option<u64>,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

impl CommandResult {
    fn empty() -> Self {
        Self {
            success: true,
            output: String::new(),
            error_kind: None,
            error_message: None,
            exit_code: 0,
            signal: None,
            resolution: Resolution::Empty,
            line: String::new(),
            sequence: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_exit(&self) -> bool {
        self.signal == Some(Signal::Exit)
    }
}

/// Exit status for an error kind.
pub fn exit_code_for(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::UnrecognizedInput => 127,
        ErrorKind::MalformedInput | ErrorKind::ArgumentCountMismatch => 2,
        _ => 1,
    }
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

/// Tunables taken from [`TerminalConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorOptions {
    pub translation_enabled: bool,
    pub max_output_lines: usize,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            translation_enabled: true,
            max_output_lines: 1000,
        }
    }
}

impl From<&TerminalConfig> for ProcessorOptions {
    fn from(cfg: &TerminalConfig) -> Self {
        Self {
            translation_enabled: cfg.translation_enabled,
            max_output_lines: cfg.max_output_lines,
        }
    }
}

/// Stateless line processor shared by every session.
///
/// Registry, translator and system services are read-only after startup
/// and shared through `Arc`; all mutable state lives in the [`Session`].
#[derive(Clone)]
pub struct Processor {
    registry: Arc<CommandRegistry>,
    translator: Arc<Translator>,
    system: Option<Arc<dyn SystemService>>,
    options: ProcessorOptions,
}

impl Processor {
    pub fn new(
        registry: Arc<CommandRegistry>,
        translator: Arc<Translator>,
        system: Option<Arc<dyn SystemService>>,
        options: ProcessorOptions,
    ) -> Self {
        Self {
            registry,
            translator,
            system,
            options,
        }
    }

    /// Built-in commands plus the built-in rules (after `user_rules`).
    pub fn standard(
        config: &TerminalConfig,
        user_rules: Option<&str>,
        system: Option<Arc<dyn SystemService>>,
    ) -> Result<Self> {
        let mut registry = CommandRegistry::new();
        crate::register_builtins(&mut registry)?;
        let translator = Translator::with_user_rules(user_rules, &registry)?;
        log::info!(
            "Registered {} commands, {} translation rules",
            registry.len(),
            translator.rules().len()
        );
        Ok(Self::new(
            Arc::new(registry),
            Arc::new(translator),
            system,
            ProcessorOptions::from(config),
        ))
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn options(&self) -> ProcessorOptions {
        self.options
    }

    /// Process one line in `session`.
    pub fn submit(&self, session: &mut Session, raw: &str) -> CommandResult {
        let start = Instant::now();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CommandResult::empty();
        }
        let cwd = session.context.cwd.clone();

        let (line, resolution, outcome) = match recall(&session.history, trimmed) {
            Ok(line) => {
                let (resolution, outcome) = self.run(&line, session);
                (line, resolution, outcome)
            },
            Err(e) => (trimmed.to_string(), Resolution::Unresolved, Err(e)),
        };

        let mut result = CommandResult {
            line,
            resolution,
            ..CommandResult::empty()
        };
        match outcome {
            Ok(out) => {
                result.signal = match out {
                    CommandOutput::Clear => Some(Signal::Clear),
                    CommandOutput::Exit => Some(Signal::Exit),
                    _ => None,
                };
                result.output = self.truncate(out.render());
            },
            Err(e) => {
                let kind = e.kind();
                result.success = false;
                result.error_kind = Some(kind);
                result.error_message = Some(e.to_string());
                result.exit_code = exit_code_for(kind);
            },
        }

        result.sequence = Some(session.history.push(&result.line, result.success, Some(cwd)));
        result.elapsed = start.elapsed();
        match &result.error_kind {
            None => log::info!("'{}' -> ok ({:.1?})", result.line, result.elapsed),
            Some(kind) => log::info!(
                "'{}' -> {kind} ({:.1?})",
                result.line,
                result.elapsed
            ),
        }
        result
    }

    fn run(&self, line: &str, session: &mut Session) -> (Resolution, Result<CommandOutput>) {
        let parsed = match tokenize(line) {
            Ok(p) => p,
            Err(e) => return (Resolution::Unresolved, Err(e)),
        };
        let (parsed, resolution) = match self.resolve(parsed) {
            Ok(r) => r,
            Err(e) => return (Resolution::Unresolved, Err(e)),
        };
        let Some(cmd) = self.registry.lookup(&parsed.command) else {
            return (
                Resolution::Unresolved,
                Err(TermError::Unrecognized(parsed.command)),
            );
        };
        if let Err(e) = cmd.arity().check(cmd.name(), parsed.args.len()) {
            return (resolution, Err(e));
        }
        let outcome = self.dispatch(cmd, &parsed, session);
        (resolution, outcome)
    }

    /// Exact lookup, else a single translation hop. A translated line is
    /// never translated again.
    fn resolve(&self, parsed: ParsedInput) -> Result<(ParsedInput, Resolution)> {
        if self.registry.contains(&parsed.command) {
            return Ok((parsed, Resolution::Exact));
        }
        if !self.options.translation_enabled {
            return Err(TermError::Unrecognized(parsed.command));
        }
        let translation = self.translator.translate(&parsed.raw)?;
        if !self.registry.contains(&translation.parsed.command) {
            return Err(TermError::Unrecognized(parsed.raw.trim().to_string()));
        }
        log::info!(
            "Translated '{}' -> '{}' (rule {})",
            parsed.raw.trim(),
            translation.parsed.raw,
            translation.rule
        );
        let resolution = Resolution::Translated {
            rule: translation.rule,
            line: translation.parsed.raw.clone(),
        };
        Ok((translation.parsed, resolution))
    }

    fn dispatch(
        &self,
        cmd: &dyn Command,
        parsed: &ParsedInput,
        session: &mut Session,
    ) -> Result<CommandOutput> {
        let args = parsed.arg_refs();
        let mut env = Environment {
            context: &mut session.context,
            vfs: &mut *session.vfs,
            history: &mut session.history,
            registry: &self.registry,
            system: self.system.as_deref(),
        };
        match panic::catch_unwind(AssertUnwindSafe(|| cmd.execute(&args, &mut env))) {
            Ok(result) => result,
            Err(_) => {
                log::error!("Handler '{}' panicked", cmd.name());
                Err(TermError::Command(format!(
                    "{}: internal error in command",
                    cmd.name()
                )))
            },
        }
    }

    fn truncate(&self, text: String) -> String {
        let max = self.options.max_output_lines;
        let total = text.lines().count();
        if total <= max {
            return text;
        }
        let mut kept: Vec<&str> = text.lines().take(max).collect();
        let marker = format!("... ({} more lines not shown)", total - max);
        kept.push(&marker);
        kept.join("\n")
    }
}

/// Expand `!!` and `!n` against the history.
fn recall(history: &History, line: &str) -> Result<String> {
    if line == "!!" {
        return history
            .last()
            .map(|e| e.text.clone())
            .ok_or_else(|| TermError::EventNotFound("!!".to_string()));
    }
    if let Some(num) = line.strip_prefix('!')
        && let Ok(seq) = num.parse::<u64>()
    {
        return history
            .at(seq)
            .map(|e| e.text.clone())
            .ok_or_else(|| TermError::EventNotFound(line.to_string()));
    }
    Ok(line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Arity;
    use crate::translator::parse_rules;
    use std::sync::Mutex;
    use termcore_vfs::{MemoryVfs, Vfs};

    /// Records every argument list it is called with.
    struct Recorder {
        name: &'static str,
        arity: Arity,
        calls: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl Command for Recorder {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "records calls"
        }
        fn usage(&self) -> &str {
            self.name
        }
        fn arity(&self) -> Arity {
            self.arity
        }
        fn execute(&self, args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(args.iter().map(|s| s.to_string()).collect());
            Ok(CommandOutput::Text(format!("called {}", self.name)))
        }
    }

    struct Panics;
    impl Command for Panics {
        fn name(&self) -> &str {
            "boom"
        }
        fn description(&self) -> &str {
            ""
        }
        fn usage(&self) -> &str {
            "boom"
        }
        fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
            panic!("handler bug");
        }
    }

    type Calls = Arc<Mutex<Vec<Vec<String>>>>;

    /// `cp` (exactly 2 args) and `mkdir` (1..) recorders, plus `boom`.
    fn recording_processor(rules: &str) -> (Processor, Calls) {
        let calls: Calls = Arc::default();
        let mut reg = CommandRegistry::new();
        reg.register(Box::new(Recorder {
            name: "cp",
            arity: Arity::exactly(2),
            calls: Arc::clone(&calls),
        }))
        .unwrap();
        reg.register(Box::new(Recorder {
            name: "mkdir",
            arity: Arity::at_least(1),
            calls: Arc::clone(&calls),
        }))
        .unwrap();
        reg.register(Box::new(Panics)).unwrap();
        let translator = Translator::new(parse_rules(rules).unwrap());
        let p = Processor::new(
            Arc::new(reg),
            Arc::new(translator),
            None,
            ProcessorOptions::default(),
        );
        (p, calls)
    }

    const FOLDER_RULE: &str = r#"
[[rules]]
name = "make-folder"
command = "mkdir"
args = ["{name}"]
match = [{ regex = '^create (?:a )?(?:new )?folder (?:called )?(?P<name>.+)$' }]
"#;

    fn standard() -> Processor {
        Processor::standard(&TerminalConfig::default(), None, None).unwrap()
    }

    fn session() -> Session {
        Session::new(Box::new(MemoryVfs::new()), 100)
    }

    #[test]
    fn quoted_args_reach_handler() {
        let (p, calls) = recording_processor(FOLDER_RULE);
        let mut s = session();
        let r = p.submit(&mut s, r#"cp "a b.txt" dest"#);
        assert!(r.success, "{r:?}");
        assert_eq!(r.resolution, Resolution::Exact);
        assert_eq!(*calls.lock().unwrap(), vec![vec!["a b.txt", "dest"]]);
    }

    #[test]
    fn phrase_translated_once_and_dispatched() {
        let (p, calls) = recording_processor(FOLDER_RULE);
        let mut s = session();
        let r = p.submit(&mut s, "create a new folder called test");
        assert!(r.success);
        assert_eq!(
            r.resolution,
            Resolution::Translated {
                rule: "make-folder".into(),
                line: "mkdir test".into()
            }
        );
        assert_eq!(*calls.lock().unwrap(), vec![vec!["test"]]);
    }

    #[test]
    fn translated_line_is_not_translated_again() {
        let rules = r#"
[[rules]]
name = "hop"
command = "again"
match = [{ regex = '^loop$' }]

[[rules]]
name = "second-hop"
command = "mkdir"
args = ["x"]
match = [{ regex = '^again$' }]
"#;
        let (p, calls) = recording_processor(rules);
        let mut s = session();
        let r = p.submit(&mut s, "loop");
        assert_eq!(r.error_kind, Some(ErrorKind::UnrecognizedInput));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn unmatched_phrase_is_unrecognized() {
        let (p, calls) = recording_processor(FOLDER_RULE);
        let mut s = session();
        let r = p.submit(&mut s, "hello there");
        assert!(!r.success);
        assert_eq!(r.error_kind, Some(ErrorKind::UnrecognizedInput));
        assert_eq!(r.exit_code, 127);
        assert_eq!(r.resolution, Resolution::Unresolved);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn wrong_arg_count_never_dispatches() {
        let (p, calls) = recording_processor(FOLDER_RULE);
        let mut s = session();
        let r = p.submit(&mut s, "cp only-one");
        assert_eq!(r.error_kind, Some(ErrorKind::ArgumentCountMismatch));
        assert_eq!(r.exit_code, 2);
        assert!(calls.lock().unwrap().is_empty());
        // Still recorded so the user can recall and fix it.
        let last = s.history.last().unwrap();
        assert_eq!(last.text, "cp only-one");
        assert!(!last.success);
    }

    #[test]
    fn history_records_phrase_not_translation() {
        let p = standard();
        let mut s = session();
        let r = p.submit(&mut s, "show me all files");
        assert!(r.success, "{r:?}");
        assert!(matches!(r.resolution, Resolution::Translated { ref line, .. } if line == "ls"));
        let recent = s.history.recent(1);
        assert_eq!(recent[0].text, "show me all files");
    }

    #[test]
    fn translated_mkdir_creates_directory() {
        let p = standard();
        let mut s = session();
        assert!(p.submit(&mut s, "create a new folder called test").success);
        assert!(s.vfs.stat("/test").unwrap().is_dir());
    }

    #[test]
    fn blank_line_is_a_noop() {
        let (p, _) = recording_processor(FOLDER_RULE);
        let mut s = session();
        let r = p.submit(&mut s, "   ");
        assert!(r.success);
        assert_eq!(r.resolution, Resolution::Empty);
        assert!(r.sequence.is_none());
        assert!(s.history.is_empty());
    }

    #[test]
    fn malformed_line_is_recorded() {
        let (p, _) = recording_processor(FOLDER_RULE);
        let mut s = session();
        let r = p.submit(&mut s, r#"cp "unterminated"#);
        assert_eq!(r.error_kind, Some(ErrorKind::MalformedInput));
        assert_eq!(r.exit_code, 2);
        assert_eq!(s.history.len(), 1);
    }

    #[test]
    fn panicking_handler_is_contained() {
        let (p, calls) = recording_processor(FOLDER_RULE);
        let mut s = session();
        let r = p.submit(&mut s, "boom");
        assert_eq!(r.error_kind, Some(ErrorKind::Unknown));
        assert_eq!(r.exit_code, 1);
        // The session keeps working.
        assert!(p.submit(&mut s, "cp a b").success);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn bang_bang_and_bang_n_recall() {
        let (p, calls) = recording_processor(FOLDER_RULE);
        let mut s = session();
        p.submit(&mut s, "mkdir one");
        p.submit(&mut s, "cp a b");
        let r = p.submit(&mut s, "!1");
        assert!(r.success);
        assert_eq!(r.line, "mkdir one");
        let r = p.submit(&mut s, "!!");
        assert_eq!(r.line, "mkdir one");
        assert_eq!(calls.lock().unwrap().len(), 4);
        let texts: Vec<&str> = s.history.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["mkdir one", "cp a b", "mkdir one", "mkdir one"]);
    }

    #[test]
    fn recall_of_unknown_event_fails() {
        let (p, _) = recording_processor(FOLDER_RULE);
        let mut s = session();
        let r = p.submit(&mut s, "!!");
        assert_eq!(r.error_kind, Some(ErrorKind::NotFound));
        let r = p.submit(&mut s, "!99");
        assert_eq!(r.error_kind, Some(ErrorKind::NotFound));
        assert_eq!(r.error_message.as_deref(), Some("!99: event not found"));
    }

    #[test]
    fn translation_can_be_disabled() {
        let (mut p, calls) = recording_processor(FOLDER_RULE);
        p.options.translation_enabled = false;
        let mut s = session();
        let r = p.submit(&mut s, "create a new folder called test");
        assert_eq!(r.error_kind, Some(ErrorKind::UnrecognizedInput));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn long_output_is_truncated() {
        let mut p = standard();
        p.options.max_output_lines = 3;
        let mut s = session();
        for i in 0..6 {
            s.vfs.write(&format!("/f{i}"), b"").unwrap();
        }
        let r = p.submit(&mut s, "ls");
        let lines: Vec<&str> = r.output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3], "... (3 more lines not shown)");
    }

    #[test]
    fn failed_cd_leaves_cwd() {
        let p = standard();
        let mut s = session();
        let r = p.submit(&mut s, "cd /missing");
        assert_eq!(r.error_kind, Some(ErrorKind::NotFound));
        assert_eq!(s.context.cwd, "/");
        assert_eq!(s.history.last().unwrap().cwd.as_deref(), Some("/"));
    }

    #[test]
    fn trailing_dots_and_marks_survive_translation() {
        let p = standard();
        let mut s = session();
        s.vfs.mkdir("/sub").unwrap();
        s.vfs.write("/sub/a.txt", b"a").unwrap();
        p.submit(&mut s, "cd /sub");

        let r = p.submit(&mut s, "show me the files in .");
        assert!(r.success, "{r:?}");
        assert_eq!(r.output, "a.txt");

        let r = p.submit(&mut s, "navigate to ..");
        assert!(r.success, "{r:?}");
        assert_eq!(s.context.cwd, "/");

        p.submit(&mut s, "cd /sub");
        let r = p.submit(&mut s, "go to the folder ..");
        assert!(r.success, "{r:?}");
        assert_eq!(s.context.cwd, "/");

        assert_eq!(p.submit(&mut s, "say hi!").output, "hi!");
        assert_eq!(p.submit(&mut s, "say hello world!").output, "hello world!");
        assert_eq!(p.submit(&mut s, "where am i?").output, "/");
    }

    #[test]
    fn every_builtin_rule_is_reachable() {
        let phrases = [
            ("make-folder", "create a new folder called test"),
            ("go-up", "go up one level"),
            ("go-home", "go home"),
            ("change-folder", "go to the folder projects"),
            ("navigate", "navigate to /tmp"),
            ("show-file", "show me the contents of the file notes.txt"),
            ("copy-file", "copy the file a.txt to b.txt"),
            ("move-file", "rename file old.txt to new.txt"),
            ("delete-file", "delete the file junk.log"),
            ("count-file", "count the lines in notes.txt"),
            ("list-here", "show me all files"),
            ("list-folder", "show me the files in docs"),
            ("what-is-here", "what is in this folder?"),
            ("where-am-i", "where am I?"),
            ("current-folder", "what is my current directory"),
            ("search-in-file", "look for TODO in the file main.rs"),
            ("locate-files", "locate files named *.rs"),
            ("search-files", "search for files named *.md"),
            ("list-processes", "list running processes"),
            ("which-processes", "what processes are running?"),
            ("system-info", "show me the system information"),
            ("terminate-process", "terminate process 4242"),
            ("what-can-i-do", "what can you do?"),
            ("show-commands", "show me the available commands"),
            ("show-history", "show my command history"),
            ("wipe-screen", "wipe the screen"),
            ("say", "say hi!"),
            ("disk-space", "how much disk space is left?"),
            ("memory-usage", "how much memory is used"),
        ];
        let p = standard();

        let mut covered: Vec<&str> = phrases.iter().map(|(rule, _)| *rule).collect();
        let mut all: Vec<&str> = p.translator().rules().iter().map(|r| r.name.as_str()).collect();
        covered.sort_unstable();
        all.sort_unstable();
        assert_eq!(covered, all);

        for (rule, phrase) in phrases {
            let mut s = session();
            let r = p.submit(&mut s, phrase);
            match &r.resolution {
                Resolution::Translated { rule: fired, .. } => {
                    assert_eq!(fired, rule, "'{phrase}'")
                },
                other => panic!("'{phrase}' resolved as {other:?}: {:?}", r.error_message),
            }
        }
    }

    #[test]
    fn signals_reach_result() {
        let p = standard();
        let mut s = session();
        assert_eq!(p.submit(&mut s, "clear").signal, Some(Signal::Clear));
        let r = p.submit(&mut s, "quit");
        assert!(r.is_exit());
    }

    #[test]
    fn result_serializes_to_json() {
        let p = standard();
        let mut s = session();
        let r = p.submit(&mut s, "hello there");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error_kind"], "unrecognized_input");
        assert_eq!(json["exit_code"], 127);
        assert_eq!(json["resolution"]["kind"], "unresolved");
        assert!(json["elapsed_ms"].is_number());
    }

    #[test]
    fn exit_codes() {
        assert_eq!(exit_code_for(ErrorKind::UnrecognizedInput), 127);
        assert_eq!(exit_code_for(ErrorKind::MalformedInput), 2);
        assert_eq!(exit_code_for(ErrorKind::NotFound), 1);
    }
}
