//! Local front-end: interactive prompt loop and one-shot execution.

use std::io::{self, BufRead, Write};

use termcore_terminal::{CommandResult, Processor, Session, Signal};
use termcore_types::config::TerminalConfig;

const CLEAR_SCREEN: &[u8] = b"\x1b[2J\x1b[H";

/// Where results go: output to `out`, error messages to `err`.
pub struct Console<O: Write, E: Write> {
    pub out: O,
    pub err: E,
    /// Emit each result as one JSON line instead of text.
    pub json: bool,
}

impl<O: Write, E: Write> Console<O, E> {
    pub fn report(&mut self, result: &CommandResult) -> io::Result<()> {
        if self.json {
            let line = serde_json::to_string(result)?;
            writeln!(self.out, "{line}")?;
            return self.out.flush();
        }
        if !result.output.is_empty() {
            writeln!(self.out, "{}", result.output)?;
        }
        if let Some(msg) = &result.error_message {
            writeln!(self.err, "error: {msg}")?;
        }
        if result.signal == Some(Signal::Clear) {
            self.out.write_all(CLEAR_SCREEN)?;
        }
        self.out.flush()
    }
}

/// Run a single line; returns its exit status.
pub fn run_once<O: Write, E: Write>(
    processor: &Processor,
    session: &mut Session,
    line: &str,
    console: &mut Console<O, E>,
) -> io::Result<i32> {
    let result = processor.submit(session, line);
    console.report(&result)?;
    Ok(result.exit_code)
}

/// Prompt, read, process and report until `exit` or end of input.
///
/// Returns the status of the last line run, like a shell does.
pub fn run_interactive<I: BufRead, O: Write, E: Write>(
    processor: &Processor,
    session: &mut Session,
    config: &TerminalConfig,
    mut input: I,
    console: &mut Console<O, E>,
) -> io::Result<i32> {
    if !console.json {
        writeln!(
            console.out,
            "termcore {} on {}. Type 'help' for commands, 'exit' to quit.",
            env!("CARGO_PKG_VERSION"),
            session.vfs.label()
        )?;
    }
    let mut status = 0;
    let mut line = String::new();
    loop {
        if !console.json {
            let id = session.id.to_string();
            let prompt = config.render_prompt(
                session.context.user(),
                &session.context.cwd,
                &id[..8],
            );
            console.out.write_all(prompt.as_bytes())?;
            console.out.flush()?;
        }
        line.clear();
        if input.read_line(&mut line)? == 0 {
            if !console.json {
                writeln!(console.out)?;
            }
            return Ok(status);
        }
        let result = processor.submit(session, &line);
        console.report(&result)?;
        if result.sequence.is_some() {
            status = result.exit_code;
        }
        if result.is_exit() {
            return Ok(status);
        }
    }
}
