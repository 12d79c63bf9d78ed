//! Shared fixture for command tests: the standard processor and one
//! session over an in-memory file system.

use std::sync::Arc;

use termcore_platform::SystemService;
use termcore_types::ErrorKind;
use termcore_types::config::TerminalConfig;
use termcore_vfs::{MemoryVfs, Vfs};

use crate::processor::{CommandResult, Processor};
use crate::session::Session;

pub(crate) struct Harness {
    pub processor: Processor,
    pub session: Session,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(Box::new(MemoryVfs::new()), None)
    }

    pub fn with_system(system: Arc<dyn SystemService>) -> Self {
        Self::build(Box::new(MemoryVfs::new()), Some(system))
    }

    fn build(vfs: Box<dyn Vfs>, system: Option<Arc<dyn SystemService>>) -> Self {
        let processor = Processor::standard(&TerminalConfig::default(), None, system).unwrap();
        Self {
            processor,
            session: Session::new(vfs, 100),
        }
    }

    pub fn run(&mut self, line: &str) -> CommandResult {
        self.processor.submit(&mut self.session, line)
    }

    /// Run a line that must succeed; returns its output.
    pub fn ok(&mut self, line: &str) -> String {
        let r = self.run(line);
        assert!(r.success, "'{line}' failed: {:?}", r.error_message);
        r.output
    }

    /// Run a line that must fail; returns the error kind.
    pub fn err(&mut self, line: &str) -> ErrorKind {
        let r = self.run(line);
        assert!(!r.success, "'{line}' unexpectedly succeeded: {}", r.output);
        r.error_kind.unwrap()
    }

    pub fn write(&mut self, path: &str, data: &str) {
        self.session.vfs.write(path, data.as_bytes()).unwrap();
    }

    pub fn read(&self, path: &str) -> String {
        String::from_utf8(self.session.vfs.read(path).unwrap()).unwrap()
    }
}
