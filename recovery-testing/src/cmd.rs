use std::sync::{Arc, Mutex};

use recovery_sys::{CommandRunner, ExternalCommand, Result};

use crate::ledger::{Ledger, Source, lock};

/// Records commands and answers with scripted exit codes.
///
/// Exit codes are matched against the rendered command line by prefix; the
/// most recently scripted matching prefix wins and unmatched commands exit 0.
#[derive(Debug, Clone)]
pub struct FakeCommands {
    ledger: Ledger,
    scripted: Arc<Mutex<Vec<(String, i32)>>>,
}

impl FakeCommands {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger,
            scripted: Arc::default(),
        }
    }

    pub fn exit_code(&self, prefix: impl Into<String>, code: i32) {
        lock(&self.scripted).push((prefix.into(), code));
    }

    pub fn fail(&self, prefix: impl Into<String>) {
        self.exit_code(prefix, 1);
    }

    /// Rendered command lines, oldest first
    pub fn invocations(&self) -> Vec<String> {
        self.ledger.details(Source::Command)
    }
}

impl CommandRunner for FakeCommands {
    fn run(&self, command: &ExternalCommand) -> Result<i32> {
        let rendered = command.render();
        let code = lock(&self.scripted)
            .iter()
            .rev()
            .find(|(prefix, _)| rendered.starts_with(prefix.as_str()))
            .map_or(0, |(_, code)| *code);
        self.ledger.record(Source::Command, rendered);
        Ok(code)
    }
}
