// SPDX-License-Identifier: GPL-3.0-only

//! External command execution
//!
//! Every helper the engine shells out to (`mount`, `umount`, recovery
//! scripts) goes through [`CommandRunner`], so tests can record invocations
//! and script exit codes.

use std::fmt;
use std::process::Command;

use tracing::debug;

use crate::error::{Result, SysError};

/// A program and its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run `script` through `sh -c`
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    /// Build from a configured argv; `None` when empty
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone()).args(args.iter().cloned()))
    }

    pub fn render(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Runs an external command to completion and reports its exit code
pub trait CommandRunner: Send + Sync {
    /// Exit code of the command; zero means success.
    ///
    /// An `Err` means the command could not be started at all.
    fn run(&self, command: &ExternalCommand) -> Result<i32>;
}

/// Runs commands as real subprocesses, blocking until they exit
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommand;

impl CommandRunner for SystemCommand {
    fn run(&self, command: &ExternalCommand) -> Result<i32> {
        let rendered = command.render();
        debug!("Running {}", rendered);

        let status = Command::new(&command.program)
            .args(&command.args)
            .status()
            .map_err(|error| SysError::CommandFailed {
                command: rendered.clone(),
                reason: error.to_string(),
            })?;

        // Killed by a signal: no exit code, report as a generic failure.
        let code = status.code().unwrap_or(-1);
        debug!("{} exited with {}", rendered, code);
        Ok(code)
    }
}
