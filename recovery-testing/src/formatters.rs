use std::path::Path;
use std::sync::{Arc, Mutex};

use recovery_sys::{FallbackFormatter, ImageBuilder, Result, SysError};

use crate::ledger::{Ledger, Source, lock};

/// Records filesystem builds instead of running `make_ext4fs`
#[derive(Debug, Clone)]
pub struct FakeImages {
    ledger: Ledger,
    fails: Arc<Mutex<bool>>,
}

impl FakeImages {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger,
            fails: Arc::default(),
        }
    }

    pub fn fail(&self, fails: bool) {
        *lock(&self.fails) = fails;
    }

    fn outcome(&self, device: &str) -> Result<()> {
        if *lock(&self.fails) {
            return Err(SysError::CommandFailed {
                command: format!("mkfs {}", device),
                reason: "exited with 1".to_string(),
            });
        }
        Ok(())
    }
}

impl ImageBuilder for FakeImages {
    fn build(
        &self,
        device: &str,
        length: i64,
        mount_point: &str,
        security_contexts: Option<&Path>,
    ) -> Result<()> {
        let contexts = security_contexts
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        self.ledger.record(
            Source::Image,
            format!("ext4 {} {} {} {}", device, length, mount_point, contexts),
        );
        self.outcome(device)
    }

    fn build_f2fs(&self, device: &str, mount_point: &str) -> Result<()> {
        self.ledger
            .record(Source::Image, format!("f2fs {} {}", device, mount_point));
        self.outcome(device)
    }
}

/// Records fallback formats; always succeeds
#[derive(Debug, Clone)]
pub struct FakeFormatter {
    ledger: Ledger,
}

impl FakeFormatter {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }
}

impl FallbackFormatter for FakeFormatter {
    fn format(&self, device: Option<&str>, path: &str, fs_type: Option<&str>) -> Result<()> {
        self.ledger.record(
            Source::Fallback,
            format!(
                "{} {} {}",
                device.unwrap_or("-"),
                path,
                fs_type.unwrap_or("-")
            ),
        );
        Ok(())
    }
}
