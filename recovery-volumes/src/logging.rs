// SPDX-License-Identifier: GPL-3.0-only

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{EngineConfig, LoggingLevel};

const LOG_FILE_ENV: &str = "RECOVERY_VOLUMES_LOG_FILE";

/// Install the global subscriber: stderr always, plus the configured log
/// file when it can be opened. `RUST_LOG` overrides the configured level.
///
/// The returned guard flushes the log file when dropped, so hold it until
/// the process is done logging.
#[must_use = "dropping the guard stops the file writer"]
pub fn init(config: &EngineConfig) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(config.logging.level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let Some(path) = log_file(config) else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
        return None;
    };

    match file_writer(&path) {
        Ok((writer, guard)) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        Err(e) => {
            eprintln!("volumectl: failed to initialize file logging: {e:#}");
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

fn default_filter(level: LoggingLevel) -> EnvFilter {
    let level = level.as_directive();
    EnvFilter::try_new(format!(
        "warn,recovery_volumes={level},recovery_sys={level}"
    ))
    .unwrap_or_else(|_| EnvFilter::new(level))
}

fn log_file(config: &EngineConfig) -> Option<PathBuf> {
    std::env::var_os(LOG_FILE_ENV)
        .map(PathBuf::from)
        .or_else(|| config.logging.file.clone())
}

fn file_writer(path: &Path) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    let name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("recovery-volumes.log"));

    if let Err(e) = fs::create_dir_all(&dir) {
        return Err(anyhow::anyhow!(
            "create log directory failed: {} ({})",
            dir.display(),
            e
        ));
    }

    let appender = tracing_appender::rolling::never(&dir, &name);
    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn dropping_the_guard_flushes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/volumes.log");

        let (mut writer, guard) = file_writer(&path).unwrap();
        writer.write_all(b"mounted /cache\n").unwrap();
        drop(guard);

        assert_eq!(fs::read_to_string(&path).unwrap(), "mounted /cache\n");
    }
}
