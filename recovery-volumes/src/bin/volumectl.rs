// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use recovery_volumes::{Collaborators, EngineConfig, Session, logging, status_code};
use serde::Serialize;

/// Inspect and operate the volumes of a recovery environment
#[derive(Parser)]
#[command(name = "volumectl")]
#[command(about = "Mount, unmount and format recovery volumes by path", long_about = None)]
struct Cli {
    /// Engine configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Partition table layout to use after the initial build
    #[arg(long, global = true, default_value_t = 1)]
    layout: usize,

    /// Format `/data` paths even when storage lives on `/data`
    #[arg(long, global = true)]
    ignore_data_media: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the merged volume table
    Table,
    /// Show the volume backing a path
    Resolve {
        path: String,
    },
    /// Mount the volume for a path
    Mount {
        path: String,
        /// Attach at this directory instead of the volume's mount point
        #[arg(long)]
        at: Option<String>,
    },
    /// Unmount the volume for a path
    Unmount {
        path: String,
    },
    /// Format the volume for a path
    Format {
        path: String,
    },
    /// Print the derived storage locations
    Storage,
    /// Link the legacy storage path to the primary storage path
    LegacyAlias,
}

#[derive(Serialize)]
struct StorageOutput<'a> {
    primary: &'a str,
    secure: &'a str,
    extra: Vec<String>,
    primary_daemon_managed: bool,
    data_media: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = EngineConfig::load(cli.config.as_deref())?;
    let _log_guard = logging::init(&config);

    if unsafe { libc::geteuid() } != 0 {
        tracing::warn!("volumectl is not running as root, most operations will fail");
    }

    let mut session = Session::new(config.clone(), Collaborators::system(&config));
    session.set_ignore_data_media(cli.ignore_data_media);
    session
        .load_volume_table()
        .context("failed to build the volume table")?;
    if cli.layout != 1 {
        session.select_layout(cli.layout);
        session
            .rebuild_volume_table()
            .with_context(|| format!("failed to build the volume table for layout {}", cli.layout))?;
    }

    let result = match cli.command {
        Commands::Table => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&session.table())?);
            } else {
                for (index, volume) in session.volumes().iter().enumerate() {
                    println!(
                        "{:>2} {:<20} {:<10} {}",
                        index,
                        volume.mount_point,
                        volume.fs_type,
                        volume.block_device.as_deref().unwrap_or("-")
                    );
                }
            }
            Ok(())
        }
        Commands::Resolve { path } => {
            let volume = session.resolve(&path);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&volume)?);
            } else if let Some(volume) = volume {
                println!("{} ({})", volume.mount_point, volume.fs_type);
            } else if session.is_media_redirected(&path) {
                println!("{}: stored on /data", path);
            } else {
                println!("{}: no volume", path);
            }
            Ok(())
        }
        Commands::Mount { path, at } => session.mount(&path, at.as_deref()),
        Commands::Unmount { path } => session.unmount(&path),
        Commands::Format { path } => session.format(&path),
        Commands::Storage => {
            let output = StorageOutput {
                primary: session.primary_storage_path(),
                secure: session.secure_app_storage_path(),
                extra: session.extra_storage_paths(),
                primary_daemon_managed: session.is_primary_storage_daemon_managed(),
                data_media: session.is_data_media(),
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("primary: {}", output.primary);
                println!("secure:  {}", output.secure);
                for path in &output.extra {
                    println!("extra:   {}", path);
                }
            }
            Ok(())
        }
        Commands::LegacyAlias => session.setup_legacy_storage_alias(),
    };

    if let Err(error) = &result
        && !error.is_silent()
    {
        tracing::error!("{}", error);
    }
    // -1 leaves the process as 255
    Ok(ExitCode::from(status_code(&result) as u8))
}
