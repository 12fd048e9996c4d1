//! Scripted stand-ins for the system collaborators of the volume engine.
//!
//! All fakes of one [`FakeSystem`] share a [`Ledger`] of the calls they
//! receive and a [`MountTable`] of what is currently attached, so a test can
//! drive the engine and then assert on both.

pub mod cmd;
pub mod daemon;
pub mod flash;
pub mod formatters;
pub mod ledger;
pub mod mounts;
pub mod tables;

pub use cmd::FakeCommands;
pub use daemon::FakeDaemon;
pub use flash::{FakeFlash, FlashStage};
pub use formatters::{FakeFormatter, FakeImages};
pub use ledger::{Invocation, Ledger, Source};
pub use mounts::{FakeMounts, MountTable};
pub use tables::{StaticTables, managed, volume};

/// One set of fakes wired to a shared ledger and mount table
#[derive(Debug, Clone)]
pub struct FakeSystem {
    pub ledger: Ledger,
    pub mounted: MountTable,
    pub tables: StaticTables,
    pub commands: FakeCommands,
    pub mounts: FakeMounts,
    pub daemon: FakeDaemon,
    pub flash: FakeFlash,
    pub images: FakeImages,
    pub fallback: FakeFormatter,
}

impl FakeSystem {
    pub fn new() -> Self {
        let ledger = Ledger::new();
        let mounted = MountTable::default();
        Self {
            tables: StaticTables::new(),
            commands: FakeCommands::new(ledger.clone()),
            mounts: FakeMounts::new(ledger.clone(), mounted.clone()),
            daemon: FakeDaemon::new(ledger.clone(), mounted.clone()),
            flash: FakeFlash::new(ledger.clone(), mounted.clone()),
            images: FakeImages::new(ledger.clone()),
            fallback: FakeFormatter::new(ledger.clone()),
            ledger,
            mounted,
        }
    }
}

impl Default for FakeSystem {
    fn default() -> Self {
        Self::new()
    }
}
