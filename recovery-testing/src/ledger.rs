use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Which fake saw a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Command,
    Syscall,
    Daemon,
    Flash,
    Image,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub source: Source,
    pub detail: String,
}

/// Ordered record of every call made into the fakes, shared between clones
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Arc<Mutex<Vec<Invocation>>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, source: Source, detail: impl Into<String>) {
        lock(&self.entries).push(Invocation {
            source,
            detail: detail.into(),
        });
    }

    pub fn entries(&self) -> Vec<Invocation> {
        lock(&self.entries).clone()
    }

    /// Details of the calls made into one fake, oldest first
    pub fn details(&self, source: Source) -> Vec<String> {
        lock(&self.entries)
            .iter()
            .filter(|entry| entry.source == source)
            .map(|entry| entry.detail.clone())
            .collect()
    }

    pub fn count(&self, source: Source) -> usize {
        lock(&self.entries)
            .iter()
            .filter(|entry| entry.source == source)
            .count()
    }

    /// Whether any call into `source` starts with `prefix`
    pub fn saw(&self, source: Source, prefix: &str) -> bool {
        self.details(source)
            .iter()
            .any(|detail| detail.starts_with(prefix))
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}

/// Lock that survives a panicking test thread
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::{Ledger, Source};

    #[test]
    fn clones_share_entries() {
        let ledger = Ledger::new();
        let other = ledger.clone();
        other.record(Source::Command, "mount system");
        ledger.record(Source::Syscall, "mount /dev/block/cache /cache ext4");

        assert_eq!(ledger.count(Source::Command), 1);
        assert!(ledger.saw(Source::Syscall, "mount /dev/block/cache"));
        assert_eq!(other.entries().len(), 2);

        ledger.clear();
        assert!(other.entries().is_empty());
    }
}
