use async_trait::async_trait;
use tokio::sync::watch;

use super::FlagStore;
use crate::error::CacheError;
use crate::flag::FlagSet;

/// Process-local store. Used when no cache path is configured.
#[derive(Debug)]
pub struct MemoryFlagStore {
    snapshots: watch::Sender<FlagSet>,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::with_snapshot(FlagSet::new())
    }

    /// A store that already holds `flags`, as if they had been saved earlier.
    pub fn with_snapshot(flags: FlagSet) -> Self {
        let (snapshots, _) = watch::channel(flags);
        Self { snapshots }
    }

    pub fn current(&self) -> FlagSet {
        self.snapshots.borrow().clone()
    }
}

impl Default for MemoryFlagStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FlagStore for MemoryFlagStore {
    async fn save_flags(&self, flags: &FlagSet) -> Result<(), CacheError> {
        self.snapshots.send_replace(flags.clone());
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<FlagSet> {
        self.snapshots.subscribe()
    }
}
