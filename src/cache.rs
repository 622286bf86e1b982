use std::sync::{Arc, RwLock};

use crate::flag::FlagSet;

/// The resolver's in-memory view of the flags.
///
/// Writers always install a complete set; readers get an `Arc` snapshot and
/// never observe a partial update.
#[derive(Debug, Default)]
pub struct FlagCache {
    slot: RwLock<Arc<FlagSet>>,
}

impl FlagCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<FlagSet> {
        let guard = self.slot.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn replace(&self, flags: FlagSet) {
        let mut guard = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(flags);
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}
