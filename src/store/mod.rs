pub mod memory;
pub mod sled_store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::CacheError;
use crate::flag::FlagSet;

pub use memory::MemoryFlagStore;
pub use sled_store::SledFlagStore;

/// Metadata about the last stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// SHA-1 of the stored JSON bytes.
    pub hash: String,
    pub saved_at: String,
    pub flags_count: u64,
}

/// Durable last-known-good flag storage. Implementations must be thread-safe.
#[async_trait]
pub trait FlagStore: Send + Sync {
    /// Overwrite the stored snapshot with `flags`.
    async fn save_flags(&self, flags: &FlagSet) -> Result<(), CacheError>;

    /// Change stream of decoded snapshots. The receiver starts with the
    /// current snapshot and sees a new value after every write. Missing or
    /// corrupt storage reads as an empty set.
    fn subscribe(&self) -> watch::Receiver<FlagSet>;
}
