use std::path::Path;

use async_trait::async_trait;
use sha1::{Digest, Sha1};
use tokio::sync::watch;

use super::{FlagStore, SnapshotMeta};
use crate::error::CacheError;
use crate::flag::{FeatureFlag, FlagSet};

const FLAGS_KEY: &str = "cached_flags_json";
const META_KEY: &str = "cached_flags_meta";

/// Persistent flag storage backed by sled.
pub struct SledFlagStore {
    db: sled::Db,
    snapshots: watch::Sender<FlagSet>,
}

impl SledFlagStore {
    /// Wraps an open database and publishes whatever snapshot it holds.
    pub fn new(db: sled::Db) -> Self {
        let initial = load_snapshot(&db);
        let (snapshots, _) = watch::channel(initial);
        Self { db, snapshots }
    }

    /// Open a sled database at the given directory path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let db = sled::open(path)?;
        Ok(Self::new(db))
    }

    pub fn meta(&self) -> Option<SnapshotMeta> {
        let ivec = self.db.get(META_KEY).ok()??;
        serde_json::from_slice(&ivec).ok()
    }
}

fn load_snapshot(db: &sled::Db) -> FlagSet {
    match db.get(FLAGS_KEY) {
        Ok(Some(bytes)) => decode_snapshot(&bytes).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "discarding corrupt flag snapshot");
            FlagSet::new()
        }),
        Ok(None) => FlagSet::new(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read flag snapshot");
            FlagSet::new()
        }
    }
}

fn decode_snapshot(bytes: &[u8]) -> Result<FlagSet, CacheError> {
    let flags: Vec<FeatureFlag> = serde_json::from_slice(bytes).map_err(CacheError::Decode)?;
    Ok(flags.into())
}

#[async_trait]
impl FlagStore for SledFlagStore {
    async fn save_flags(&self, flags: &FlagSet) -> Result<(), CacheError> {
        let content = serde_json::to_vec(flags).map_err(CacheError::Encode)?;

        let mut hasher = Sha1::new();
        hasher.update(&content);
        let meta = SnapshotMeta {
            hash: format!("{:x}", hasher.finalize()),
            saved_at: chrono::Utc::now().to_rfc3339(),
            flags_count: flags.len() as u64,
        };
        let meta_bytes = serde_json::to_vec(&meta).map_err(CacheError::Encode)?;

        let mut batch = sled::Batch::default();
        batch.insert(FLAGS_KEY, content);
        batch.insert(META_KEY, meta_bytes);
        self.db.apply_batch(batch)?;
        self.db.flush_async().await?;

        self.snapshots.send_replace(flags.clone());
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<FlagSet> {
        self.snapshots.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flag::FlagType;

    fn temporary_db() -> sled::Db {
        sled::Config::new().temporary(true).open().unwrap()
    }

    fn sample() -> FlagSet {
        vec![
            FeatureFlag::new("checkout", FlagType::Boolean, true).with_description("New checkout"),
            FeatureFlag::new("price", FlagType::Number, true).with_value("12.5"),
            FeatureFlag::new("banner", FlagType::String, false).with_value(""),
        ]
        .into()
    }

    #[tokio::test]
    async fn test_empty_database_emits_empty_snapshot() {
        let store = SledFlagStore::new(temporary_db());
        assert!(store.subscribe().borrow().is_empty());
        assert!(store.meta().is_none());
    }

    #[tokio::test]
    async fn test_write_then_read_back_through_stream() {
        let store = SledFlagStore::new(temporary_db());
        let mut rx = store.subscribe();
        let _ = rx.borrow_and_update();

        store.save_flags(&sample()).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), sample());
    }

    #[tokio::test]
    async fn test_new_store_on_existing_db_decodes_snapshot() {
        let db = temporary_db();
        SledFlagStore::new(db.clone()).save_flags(&sample()).await.unwrap();

        let reopened = SledFlagStore::new(db);
        assert_eq!(*reopened.subscribe().borrow(), sample());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_reads_as_empty() {
        let db = temporary_db();
        db.insert(FLAGS_KEY, b"not json".as_slice()).unwrap();

        let store = SledFlagStore::new(db);
        assert!(store.subscribe().borrow().is_empty());
    }

    #[tokio::test]
    async fn test_save_replaces_snapshot_and_meta_together() {
        let db = temporary_db();
        let store = SledFlagStore::new(db.clone());
        store.save_flags(&sample()).await.unwrap();

        let smaller: FlagSet = vec![FeatureFlag::new("only", FlagType::Boolean, true)].into();
        store.save_flags(&smaller).await.unwrap();

        let reopened = SledFlagStore::new(db);
        assert_eq!(*reopened.subscribe().borrow(), smaller);
        assert_eq!(reopened.meta().unwrap().flags_count, 1);
        assert_eq!(*store.subscribe().borrow(), smaller);
    }

    #[tokio::test]
    async fn test_meta_tracks_hash_and_count() {
        let store = SledFlagStore::new(temporary_db());
        store.save_flags(&sample()).await.unwrap();

        let meta = store.meta().unwrap();
        assert_eq!(meta.flags_count, 3);
        assert_eq!(meta.hash.len(), 40);

        let stored = store.db.get(FLAGS_KEY).unwrap().unwrap();
        let mut hasher = Sha1::new();
        hasher.update(&stored);
        assert_eq!(meta.hash, format!("{:x}", hasher.finalize()));

        let first_hash = meta.hash;
        store.save_flags(&sample()).await.unwrap();
        assert_eq!(store.meta().unwrap().hash, first_hash);
    }
}
