use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::client::Flagship;
use crate::defaults::Defaults;
use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use crate::source::FlagSource;
use crate::store::{FlagStore, MemoryFlagStore, SledFlagStore};

/// Where the last-known-good snapshot is kept.
#[derive(Clone)]
pub enum StoreConfig {
    Memory,
    Path(PathBuf),
    Custom(Arc<dyn FlagStore>),
}

impl StoreConfig {
    /// Opens the configured store. A path that cannot be opened degrades to
    /// a memory store.
    pub(crate) fn open(self) -> Arc<dyn FlagStore> {
        match self {
            StoreConfig::Memory => Arc::new(MemoryFlagStore::new()),
            StoreConfig::Path(path) => match SledFlagStore::open(&path) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to open flag cache, continuing in memory"
                    );
                    Arc::new(MemoryFlagStore::new())
                }
            },
            StoreConfig::Custom(store) => store,
        }
    }
}

/// Initialization arguments for a [`Flagship`] client.
pub struct FlagshipBuilder {
    pub(crate) app_key: String,
    pub(crate) base_url: String,
    pub(crate) auto_load: bool,
    pub(crate) defaults: Defaults,
    pub(crate) store: StoreConfig,
    pub(crate) source: Option<Arc<dyn FlagSource>>,
    pub(crate) retry: RetryPolicy,
}

pub fn create_builder(app_key: &str, base_url: &str) -> FlagshipBuilder {
    FlagshipBuilder {
        app_key: app_key.to_string(),
        base_url: base_url.to_string(),
        auto_load: true,
        defaults: Defaults::new(),
        store: StoreConfig::Memory,
        source: None,
        retry: RetryPolicy::default(),
    }
}

impl FlagshipBuilder {
    /// Fetch flags in the background as soon as initialization succeeds.
    /// Enabled by default.
    pub fn auto_load(mut self, auto_load: bool) -> Self {
        self.auto_load = auto_load;
        self
    }

    pub fn defaults(mut self, defaults: impl Into<Defaults>) -> Self {
        self.defaults = defaults.into();
        self
    }

    pub fn default_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.defaults.insert(key, value);
        self
    }

    /// Persist snapshots in a sled database at `path`.
    ///
    /// Without this (or [`store`](Self::store)) snapshots are kept in memory
    /// only, so a restarted process has no cached flags until its first
    /// successful fetch.
    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store = StoreConfig::Path(path.into());
        self
    }

    pub fn store(mut self, store: Arc<dyn FlagStore>) -> Self {
        self.store = StoreConfig::Custom(store);
        self
    }

    /// Replace the HTTP source, e.g. with a test double.
    pub fn source(mut self, source: Arc<dyn FlagSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Creates a fresh client and initializes it with these arguments.
    pub fn build(self) -> Result<Flagship, ConfigError> {
        let client = Flagship::new();
        client.initialize(self)?;
        Ok(client)
    }
}
