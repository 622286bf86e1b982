//! Client-side feature flag resolution.
//!
//! Flags are fetched from a backend for an application key, persisted as the
//! last-known-good snapshot, and answered through typed accessors that fall
//! back to cached data and static defaults when the network is unavailable.
//!
//! The snapshot only survives a restart when it is persisted to disk with
//! [`FlagshipBuilder::cache_path`] or a custom [`FlagStore`]. By default it is
//! held in memory.
//!
//! # Examples
//! ```no_run
//! # async fn run() -> Result<(), flagship_lib::ConfigError> {
//! let flags = flagship_lib::init("my-app-key", "https://flags.example.com")
//!     .cache_path(".flagship-cache")
//!     .default_value("new_checkout", false)
//!     .default_value("max_items", 20)
//!     .build()?;
//!
//! let all = flags.fetch_flags().await;
//! println!("{} flags loaded", all.len());
//!
//! if flags.is_enabled("new_checkout", false) {
//!     let limit = flags.get_int("max_items", 10);
//!     println!("new checkout with {} items", limit);
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod cache;
pub mod client;
pub mod defaults;
pub mod error;
pub mod fallback;
pub mod flag;
pub mod resolve;
pub mod retry;
pub mod source;
pub mod store;

pub use builder::{FlagshipBuilder, StoreConfig};
pub use client::Flagship;
pub use defaults::Defaults;
pub use error::{CacheError, ConfigError, FetchError};
pub use fallback::{FetchReport, Layer};
pub use flag::{FeatureFlag, FlagSet, FlagType};
pub use retry::RetryPolicy;
pub use source::{normalize_base_url, FlagSource, HttpFlagSource};
pub use store::{FlagStore, MemoryFlagStore, SledFlagStore, SnapshotMeta};

/// Returns a builder for a new client bound to `app_key` and `base_url`.
///
/// Call [`FlagshipBuilder::build`] to create and initialize the client, or
/// pass the builder to [`Flagship::initialize`] on an existing handle.
pub fn init(app_key: &str, base_url: &str) -> FlagshipBuilder {
    builder::create_builder(app_key, base_url)
}
