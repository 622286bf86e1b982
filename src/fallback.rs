//! The exhaustion chain consulted once every remote attempt has failed.
//!
//! Layers are tried in order; the first one that yields a non-empty set is
//! served. Every skipped layer leaves a reason in the [`FetchReport`].

use std::fmt;

use chrono::{DateTime, Utc};

use crate::cache::FlagCache;
use crate::defaults::Defaults;
use crate::flag::FlagSet;

/// Where the result of a fetch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Remote,
    MemoryCache,
    Defaults,
    Empty,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layer::Remote => "remote",
            Layer::MemoryCache => "memory cache",
            Layer::Defaults => "defaults",
            Layer::Empty => "empty",
        };
        f.write_str(name)
    }
}

/// Fallback layers in the order they are consulted.
pub const CHAIN: [Layer; 2] = [Layer::MemoryCache, Layer::Defaults];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub attempt: u32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLayer {
    pub layer: Layer,
    pub reason: String,
}

/// Outcome of one `fetch_flags` call.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchReport {
    pub served_from: Layer,
    pub attempts: u32,
    pub failures: Vec<AttemptFailure>,
    pub skipped: Vec<SkippedLayer>,
    pub flags_count: usize,
    pub completed_at: DateTime<Utc>,
}

impl FetchReport {
    pub(crate) fn new(served_from: Layer, attempts: u32, failures: Vec<AttemptFailure>) -> Self {
        Self {
            served_from,
            attempts,
            failures,
            skipped: Vec::new(),
            flags_count: 0,
            completed_at: Utc::now(),
        }
    }

    pub(crate) fn with_skipped(mut self, skipped: Vec<SkippedLayer>) -> Self {
        self.skipped = skipped;
        self
    }

    pub(crate) fn served(mut self, flags: &FlagSet) -> Self {
        self.flags_count = flags.len();
        self
    }
}

fn provide(layer: Layer, cache: &FlagCache, defaults: &Defaults) -> Result<FlagSet, String> {
    match layer {
        Layer::MemoryCache => {
            let snapshot = cache.snapshot();
            if snapshot.is_empty() {
                Err("in-memory cache is empty".to_string())
            } else {
                Ok(FlagSet::clone(&snapshot))
            }
        }
        Layer::Defaults => {
            if defaults.is_empty() {
                return Err("no defaults configured".to_string());
            }
            let flags = defaults.to_flag_set();
            // Defaults become the working set so accessors see the same view.
            cache.replace(flags.clone());
            Ok(flags)
        }
        Layer::Remote | Layer::Empty => Err(format!("{} is not a fallback layer", layer)),
    }
}

/// Walks [`CHAIN`] and returns the first non-empty set, or an empty set
/// served from [`Layer::Empty`].
pub(crate) fn resolve(cache: &FlagCache, defaults: &Defaults) -> (FlagSet, Layer, Vec<SkippedLayer>) {
    let mut skipped = Vec::new();
    for layer in CHAIN {
        match provide(layer, cache, defaults) {
            Ok(flags) => return (flags, layer, skipped),
            Err(reason) => {
                tracing::debug!(%layer, %reason, "fallback layer skipped");
                skipped.push(SkippedLayer { layer, reason });
            }
        }
    }
    (FlagSet::new(), Layer::Empty, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flag::{FeatureFlag, FlagType};

    #[test]
    fn test_cache_wins_over_defaults() {
        let cache = FlagCache::new();
        cache.replace(vec![FeatureFlag::new("a", FlagType::Boolean, true)].into());
        let defaults = Defaults::new().with("x", true);

        let (flags, layer, skipped) = resolve(&cache, &defaults);
        assert_eq!(layer, Layer::MemoryCache);
        assert_eq!(flags.keys().collect::<Vec<_>>(), vec!["a"]);
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_defaults_are_installed_into_cache() {
        let cache = FlagCache::new();
        let defaults = Defaults::new().with("x", true).with("y", 5);

        let (flags, layer, skipped) = resolve(&cache, &defaults);
        assert_eq!(layer, Layer::Defaults);
        assert_eq!(flags.len(), 2);
        assert_eq!(*cache.snapshot(), flags);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].layer, Layer::MemoryCache);
    }

    #[test]
    fn test_nothing_available_is_empty() {
        let cache = FlagCache::new();
        let (flags, layer, skipped) = resolve(&cache, &Defaults::new());
        assert!(flags.is_empty());
        assert_eq!(layer, Layer::Empty);
        assert_eq!(
            skipped.iter().map(|s| s.layer).collect::<Vec<_>>(),
            vec![Layer::MemoryCache, Layer::Defaults]
        );
        assert!(cache.is_empty());
    }
}
