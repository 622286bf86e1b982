use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use reqwest::Url;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::builder::FlagshipBuilder;
use crate::cache::FlagCache;
use crate::defaults::Defaults;
use crate::error::{ConfigError, FetchError};
use crate::fallback::{self, AttemptFailure, FetchReport, Layer, SkippedLayer};
use crate::flag::{FeatureFlag, FlagSet};
use crate::resolve;
use crate::retry::RetryPolicy;
use crate::source::{normalize_base_url, FlagSource, HttpFlagSource};
use crate::store::FlagStore;

/// Configuration fixed by the first successful [`Flagship::initialize`].
struct Settings {
    app_key: String,
    base_url: Url,
    source: Arc<dyn FlagSource>,
    store: Arc<dyn FlagStore>,
    defaults: Defaults,
    retry: RetryPolicy,
    runtime: Handle,
}

/// Background task keeping the cache warm from the persistent store.
struct Subscription {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

struct Inner {
    settings: OnceLock<Settings>,
    cache: Arc<FlagCache>,
    last_report: Mutex<Option<FetchReport>>,
    subscription: Mutex<Option<Subscription>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let subscription = self
            .subscription
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(subscription) = subscription {
            subscription.handle.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Handle to a feature flag resolver.
///
/// Cheap to clone; clones share the same state. Typed accessors never block
/// on I/O and only read the in-memory cache and the static defaults.
#[derive(Clone)]
pub struct Flagship {
    inner: Arc<Inner>,
}

impl Default for Flagship {
    fn default() -> Self {
        Self::new()
    }
}

impl Flagship {
    /// An uninitialized client. Accessors answer from fallbacks only until
    /// [`Flagship::initialize`] succeeds.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                settings: OnceLock::new(),
                cache: Arc::new(FlagCache::new()),
                last_report: Mutex::new(None),
                subscription: Mutex::new(None),
            }),
        }
    }

    /// Configures the client. Only the first successful call has any effect;
    /// later calls return `Ok(())` without touching the configuration, the
    /// cache or the background subscription.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn initialize(&self, builder: FlagshipBuilder) -> Result<(), ConfigError> {
        if self.is_initialized() {
            debug!("flagship already initialized, ignoring");
            return Ok(());
        }

        let FlagshipBuilder {
            app_key,
            base_url,
            auto_load,
            defaults,
            store,
            source,
            retry,
        } = builder;

        let app_key = app_key.trim();
        if app_key.is_empty() {
            return Err(ConfigError::EmptyAppKey);
        }
        let base_url = normalize_base_url(&base_url)?;
        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;

        let source: Arc<dyn FlagSource> = match source {
            Some(source) => source,
            None => Arc::new(HttpFlagSource::new(base_url.clone())?),
        };

        let settings = Settings {
            app_key: app_key.to_string(),
            base_url,
            source,
            store: store.open(),
            defaults,
            retry,
            runtime,
        };
        if self.inner.settings.set(settings).is_err() {
            debug!("flagship initialized concurrently, ignoring");
            return Ok(());
        }
        let Some(settings) = self.inner.settings.get() else {
            return Ok(());
        };

        self.start_subscription(settings);
        info!(
            app_key = %settings.app_key,
            base_url = %settings.base_url,
            defaults = settings.defaults.len(),
            "flagship initialized"
        );

        if auto_load {
            self.refresh();
        }
        Ok(())
    }

    fn start_subscription(&self, settings: &Settings) {
        let (shutdown, shutdown_rx) = oneshot::channel();
        let handle = settings.runtime.spawn(sync_from_store(
            Arc::clone(&self.inner.cache),
            settings.store.subscribe(),
            shutdown_rx,
        ));
        *lock(&self.inner.subscription) = Some(Subscription { shutdown, handle });
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.settings.get().is_some()
    }

    pub fn app_key(&self) -> Option<&str> {
        self.inner.settings.get().map(|s| s.app_key.as_str())
    }

    /// The normalized base URL, always ending with `/`.
    pub fn base_url(&self) -> Option<&Url> {
        self.inner.settings.get().map(|s| &s.base_url)
    }

    /// Fetches the full flag set, retrying with exponential backoff.
    ///
    /// Never fails: once every attempt is exhausted the result comes from the
    /// in-memory cache, then the static defaults, then an empty set. Details
    /// of how the result was obtained are kept in [`Flagship::last_report`].
    pub async fn fetch_flags(&self) -> FlagSet {
        let Some(settings) = self.inner.settings.get() else {
            error!("flagship not initialized, returning fallback");
            self.record(FetchReport::new(Layer::Empty, 0, Vec::new()).with_skipped(vec![
                SkippedLayer {
                    layer: Layer::Remote,
                    reason: "client is not initialized".to_string(),
                },
            ]));
            return FlagSet::new();
        };

        let policy = &settings.retry;
        let mut failures = Vec::new();

        for attempt in 1..=policy.attempts() {
            let reason = match settings.source.get_flags(&settings.app_key).await {
                Ok(flags) if !flags.is_empty() => {
                    if let Err(e) = settings.store.save_flags(&flags).await {
                        warn!(error = %e, "failed to persist fetched flags");
                    }
                    self.inner.cache.replace(flags.clone());
                    debug!(attempt, count = flags.len(), "flags fetched");
                    self.record(FetchReport::new(Layer::Remote, attempt, failures).served(&flags));
                    return flags;
                }
                Ok(_) => FetchError::Empty.to_string(),
                Err(e) => e.to_string(),
            };

            warn!(attempt, error = %reason, "fetch attempt failed");
            failures.push(AttemptFailure { attempt, reason });

            if let Some(delay) = policy.delay_after(attempt) {
                tokio::time::sleep(delay).await;
            }
        }

        let (flags, layer, skipped) = fallback::resolve(&self.inner.cache, &settings.defaults);
        warn!(served_from = %layer, count = flags.len(), "remote unavailable, serving fallback");
        self.record(
            FetchReport::new(layer, policy.attempts(), failures)
                .with_skipped(skipped)
                .served(&flags),
        );
        flags
    }

    /// Starts a fetch in the background. Completion and failures are not
    /// reported to the caller.
    pub fn refresh(&self) {
        let Some(settings) = self.inner.settings.get() else {
            warn!("refresh requested before initialization");
            return;
        };
        let client = self.clone();
        settings.runtime.spawn(async move {
            client.fetch_flags().await;
        });
    }

    /// Current flags in key order.
    pub fn flags(&self) -> Vec<FeatureFlag> {
        self.inner.cache.snapshot().to_vec()
    }

    pub fn snapshot(&self) -> Arc<FlagSet> {
        self.inner.cache.snapshot()
    }

    pub fn last_report(&self) -> Option<FetchReport> {
        lock(&self.inner.last_report).clone()
    }

    fn record(&self, report: FetchReport) {
        *lock(&self.inner.last_report) = Some(report);
    }

    fn with_view<T>(&self, f: impl FnOnce(&FlagSet, &Defaults) -> T) -> T {
        let flags = self.inner.cache.snapshot();
        match self.inner.settings.get() {
            Some(settings) => f(&flags, &settings.defaults),
            None => f(&flags, &Defaults::new()),
        }
    }

    pub fn is_enabled(&self, key: &str, fallback: bool) -> bool {
        self.with_view(|flags, defaults| resolve::is_enabled(flags, defaults, key, fallback))
    }

    pub fn get_string(&self, key: &str, fallback: &str) -> String {
        self.with_view(|flags, defaults| resolve::get_string(flags, defaults, key, fallback))
    }

    pub fn get_number(&self, key: &str, fallback: f64) -> f64 {
        self.with_view(|flags, defaults| resolve::get_number(flags, defaults, key, fallback))
    }

    pub fn get_int(&self, key: &str, fallback: i64) -> i64 {
        self.with_view(|flags, defaults| resolve::get_int(flags, defaults, key, fallback))
    }

    pub fn get_json(&self, key: &str, fallback: &str) -> String {
        self.with_view(|flags, defaults| resolve::get_json(flags, defaults, key, fallback))
    }

    /// Stops the store subscription and waits for it to finish.
    pub async fn shutdown(&self) {
        let subscription = lock(&self.inner.subscription).take();
        let Some(Subscription { shutdown, handle }) = subscription else {
            return;
        };
        let _ = shutdown.send(());
        if let Err(e) = handle.await {
            if !e.is_cancelled() {
                warn!(error = %e, "store subscription ended abnormally");
            }
        }
        debug!("store subscription stopped");
    }
}

/// Replaces the cache with every non-empty snapshot the store publishes.
/// Empty snapshots never clear a populated cache.
async fn sync_from_store(
    cache: Arc<FlagCache>,
    mut snapshots: watch::Receiver<FlagSet>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        if snapshot.is_empty() {
            debug!("ignoring empty cached snapshot");
        } else {
            debug!(count = snapshot.len(), "loaded flags from store");
            cache.replace(snapshot);
        }

        tokio::select! {
            _ = &mut shutdown => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}
