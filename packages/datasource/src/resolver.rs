//! WebID resolution and caching.
//!
//! Hierarchical paths are resolved to WebIDs through one of three lookup
//! endpoints:
//!
//! | Path kind | Endpoint |
//! |-----------|----------|
//! | PI point (`\\server\tag`) | `GET <base>/points?path=...` |
//! | AF attribute (`\\af\db\element|attribute`) | `GET <base>/attributes?path=...` |
//! | AF element (`\\af\db\element`) | `GET <base>/elements?path=...` |
//!
//! Successful lookups land in a [`WebIdCache`]. Entries older than the cache
//! TTL are never served, and a background task started with
//! [`spawn_eviction`] sweeps them out once per TTL period for as long as the
//! owning datasource lives.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use piweb_query::{QueryError, WebIdLookup};

use crate::client::PiWebClient;

/// Default cache lifetime and eviction period.
pub const WEBID_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

// ---------------------------------------------------------------------------
// WebIdCache
// ---------------------------------------------------------------------------

struct CacheEntry {
    web_id: String,
    created: Instant,
}

/// Full path → WebID, with per-entry creation time.
///
/// Shared between the request path (lookups, inserts) and the eviction task
/// (sweeps); every operation takes the table lock once.
pub struct WebIdCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl WebIdCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Cached WebID for `path`, unless missing or expired.
    pub fn get(&self, path: &str) -> Option<String> {
        let entries = self.lock();
        entries
            .get(path)
            .filter(|e| e.created.elapsed() < self.ttl)
            .map(|e| e.web_id.clone())
    }

    pub fn insert(&self, path: &str, web_id: &str) {
        self.lock().insert(
            path.to_string(),
            CacheEntry {
                web_id: web_id.to_string(),
                created: Instant::now(),
            },
        );
    }

    /// Remove every expired entry; returns how many were removed.
    pub fn sweep(&self) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| e.created.elapsed() < self.ttl);
        before - entries.len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for WebIdCache {
    fn default() -> Self {
        Self::new(WEBID_CACHE_TTL)
    }
}

/// Start the periodic sweep of `cache`, once every `period`, until `shutdown`
/// is cancelled.
pub fn spawn_eviction(
    cache: Arc<WebIdCache>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("resolver: eviction task stopped");
                    return;
                }
                _ = ticker.tick() => {
                    let removed = cache.sweep();
                    if removed > 0 {
                        info!("resolver: evicted {removed} cached WebIDs");
                    }
                }
            }
        }
    })
}

// ---------------------------------------------------------------------------
// WebIdResolver
// ---------------------------------------------------------------------------

/// Lookup URL for `full_path`.
pub fn lookup_url(base_url: &str, full_path: &str, is_pi_point: bool) -> String {
    let collection = if is_pi_point {
        "points"
    } else if full_path.contains('|') {
        "attributes"
    } else {
        "elements"
    };
    format!(
        "{}/{collection}?path={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(full_path)
    )
}

/// Resolves hierarchical paths to WebIDs, consulting the cache first.
pub struct WebIdResolver {
    client: PiWebClient,
    cache: Arc<WebIdCache>,
}

impl WebIdResolver {
    pub fn new(client: PiWebClient, cache: Arc<WebIdCache>) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &Arc<WebIdCache> {
        &self.cache
    }

    /// Resolve `full_path` to its WebID.
    ///
    /// A cache hit makes no network call. A miss issues exactly one lookup;
    /// on success the WebID is cached. Failures are not cached and not
    /// retried.
    pub async fn resolve(
        &self,
        full_path: &str,
        is_pi_point: bool,
        cancel: &CancellationToken,
    ) -> Result<String, QueryError> {
        if let Some(web_id) = self.cache.get(full_path) {
            debug!("resolver: cache hit for {full_path}");
            return Ok(web_id);
        }

        let url = lookup_url(self.client.base_url(), full_path, is_pi_point);
        let lookup: WebIdLookup = self
            .client
            .get_json(&url, cancel)
            .await
            .map_err(|e| e.into_query_error(|m| QueryError::Resolution(format!("{full_path}: {m}"))))?;

        if lookup.web_id.is_empty() {
            return Err(QueryError::Resolution(format!(
                "{full_path}: lookup returned an empty WebId"
            )));
        }

        self.cache.insert(full_path, &lookup.web_id);
        Ok(lookup.web_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
