//! Allow-list validation with a TTL cache.
//!
//! An identifier may be reserved or joined only if it appears in an
//! externally maintained text file (one identifier per line).  The file is
//! fetched through an [`AllowListSource`] and cached for a configurable TTL.
//!
//! # Failure semantics (fail closed)
//!
//! - A fetch that errors, or does not finish within `fetch_timeout`, yields
//!   [`BrokerError::UpstreamUnavailable`].
//! - A failed refresh *discards* the cached list, so an identifier revoked
//!   upstream is never accepted from stale data.
//!
//! # Single flight
//!
//! The cache sits behind a `tokio::sync::Mutex`.  When the list is stale the
//! first caller fetches while holding the lock; concurrent callers queue on
//! the lock and then read the fresh list instead of fetching again.  If that
//! fetch failed, callers that were already waiting get the same error
//! rather than starting another fetch, so no caller waits for more than one
//! fetch.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use share_core::{BrokerError, Identifier};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Errors from fetching the raw allow-list text.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The HTTP request could not be completed.
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// A local allow-list file could not be read.
    #[error("I/O error reading allow-list at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the allow-list text comes from.
///
/// Infrastructure implementations fetch over HTTP or read a local file;
/// tests use a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AllowListSource: Send + Sync {
    /// Fetches the full allow-list text.
    async fn fetch(&self) -> Result<String, SourceError>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Parses allow-list text into a set of identifiers.
///
/// One identifier per line; surrounding whitespace is trimmed, blank lines
/// and lines starting with `#` are skipped.
pub fn parse_allow_list(text: &str) -> HashSet<String> {
    text.trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[derive(Debug)]
struct CachedList {
    identifiers: HashSet<String>,
    fetched_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    list: Option<CachedList>,
    last_failure: Option<(Instant, String)>,
}

/// Answers "is this identifier allowed right now?".
pub struct AllowListValidator {
    source: Arc<dyn AllowListSource>,
    source_name: String,
    ttl: Duration,
    fetch_timeout: Duration,
    cache: Mutex<CacheState>,
}

impl AllowListValidator {
    pub fn new(source: Arc<dyn AllowListSource>, ttl: Duration, fetch_timeout: Duration) -> Self {
        let source_name = source.describe();
        Self {
            source,
            source_name,
            ttl,
            fetch_timeout,
            cache: Mutex::new(CacheState::default()),
        }
    }

    /// Returns whether `identifier` is on the allow-list, fetching it first
    /// if the cache is empty or older than the TTL.
    ///
    /// # Errors
    ///
    /// [`BrokerError::UpstreamUnavailable`] if a needed fetch fails or times
    /// out.  Callers must treat this as "not allowed".
    pub async fn is_allowed(&self, identifier: &Identifier) -> Result<bool, BrokerError> {
        let waited_since = Instant::now();
        let mut state = self.cache.lock().await;

        let fresh = state
            .list
            .as_ref()
            .is_some_and(|list| list.fetched_at.elapsed() < self.ttl);

        if !fresh {
            // Someone else's fetch failed while we were queued on the lock.
            if let Some((failed_at, message)) = &state.last_failure {
                if *failed_at > waited_since {
                    return Err(BrokerError::UpstreamUnavailable(message.clone()));
                }
            }
            self.refresh_locked(&mut state).await?;
        }

        Ok(state
            .list
            .as_ref()
            .is_some_and(|list| list.identifiers.contains(identifier.as_str())))
    }

    /// Fetches the list now regardless of the TTL and returns its size.
    ///
    /// # Errors
    ///
    /// [`BrokerError::UpstreamUnavailable`] if the fetch fails or times out.
    pub async fn refresh(&self) -> Result<usize, BrokerError> {
        let mut state = self.cache.lock().await;
        self.refresh_locked(&mut state).await
    }

    /// Number of identifiers in the cached list, if one is held.
    pub async fn cached_len(&self) -> Option<usize> {
        self.cache
            .lock()
            .await
            .list
            .as_ref()
            .map(|list| list.identifiers.len())
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    async fn refresh_locked(&self, state: &mut CacheState) -> Result<usize, BrokerError> {
        // Never keep serving a list we failed to refresh.
        state.list = None;

        let outcome = tokio::time::timeout(self.fetch_timeout, self.source.fetch()).await;
        let text = match outcome {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(self.record_failure(state, e.to_string())),
            Err(_) => {
                return Err(self.record_failure(
                    state,
                    format!("fetch timed out after {:?}", self.fetch_timeout),
                ))
            }
        };

        let identifiers = parse_allow_list(&text);
        let count = identifiers.len();
        debug!(source = %self.source_name, count, "allow-list refreshed");
        if count == 0 {
            warn!(source = %self.source_name, "allow-list is empty; every identifier will be rejected");
        }
        state.list = Some(CachedList {
            identifiers,
            fetched_at: Instant::now(),
        });
        state.last_failure = None;
        Ok(count)
    }

    fn record_failure(&self, state: &mut CacheState, message: String) -> BrokerError {
        warn!(source = %self.source_name, "allow-list fetch failed: {message}");
        state.last_failure = Some((Instant::now(), message.clone()));
        BrokerError::UpstreamUnavailable(message)
    }
}

impl std::fmt::Debug for AllowListValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllowListValidator")
            .field("source", &self.source_name)
            .field("ttl", &self.ttl)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish()
    }
}

/// Logs the outcome of a startup cache warm-up.
pub async fn warm_up(validator: &AllowListValidator) {
    match validator.refresh().await {
        Ok(count) => info!(
            source = %validator.source_name(),
            "loaded {count} identifiers from allow-list"
        ),
        Err(e) => warn!(
            source = %validator.source_name(),
            "initial allow-list load failed ({e}); will retry on first request"
        ),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
