//! In-memory TTL cache of resolved releases, keyed by query fingerprint.
//!
//! The lock is only held to read or overwrite an entry; resolution itself runs
//! unlocked. Two concurrent misses for the same key both resolve and the later
//! write wins. Entries are never evicted; growth is bounded by the number of
//! distinct queries seen during the process lifetime.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use installer_schema::{Query, ResolvedRelease};
use tracing::debug;

use crate::error::{Error, Result};

/// Default time a resolved release is served without asking upstream again.
pub const DEFAULT_TTL: TimeDelta = TimeDelta::hours(1);

/// Source of "now", injectable for tests.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Memoizes query → [`ResolvedRelease`] for a fixed TTL.
#[derive(Debug)]
pub struct ResultCache {
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, ResolvedRelease>>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, Arc::new(SystemClock))
    }
}

impl ResultCache {
    /// Empty cache with the given TTL and clock.
    pub fn new(ttl: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The clock this cache judges staleness by.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// A still-fresh entry for `key`, if any.
    pub fn get(&self, key: &str) -> Option<ResolvedRelease> {
        let cached = self.lock().get(key).cloned()?;
        let age = self.clock.now() - cached.timestamp;
        (age < self.ttl).then_some(cached)
    }

    /// Store `value` under `key`, replacing whatever was there.
    pub fn insert(&self, key: String, value: ResolvedRelease) {
        self.lock().insert(key, value);
    }

    /// Number of stored entries, fresh or stale.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Return the fresh entry for `query`, or run `resolve` and store its result.
    ///
    /// # Errors
    ///
    /// Propagates errors from `resolve`; failures are not cached.
    pub async fn get_or_resolve<F, Fut>(&self, query: &Query, resolve: F) -> Result<ResolvedRelease>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ResolvedRelease>>,
    {
        let key = query.fingerprint().map_err(Error::Fingerprint)?;
        if let Some(hit) = self.get(&key) {
            debug!(user = %query.user, program = %query.program, "cache hit");
            return Ok(hit);
        }

        let fresh = resolve().await?;
        self.insert(key, fresh.clone());
        Ok(fresh)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ResolvedRelease>> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
