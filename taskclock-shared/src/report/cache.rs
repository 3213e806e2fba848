/// Report cache
///
/// Short-lived memoization of built reports, keyed by the resolved
/// [`ReportQuery`]. The TTL is capped below one minute so a freshly logged
/// entry shows up in reports within a minute at most. A zero TTL disables
/// caching.

use super::params::ReportQuery;
use super::Report;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Upper bound on the cache TTL
pub const MAX_TTL: Duration = Duration::from_secs(59);

/// Default TTL
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

struct Entry {
    stored_at: Instant,
    report: Arc<Report>,
}

/// In-process TTL cache of built reports
pub struct ReportCache {
    ttl: Duration,
    entries: RwLock<HashMap<ReportQuery, Entry>>,
}

impl ReportCache {
    /// Creates a cache; `ttl` above [`MAX_TTL`] is clamped
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: ttl.min(MAX_TTL),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry for `key`, if any
    pub async fn get(&self, key: &ReportQuery) -> Option<Arc<Report>> {
        if self.ttl.is_zero() {
            return None;
        }

        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.report))
    }

    /// Stores a report and evicts expired entries
    pub async fn put(&self, key: ReportQuery, report: Arc<Report>) {
        if self.ttl.is_zero() {
            return;
        }

        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        entries.insert(
            key,
            Entry {
                stored_at: Instant::now(),
                report,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for ReportCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
