use std::time::{Duration, Instant};

use moka::sync::Cache;
use moka::Expiry;

use super::domain::{Document, RecoveryScore};

const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// Injected cache for recovery scores so tests can swap in a deterministic
/// fake.
pub trait ScoreCache: Send + Sync {
    fn get(&self, document: &Document) -> Option<RecoveryScore>;
    fn set(&self, score: RecoveryScore, ttl: Duration);
}

#[derive(Clone)]
struct CachedScore {
    score: RecoveryScore,
    ttl: Duration,
}

/// Each entry lives for the ttl it was stored with; re-inserting restarts it.
struct PerEntryTtl;

impl Expiry<Document, CachedScore> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &Document,
        value: &CachedScore,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &Document,
        value: &CachedScore,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// `moka`-backed cache with a per-entry ttl.
pub struct MemoryScoreCache {
    entries: Cache<Document, CachedScore>,
}

impl Default for MemoryScoreCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }
}

impl MemoryScoreCache {
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }
}

impl ScoreCache for MemoryScoreCache {
    fn get(&self, document: &Document) -> Option<RecoveryScore> {
        self.entries.get(document).map(|cached| cached.score)
    }

    fn set(&self, score: RecoveryScore, ttl: Duration) {
        let document = score.document.clone();
        self.entries.insert(document, CachedScore { score, ttl });
    }
}

/// Cache that never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScoreCache;

impl ScoreCache for NoScoreCache {
    fn get(&self, _document: &Document) -> Option<RecoveryScore> {
        None
    }

    fn set(&self, _score: RecoveryScore, _ttl: Duration) {}
}
