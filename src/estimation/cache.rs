//! Time-bounded prediction cache owned by one engine instance.

use crate::domain::Estimate;
use crate::error::AppError;
use std::collections::HashMap;
use std::sync::Mutex;
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone)]
struct CacheEntry {
    estimate: Estimate,
    stored_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct PredictionCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl PredictionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Entry for `key` if it is younger than the TTL at `now`. Expired entries
    /// are evicted on the way out.
    pub fn get(&self, key: &str, now: OffsetDateTime) -> Result<Option<Estimate>, AppError> {
        let mut entries = self.entries.lock().map_err(|_| AppError::CacheLock)?;
        match entries.get(key) {
            Some(entry) if now - entry.stored_at < self.ttl => Ok(Some(entry.estimate.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub fn insert(&self, key: String, estimate: Estimate, now: OffsetDateTime) -> Result<(), AppError> {
        let mut entries = self.entries.lock().map_err(|_| AppError::CacheLock)?;
        entries.insert(
            key,
            CacheEntry {
                estimate,
                stored_at: now,
            },
        );
        Ok(())
    }

    pub fn clear(&self) -> Result<(), AppError> {
        self.entries.lock().map_err(|_| AppError::CacheLock)?.clear();
        Ok(())
    }

    pub fn len(&self) -> Result<usize, AppError> {
        Ok(self.entries.lock().map_err(|_| AppError::CacheLock)?.len())
    }

    pub fn is_empty(&self) -> Result<bool, AppError> {
        self.len().map(|len| len == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::fixtures::NOW;
    use std::sync::Arc;

    fn estimate(minutes: f64) -> Estimate {
        Estimate::new("High Level Road", minutes, 0.5, Vec::new())
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = PredictionCache::new(Duration::minutes(15));
        cache.insert("key".to_string(), estimate(30.0), NOW).expect("insert");

        let fresh = cache.get("key", NOW + Duration::minutes(14)).expect("get");
        let stale = cache.get("key", NOW + Duration::minutes(15)).expect("get");

        assert_eq!(fresh.map(|e| e.minutes), Some(30));
        assert_eq!(stale, None);
        assert!(cache.is_empty().expect("len"));
    }

    #[test]
    fn clear_drops_everything() {
        let cache = PredictionCache::new(Duration::minutes(15));
        cache.insert("a".to_string(), estimate(20.0), NOW).expect("insert");
        cache.insert("b".to_string(), estimate(40.0), NOW).expect("insert");

        cache.clear().expect("clear");

        assert_eq!(cache.len().expect("len"), 0);
    }

    #[test]
    fn poisoned_lock_reports_cache_error() {
        let cache = Arc::new(PredictionCache::new(Duration::minutes(15)));
        let poisoner = Arc::clone(&cache);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.entries.lock().expect("lock");
            panic!("poison the cache");
        })
        .join();

        assert!(matches!(cache.get("key", NOW), Err(AppError::CacheLock)));
    }
}
