use crate::quote::types::Quote;
use chrono::{DateTime, TimeDelta, Utc};
use moka::Expiry;
use moka::sync::Cache;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 当前语录在瞬态缓存中的固定 key。
pub const QUOTE_CACHE_KEY: &str = "hello_homer_quote";

const DEFAULT_TRANSIENT_CAPACITY: u64 = 64;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 带 TTL 的键值缓存。get/set/delete 各自原子，彼此之间不加锁。
pub trait TransientCache: Send + Sync {
    /// 未过期才返回。
    fn get(&self, key: &str) -> Option<Quote>;
    fn set(&self, key: &str, quote: Quote, ttl: Duration);
    /// 返回是否删除了一条记录。
    fn delete(&self, key: &str) -> bool;
}

#[derive(Clone, Debug)]
struct CachedQuote {
    quote: Quote,
    expires_at: DateTime<Utc>,
    ttl: Duration,
}

/// 按条目 TTL 让 moka 自行回收；读取时仍以 expires_at 为准。
struct PerEntryTtl;

impl Expiry<String, CachedQuote> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedQuote,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedQuote,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

#[derive(Clone)]
pub struct MokaTransientCache {
    entries: Cache<String, CachedQuote>,
    clock: Arc<dyn Clock>,
}

impl MokaTransientCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(DEFAULT_TRANSIENT_CAPACITY)
                .expire_after(PerEntryTtl)
                .build(),
            clock,
        }
    }
}

impl TransientCache for MokaTransientCache {
    fn get(&self, key: &str) -> Option<Quote> {
        let entry = self.entries.get(key)?;
        if self.clock.now() >= entry.expires_at {
            self.entries.invalidate(key);
            return None;
        }
        Some(entry.quote)
    }

    fn set(&self, key: &str, quote: Quote, ttl: Duration) {
        let now = self.clock.now();
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entries.insert(
            key.to_string(),
            CachedQuote {
                quote,
                expires_at,
                ttl,
            },
        );
    }

    fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }
}

#[cfg(test)]
pub use manual::ManualClock;


#[cfg(test)]
mod tests {
    use super::*;

    fn quote(text: &str) -> Quote {
        Quote {
            text: text.to_string(),
            episode_title: "Marge vs. the Monorail".to_string(),
            season: Some(4),
            image_url: "https://frinkiac.com/img/S04E12/1.jpg".to_string(),
        }
    }

    fn cache() -> (MokaTransientCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (MokaTransientCache::new(clock.clone()), clock)
    }

    #[test]
    fn miss_on_empty_cache() {
        let (cache, _) = cache();
        assert_eq!(cache.get(QUOTE_CACHE_KEY), None);
    }

    #[test]
    fn entry_lives_until_ttl_boundary() {
        let (cache, clock) = cache();
        let q = quote("Monorail!");
        cache.set(QUOTE_CACHE_KEY, q.clone(), Duration::from_secs(3600));

        clock.advance(Duration::from_secs(3599));
        assert_eq!(cache.get(QUOTE_CACHE_KEY), Some(q));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(QUOTE_CACHE_KEY), None);
    }

    #[test]
    fn overwrite_resets_expiry() {
        let (cache, clock) = cache();
        cache.set(QUOTE_CACHE_KEY, quote("first"), Duration::from_secs(60));
        clock.advance(Duration::from_secs(50));
        cache.set(QUOTE_CACHE_KEY, quote("second"), Duration::from_secs(60));
        clock.advance(Duration::from_secs(50));
        assert_eq!(cache.get(QUOTE_CACHE_KEY).map(|q| q.text), Some("second".to_string()));
    }

    #[test]
    fn delete_removes_entry() {
        let (cache, _) = cache();
        cache.set(QUOTE_CACHE_KEY, quote("gone"), Duration::from_secs(60));
        assert!(cache.delete(QUOTE_CACHE_KEY));
        assert!(!cache.delete(QUOTE_CACHE_KEY));
        assert_eq!(cache.get(QUOTE_CACHE_KEY), None);
    }
}
