//! Resilience state shared by every AI operation.
//!
//! [`ResiliencePolicy`] owns the response cache, the rate-limit clock and the
//! retry policy. One instance is shared by all operations of a gateway, so
//! the minimum spacing applies across features, not per feature.

use mentor_core::completion::{CompletionError, TextCompletion};
use mentor_core::config::AiSettings;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    stored_at: Instant,
}

/// Snapshot of the response cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    /// Keys in lexical order.
    pub keys: Vec<String>,
}

#[derive(Debug)]
pub struct ResiliencePolicy {
    settings: AiSettings,
    cache: Mutex<HashMap<String, CacheEntry>>,
    /// Instant of the last dispatched request. Held across the spacing sleep
    /// so concurrent callers take slots one after another.
    last_dispatch: tokio::sync::Mutex<Option<Instant>>,
}

impl Default for ResiliencePolicy {
    fn default() -> Self {
        Self::new(AiSettings::default())
    }
}

impl ResiliencePolicy {
    pub fn new(settings: AiSettings) -> Self {
        Self {
            settings,
            cache: Mutex::new(HashMap::new()),
            last_dispatch: tokio::sync::Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &AiSettings {
        &self.settings
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached value under `key` if it is still fresh.
    ///
    /// Stale entries are evicted on lookup.
    pub fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let ttl = self.settings.cache_ttl();
        let mut cache = self.cache();
        let entry = cache.get(key)?;
        if entry.stored_at.elapsed() >= ttl {
            cache.remove(key);
            return None;
        }
        match serde_json::from_value(entry.value.clone()) {
            Ok(value) => {
                tracing::debug!("[AiGateway] Using cached response for {}", key);
                Some(value)
            }
            Err(err) => {
                tracing::warn!("[AiGateway] Dropping cache entry {} of unexpected shape: {}", key, err);
                cache.remove(key);
                None
            }
        }
    }

    /// Stores `value` under `key`, restarting its freshness window.
    pub fn store<T: Serialize>(&self, key: impl Into<String>, value: &T) {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.cache().insert(
                    key,
                    CacheEntry {
                        value,
                        stored_at: Instant::now(),
                    },
                );
            }
            Err(err) => tracing::warn!("[AiGateway] Not caching {}: {}", key, err),
        }
    }

    /// Empties the cache, returning how many entries were dropped.
    pub fn clear(&self) -> usize {
        let mut cache = self.cache();
        let dropped = cache.len();
        cache.clear();
        dropped
    }

    pub fn stats(&self) -> CacheStats {
        let cache = self.cache();
        let mut keys: Vec<String> = cache.keys().cloned().collect();
        keys.sort();
        CacheStats {
            size: keys.len(),
            keys,
        }
    }

    /// Waits until the minimum spacing since the previous dispatch has passed,
    /// then claims the slot.
    pub async fn wait_for_slot(&self) {
        let spacing = self.settings.min_request_spacing();
        let mut last = self.last_dispatch.lock().await;
        if let Some(previous) = *last {
            let since = previous.elapsed();
            if since < spacing {
                let delay = spacing - since;
                tracing::debug!("[AiGateway] Rate limiting: waiting {:?} before next request", delay);
                tokio::time::sleep(delay).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Delay before the retry that follows failed attempt `attempt` (1-based):
    /// `base * 2^attempt`, or the server hint when that is longer.
    pub fn backoff_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let computed = self
            .settings
            .backoff_base()
            .saturating_mul(2u32.saturating_pow(attempt));
        match retry_after {
            Some(hint) if hint > computed => hint,
            _ => computed,
        }
    }

    /// Sends `prompt` through the rate limiter, retrying retryable failures
    /// with exponential backoff up to the configured attempt bound.
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: Raw completion text
    /// - `Err(CompletionError)`: A non-retryable failure, or the last
    ///   retryable failure once attempts are exhausted
    pub async fn dispatch(
        &self,
        client: &dyn TextCompletion,
        prompt: &str,
    ) -> Result<String, CompletionError> {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            self.wait_for_slot().await;
            match client.complete(prompt).await {
                Ok(text) => return Ok(text),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.backoff_delay(attempt, err.retry_after);
                    tracing::warn!(
                        "[AiGateway] {} request failed (attempt {}/{}), retrying in {:?}: {}",
                        client.name(),
                        attempt,
                        max_attempts,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_retryable() {
                        tracing::error!(
                            "[AiGateway] {} request failed after {} attempts: {}",
                            client.name(),
                            attempt,
                            err
                        );
                    } else {
                        tracing::error!("[AiGateway] Non-retryable {} error: {}", client.name(), err);
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ResiliencePolicy {
        ResiliencePolicy::new(AiSettings::default())
    }

    #[test]
    fn test_backoff_grows_geometrically() {
        let policy = policy();
        assert_eq!(policy.backoff_delay(1, None), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(2, None), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(3, None), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_honors_longer_server_hint() {
        let policy = policy();
        assert_eq!(
            policy.backoff_delay(1, Some(Duration::from_secs(30))),
            Duration::from_secs(30)
        );
        assert_eq!(
            policy.backoff_delay(2, Some(Duration::from_secs(1))),
            Duration::from_secs(4)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_entries_expire_after_ttl() {
        let policy = policy();
        policy.store("k", &serde_json::json!({"feedback": "ok"}));
        assert!(policy.cached::<Value>("k").is_some());

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(policy.cached::<Value>("k").is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(policy.cached::<Value>("k").is_none());
        assert_eq!(policy.stats().size, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_slot_is_immediate_then_spaced() {
        let policy = policy();
        let start = Instant::now();
        policy.wait_for_slot().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        policy.wait_for_slot().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[test]
    fn test_stats_and_clear() {
        let policy = policy();
        policy.store("b", &1);
        policy.store("a", &2);
        assert_eq!(
            policy.stats(),
            CacheStats {
                size: 2,
                keys: vec!["a".into(), "b".into()]
            }
        );
        assert_eq!(policy.clear(), 2);
        assert_eq!(policy.stats(), CacheStats::default());
    }
}
