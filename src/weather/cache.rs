use chrono::Local;
use log::{debug, trace, warn};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use super::{Location, WeatherError, WeatherSnapshot, WeatherSource};
use crate::error::{Error, Result};

#[derive(Default)]
struct CacheEntry {
    value: Option<WeatherSnapshot>,
    fetched_at: Option<Instant>,
    in_flight: bool,
}

/// Time-bounded cache in front of a [`WeatherSource`].
///
/// At most one fetch is outstanding at a time. While it runs, every other
/// caller gets the previous snapshot (stale or not) instead of waiting, and a
/// failed fetch falls back to the previous snapshot when there is one. The
/// entry lock is never held across the remote call.
pub struct WeatherCache {
    source: Box<dyn WeatherSource + Send + Sync>,
    location: Location,
    ttl: Duration,
    timeout: Duration,
    entry: Mutex<CacheEntry>,
}

/// Clears `in_flight` even if the fetching future is dropped midway.
struct InFlight<'a> {
    cache: &'a WeatherCache,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.cache.lock().in_flight = false;
    }
}

impl WeatherCache {
    pub fn new(
        source: Box<dyn WeatherSource + Send + Sync>,
        location: Location,
        ttl: Duration,
        timeout: Duration,
    ) -> Self {
        WeatherCache {
            source,
            location,
            ttl,
            timeout,
            entry: Mutex::new(CacheEntry::default()),
        }
    }

    pub async fn get(&self) -> Result<WeatherSnapshot> {
        let in_flight = {
            let mut entry = self.lock();

            if let (Some(value), Some(fetched_at)) = (&entry.value, entry.fetched_at) {
                if fetched_at.elapsed() < self.ttl {
                    trace!("weather cache hit");
                    return Ok(value.clone());
                }
            }

            if entry.in_flight {
                debug!("weather fetch already in flight");
                return entry.value.clone().ok_or(Error::WeatherNotReady);
            }

            entry.in_flight = true;
            InFlight { cache: self }
        };

        debug!("fetching weather for {}", self.location);
        let result = tokio::time::timeout(self.timeout, self.source.fetch(&self.location))
            .await
            .unwrap_or(Err(WeatherError::Timeout));

        let mut entry = self.lock();
        let outcome = match result {
            Ok(report) => {
                let snapshot = WeatherSnapshot::new(report, self.location.clone(), Local::now());
                entry.value = Some(snapshot.clone());
                entry.fetched_at = Some(Instant::now());

                Ok(snapshot)
            }
            Err(err) => match &entry.value {
                Some(stale) => {
                    warn!("weather fetch failed, serving snapshot from {}: {err}", stale.fetched_at);
                    Ok(stale.clone())
                }
                None => Err(Error::WeatherUnavailable(err)),
            },
        };
        drop(entry);
        drop(in_flight);

        outcome
    }

    /// Whatever is cached right now, however old. Never touches the network.
    pub fn latest(&self) -> Option<WeatherSnapshot> {
        self.lock().value.clone()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, CacheEntry> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::WeatherReport;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct Remote {
        calls: AtomicUsize,
        responses: Mutex<VecDeque<std::result::Result<WeatherReport, WeatherError>>>,
        // When set, every fetch parks until released.
        gate: Option<Arc<Notify>>,
    }

    impl Remote {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn wait_for_calls(&self, calls: usize) {
            while self.calls() < calls {
                tokio::task::yield_now().await;
            }
        }
    }

    struct FakeSource(Arc<Remote>);

    #[async_trait]
    impl WeatherSource for FakeSource {
        async fn fetch(
            &self,
            _location: &Location,
        ) -> std::result::Result<WeatherReport, WeatherError> {
            self.0.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(gate) = &self.0.gate {
                gate.notified().await;
            }

            self.0
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(WeatherError::MissingCondition))
        }
    }

    fn report(temperature_c: f32) -> std::result::Result<WeatherReport, WeatherError> {
        Ok(WeatherReport {
            temperature_c,
            wind_speed: 2.0,
            description: "clear sky".to_string(),
        })
    }

    fn remote(
        responses: Vec<std::result::Result<WeatherReport, WeatherError>>,
        gate: Option<Arc<Notify>>,
    ) -> Arc<Remote> {
        Arc::new(Remote {
            responses: Mutex::new(responses.into()),
            gate,
            ..Default::default()
        })
    }

    fn cache(remote: &Arc<Remote>) -> WeatherCache {
        WeatherCache::new(
            Box::new(FakeSource(remote.clone())),
            Location::City("Satu Mare,RO".to_string()),
            Duration::from_secs(600),
            Duration::from_secs(5),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn serves_cached_value_within_ttl() {
        let remote = remote(vec![report(5.0), report(7.0)], None);
        let cache = cache(&remote);

        assert_eq!(cache.get().await.unwrap().temperature_c, 5.0);

        tokio::time::advance(Duration::from_secs(9 * 60 + 59)).await;
        assert_eq!(cache.get().await.unwrap().temperature_c, 5.0);
        assert_eq!(remote.calls(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get().await.unwrap().temperature_c, 7.0);
        assert_eq!(remote.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn many_calls_inside_one_window_fetch_once() {
        let remote = remote(vec![report(5.0)], None);
        let cache = cache(&remote);

        for _ in 0..50 {
            cache.get().await.unwrap();
            tokio::time::advance(Duration::from_secs(10)).await;
        }

        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_caller_without_value_is_not_ready() {
        let gate = Arc::new(Notify::new());
        let remote = remote(vec![report(5.0)], Some(gate.clone()));
        let cache = Arc::new(cache(&remote));

        let first = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get().await }
        });
        remote.wait_for_calls(1).await;

        assert!(matches!(cache.get().await, Err(Error::WeatherNotReady)));
        assert_eq!(cache.latest(), None);

        gate.notify_one();
        assert_eq!(first.await.unwrap().unwrap().temperature_c, 5.0);
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_caller_gets_stale_value_while_refreshing() {
        let gate = Arc::new(Notify::new());
        let remote = remote(vec![report(5.0), report(7.0)], Some(gate.clone()));
        let cache = Arc::new(cache(&remote));

        gate.notify_one();
        cache.get().await.unwrap();
        tokio::time::advance(Duration::from_secs(601)).await;

        let refresh = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get().await }
        });
        remote.wait_for_calls(2).await;

        assert_eq!(cache.get().await.unwrap().temperature_c, 5.0);
        assert_eq!(remote.calls(), 2);

        gate.notify_one();
        assert_eq!(refresh.await.unwrap().unwrap().temperature_c, 7.0);
        assert_eq!(cache.latest().unwrap().temperature_c, 7.0);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_falls_back_to_stale_value() {
        let remote = remote(vec![report(5.0), Err(WeatherError::MissingCondition)], None);
        let cache = cache(&remote);

        cache.get().await.unwrap();
        tokio::time::advance(Duration::from_secs(601)).await;

        assert_eq!(cache.get().await.unwrap().temperature_c, 5.0);
        assert_eq!(remote.calls(), 2);

        // A failed refresh leaves the entry expired, so the next call retries.
        cache.get().await.unwrap();
        assert_eq!(remote.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_without_value_is_unavailable() {
        let remote = remote(vec![Err(WeatherError::MissingCondition)], None);
        let cache = cache(&remote);

        assert!(matches!(
            cache.get().await,
            Err(Error::WeatherUnavailable(WeatherError::MissingCondition))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_remote_times_out_and_releases_in_flight() {
        let gate = Arc::new(Notify::new());
        let remote = remote(vec![], Some(gate));
        let cache = cache(&remote);

        let begun = Instant::now();
        assert!(matches!(
            cache.get().await,
            Err(Error::WeatherUnavailable(WeatherError::Timeout))
        ));
        assert!(begun.elapsed() >= Duration::from_secs(5));
        assert!(begun.elapsed() < Duration::from_secs(6));

        // Not stuck in flight: the next call goes to the network again.
        let _ = cache.get().await;
        assert_eq!(remote.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_fetch_clears_in_flight() {
        let gate = Arc::new(Notify::new());
        let remote = remote(vec![], Some(gate));
        let cache = Arc::new(cache(&remote));

        let fetch = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get().await }
        });
        remote.wait_for_calls(1).await;
        fetch.abort();
        let _ = fetch.await;

        let _ = tokio::time::timeout(Duration::from_secs(1), cache.get()).await;
        assert_eq!(remote.calls(), 2);
    }
}
