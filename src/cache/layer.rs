//! Cache-then-network helpers that pair the caches with a remote fetch.
//!
//! Cache errors never surface here: they are logged and the call proceeds
//! as if the cache were empty (reads) or the write never happened. Only the
//! fetcher's own error is returned, and only when no cached copy exists.

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use tracing::{debug, warn};

use super::entity::EntityCache;
use super::error::CacheOutcome;
use super::query::QueryCache;
use super::traits::{CacheResult, CachedEntity, QueryKey, Record};

/// Keep the value of a cache operation, or log and drop its error.
pub fn discard<T>(operation: &'static str, outcome: CacheOutcome<T>) -> Option<T> {
  match outcome {
    Ok(value) => Some(value),
    Err(e) => {
      warn!(operation, error = %e, "Ignoring cache error");
      None
    }
  }
}

/// Run `fetcher`, write the response through, and fall back to the last
/// stored copy if the network fails.
async fn refresh_with<T, F, Fut, E, W, L>(fetcher: F, write: W, last_known: L) -> Result<CacheResult<T>, E>
where
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<T, E>>,
  W: FnOnce(&T) -> CacheOutcome<()>,
  L: FnOnce() -> CacheOutcome<Option<CachedEntity<T>>>,
{
  match fetcher().await {
    Ok(data) => {
      discard("write-through", write(&data));
      Ok(CacheResult::from_network(data))
    }
    Err(err) => match discard("offline fallback", last_known()).flatten() {
      Some(cached) => {
        // Served as-is: the TTL is not extended
        debug!(cached_at = %cached.cached_at, "Network failed, serving last cached copy");
        Ok(CacheResult::offline(cached.entity, Some(cached.cached_at)))
      }
      None => Err(err),
    },
  }
}

/// Fetch one entity with a cache-first strategy.
///
/// 1. Check cache - if fresh, return immediately
/// 2. If expired/missing, fetch from network and write through
/// 3. On network failure, return the last stored row (offline mode)
pub async fn fetch_entity<T, F, Fut, E>(
  cache: &EntityCache<T>,
  id: &str,
  fetcher: F,
) -> Result<CacheResult<T>, E>
where
  T: Record,
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<T, E>>,
{
  if let Some(cached) = discard("get", cache.get_entry(id)).flatten() {
    return Ok(CacheResult::from_cache(cached.entity, Some(cached.cached_at)));
  }
  refresh_entity(cache, id, fetcher).await
}

/// Always go to the network, writing through on success.
///
/// This is the second half of "render cached, then refresh".
pub async fn refresh_entity<T, F, Fut, E>(
  cache: &EntityCache<T>,
  id: &str,
  fetcher: F,
) -> Result<CacheResult<T>, E>
where
  T: Record,
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<T, E>>,
{
  refresh_with(fetcher, |data| cache.put(data), || cache.last_known(id)).await
}

/// Fetch every entity of a kind (list screens).
///
/// Any fresh cached rows count as a hit and are returned without touching
/// the network, even if they were cached one at a time by
/// [`fetch_entity`] and so are only part of the remote list. Screens that
/// need the complete list follow up with [`refresh_list`].
pub async fn fetch_list<T, F, Fut, E>(cache: &EntityCache<T>, fetcher: F) -> Result<CacheResult<Vec<T>>, E>
where
  T: Record,
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<Vec<T>, E>>,
{
  let cached = discard("get_many", cache.get_many()).unwrap_or_default();
  if !cached.is_empty() {
    return Ok(CacheResult::from_cache(cached, None));
  }
  refresh_list(cache, fetcher).await
}

/// Always fetch the list from the network, writing through on success.
///
/// On network failure every row still stored is served, expired or not,
/// tagged offline.
pub async fn refresh_list<T, F, Fut, E>(cache: &EntityCache<T>, fetcher: F) -> Result<CacheResult<Vec<T>>, E>
where
  T: Record,
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<Vec<T>, E>>,
{
  match fetcher().await {
    Ok(data) => {
      discard("write-through", cache.put_many(&data));
      Ok(CacheResult::from_network(data))
    }
    Err(err) => {
      let stale = discard("offline fallback", cache.last_known_all()).unwrap_or_default();
      if stale.is_empty() {
        return Err(err);
      }
      // Oldest row decides how stale the list is
      let cached_at = stale.iter().map(|entry| entry.cached_at).min();
      debug!(rows = stale.len(), "Network failed, serving last cached list");
      let data = stale.into_iter().map(|entry| entry.entity).collect();
      Ok(CacheResult::offline(data, cached_at))
    }
  }
}

/// Fetch a query's results with a cache-first strategy.
pub async fn fetch_query<T, K, F, Fut, E>(
  cache: &QueryCache<T>,
  key: &K,
  fetcher: F,
) -> Result<CacheResult<Vec<T>>, E>
where
  T: Serialize + DeserializeOwned,
  K: QueryKey,
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<Vec<T>, E>>,
{
  if let Some(cached) = discard("get", cache.get_entry(key)).flatten() {
    return Ok(CacheResult::from_cache(cached.entity, Some(cached.cached_at)));
  }
  refresh_query(cache, key, fetcher).await
}

/// Always run the query remotely, replacing the cached list on success.
pub async fn refresh_query<T, K, F, Fut, E>(
  cache: &QueryCache<T>,
  key: &K,
  fetcher: F,
) -> Result<CacheResult<Vec<T>>, E>
where
  T: Serialize + DeserializeOwned,
  K: QueryKey,
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<Vec<T>, E>>,
{
  refresh_with(fetcher, |data| cache.put(key, data), || cache.last_known(key)).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::clock::{Clock, ManualClock};
  use crate::cache::CacheSource;
  use crate::db::{StoreInitializer, StoreLocation};
  use crate::travel::fixtures::{airport, priced_flight};
  use crate::travel::{Airport, SearchParams, SearchResultCache};
  use chrono::Duration;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;

  const TTL_MS: i64 = 60_000;

  fn airports() -> (EntityCache<Airport>, Arc<ManualClock>) {
    let store = StoreInitializer::new(StoreLocation::Memory).open().unwrap();
    let clock = Arc::new(ManualClock::new(1_000));
    let cache = EntityCache::new(Arc::new(store), clock.clone(), Duration::milliseconds(TTL_MS));
    (cache, clock)
  }

  #[tokio::test]
  async fn test_miss_fetches_and_writes_through() {
    let (cache, _clock) = airports();
    let result = fetch_entity(&cache, "1", || async {
      Ok::<_, String>(airport("1", "HAN", "Noi Bai"))
    })
    .await
    .unwrap();

    assert_eq!(result.source, CacheSource::Network);
    assert_eq!(cache.get("1").unwrap(), Some(airport("1", "HAN", "Noi Bai")));
  }

  #[tokio::test]
  async fn test_fresh_hit_skips_network() {
    let (cache, _clock) = airports();
    cache.put(&airport("1", "HAN", "Noi Bai")).unwrap();
    let counter = AtomicU32::new(0);
    let calls = &counter;

    let result = fetch_entity(&cache, "1", || async move {
      calls.fetch_add(1, Ordering::SeqCst);
      Ok::<_, String>(airport("1", "HAN", "changed"))
    })
    .await
    .unwrap();

    assert_eq!(result.source, CacheSource::CacheFresh);
    assert_eq!(result.data.name, "Noi Bai");
    assert_eq!(counter.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_network_failure_serves_expired_copy_without_extending_ttl() {
    let (cache, clock) = airports();
    let cached_at = clock.now_millis();
    cache.put(&airport("1", "HAN", "Noi Bai")).unwrap();
    clock.advance(TTL_MS * 2);

    let result = refresh_entity(&cache, "1", || async { Err::<Airport, _>("offline".to_string()) })
      .await
      .unwrap();

    assert!(result.is_offline());
    assert_eq!(result.cached_at.unwrap().timestamp_millis(), cached_at);
    let entry = cache.last_known("1").unwrap().unwrap();
    assert_eq!(entry.expires_at.timestamp_millis(), cached_at + TTL_MS);
    assert!(cache.get("1").unwrap().is_none());
  }

  #[tokio::test]
  async fn test_network_failure_without_cache_returns_error() {
    let (cache, _clock) = airports();
    let result = fetch_entity(&cache, "1", || async { Err::<Airport, _>("offline".to_string()) }).await;
    assert_eq!(result.unwrap_err(), "offline");
  }

  #[tokio::test]
  async fn test_refresh_overwrites_cached_value() {
    let (cache, _clock) = airports();
    cache.put(&airport("1", "HAN", "old")).unwrap();

    refresh_entity(&cache, "1", || async {
      Ok::<_, String>(airport("1", "HAN", "new"))
    })
    .await
    .unwrap();
    assert_eq!(cache.get("1").unwrap().unwrap().name, "new");
  }

  #[tokio::test]
  async fn test_list_fetch_and_offline_fallback() {
    let (cache, _clock) = airports();
    let listed = fetch_list(&cache, || async {
      Ok::<_, String>(vec![airport("1", "HAN", "Noi Bai"), airport("2", "SGN", "Tan Son Nhat")])
    })
    .await
    .unwrap();
    assert_eq!(listed.source, CacheSource::Network);

    let cached = fetch_list(&cache, || async { Err::<Vec<Airport>, _>("unused".to_string()) })
      .await
      .unwrap();
    assert_eq!(cached.source, CacheSource::CacheFresh);
    assert_eq!(cached.data.len(), 2);

    let offline = refresh_list(&cache, || async { Err::<Vec<Airport>, _>("offline".to_string()) })
      .await
      .unwrap();
    assert!(offline.is_offline());
    assert_eq!(offline.data.len(), 2);
  }

  #[tokio::test]
  async fn test_list_falls_back_to_expired_rows_when_offline() {
    let (cache, clock) = airports();
    let cached_at = clock.now_millis();
    cache
      .put_many(&[airport("1", "HAN", "Noi Bai"), airport("2", "SGN", "Tan Son Nhat")])
      .unwrap();
    clock.advance(TTL_MS * 2);

    let refreshed = refresh_list(&cache, || async { Err::<Vec<Airport>, _>("offline".to_string()) })
      .await
      .unwrap();
    assert!(refreshed.is_offline());
    assert_eq!(refreshed.data.len(), 2);
    assert_eq!(refreshed.cached_at.unwrap().timestamp_millis(), cached_at);

    let fetched = fetch_list(&cache, || async { Err::<Vec<Airport>, _>("offline".to_string()) })
      .await
      .unwrap();
    assert!(fetched.is_offline());
    assert_eq!(fetched.data.len(), 2);

    // Still expired: the fallback never extends a TTL
    assert!(cache.get_many().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_list_offline_without_rows_returns_error() {
    let (cache, _clock) = airports();
    let result = refresh_list(&cache, || async { Err::<Vec<Airport>, _>("offline".to_string()) }).await;
    assert_eq!(result.unwrap_err(), "offline");
  }

  #[tokio::test]
  async fn test_search_miss_on_different_passenger_count() {
    let store = StoreInitializer::new(StoreLocation::Memory).open().unwrap();
    let clock = Arc::new(ManualClock::new(1_000));
    let searches = SearchResultCache::new(Arc::new(store), clock, Duration::milliseconds(TTL_MS));
    let params = SearchParams::new()
      .origin("HAN")
      .destination("SGN")
      .date("2025-11-06")
      .cabin_class("Economy")
      .passengers(1);
    let results = vec![priced_flight("VN1", 1.0), priced_flight("VN2", 2.0)];

    let first = fetch_query(&searches, &params, || {
      let results = results.clone();
      async move { Ok::<_, String>(results) }
    })
    .await
    .unwrap();
    assert_eq!(first.source, CacheSource::Network);

    let again = fetch_query(&searches, &params, || async { Err::<Vec<_>, _>("unused".to_string()) })
      .await
      .unwrap();
    assert_eq!(again.source, CacheSource::CacheFresh);
    assert_eq!(again.data, results);

    let counter = AtomicU32::new(0);
    let calls = &counter;
    let two_pax = params.clone().passengers(2);
    fetch_query(&searches, &two_pax, || async move {
      calls.fetch_add(1, Ordering::SeqCst);
      Ok::<_, String>(vec![])
    })
    .await
    .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }
}
