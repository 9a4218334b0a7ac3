//! One cache per travel entity kind, sharing a store and a clock.

use chrono::Duration;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{
  sweep_expired, CacheError, CacheOutcome, CacheStorage, Clock, EntityCache, NoopStorage,
  SweepReport, Sweeper, TableStats,
};
use crate::db::schema::ALL_TABLES;
use crate::db::StoreInitializer;

use super::search::SearchResultCache;
use super::types::{Airport, Booking, Flight, Notification, User};

/// Default freshness window for every kind.
pub const DEFAULT_TTL: Duration = Duration::minutes(5);

/// Time-to-live per entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
  pub flights: Duration,
  pub bookings: Duration,
  pub users: Duration,
  pub airports: Duration,
  pub notifications: Duration,
  pub search_results: Duration,
}

impl CacheTtls {
  pub fn uniform(ttl: Duration) -> Self {
    Self {
      flights: ttl,
      bookings: ttl,
      users: ttl,
      airports: ttl,
      notifications: ttl,
      search_results: ttl,
    }
  }
}

impl Default for CacheTtls {
  fn default() -> Self {
    Self::uniform(DEFAULT_TTL)
  }
}

/// Cached travel data for one installation.
///
/// This is the surface screens use: each field is a ready cache for one
/// kind, and the cache-then-network helpers in [`crate::cache::layer`]
/// take them directly.
#[derive(Clone)]
pub struct TravelCache {
  storage: Arc<dyn CacheStorage>,
  clock: Arc<dyn Clock>,
  network_only: bool,
  pub flights: EntityCache<Flight>,
  pub bookings: EntityCache<Booking>,
  pub users: EntityCache<User>,
  pub airports: EntityCache<Airport>,
  pub notifications: EntityCache<Notification>,
  pub searches: SearchResultCache,
}

impl TravelCache {
  pub fn new(storage: Arc<dyn CacheStorage>, clock: Arc<dyn Clock>, ttls: &CacheTtls) -> Self {
    Self::build(storage, clock, ttls, false)
  }

  /// Open the store behind `init`, or fall back to network-only mode.
  ///
  /// In network-only mode every read misses and every write is dropped, so
  /// callers keep working against the network alone.
  pub fn open(init: &StoreInitializer, clock: Arc<dyn Clock>, ttls: &CacheTtls) -> Self {
    match init.open() {
      Ok(store) => Self::build(Arc::new(store), clock, ttls, false),
      Err(e) => {
        warn!(error = %e, "Running without offline cache");
        Self::build(Arc::new(NoopStorage), clock, ttls, true)
      }
    }
  }

  fn build(storage: Arc<dyn CacheStorage>, clock: Arc<dyn Clock>, ttls: &CacheTtls, network_only: bool) -> Self {
    let s = || Arc::clone(&storage);
    let c = || Arc::clone(&clock);
    Self {
      flights: EntityCache::new(s(), c(), ttls.flights),
      bookings: EntityCache::new(s(), c(), ttls.bookings),
      users: EntityCache::new(s(), c(), ttls.users),
      airports: EntityCache::new(s(), c(), ttls.airports),
      notifications: EntityCache::new(s(), c(), ttls.notifications),
      searches: SearchResultCache::new(s(), c(), ttls.search_results),
      storage: Arc::clone(&storage),
      clock: Arc::clone(&clock),
      network_only,
    }
  }

  pub fn is_network_only(&self) -> bool {
    self.network_only
  }

  /// Fresh bookings belonging to `user_id`.
  pub fn bookings_for_user(&self, user_id: &str) -> CacheOutcome<Vec<Booking>> {
    let mut bookings = self.bookings.get_many()?;
    bookings.retain(|b| b.user_id == user_id);
    Ok(bookings)
  }

  /// Fresh notifications for `user_id`, newest first.
  pub fn notifications_for_user(&self, user_id: &str) -> CacheOutcome<Vec<Notification>> {
    let mut notifications = self.notifications.get_many()?;
    notifications.retain(|n| n.user_id == user_id);
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(notifications)
  }

  /// Wipe every cached row, e.g. on logout.
  ///
  /// Every table is attempted; the first failure is returned.
  pub fn clear_all(&self) -> CacheOutcome<usize> {
    let mut removed = 0;
    let mut first_err: Option<CacheError> = None;

    for table in ALL_TABLES {
      match self.storage.delete_all(table) {
        Ok(n) => removed += n,
        Err(e) => {
          warn!(table = table.name, error = %e, "Failed to clear cache table");
          first_err.get_or_insert(e);
        }
      }
    }

    match first_err {
      Some(e) => Err(e),
      None => {
        info!(removed, "Cleared offline cache");
        Ok(removed)
      }
    }
  }

  /// Run one sweep now.
  pub fn sweep_expired(&self) -> SweepReport {
    sweep_expired(self.storage.as_ref(), self.clock.now_millis())
  }

  /// A periodic sweeper over this cache's store.
  pub fn sweeper(&self, interval: std::time::Duration) -> Sweeper {
    Sweeper::new(Arc::clone(&self.storage), Arc::clone(&self.clock), interval)
  }

  /// Live and expired row counts for every table.
  pub fn stats(&self) -> CacheOutcome<Vec<TableStats>> {
    let now = self.clock.now_millis();
    ALL_TABLES
      .iter()
      .map(|table| self.storage.stats(table, now))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::clock::ManualClock;
  use crate::db::{StoreHandle, StoreLocation};
  use crate::travel::fixtures::{airport, booking, flight, notification, user};
  use crate::travel::SearchParams;

  fn setup() -> (TravelCache, Arc<ManualClock>) {
    let init = StoreInitializer::new(StoreLocation::Memory);
    let clock = Arc::new(ManualClock::new(1_000_000));
    let cache = TravelCache::open(&init, clock.clone(), &CacheTtls::default());
    (cache, clock)
  }

  fn fill(cache: &TravelCache) {
    cache.flights.put(&flight("VN123")).unwrap();
    cache.bookings.put(&booking("B1", "u1")).unwrap();
    cache.users.put(&user("u1")).unwrap();
    cache.airports.put(&airport("1", "HAN", "Noi Bai")).unwrap();
    cache.notifications.put(&notification("n1", "u1", 0)).unwrap();
    cache
      .searches
      .put(&SearchParams::new().origin("HAN").destination("SGN"), &[flight("VN123")])
      .unwrap();
  }

  #[test]
  fn test_clear_all_wipes_every_kind() {
    let (cache, _clock) = setup();
    fill(&cache);

    assert_eq!(cache.clear_all().unwrap(), 6);
    for stats in cache.stats().unwrap() {
      assert_eq!(stats.live + stats.expired, 0, "{} not empty", stats.table);
    }
  }

  #[test]
  fn test_per_kind_ttl() {
    let init = StoreInitializer::new(StoreLocation::Memory);
    let clock = Arc::new(ManualClock::new(0));
    let ttls = CacheTtls {
      airports: Duration::hours(24),
      ..CacheTtls::default()
    };
    let cache = TravelCache::open(&init, clock.clone(), &ttls);
    cache.flights.put(&flight("VN123")).unwrap();
    cache.airports.put(&airport("1", "HAN", "Noi Bai")).unwrap();

    clock.advance(Duration::hours(1).num_milliseconds());
    assert!(cache.flights.get("VN123").unwrap().is_none());
    assert!(cache.airports.get("1").unwrap().is_some());
  }

  #[test]
  fn test_user_scoped_views() {
    let (cache, _clock) = setup();
    cache
      .bookings
      .put_many(&[booking("B1", "u1"), booking("B2", "u2"), booking("B3", "u1")])
      .unwrap();
    cache
      .notifications
      .put_many(&[
        notification("n1", "u1", 5),
        notification("n2", "u1", 30),
        notification("n3", "u2", 60),
      ])
      .unwrap();

    let ids: Vec<String> = cache.bookings_for_user("u1").unwrap().into_iter().map(|b| b.id).collect();
    assert_eq!(ids, vec!["B1", "B3"]);

    let ids: Vec<String> = cache
      .notifications_for_user("u1")
      .unwrap()
      .into_iter()
      .map(|n| n.id)
      .collect();
    assert_eq!(ids, vec!["n2", "n1"]);
  }

  #[test]
  fn test_sweep_and_stats() {
    let (cache, clock) = setup();
    fill(&cache);
    clock.advance(DEFAULT_TTL.num_milliseconds());

    let expired: usize = cache.stats().unwrap().iter().map(|s| s.expired).sum();
    assert_eq!(expired, 6);
    assert_eq!(cache.sweep_expired().removed(), 6);
    let expired: usize = cache.stats().unwrap().iter().map(|s| s.expired).sum();
    assert_eq!(expired, 0);
  }

  #[test]
  fn test_unavailable_store_runs_network_only() {
    let blocker = tempfile::NamedTempFile::new().unwrap();
    let init = StoreInitializer::new(StoreLocation::File(blocker.path().join("cache.db")));
    let cache = TravelCache::open(&init, Arc::new(ManualClock::new(0)), &CacheTtls::default());

    assert!(cache.is_network_only());
    cache.flights.put(&flight("VN123")).unwrap();
    assert!(cache.flights.get("VN123").unwrap().is_none());
    assert_eq!(cache.sweep_expired().removed(), 0);
  }

  #[test]
  fn test_shares_one_store() {
    let init = StoreInitializer::new(StoreLocation::Memory);
    let store: StoreHandle = init.open().unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let a = TravelCache::open(&init, clock.clone(), &CacheTtls::default());
    let b = TravelCache::new(Arc::new(store), clock, &CacheTtls::default());

    a.users.put(&user("u1")).unwrap();
    assert_eq!(b.users.get("u1").unwrap(), Some(user("u1")));
  }
}
