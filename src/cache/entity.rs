//! Keyed, TTL-scoped cache for one entity kind.

use chrono::Duration;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;

use super::clock::{to_datetime, Clock};
use super::codec::StoredRow;
use super::error::{CacheError, CacheOutcome};
use super::storage::{read_fresh, CacheStorage};
use super::traits::{CachedEntity, Record};
use crate::db::schema::Table;

/// Get/put interface over one entity table.
///
/// Rows are visible only while `now < expires_at`. Expiry is checked on
/// every read; an expired row found by [`get`](Self::get) is deleted on the
/// spot. Rows that no longer decode are dropped and reported as misses.
pub struct EntityCache<T> {
  storage: Arc<dyn CacheStorage>,
  clock: Arc<dyn Clock>,
  ttl: Duration,
  _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for EntityCache<T> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      clock: Arc::clone(&self.clock),
      ttl: self.ttl,
      _entity: PhantomData,
    }
  }
}

impl<T: Record> EntityCache<T> {
  pub fn new(storage: Arc<dyn CacheStorage>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
    Self {
      storage,
      clock,
      ttl,
      _entity: PhantomData,
    }
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  /// Look up a fresh entity by id.
  pub fn get(&self, id: &str) -> CacheOutcome<Option<T>> {
    Ok(self.get_entry(id)?.map(|cached| cached.entity))
  }

  /// Like [`get`](Self::get), but keeps the row's timestamps.
  pub fn get_entry(&self, id: &str) -> CacheOutcome<Option<CachedEntity<T>>> {
    let stored = read_fresh(self.storage.as_ref(), T::table(), id, self.clock.now_millis())?;
    Ok(stored.and_then(|stored| self.decode_or_drop(stored)))
  }

  /// The row for `id` regardless of expiry, for offline fallback.
  ///
  /// The TTL is not extended and the timestamps are returned as stored.
  pub fn last_known(&self, id: &str) -> CacheOutcome<Option<CachedEntity<T>>> {
    let stored = self.storage.get(T::table(), id)?;
    Ok(stored.and_then(|stored| self.decode_or_drop(stored)))
  }

  /// Every fresh entity of this kind.
  pub fn get_many(&self) -> CacheOutcome<Vec<T>> {
    let rows = self
      .storage
      .get_live(T::table(), self.clock.now_millis())?;
    Ok(
      rows
        .into_iter()
        .filter_map(|stored| self.decode_or_drop(stored))
        .map(|cached| cached.entity)
        .collect(),
    )
  }

  /// Every entity of this kind still stored, expired or not, for offline
  /// fallback on list screens. TTLs are not extended.
  pub fn last_known_all(&self) -> CacheOutcome<Vec<CachedEntity<T>>> {
    let rows = self.storage.get_all(T::table())?;
    Ok(rows.into_iter().filter_map(|stored| self.decode_or_drop(stored)).collect())
  }

  /// Insert or fully replace an entity, restarting its TTL.
  pub fn put(&self, value: &T) -> CacheOutcome<()> {
    let row = value.encode()?;
    let (cached_at, expires_at) = self.window()?;
    self.storage.put(T::table(), &row, cached_at, expires_at)
  }

  /// Put every value in one transaction. Either all rows land or none do.
  pub fn put_many(&self, values: &[T]) -> CacheOutcome<()> {
    if values.is_empty() {
      return Ok(());
    }

    let rows = values
      .iter()
      .map(T::encode)
      .collect::<CacheOutcome<Vec<_>>>()?;
    let (cached_at, expires_at) = self.window()?;
    self
      .storage
      .put_many(T::table(), &rows, cached_at, expires_at)
  }

  /// Drop one entity. Returns whether it was cached.
  pub fn clear(&self, id: &str) -> CacheOutcome<bool> {
    self.storage.delete(T::table(), id)
  }

  /// Drop every entity of this kind.
  pub fn clear_all(&self) -> CacheOutcome<usize> {
    self.storage.delete_all(T::table())
  }

  fn window(&self) -> CacheOutcome<(i64, i64)> {
    expiry_window(T::table(), self.clock.now_millis(), self.ttl)
  }

  fn decode_or_drop(&self, stored: StoredRow) -> Option<CachedEntity<T>> {
    let table = T::table();
    match T::decode(&stored.row) {
      Ok(entity) => Some(CachedEntity {
        entity,
        cached_at: to_datetime(stored.cached_at),
        expires_at: to_datetime(stored.expires_at),
      }),
      Err(e) => {
        warn!(table = table.name, key = %stored.row.key, error = %e, "Dropping undecodable cache row");
        // A put that landed since the read is left alone
        if let Err(e) = self
          .storage
          .delete_if_unchanged(table, &stored.row.key, stored.cached_at)
        {
          warn!(table = table.name, error = %e, "Failed to drop undecodable row");
        }
        None
      }
    }
  }
}

/// `(cached_at, expires_at)` for a row written at `now`.
pub(crate) fn expiry_window(table: &'static Table, now: i64, ttl: Duration) -> CacheOutcome<(i64, i64)> {
  now
    .checked_add(ttl.num_milliseconds())
    .map(|expires_at| (now, expires_at))
    .ok_or_else(|| CacheError::write(table.name, format!("TTL of {} overflows expiry", ttl)))
}
