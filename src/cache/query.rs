//! Cache for the ordered output of a parameterized query.

use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;

use super::clock::{to_datetime, Clock};
use super::codec::{Row, RowReader, RowWriter, StoredRow};
use super::entity::expiry_window;
use super::error::{CacheError, CacheOutcome};
use super::storage::{read_fresh, CacheStorage};
use super::traits::{CachedEntity, QueryKey};
use crate::db::schema::{Table, SEARCH_RESULTS};

/// Stores one result list per query key, verbatim and in order.
///
/// A result list is replaced as a whole: there is no merging of a fresh
/// response into a stale list.
pub struct QueryCache<T> {
  storage: Arc<dyn CacheStorage>,
  clock: Arc<dyn Clock>,
  ttl: Duration,
  _item: PhantomData<fn() -> T>,
}

impl<T> Clone for QueryCache<T> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      clock: Arc::clone(&self.clock),
      ttl: self.ttl,
      _item: PhantomData,
    }
  }
}

impl<T> QueryCache<T>
where
  T: Serialize + DeserializeOwned,
{
  pub fn new(storage: Arc<dyn CacheStorage>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
    Self {
      storage,
      clock,
      ttl,
      _item: PhantomData,
    }
  }

  fn table() -> &'static Table {
    &SEARCH_RESULTS
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  /// The cached results for `key`, if present and fresh.
  pub fn get(&self, key: &impl QueryKey) -> CacheOutcome<Option<Vec<T>>> {
    Ok(self.get_entry(key)?.map(|cached| cached.entity))
  }

  pub fn get_entry(&self, key: &impl QueryKey) -> CacheOutcome<Option<CachedEntity<Vec<T>>>> {
    let hash = key.cache_hash();
    let stored = read_fresh(self.storage.as_ref(), Self::table(), &hash, self.clock.now_millis())?;
    Ok(stored.and_then(|stored| self.decode_or_drop(stored)))
  }

  /// The results for `key` regardless of expiry, for offline fallback.
  pub fn last_known(&self, key: &impl QueryKey) -> CacheOutcome<Option<CachedEntity<Vec<T>>>> {
    let stored = self.storage.get(Self::table(), &key.cache_hash())?;
    Ok(stored.and_then(|stored| self.decode_or_drop(stored)))
  }

  /// Replace the results for `key`, restarting the TTL.
  pub fn put(&self, key: &impl QueryKey, items: &[T]) -> CacheOutcome<()> {
    let table = Self::table();
    let row = RowWriter::new(table, key.cache_hash())
      .text(&key.description())
      .json(items)?
      .integer(items.len() as i64)
      .finish();

    let (cached_at, expires_at) = expiry_window(table, self.clock.now_millis(), self.ttl)?;
    self.storage.put(table, &row, cached_at, expires_at)
  }

  pub fn clear(&self, key: &impl QueryKey) -> CacheOutcome<bool> {
    self.storage.delete(Self::table(), &key.cache_hash())
  }

  pub fn clear_all(&self) -> CacheOutcome<usize> {
    self.storage.delete_all(Self::table())
  }

  fn decode(row: &Row) -> CacheOutcome<Vec<T>> {
    let table = Self::table();
    let mut r = RowReader::new(table, row)?;
    let _description = r.text()?;
    let items: Vec<T> = r.json()?;
    let count = r.integer()?;

    if items.len() as i64 != count {
      return Err(CacheError::decode(
        table.name,
        &row.key,
        format!("expected {} results, found {}", count, items.len()),
      ));
    }
    Ok(items)
  }

  fn decode_or_drop(&self, stored: StoredRow) -> Option<CachedEntity<Vec<T>>> {
    let table = Self::table();
    match Self::decode(&stored.row) {
      Ok(items) => Some(CachedEntity {
        entity: items,
        cached_at: to_datetime(stored.cached_at),
        expires_at: to_datetime(stored.expires_at),
      }),
      Err(e) => {
        warn!(table = table.name, error = %e, "Dropping undecodable query result");
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
