//! Cache storage trait and SQLite implementation.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension};
use tracing::{debug, warn};

use super::codec::{Row, StoredRow};
use super::error::{CacheError, CacheOutcome};
use crate::db::schema::Table;
use crate::db::StoreHandle;

/// Row counts of one table at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
  pub table: &'static str,
  /// Rows with `expires_at > now`
  pub live: usize,
  /// Rows still present but past their expiry
  pub expired: usize,
}

/// Trait for cache storage backends.
///
/// Operates on encoded rows; typed access lives in the entity and
/// result-set caches. Timestamps are epoch milliseconds.
pub trait CacheStorage: Send + Sync {
  /// Fetch a row by key, whether or not it has expired.
  fn get(&self, table: &'static Table, key: &str) -> CacheOutcome<Option<StoredRow>>;

  /// All rows with `expires_at > now`, in key order.
  fn get_live(&self, table: &'static Table, now: i64) -> CacheOutcome<Vec<StoredRow>>;

  /// Every row still present, expired or not, in key order.
  fn get_all(&self, table: &'static Table) -> CacheOutcome<Vec<StoredRow>>;

  /// Insert or fully replace one row.
  fn put(&self, table: &'static Table, row: &Row, cached_at: i64, expires_at: i64) -> CacheOutcome<()>;

  /// Insert or replace many rows in one transaction.
  fn put_many(
    &self,
    table: &'static Table,
    rows: &[Row],
    cached_at: i64,
    expires_at: i64,
  ) -> CacheOutcome<()>;

  /// Delete a row. Returns whether it existed.
  fn delete(&self, table: &'static Table, key: &str) -> CacheOutcome<bool>;

  /// Delete a row only if it is still expired at `now`.
  fn delete_if_expired(&self, table: &'static Table, key: &str, now: i64) -> CacheOutcome<bool>;

  /// Delete a row only if it still carries the `cached_at` it was read with.
  fn delete_if_unchanged(&self, table: &'static Table, key: &str, cached_at: i64) -> CacheOutcome<bool>;

  /// Delete every row of the table.
  fn delete_all(&self, table: &'static Table) -> CacheOutcome<usize>;

  /// Delete every row with `expires_at <= now` in one transaction.
  fn sweep(&self, table: &'static Table, now: i64) -> CacheOutcome<usize>;

  fn stats(&self, table: &'static Table, now: i64) -> CacheOutcome<TableStats>;
}

/// Storage implementation that doesn't cache anything.
/// Used when the store is unavailable - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _table: &'static Table, _key: &str) -> CacheOutcome<Option<StoredRow>> {
    Ok(None) // Always miss
  }

  fn get_live(&self, _table: &'static Table, _now: i64) -> CacheOutcome<Vec<StoredRow>> {
    Ok(Vec::new())
  }

  fn get_all(&self, _table: &'static Table) -> CacheOutcome<Vec<StoredRow>> {
    Ok(Vec::new())
  }

  fn put(&self, _table: &'static Table, _row: &Row, _cached_at: i64, _expires_at: i64) -> CacheOutcome<()> {
    Ok(()) // Discard
  }

  fn put_many(
    &self,
    _table: &'static Table,
    _rows: &[Row],
    _cached_at: i64,
    _expires_at: i64,
  ) -> CacheOutcome<()> {
    Ok(()) // Discard
  }

  fn delete(&self, _table: &'static Table, _key: &str) -> CacheOutcome<bool> {
    Ok(false)
  }

  fn delete_if_expired(&self, _table: &'static Table, _key: &str, _now: i64) -> CacheOutcome<bool> {
    Ok(false)
  }

  fn delete_if_unchanged(&self, _table: &'static Table, _key: &str, _cached_at: i64) -> CacheOutcome<bool> {
    Ok(false)
  }

  fn delete_all(&self, _table: &'static Table) -> CacheOutcome<usize> {
    Ok(0)
  }

  fn sweep(&self, _table: &'static Table, _now: i64) -> CacheOutcome<usize> {
    Ok(0)
  }

  fn stats(&self, table: &'static Table, _now: i64) -> CacheOutcome<TableStats> {
    Ok(TableStats {
      table: table.name,
      live: 0,
      expired: 0,
    })
  }
}

/// Fetch a row that is still visible at `now`.
///
/// An expired row is reported as absent and deleted on the spot, unless a
/// concurrent write has refreshed it in the meantime.
pub(crate) fn read_fresh(
  storage: &dyn CacheStorage,
  table: &'static Table,
  key: &str,
  now: i64,
) -> CacheOutcome<Option<StoredRow>> {
  let Some(stored) = storage.get(table, key)? else {
    debug!(table = table.name, key, "Cache miss");
    return Ok(None);
  };

  if stored.is_expired(now) {
    debug!(table = table.name, key, "Cache entry expired");
    if let Err(e) = storage.delete_if_expired(table, key, now) {
      warn!(table = table.name, key, error = %e, "Failed to delete expired entry");
    }
    return Ok(None);
  }

  Ok(Some(stored))
}

fn select_sql(table: &Table) -> String {
  format!(
    "SELECT key, {}, cached_at, expires_at FROM {}",
    table.columns.join(", "),
    table.name
  )
}

fn upsert_sql(table: &Table) -> String {
  let placeholders: Vec<String> = (1..=table.columns.len() + 3).map(|i| format!("?{}", i)).collect();
  format!(
    "INSERT OR REPLACE INTO {} (key, {}, cached_at, expires_at) VALUES ({})",
    table.name,
    table.columns.join(", "),
    placeholders.join(", ")
  )
}

/// Key, payload columns and timestamps in statement order.
fn bind(row: &Row, cached_at: i64, expires_at: i64) -> Vec<Value> {
  let mut values = Vec::with_capacity(row.values.len() + 3);
  values.push(Value::Text(row.key.clone()));
  values.extend(row.values.iter().cloned());
  values.push(Value::Integer(cached_at));
  values.push(Value::Integer(expires_at));
  values
}

fn read_stored(table: &Table, sql_row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredRow> {
  let width = table.columns.len();
  let key: String = sql_row.get(0)?;
  let mut values = Vec::with_capacity(width);
  for i in 1..=width {
    values.push(sql_row.get::<_, Value>(i)?);
  }
  Ok(StoredRow {
    row: Row { key, values },
    cached_at: sql_row.get(width + 1)?,
    expires_at: sql_row.get(width + 2)?,
  })
}

impl StoreHandle {
  fn select_rows(
    &self,
    table: &'static Table,
    sql: &str,
    args: impl rusqlite::Params,
  ) -> CacheOutcome<Vec<StoredRow>> {
    let conn = self.lock(table.name)?;
    let mut stmt = conn
      .prepare_cached(sql)
      .map_err(|e| CacheError::read(table.name, e))?;
    let rows = stmt
      .query_map(args, |row| read_stored(table, row))
      .map_err(|e| CacheError::read(table.name, e))?
      .collect::<rusqlite::Result<Vec<_>>>()
      .map_err(|e| CacheError::read(table.name, e))?;
    Ok(rows)
  }
}

impl CacheStorage for StoreHandle {
  fn get(&self, table: &'static Table, key: &str) -> CacheOutcome<Option<StoredRow>> {
    let conn = self.lock(table.name)?;
    let sql = format!("{} WHERE key = ?1", select_sql(table));

    let mut stmt = conn
      .prepare_cached(&sql)
      .map_err(|e| CacheError::read(table.name, e))?;
    stmt
      .query_row(params![key], |row| read_stored(table, row))
      .optional()
      .map_err(|e| CacheError::read(table.name, e))
  }

  fn get_live(&self, table: &'static Table, now: i64) -> CacheOutcome<Vec<StoredRow>> {
    let sql = format!("{} WHERE expires_at > ?1 ORDER BY key", select_sql(table));
    self.select_rows(table, &sql, params![now])
  }

  fn get_all(&self, table: &'static Table) -> CacheOutcome<Vec<StoredRow>> {
    let sql = format!("{} ORDER BY key", select_sql(table));
    self.select_rows(table, &sql, params![])
  }

  fn put(&self, table: &'static Table, row: &Row, cached_at: i64, expires_at: i64) -> CacheOutcome<()> {
    let conn = self.lock(table.name)?;
    conn
      .prepare_cached(&upsert_sql(table))
      .and_then(|mut stmt| stmt.execute(params_from_iter(bind(row, cached_at, expires_at))))
      .map_err(|e| CacheError::write(table.name, e))?;
    Ok(())
  }

  fn put_many(
    &self,
    table: &'static Table,
    rows: &[Row],
    cached_at: i64,
    expires_at: i64,
  ) -> CacheOutcome<()> {
    let mut conn = self.lock(table.name)?;
    let tx = conn
      .transaction()
      .map_err(|e| CacheError::write(table.name, e))?;

    {
      let mut stmt = tx
        .prepare_cached(&upsert_sql(table))
        .map_err(|e| CacheError::write(table.name, e))?;
      for row in rows {
        // An error here drops `tx`, which rolls the whole batch back
        stmt
          .execute(params_from_iter(bind(row, cached_at, expires_at)))
          .map_err(|e| CacheError::write(table.name, e))?;
      }
    }

    tx.commit().map_err(|e| CacheError::write(table.name, e))
  }

  fn delete(&self, table: &'static Table, key: &str) -> CacheOutcome<bool> {
    let conn = self.lock(table.name)?;
    let deleted = conn
      .execute(&format!("DELETE FROM {} WHERE key = ?1", table.name), params![key])
      .map_err(|e| CacheError::write(table.name, e))?;
    Ok(deleted > 0)
  }

  fn delete_if_expired(&self, table: &'static Table, key: &str, now: i64) -> CacheOutcome<bool> {
    let conn = self.lock(table.name)?;
    let deleted = conn
      .execute(
        &format!("DELETE FROM {} WHERE key = ?1 AND expires_at <= ?2", table.name),
        params![key, now],
      )
      .map_err(|e| CacheError::write(table.name, e))?;
    Ok(deleted > 0)
  }

  fn delete_if_unchanged(&self, table: &'static Table, key: &str, cached_at: i64) -> CacheOutcome<bool> {
    let conn = self.lock(table.name)?;
    let deleted = conn
      .execute(
        &format!("DELETE FROM {} WHERE key = ?1 AND cached_at = ?2", table.name),
        params![key, cached_at],
      )
      .map_err(|e| CacheError::write(table.name, e))?;
    Ok(deleted > 0)
  }

  fn delete_all(&self, table: &'static Table) -> CacheOutcome<usize> {
    let conn = self.lock(table.name)?;
    conn
      .execute(&format!("DELETE FROM {}", table.name), [])
      .map_err(|e| CacheError::write(table.name, e))
  }

  fn sweep(&self, table: &'static Table, now: i64) -> CacheOutcome<usize> {
    let mut conn = self.lock(table.name)?;
    let tx = conn
      .transaction()
      .map_err(|e| CacheError::write(table.name, e))?;
    let removed = tx
      .execute(
        &format!("DELETE FROM {} WHERE expires_at <= ?1", table.name),
        params![now],
      )
      .map_err(|e| CacheError::write(table.name, e))?;
    tx.commit().map_err(|e| CacheError::write(table.name, e))?;
    Ok(removed)
  }

  fn stats(&self, table: &'static Table, now: i64) -> CacheOutcome<TableStats> {
    let conn = self.lock(table.name)?;
    let (total, expired): (i64, i64) = conn
      .query_row(
        &format!(
          "SELECT COUNT(*), COALESCE(SUM(CASE WHEN expires_at <= ?1 THEN 1 ELSE 0 END), 0) FROM {}",
          table.name
        ),
        params![now],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .map_err(|e| CacheError::read(table.name, e))?;

    Ok(TableStats {
      table: table.name,
      live: (total - expired) as usize,
      expired: expired as usize,
    })
  }
}
