//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};

use super::codec::Row;
use super::error::CacheError;
use crate::db::schema::Table;

/// Trait for entities that can be cached in their own table.
///
/// `encode` and `decode` form the record codec: any row produced by
/// `encode` must decode back to an equal value.
pub trait Record: Clone + Send + Sync + Sized {
  /// Remote identity of this entity (e.g., flight id, user id)
  fn cache_key(&self) -> String;

  /// Table the entity is stored in
  fn table() -> &'static Table;

  fn encode(&self) -> Result<Row, CacheError>;

  fn decode(row: &Row) -> Result<Self, CacheError>;
}

/// Identity of a parameterized query whose results are cached as one row.
pub trait QueryKey {
  /// Stable, fixed-length key for storage
  fn cache_hash(&self) -> String;

  /// Human readable form, kept next to the row for diagnostics
  fn description(&self) -> String;
}

/// A single cached value together with its timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntity<T> {
  pub entity: T,
  pub cached_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from fresh cached data.
  ///
  /// `cached_at` is `None` for lists assembled from several rows.
  pub fn from_cache(data: T, cached_at: Option<DateTime<Utc>>) -> Self {
    Self {
      data,
      source: CacheSource::CacheFresh,
      cached_at,
    }
  }

  /// Create a new cache result for offline mode.
  pub fn offline(data: T, cached_at: Option<DateTime<Utc>>) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
      cached_at,
    }
  }

  pub fn is_offline(&self) -> bool {
    self.source == CacheSource::Offline
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still within its TTL
  CacheFresh,
  /// Network unavailable, serving the last row we have, possibly past its TTL
  Offline,
}
