use thiserror::Error;

/// Failures raised by the local cache.
///
/// None of these are user-visible. The cache is best-effort: callers log
/// the error and carry on as if the cache were empty (reads) or as if the
/// write never happened (writes).
#[derive(Error, Debug)]
pub enum CacheError {
  /// The local database could not be opened. The process runs network-only.
  #[error("Cache store unavailable at {path}: {reason}")]
  StoreUnavailable { path: String, reason: String },

  /// A stored row could not be parsed back into its entity shape.
  #[error("Failed to decode {table} row '{key}': {reason}")]
  DecodeFailure {
    table: &'static str,
    key: String,
    reason: String,
  },

  /// A put, batch put or delete could not be committed.
  #[error("Failed to write {table}: {reason}")]
  WriteFailure { table: &'static str, reason: String },

  /// A lookup query failed. Treated like a miss.
  #[error("Failed to read {table}: {reason}")]
  ReadFailure { table: &'static str, reason: String },
}

impl CacheError {
  pub(crate) fn write(table: &'static str, err: impl std::fmt::Display) -> Self {
    CacheError::WriteFailure {
      table,
      reason: err.to_string(),
    }
  }

  pub(crate) fn read(table: &'static str, err: impl std::fmt::Display) -> Self {
    CacheError::ReadFailure {
      table,
      reason: err.to_string(),
    }
  }

  pub(crate) fn decode(table: &'static str, key: &str, reason: impl std::fmt::Display) -> Self {
    CacheError::DecodeFailure {
      table,
      key: key.to_string(),
      reason: reason.to_string(),
    }
  }
}

pub type CacheOutcome<T> = std::result::Result<T, CacheError>;
