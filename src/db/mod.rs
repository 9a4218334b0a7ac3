pub mod schema;

use rusqlite::Connection;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info};

use crate::cache::CacheError;
use schema::{ALL_TABLES, SCHEMA, SCHEMA_VERSION};

/// Where the cache database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
  /// One database file per installation.
  File(PathBuf),
  /// Private in-memory database, gone when the last handle is dropped.
  Memory,
}

impl fmt::Display for StoreLocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StoreLocation::File(path) => write!(f, "{}", path.display()),
      StoreLocation::Memory => write!(f, ":memory:"),
    }
  }
}

/// Shared handle to the open cache database.
///
/// Cloning is cheap; all clones talk to the same connection, and every
/// mutation is serialized through it.
#[derive(Clone)]
pub struct StoreHandle {
  conn: Arc<Mutex<Connection>>,
  location: Arc<StoreLocation>,
}

impl fmt::Debug for StoreHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("StoreHandle")
      .field("location", &self.location.to_string())
      .finish()
  }
}

impl StoreHandle {
  fn open(location: &StoreLocation) -> Result<Self, CacheError> {
    let unavailable = |reason: String| CacheError::StoreUnavailable {
      path: location.to_string(),
      reason,
    };

    let conn = match location {
      StoreLocation::File(path) => {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
          std::fs::create_dir_all(parent)
            .map_err(|e| unavailable(format!("Failed to create cache directory: {}", e)))?;
        }

        let conn = Connection::open(path).map_err(|e| unavailable(e.to_string()))?;
        conn
          .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
          .map_err(|e| unavailable(e.to_string()))?;
        conn
          .pragma_update(None, "synchronous", "NORMAL")
          .map_err(|e| unavailable(e.to_string()))?;
        conn
      }
      StoreLocation::Memory => Connection::open_in_memory().map_err(|e| unavailable(e.to_string()))?,
    };

    run_migrations(&conn).map_err(|e| unavailable(format!("Failed to run cache migrations: {}", e)))?;

    Ok(Self {
      conn: Arc::new(Mutex::new(conn)),
      location: Arc::new(location.clone()),
    })
  }

  /// Lock the connection for one operation on `table`.
  pub(crate) fn lock(&self, table: &'static str) -> Result<MutexGuard<'_, Connection>, CacheError> {
    self
      .conn
      .lock()
      .map_err(|e| CacheError::read(table, format!("Lock poisoned: {}", e)))
  }

  pub fn location(&self) -> &StoreLocation {
    &self.location
  }

  /// Whether two handles refer to the same open store.
  pub fn same_store(&self, other: &StoreHandle) -> bool {
    Arc::ptr_eq(&self.conn, &other.conn)
  }
}

/// Create the cache tables, wiping them first if they were written by a
/// different schema version.
fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
  let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

  if version != 0 && version != SCHEMA_VERSION {
    info!(from = version, to = SCHEMA_VERSION, "Cache schema changed, dropping cached data");
    for table in ALL_TABLES {
      conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", table.name))?;
    }
  }

  conn.execute_batch(SCHEMA)?;
  conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
  Ok(())
}

enum InitState {
  Pending,
  Ready(StoreHandle),
  Unavailable(String),
}

/// Opens the cache database exactly once per process.
///
/// The first [`open`](Self::open) creates the tables and indexes; later
/// calls hand back a clone of the same [`StoreHandle`]. If the first attempt
/// fails, the failure is logged once and remembered: the store is not
/// retried for the rest of the session and the caller should run
/// network-only.
pub struct StoreInitializer {
  location: StoreLocation,
  state: Mutex<InitState>,
}

impl StoreInitializer {
  pub fn new(location: StoreLocation) -> Self {
    Self {
      location,
      state: Mutex::new(InitState::Pending),
    }
  }

  pub fn location(&self) -> &StoreLocation {
    &self.location
  }

  pub fn open(&self) -> Result<StoreHandle, CacheError> {
    let mut state = self.state.lock().map_err(|e| CacheError::StoreUnavailable {
      path: self.location.to_string(),
      reason: format!("Lock poisoned: {}", e),
    })?;

    match &*state {
      InitState::Ready(handle) => Ok(handle.clone()),
      InitState::Unavailable(reason) => Err(CacheError::StoreUnavailable {
        path: self.location.to_string(),
        reason: reason.clone(),
      }),
      InitState::Pending => match StoreHandle::open(&self.location) {
        Ok(handle) => {
          debug!(location = %self.location, "Cache store opened");
          *state = InitState::Ready(handle.clone());
          Ok(handle)
        }
        Err(err) => {
          error!(error = %err, "Cache store unavailable, continuing network-only");
          let reason = match &err {
            CacheError::StoreUnavailable { reason, .. } => reason.clone(),
            other => other.to_string(),
          };
          *state = InitState::Unavailable(reason);
          Err(err)
        }
      },
    }
  }
}
