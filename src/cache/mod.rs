//! Generic caching layer for offline support.
//!
//! This module provides a domain-agnostic, TTL-scoped cache over SQLite:
//! - Caches entities by key, one table per entity kind
//! - Caches ordered query results under a canonical query key
//! - Treats rows past `expires_at` as absent on every read
//! - Sweeps expired rows in bulk, on demand or on a timer
//! - Provides basic offline mode (serve the last stored copy when the
//!   network is unavailable)

pub mod clock;
pub mod codec;
mod entity;
mod error;
pub mod layer;
mod query;
mod storage;
mod sweeper;
mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entity::EntityCache;
pub use error::{CacheError, CacheOutcome};
pub use query::QueryCache;
pub use storage::{CacheStorage, NoopStorage, TableStats};
pub use sweeper::{sweep_expired, SweepReport, Sweeper, SweeperHandle};
pub use traits::{CacheResult, CacheSource, CachedEntity, QueryKey, Record};
