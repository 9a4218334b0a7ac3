//! Bulk removal of expired rows.
//!
//! Sweeping only reclaims storage. Visibility never depends on it: every
//! read checks `expires_at` itself.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::storage::CacheStorage;
use crate::db::schema::ALL_TABLES;

/// Outcome of one full sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
  /// Rows removed per table, in table order
  pub by_table: Vec<(&'static str, usize)>,
  /// Tables whose sweep failed and was skipped
  pub failed: Vec<&'static str>,
}

impl SweepReport {
  pub fn removed(&self) -> usize {
    self.by_table.iter().map(|(_, n)| n).sum()
  }
}

/// Delete every expired row in every cache table, one transaction per table.
///
/// A table that fails to sweep is logged and skipped; the others still run.
pub fn sweep_expired(storage: &dyn CacheStorage, now: i64) -> SweepReport {
  let mut report = SweepReport::default();

  for table in ALL_TABLES {
    match storage.sweep(table, now) {
      Ok(removed) => report.by_table.push((table.name, removed)),
      Err(e) => {
        warn!(table = table.name, error = %e, "Sweep failed");
        report.failed.push(table.name);
      }
    }
  }

  debug!(removed = report.removed(), "Swept expired cache rows");
  report
}

/// Process-wide periodic sweep.
#[derive(Clone)]
pub struct Sweeper {
  storage: Arc<dyn CacheStorage>,
  clock: Arc<dyn Clock>,
  interval: Duration,
}

impl Sweeper {
  pub fn new(storage: Arc<dyn CacheStorage>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
    Self {
      storage,
      clock,
      interval,
    }
  }

  pub fn interval(&self) -> Duration {
    self.interval
  }

  /// Run one full sweep on the calling thread.
  pub fn sweep_now(&self) -> SweepReport {
    sweep_expired(self.storage.as_ref(), self.clock.now_millis())
  }

  /// Start sweeping on a timer: once immediately, then every `interval`.
  ///
  /// Must be called from within a Tokio runtime. The timer runs until
  /// [`SweeperHandle::stop`] is awaited or the handle is dropped.
  pub fn spawn(self) -> SweeperHandle {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
      let mut ticker = tokio::time::interval(self.interval);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      info!(interval_secs = self.interval.as_secs(), "Cache sweeper started");

      loop {
        tokio::select! {
          _ = &mut shutdown_rx => {
            info!("Cache sweeper stopped");
            break;
          }
          _ = ticker.tick() => {
            let sweeper = self.clone();
            match tokio::task::spawn_blocking(move || sweeper.sweep_now()).await {
              Ok(report) if report.removed() > 0 => {
                info!(removed = report.removed(), "Periodic sweep removed expired rows");
              }
              Ok(_) => {}
              Err(e) => warn!(error = %e, "Periodic sweep task failed"),
            }
          }
        }
      }
    });

    SweeperHandle {
      shutdown: shutdown_tx,
      task,
    }
  }
}

/// Owner of a running periodic sweep.
///
/// Dropping the handle also stops the timer, without waiting for it.
pub struct SweeperHandle {
  shutdown: oneshot::Sender<()>,
  task: JoinHandle<()>,
}

impl SweeperHandle {
  /// Cancel the timer and wait for the task to finish.
  pub async fn stop(self) {
    // Err means the task is already gone
    let _ = self.shutdown.send(());
    if let Err(e) = self.task.await {
      warn!(error = %e, "Cache sweeper task ended abnormally");
    }
  }

  pub fn is_running(&self) -> bool {
    !self.task.is_finished()
  }
}
