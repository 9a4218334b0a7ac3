use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use flightcache::cache::SystemClock;
use flightcache::config::Config;
use flightcache::db::StoreInitializer;
use flightcache::travel::TravelCache;

#[derive(Parser, Debug)]
#[command(name = "flightcache")]
#[command(about = "Maintenance tool for the flight-booking offline cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/flightcache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Sweep expired rows periodically until interrupted
  Run,
  /// Remove every expired row once
  Sweep,
  /// Show live and expired row counts per table
  Stats,
  /// Remove every cached row
  Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = flightcache::logging::init(&config.log);

  let init = StoreInitializer::new(config.store_location());
  // No network-only fallback for maintenance
  init.open()?;
  let cache = TravelCache::open(&init, Arc::new(SystemClock), &config.ttls());

  match args.command {
    Command::Run => {
      let handle = cache.sweeper(config.sweep_interval()).spawn();
      tokio::signal::ctrl_c().await?;
      info!("Interrupted, stopping sweeper");
      handle.stop().await;
    }
    Command::Sweep => {
      let report = cache.sweep_expired();
      for (table, removed) in &report.by_table {
        println!("{:<16} {:>8}", table, removed);
      }
      println!("{:<16} {:>8}", "total", report.removed());
      if !report.failed.is_empty() {
        eprintln!("failed: {}", report.failed.join(", "));
      }
    }
    Command::Stats => {
      println!("{:<16} {:>8} {:>8}", "table", "live", "expired");
      for stats in cache.stats()? {
        println!("{:<16} {:>8} {:>8}", stats.table, stats.live, stats.expired);
      }
    }
    Command::Clear => {
      let removed = cache.clear_all()?;
      println!("removed {} rows", removed);
    }
  }

  Ok(())
}
