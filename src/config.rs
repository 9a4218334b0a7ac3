use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::db::StoreLocation;
use crate::travel::{CacheTtls, DEFAULT_TTL};

/// Longest accepted TTL: ten years.
pub const MAX_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Database file (defaults to $XDG_DATA_HOME/flightcache/cache.db)
  pub path: Option<PathBuf>,
  /// Freshness window applied to every kind without an override
  pub ttl_secs: i64,
  pub ttl_overrides: TtlOverrides,
  /// Seconds between periodic sweeps
  pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      path: None,
      ttl_secs: DEFAULT_TTL.num_seconds(),
      ttl_overrides: TtlOverrides::default(),
      sweep_interval_secs: 600,
    }
  }
}

/// Per-kind TTLs in seconds.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TtlOverrides {
  pub flights: Option<i64>,
  pub bookings: Option<i64>,
  pub users: Option<i64>,
  pub airports: Option<i64>,
  pub notifications: Option<i64>,
  pub search_results: Option<i64>,
}

impl TtlOverrides {
  fn entries(&self) -> [(&'static str, Option<i64>); 6] {
    [
      ("flights", self.flights),
      ("bookings", self.bookings),
      ("users", self.users),
      ("airports", self.airports),
      ("notifications", self.notifications),
      ("search_results", self.search_results),
    ]
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Filter directive used when RUST_LOG is unset (e.g., "info,flightcache=debug")
  pub level: Option<String>,
  /// Also write daily-rotated log files here
  pub directory: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./flightcache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/flightcache/config.yaml
  ///
  /// Without any file the defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };
    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("flightcache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("flightcache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    // An empty file is a valid, all-default config
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    serde_yaml::from_str(contents)
  }

  pub fn validate(&self) -> Result<()> {
    check_ttl("cache.ttl_secs", self.cache.ttl_secs)?;
    for (kind, ttl) in self.cache.ttl_overrides.entries() {
      if let Some(secs) = ttl {
        check_ttl(&format!("cache.ttl_overrides.{}", kind), secs)?;
      }
    }
    if self.cache.sweep_interval_secs == 0 {
      return Err(eyre!("cache.sweep_interval_secs must be positive"));
    }
    Ok(())
  }

  /// Effective TTL for every kind.
  pub fn ttls(&self) -> CacheTtls {
    let o = &self.cache.ttl_overrides;
    let pick = |ttl: Option<i64>| Duration::seconds(ttl.unwrap_or(self.cache.ttl_secs));
    CacheTtls {
      flights: pick(o.flights),
      bookings: pick(o.bookings),
      users: pick(o.users),
      airports: pick(o.airports),
      notifications: pick(o.notifications),
      search_results: pick(o.search_results),
    }
  }

  pub fn sweep_interval(&self) -> std::time::Duration {
    std::time::Duration::from_secs(self.cache.sweep_interval_secs)
  }

  /// Where the cache database lives.
  pub fn store_location(&self) -> StoreLocation {
    let path = self.cache.path.clone().unwrap_or_else(|| {
      dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("flightcache")
        .join("cache.db")
    });
    StoreLocation::File(path)
  }
}

fn check_ttl(name: &str, secs: i64) -> Result<()> {
  if secs <= 0 {
    return Err(eyre!("{} must be positive, got {}", name, secs));
  }
  if secs > MAX_TTL_SECS {
    return Err(eyre!("{} must be at most {} seconds, got {}", name, MAX_TTL_SECS, secs));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_config_uses_defaults() {
    let config = Config::parse("").unwrap();
    config.validate().unwrap();
    assert_eq!(config.ttls(), CacheTtls::default());
    assert_eq!(config.sweep_interval(), std::time::Duration::from_secs(600));
    assert!(matches!(config.store_location(), StoreLocation::File(p) if p.ends_with("flightcache/cache.db")));
  }

  #[test]
  fn test_overrides_apply_per_kind() {
    let config = Config::parse(
      "cache:\n  path: /tmp/fc.db\n  ttl_secs: 120\n  ttl_overrides:\n    airports: 86400\nlog:\n  level: debug\n",
    )
    .unwrap();
    config.validate().unwrap();

    let ttls = config.ttls();
    assert_eq!(ttls.airports, Duration::days(1));
    assert_eq!(ttls.flights, Duration::minutes(2));
    assert_eq!(ttls.search_results, Duration::minutes(2));
    assert_eq!(config.store_location(), StoreLocation::File(PathBuf::from("/tmp/fc.db")));
    assert_eq!(config.log.level.as_deref(), Some("debug"));
  }

  #[test]
  fn test_non_positive_ttl_is_rejected() {
    let config = Config::parse("cache:\n  ttl_secs: 0\n").unwrap();
    assert!(config.validate().is_err());

    let config = Config::parse("cache:\n  ttl_overrides:\n    users: -5\n").unwrap();
    assert!(config.validate().is_err());

    let config = Config::parse("cache:\n  sweep_interval_secs: 0\n").unwrap();
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_oversized_ttl_is_rejected() {
    let config = Config::parse(&format!("cache:\n  ttl_secs: {}\n", i64::MAX)).unwrap();
    assert!(config.validate().is_err());

    let config = Config::parse(&format!("cache:\n  ttl_overrides:\n    airports: {}\n", MAX_TTL_SECS + 1)).unwrap();
    assert!(config.validate().is_err());

    let config = Config::parse(&format!("cache:\n  ttl_secs: {}\n", MAX_TTL_SECS)).unwrap();
    config.validate().unwrap();
    assert_eq!(config.ttls().flights.num_seconds(), MAX_TTL_SECS);
  }

  #[test]
  fn test_malformed_value_fails_to_parse() {
    assert!(Config::parse("cache:\n  ttl_secs: soon\n").is_err());
  }

  #[test]
  fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flightcache.yaml");
    std::fs::write(&path, "cache:\n  sweep_interval_secs: 30\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.sweep_interval(), std::time::Duration::from_secs(30));
    assert!(Config::load(Some(&dir.path().join("missing.yaml"))).is_err());
  }
}
