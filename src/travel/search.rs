//! Flight search parameters and their canonical cache key.

use sha2::{Digest, Sha256};
use std::fmt::{self, Write as _};

use crate::cache::{QueryCache, QueryKey};

use super::types::Flight;

/// Cached result lists of flight searches.
pub type SearchResultCache = QueryCache<Flight>;

/// Parameters of a flight search.
///
/// Unset fields are part of the key as "absent", which is distinct from a
/// field set to the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
  pub from: Option<String>,
  pub to: Option<String>,
  /// Departure date, `YYYY-MM-DD`
  pub date: Option<String>,
  pub cabin_class: Option<String>,
  pub passengers: Option<u32>,
}

impl SearchParams {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn origin(mut self, code: impl Into<String>) -> Self {
    self.from = Some(code.into());
    self
  }

  pub fn destination(mut self, code: impl Into<String>) -> Self {
    self.to = Some(code.into());
    self
  }

  pub fn date(mut self, date: impl Into<String>) -> Self {
    self.date = Some(date.into());
    self
  }

  pub fn cabin_class(mut self, cabin_class: impl Into<String>) -> Self {
    self.cabin_class = Some(cabin_class.into());
    self
  }

  pub fn passengers(mut self, passengers: u32) -> Self {
    self.passengers = Some(passengers);
    self
  }

  /// Canonical cache key for these parameters.
  ///
  /// Fields are encoded in a fixed order. Every value is trimmed; airport
  /// codes are then upper-cased and the cabin class lower-cased, so
  /// `Economy` and `ECONOMY` share a key. The date and passenger count are
  /// kept as given.
  pub fn key(&self) -> SearchKey {
    let from = self.from.as_deref().map(|c| c.trim().to_uppercase());
    let to = self.to.as_deref().map(|c| c.trim().to_uppercase());
    let date = self.date.as_deref().map(|d| d.trim().to_string());
    let cabin = self.cabin_class.as_deref().map(|c| c.trim().to_lowercase());
    let passengers = self.passengers.map(|n| n.to_string());

    let mut canonical = String::new();
    push_field(&mut canonical, "from", from.as_deref());
    push_field(&mut canonical, "to", to.as_deref());
    push_field(&mut canonical, "date", date.as_deref());
    push_field(&mut canonical, "cabin", cabin.as_deref());
    push_field(&mut canonical, "passengers", passengers.as_deref());

    SearchKey { canonical }
  }
}

/// `name=` followed by nothing when absent, or `<len>:<value>` when present.
fn push_field(out: &mut String, name: &str, value: Option<&str>) {
  if !out.is_empty() {
    out.push('|');
  }
  out.push_str(name);
  out.push('=');
  if let Some(value) = value {
    // Writing to a String cannot fail
    let _ = write!(out, "{}:{}", value.len(), value);
  }
}

/// Deterministic encoding of a search's parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchKey {
  canonical: String,
}

impl SearchKey {
  pub fn as_str(&self) -> &str {
    &self.canonical
  }
}

impl fmt::Display for SearchKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.canonical)
  }
}

impl QueryKey for SearchKey {
  fn cache_hash(&self) -> String {
    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(self.canonical.as_bytes());
    hex::encode(hasher.finalize())
  }

  fn description(&self) -> String {
    self.canonical.clone()
  }
}

impl QueryKey for SearchParams {
  fn cache_hash(&self) -> String {
    self.key().cache_hash()
  }

  fn description(&self) -> String {
    self.key().description()
  }
}
