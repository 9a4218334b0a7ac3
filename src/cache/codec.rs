//! Row representation shared by every cache table, plus helpers for
//! writing and reading the payload columns.
//!
//! Scalars map to their natural SQLite type. Nested structures are stored
//! as JSON text in one column. Timestamps inside payloads are RFC 3339 text.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Value;
use serde::{de::DeserializeOwned, Serialize};

use super::error::CacheError;
use crate::db::schema::Table;

/// Payload of one cache row: the key plus the table's columns in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
  pub key: String,
  pub values: Vec<Value>,
}

/// A row as read back from the store, with its timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
  pub row: Row,
  pub cached_at: i64,
  pub expires_at: i64,
}

impl StoredRow {
  /// A row is visible only while `now < expires_at`.
  pub fn is_expired(&self, now: i64) -> bool {
    self.expires_at <= now
  }
}

/// Builds a [`Row`] column by column.
pub struct RowWriter {
  table: &'static Table,
  row: Row,
}

impl RowWriter {
  pub fn new(table: &'static Table, key: impl Into<String>) -> Self {
    Self {
      table,
      row: Row {
        key: key.into(),
        values: Vec::with_capacity(table.columns.len()),
      },
    }
  }

  pub fn text(mut self, value: &str) -> Self {
    self.row.values.push(Value::Text(value.to_string()));
    self
  }

  pub fn opt_text(mut self, value: Option<&str>) -> Self {
    self
      .row
      .values
      .push(value.map_or(Value::Null, |v| Value::Text(v.to_string())));
    self
  }

  pub fn integer(mut self, value: i64) -> Self {
    self.row.values.push(Value::Integer(value));
    self
  }

  pub fn real(mut self, value: f64) -> Self {
    self.row.values.push(Value::Real(value));
    self
  }

  pub fn flag(self, value: bool) -> Self {
    self.integer(i64::from(value))
  }

  pub fn datetime(self, value: &DateTime<Utc>) -> Self {
    let text = value.to_rfc3339();
    self.text(&text)
  }

  pub fn opt_date(self, value: Option<NaiveDate>) -> Self {
    let text = value.map(|d| d.format("%Y-%m-%d").to_string());
    self.opt_text(text.as_deref())
  }

  pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, CacheError> {
    let text = serde_json::to_string(value).map_err(|e| CacheError::write(self.table.name, e))?;
    self.row.values.push(Value::Text(text));
    Ok(self)
  }

  pub fn finish(self) -> Row {
    debug_assert_eq!(
      self.row.values.len(),
      self.table.columns.len(),
      "column count for {}",
      self.table.name
    );
    self.row
  }
}

/// Reads a [`Row`]'s columns back in order.
///
/// Every accessor fails with [`CacheError::DecodeFailure`] on a missing
/// column or a type mismatch.
pub struct RowReader<'a> {
  table: &'static Table,
  row: &'a Row,
  next: usize,
}

impl<'a> RowReader<'a> {
  pub fn new(table: &'static Table, row: &'a Row) -> Result<Self, CacheError> {
    if row.values.len() != table.columns.len() {
      return Err(CacheError::decode(
        table.name,
        &row.key,
        format!(
          "expected {} columns, found {}",
          table.columns.len(),
          row.values.len()
        ),
      ));
    }
    Ok(Self { table, row, next: 0 })
  }

  pub fn key(&self) -> &'a str {
    &self.row.key
  }

  fn column(&self) -> &'static str {
    self.table.columns.get(self.next).copied().unwrap_or("?")
  }

  fn take(&mut self) -> Result<(&'static str, &'a Value), CacheError> {
    let column = self.column();
    let row: &'a Row = self.row;
    let value = row.values.get(self.next).ok_or_else(|| {
      CacheError::decode(self.table.name, &row.key, format!("column {} missing", column))
    })?;
    self.next += 1;
    Ok((column, value))
  }

  fn fail(&self, column: &str, expected: &str, found: &Value) -> CacheError {
    CacheError::decode(
      self.table.name,
      &self.row.key,
      format!("column {}: expected {}, found {:?}", column, expected, found.data_type()),
    )
  }

  pub fn text(&mut self) -> Result<String, CacheError> {
    match self.take()? {
      (_, Value::Text(s)) => Ok(s.clone()),
      (column, other) => Err(self.fail(column, "text", other)),
    }
  }

  pub fn opt_text(&mut self) -> Result<Option<String>, CacheError> {
    match self.take()? {
      (_, Value::Null) => Ok(None),
      (_, Value::Text(s)) => Ok(Some(s.clone())),
      (column, other) => Err(self.fail(column, "text or null", other)),
    }
  }

  pub fn integer(&mut self) -> Result<i64, CacheError> {
    match self.take()? {
      (_, Value::Integer(i)) => Ok(*i),
      (column, other) => Err(self.fail(column, "integer", other)),
    }
  }

  pub fn unsigned(&mut self) -> Result<u32, CacheError> {
    let column = self.column();
    let value = self.integer()?;
    u32::try_from(value).map_err(|e| {
      CacheError::decode(self.table.name, &self.row.key, format!("column {}: {}", column, e))
    })
  }

  pub fn real(&mut self) -> Result<f64, CacheError> {
    match self.take()? {
      (_, Value::Real(f)) => Ok(*f),
      (_, Value::Integer(i)) => Ok(*i as f64),
      (column, other) => Err(self.fail(column, "real", other)),
    }
  }

  pub fn flag(&mut self) -> Result<bool, CacheError> {
    Ok(self.integer()? != 0)
  }

  pub fn datetime(&mut self) -> Result<DateTime<Utc>, CacheError> {
    let column = self.column();
    let text = self.text()?;
    DateTime::parse_from_rfc3339(&text)
      .map(|dt| dt.with_timezone(&Utc))
      .map_err(|e| {
        CacheError::decode(self.table.name, &self.row.key, format!("column {}: {}", column, e))
      })
  }

  pub fn opt_date(&mut self) -> Result<Option<NaiveDate>, CacheError> {
    let column = self.column();
    match self.opt_text()? {
      None => Ok(None),
      Some(text) => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| {
          CacheError::decode(self.table.name, &self.row.key, format!("column {}: {}", column, e))
        }),
    }
  }

  pub fn json<T: DeserializeOwned>(&mut self) -> Result<T, CacheError> {
    let column = self.column();
    let text = self.text()?;
    serde_json::from_str(&text).map_err(|e| {
      CacheError::decode(self.table.name, &self.row.key, format!("column {}: {}", column, e))
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::schema::AIRPORTS;

  #[test]
  fn test_reader_rejects_wrong_column_count() {
    let row = Row {
      key: "1".to_string(),
      values: vec![Value::Text("HAN".to_string())],
    };
    let err = RowReader::new(&AIRPORTS, &row).err().unwrap();
    assert!(matches!(err, CacheError::DecodeFailure { table: "airports", .. }));
  }

  #[test]
  fn test_reader_rejects_type_mismatch() {
    let row = Row {
      key: "1".to_string(),
      values: vec![
        Value::Integer(7),
        Value::Text("Noi Bai".to_string()),
        Value::Text("Hanoi".to_string()),
        Value::Text("Vietnam".to_string()),
      ],
    };
    let mut reader = RowReader::new(&AIRPORTS, &row).unwrap();
    let err = reader.text().unwrap_err();
    assert!(err.to_string().contains("iata_code"));
  }

  #[test]
  fn test_writer_and_reader_agree() {
    let when = DateTime::parse_from_rfc3339("2025-11-06T07:30:00.250Z")
      .unwrap()
      .with_timezone(&Utc);
    let row = RowWriter::new(&AIRPORTS, "1")
      .text("HAN")
      .opt_text(None)
      .datetime(&when)
      .json(&vec!["a", "b"])
      .unwrap()
      .finish();

    let mut reader = RowReader::new(&AIRPORTS, &row).unwrap();
    assert_eq!(reader.key(), "1");
    assert_eq!(reader.text().unwrap(), "HAN");
    assert_eq!(reader.opt_text().unwrap(), None);
    assert_eq!(reader.datetime().unwrap(), when);
    assert_eq!(reader.json::<Vec<String>>().unwrap(), vec!["a", "b"]);
  }

  #[test]
  fn test_stored_row_expiry_is_inclusive() {
    let stored = StoredRow {
      row: Row {
        key: "k".to_string(),
        values: vec![],
      },
      cached_at: 1_000,
      expires_at: 2_000,
    };
    assert!(!stored.is_expired(1_999));
    assert!(stored.is_expired(2_000));
  }
}
