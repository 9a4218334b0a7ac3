use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scheduled flight as returned by the booking API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
  pub id: String,
  pub flight_number: String,
  pub airline: String,
  /// IATA code
  pub origin: String,
  pub destination: String,
  pub departure_at: DateTime<Utc>,
  pub arrival_at: DateTime<Utc>,
  pub price: f64,
  pub stops: u32,
  pub cabin_classes: Vec<String>,
  /// Remaining seats per cabin class
  pub seats_available: BTreeMap<String, u32>,
}

impl Flight {
  pub fn seats_in(&self, cabin_class: &str) -> u32 {
    self.seats_available.get(cabin_class).copied().unwrap_or(0)
  }
}

/// A leg of a booking: either a reference or the flight as it was booked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BookedFlight {
  Id(String),
  Snapshot(Box<Flight>),
}

impl BookedFlight {
  pub fn flight_id(&self) -> &str {
    match self {
      BookedFlight::Id(id) => id,
      BookedFlight::Snapshot(flight) => &flight.id,
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravellerCounts {
  pub adults: u32,
  pub children: u32,
  pub infants: u32,
}

impl TravellerCounts {
  pub fn total(&self) -> u32 {
    self.adults + self.children + self.infants
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Traveller {
  pub full_name: String,
  /// "adult", "child" or "infant"
  pub kind: String,
  pub date_of_birth: Option<NaiveDate>,
  pub nationality: Option<String>,
  pub passport_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactDetails {
  pub name: String,
  pub email: String,
  pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
  pub method: String,
  pub amount: f64,
  pub currency: String,
  pub status: String,
  pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
  pub id: String,
  pub user_id: String,
  /// Legs in travel order
  pub flights: Vec<BookedFlight>,
  /// "one-way", "round-trip" or "multi-city"
  pub trip_type: String,
  pub traveller_counts: TravellerCounts,
  pub travellers: Vec<Traveller>,
  pub contact: ContactDetails,
  pub status: String,
  pub payment: PaymentSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: String,
  pub name: String,
  pub email: String,
  pub phone: Option<String>,
  pub date_of_birth: Option<NaiveDate>,
  pub gender: Option<String>,
  pub loyalty_points: i64,
  pub membership_tier: String,
  pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Airport {
  pub id: String,
  pub iata_code: String,
  pub name: String,
  pub city: String,
  pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
  pub id: String,
  pub user_id: String,
  pub title: String,
  pub message: String,
  /// e.g. "booking", "promotion", "system"
  pub kind: String,
  pub read: bool,
  pub created_at: DateTime<Utc>,
}
