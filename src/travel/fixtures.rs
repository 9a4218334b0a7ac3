//! Sample entities shared by tests.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;

use super::types::{
  Airport, BookedFlight, Booking, ContactDetails, Flight, Notification, PaymentSummary, Traveller,
  TravellerCounts, User,
};

fn departure() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2025, 11, 6, 7, 30, 0).unwrap()
}

pub fn flight(id: &str) -> Flight {
  let mut seats = BTreeMap::new();
  seats.insert("Economy".to_string(), 120);
  seats.insert("Business".to_string(), 4);

  Flight {
    id: id.to_string(),
    flight_number: id.to_string(),
    airline: "Vietnam Airlines".to_string(),
    origin: "HAN".to_string(),
    destination: "SGN".to_string(),
    departure_at: departure(),
    arrival_at: departure() + Duration::minutes(130),
    price: 1_850_000.5,
    stops: 0,
    cabin_classes: vec!["Economy".to_string(), "Business".to_string()],
    seats_available: seats,
  }
}

/// A flight for the HAN-SGN route with a given price, for ordering tests.
pub fn priced_flight(id: &str, price: f64) -> Flight {
  Flight {
    price,
    ..flight(id)
  }
}

pub fn booking(id: &str, user_id: &str) -> Booking {
  Booking {
    id: id.to_string(),
    user_id: user_id.to_string(),
    flights: vec![
      BookedFlight::Snapshot(Box::new(flight("VN123"))),
      BookedFlight::Id("VN456".to_string()),
    ],
    trip_type: "round-trip".to_string(),
    traveller_counts: TravellerCounts {
      adults: 2,
      children: 1,
      infants: 0,
    },
    travellers: vec![
      Traveller {
        full_name: "Nguyen Van A".to_string(),
        kind: "adult".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 15),
        nationality: Some("VN".to_string()),
        passport_number: Some("C1234567".to_string()),
      },
      Traveller {
        full_name: "Tran Thi B".to_string(),
        kind: "adult".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1992, 3, 2),
        nationality: Some("VN".to_string()),
        passport_number: None,
      },
      Traveller {
        full_name: "Nguyen Van C".to_string(),
        kind: "child".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(2018, 7, 30),
        nationality: None,
        passport_number: None,
      },
    ],
    contact: ContactDetails {
      name: "Nguyen Van A".to_string(),
      email: "a@example.com".to_string(),
      phone: "+84 912 345 678".to_string(),
    },
    status: "confirmed".to_string(),
    payment: PaymentSummary {
      method: "card".to_string(),
      amount: 5_550_000.0,
      currency: "VND".to_string(),
      status: "paid".to_string(),
      transaction_id: Some("txn_001".to_string()),
    },
  }
}

pub fn user(id: &str) -> User {
  User {
    id: id.to_string(),
    name: "Nguyen Van A".to_string(),
    email: format!("{}@example.com", id),
    phone: Some("+84 912 345 678".to_string()),
    date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 15),
    gender: Some("male".to_string()),
    loyalty_points: 1_250,
    membership_tier: "silver".to_string(),
    role: "customer".to_string(),
  }
}

pub fn airport(id: &str, iata_code: &str, name: &str) -> Airport {
  Airport {
    id: id.to_string(),
    iata_code: iata_code.to_string(),
    name: name.to_string(),
    city: "Hanoi".to_string(),
    country: "Vietnam".to_string(),
  }
}

/// A notification created `minutes` after a fixed instant.
pub fn notification(id: &str, user_id: &str, minutes: i64) -> Notification {
  Notification {
    id: id.to_string(),
    user_id: user_id.to_string(),
    title: "Booking confirmed".to_string(),
    message: "Your trip to Ho Chi Minh City is confirmed.".to_string(),
    kind: "booking".to_string(),
    read: false,
    created_at: departure() - Duration::days(1) + Duration::minutes(minutes),
  }
}

/// Deterministic prices with full-precision fractional parts.
pub fn awkward_prices(count: usize) -> Vec<f64> {
  let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
  (0..count)
    .map(|_| {
      // xorshift64
      state ^= state << 13;
      state ^= state >> 7;
      state ^= state << 17;
      (state % 10_000_000_000_000) as f64 / 1e7
    })
    .collect()
}
