//! Record codec implementations for the mirrored entities.

use crate::cache::codec::{Row, RowReader, RowWriter};
use crate::cache::{CacheError, Record};
use crate::db::schema::{Table, AIRPORTS, BOOKINGS, FLIGHTS, NOTIFICATIONS, USERS};

use super::types::{Airport, Booking, Flight, Notification, TravellerCounts, User};

impl Record for Flight {
  fn cache_key(&self) -> String {
    self.id.clone()
  }

  fn table() -> &'static Table {
    &FLIGHTS
  }

  fn encode(&self) -> Result<Row, CacheError> {
    Ok(
      RowWriter::new(&FLIGHTS, &self.id)
        .text(&self.flight_number)
        .text(&self.airline)
        .text(&self.origin)
        .text(&self.destination)
        .datetime(&self.departure_at)
        .datetime(&self.arrival_at)
        .real(self.price)
        .integer(i64::from(self.stops))
        .json(&self.cabin_classes)?
        .json(&self.seats_available)?
        .finish(),
    )
  }

  fn decode(row: &Row) -> Result<Self, CacheError> {
    let mut r = RowReader::new(&FLIGHTS, row)?;
    Ok(Self {
      id: r.key().to_string(),
      flight_number: r.text()?,
      airline: r.text()?,
      origin: r.text()?,
      destination: r.text()?,
      departure_at: r.datetime()?,
      arrival_at: r.datetime()?,
      price: r.real()?,
      stops: r.unsigned()?,
      cabin_classes: r.json()?,
      seats_available: r.json()?,
    })
  }
}

impl Record for Booking {
  fn cache_key(&self) -> String {
    self.id.clone()
  }

  fn table() -> &'static Table {
    &BOOKINGS
  }

  fn encode(&self) -> Result<Row, CacheError> {
    let counts = self.traveller_counts;
    Ok(
      RowWriter::new(&BOOKINGS, &self.id)
        .text(&self.user_id)
        .json(&self.flights)?
        .text(&self.trip_type)
        .integer(i64::from(counts.adults))
        .integer(i64::from(counts.children))
        .integer(i64::from(counts.infants))
        .json(&self.travellers)?
        .json(&self.contact)?
        .text(&self.status)
        .json(&self.payment)?
        .finish(),
    )
  }

  fn decode(row: &Row) -> Result<Self, CacheError> {
    let mut r = RowReader::new(&BOOKINGS, row)?;
    Ok(Self {
      id: r.key().to_string(),
      user_id: r.text()?,
      flights: r.json()?,
      trip_type: r.text()?,
      traveller_counts: TravellerCounts {
        adults: r.unsigned()?,
        children: r.unsigned()?,
        infants: r.unsigned()?,
      },
      travellers: r.json()?,
      contact: r.json()?,
      status: r.text()?,
      payment: r.json()?,
    })
  }
}

impl Record for User {
  fn cache_key(&self) -> String {
    self.id.clone()
  }

  fn table() -> &'static Table {
    &USERS
  }

  fn encode(&self) -> Result<Row, CacheError> {
    Ok(
      RowWriter::new(&USERS, &self.id)
        .text(&self.name)
        .text(&self.email)
        .opt_text(self.phone.as_deref())
        .opt_date(self.date_of_birth)
        .opt_text(self.gender.as_deref())
        .integer(self.loyalty_points)
        .text(&self.membership_tier)
        .text(&self.role)
        .finish(),
    )
  }

  fn decode(row: &Row) -> Result<Self, CacheError> {
    let mut r = RowReader::new(&USERS, row)?;
    Ok(Self {
      id: r.key().to_string(),
      name: r.text()?,
      email: r.text()?,
      phone: r.opt_text()?,
      date_of_birth: r.opt_date()?,
      gender: r.opt_text()?,
      loyalty_points: r.integer()?,
      membership_tier: r.text()?,
      role: r.text()?,
    })
  }
}

impl Record for Airport {
  fn cache_key(&self) -> String {
    self.id.clone()
  }

  fn table() -> &'static Table {
    &AIRPORTS
  }

  fn encode(&self) -> Result<Row, CacheError> {
    Ok(
      RowWriter::new(&AIRPORTS, &self.id)
        .text(&self.iata_code)
        .text(&self.name)
        .text(&self.city)
        .text(&self.country)
        .finish(),
    )
  }

  fn decode(row: &Row) -> Result<Self, CacheError> {
    let mut r = RowReader::new(&AIRPORTS, row)?;
    Ok(Self {
      id: r.key().to_string(),
      iata_code: r.text()?,
      name: r.text()?,
      city: r.text()?,
      country: r.text()?,
    })
  }
}

impl Record for Notification {
  fn cache_key(&self) -> String {
    self.id.clone()
  }

  fn table() -> &'static Table {
    &NOTIFICATIONS
  }

  fn encode(&self) -> Result<Row, CacheError> {
    Ok(
      RowWriter::new(&NOTIFICATIONS, &self.id)
        .text(&self.user_id)
        .text(&self.title)
        .text(&self.message)
        .text(&self.kind)
        .flag(self.read)
        .datetime(&self.created_at)
        .finish(),
    )
  }

  fn decode(row: &Row) -> Result<Self, CacheError> {
    let mut r = RowReader::new(&NOTIFICATIONS, row)?;
    Ok(Self {
      id: r.key().to_string(),
      user_id: r.text()?,
      title: r.text()?,
      message: r.text()?,
      kind: r.text()?,
      read: r.flag()?,
      created_at: r.datetime()?,
    })
  }
}
