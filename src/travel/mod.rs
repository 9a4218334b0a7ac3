//! Flight-booking domain: entity types, their row codecs, and the search key.

mod cached;
mod records;
pub mod search;
mod types;

#[cfg(test)]
pub mod fixtures;

pub use cached::{CacheTtls, TravelCache, DEFAULT_TTL};
pub use search::{SearchKey, SearchParams, SearchResultCache};
pub use types::{
  Airport, BookedFlight, Booking, ContactDetails, Flight, Notification, PaymentSummary, Traveller,
  TravellerCounts, User,
};
