//! Offline cache for the flight-booking client.

pub mod cache;
pub mod config;
pub mod db;
pub mod logging;
pub mod travel;
