//! Table layout of the cache database.
//!
//! Every table shares the same frame: `key` as primary key, the entity's
//! payload columns, then `cached_at` / `expires_at` in epoch milliseconds.
//! Nested structures (seat maps, traveller lists, payment summaries) live
//! as JSON text in a single column.

/// Bump when any table below changes shape. Older stores are wiped.
pub const SCHEMA_VERSION: i64 = 1;

/// Static description of one cache table, used to build row SQL.
#[derive(Debug, PartialEq, Eq)]
pub struct Table {
  pub name: &'static str,
  /// Payload columns in codec order, excluding `key` and the timestamps.
  pub columns: &'static [&'static str],
}

pub const FLIGHTS: Table = Table {
  name: "flights",
  columns: &[
    "flight_number",
    "airline",
    "origin",
    "destination",
    "departure_at",
    "arrival_at",
    "price",
    "stops",
    "cabin_classes",
    "seats_available",
  ],
};

pub const BOOKINGS: Table = Table {
  name: "bookings",
  columns: &[
    "user_id",
    "flights",
    "trip_type",
    "adults",
    "children",
    "infants",
    "travellers",
    "contact",
    "status",
    "payment",
  ],
};

pub const USERS: Table = Table {
  name: "users",
  columns: &[
    "name",
    "email",
    "phone",
    "date_of_birth",
    "gender",
    "loyalty_points",
    "membership_tier",
    "role",
  ],
};

pub const AIRPORTS: Table = Table {
  name: "airports",
  columns: &["iata_code", "name", "city", "country"],
};

pub const NOTIFICATIONS: Table = Table {
  name: "notifications",
  columns: &[
    "user_id",
    "title",
    "message",
    "kind",
    "is_read",
    "created_at",
  ],
};

pub const SEARCH_RESULTS: Table = Table {
  name: "search_results",
  columns: &["description", "flights", "result_count"],
};

pub const ALL_TABLES: &[Table] = &[
  FLIGHTS,
  BOOKINGS,
  USERS,
  AIRPORTS,
  NOTIFICATIONS,
  SEARCH_RESULTS,
];

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS flights (
    key TEXT PRIMARY KEY NOT NULL,
    flight_number TEXT NOT NULL,
    airline TEXT NOT NULL,
    origin TEXT NOT NULL,
    destination TEXT NOT NULL,
    departure_at TEXT NOT NULL,
    arrival_at TEXT NOT NULL,
    price REAL NOT NULL,
    stops INTEGER NOT NULL,
    cabin_classes TEXT NOT NULL,
    seats_available TEXT NOT NULL,
    cached_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL,
    CHECK (expires_at > cached_at)
);
CREATE INDEX IF NOT EXISTS idx_flights_expires_at ON flights(expires_at);

CREATE TABLE IF NOT EXISTS bookings (
    key TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    flights TEXT NOT NULL,
    trip_type TEXT NOT NULL,
    adults INTEGER NOT NULL,
    children INTEGER NOT NULL,
    infants INTEGER NOT NULL,
    travellers TEXT NOT NULL,
    contact TEXT NOT NULL,
    status TEXT NOT NULL,
    payment TEXT NOT NULL,
    cached_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL,
    CHECK (expires_at > cached_at)
);
CREATE INDEX IF NOT EXISTS idx_bookings_expires_at ON bookings(expires_at);

CREATE TABLE IF NOT EXISTS users (
    key TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    phone TEXT,
    date_of_birth TEXT,
    gender TEXT,
    loyalty_points INTEGER NOT NULL,
    membership_tier TEXT NOT NULL,
    role TEXT NOT NULL,
    cached_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL,
    CHECK (expires_at > cached_at)
);
CREATE INDEX IF NOT EXISTS idx_users_expires_at ON users(expires_at);

CREATE TABLE IF NOT EXISTS airports (
    key TEXT PRIMARY KEY NOT NULL,
    iata_code TEXT NOT NULL,
    name TEXT NOT NULL,
    city TEXT NOT NULL,
    country TEXT NOT NULL,
    cached_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL,
    CHECK (expires_at > cached_at)
);
CREATE INDEX IF NOT EXISTS idx_airports_expires_at ON airports(expires_at);

CREATE TABLE IF NOT EXISTS notifications (
    key TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    kind TEXT NOT NULL,
    is_read INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    cached_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL,
    CHECK (expires_at > cached_at)
);
CREATE INDEX IF NOT EXISTS idx_notifications_expires_at ON notifications(expires_at);

-- Search results keyed by the SHA-256 of the canonical query
CREATE TABLE IF NOT EXISTS search_results (
    key TEXT PRIMARY KEY NOT NULL,
    description TEXT NOT NULL,
    flights TEXT NOT NULL,
    result_count INTEGER NOT NULL,
    cached_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL,
    CHECK (expires_at > cached_at)
);
CREATE INDEX IF NOT EXISTS idx_search_results_expires_at ON search_results(expires_at);
CREATE INDEX IF NOT EXISTS idx_search_results_key ON search_results(key);
"#;
