//! Default constants for stayfinder configuration.
//!
//! All magic numbers are centralized here with documentation.

// =============================================================================
// Network Defaults
// =============================================================================

/// Default listen interface
pub const DEFAULT_LISTEN_IP: &str = "0.0.0.0";

/// Default listen port, shared by every role
pub const DEFAULT_PORT: u16 = 8080;

/// Default geo dependent address
pub const DEFAULT_GEO_ADDR: &str = "geo:8080";

/// Default rate dependent address
pub const DEFAULT_RATE_ADDR: &str = "rate:8080";

/// Default profile dependent address
pub const DEFAULT_PROFILE_ADDR: &str = "profile:8080";

/// Default search dependent address
pub const DEFAULT_SEARCH_ADDR: &str = "search:8080";

/// Connect timeout when dialing a dependent (milliseconds)
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

// =============================================================================
// Tracing Defaults
// =============================================================================

/// Interval between span batch flushes to the collector (milliseconds)
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 1_000;

// =============================================================================
// Data Defaults
// =============================================================================

pub const DEFAULT_GEO_DATA: &str = "data/geo.json";
pub const DEFAULT_RATES_DATA: &str = "data/rates.json";
pub const DEFAULT_HOTELS_DATA: &str = "data/hotels.json";

// =============================================================================
// Query Defaults
// =============================================================================

/// Maximum hotels returned by a nearby query
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Maximum search radius (kilometres)
pub const DEFAULT_MAX_RADIUS_KM: f64 = 10.0;

// =============================================================================
// Frontend Defaults
// =============================================================================

/// Fixed search origin used by the frontend (Union Square, San Francisco)
pub const DEFAULT_ORIGIN_LAT: f64 = 37.7879;
pub const DEFAULT_ORIGIN_LON: f64 = -122.4075;

/// Locale requested from the profile role when the caller names none
pub const DEFAULT_LOCALE: &str = "en";
