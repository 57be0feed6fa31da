//! # Stayfinder
//!
//! A fleet of cooperating hotel-search services dispatched by role from one
//! binary. The `geo` role answers bounded nearest-neighbour queries from a
//! grid-clustered [`index::ProximityIndex`]; `rate` and `profile` serve stored
//! records; `search` combines geo and rate; `frontend` is the HTTP edge.
//!
//! Every remote call runs inside a span. The [`interceptor`] layers start,
//! propagate and close spans on both sides of each call, so one inbound request
//! yields one connected span tree across the fleet.

pub mod config;
pub mod connection;
pub mod data;
pub mod dispatch;
pub mod index;
pub mod interceptor;
pub mod model;
pub mod proto;
pub mod services;
pub mod telemetry;
pub mod test_support;
pub mod trace;

// Re-export main types for convenience
pub use config::StayConfig;
pub use connection::{dial, Connection, DialError};
pub use dispatch::{Role, Service, StartupError, Unresolved, Wired};
pub use index::{IndexError, Neighbor, ProximityIndex, QueryError, QueryParams};
pub use model::{GeoPoint, Location};
pub use trace::{CallContext, Span, SpanContext, Tracer};
