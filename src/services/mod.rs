//! # Service Facades
//!
//! One facade per role. The gRPC facades implement the tonic service traits
//! generated in [`crate::proto`]; the frontend is an axum router.

pub mod frontend;
pub mod geo;
pub mod profile;
pub mod rate;
pub mod search;

pub use frontend::FrontendService;
pub use geo::GeoService;
pub use profile::ProfileService;
pub use rate::RateService;
pub use search::SearchService;
