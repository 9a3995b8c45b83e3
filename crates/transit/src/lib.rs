//! # skyroute-transit
//!
//! Data model for the flight map: airports, direct flights, multi-leg
//! itineraries, and the provider abstraction that delivers them.
//!
//! ## Example
//!
//! ```
//! use skyroute_transit::prelude::*;
//!
//! let lhr = Station::new("LHR", 51.47, -0.45).with_city("London");
//! let query = RouteQuery::new("LHR", "HND");
//!
//! assert_eq!(lhr.label(), "London");
//! assert_eq!(query.role_of(&lhr.code), StationRole::Origin);
//! ```

pub mod identifiers;
pub mod models;
pub mod provider;

// Re-exports for convenience
pub mod prelude {
    pub use crate::identifiers::*;
    pub use crate::models::types::*;
    pub use crate::provider::{RouteProvider, StaticRouteProvider};
}

pub use prelude::*;
