//! Flight-map data models and types.

pub mod types;

// Re-exports for convenience
pub use types::{
    MultiLegRoute, Result, Route, RouteQuery, RouteSet, Station, StationRole, TransitError,
};
