//! # skyroute-core
//!
//! The annotation layer of the flight map. It decides which airport's detail
//! overlay is open (never more than one), where each overlay sits relative
//! to its marker, when the origin overlay reveals itself on load, and which
//! path segments light up for the selected route.
//!
//! Everything here is single-threaded: state lives in `Rc`/`RefCell`, and
//! timers run on a `tokio::task::LocalSet`.

pub mod annotation;
pub mod config;
pub mod map;

// Re-export the data model so callers need only one crate
pub use skyroute_transit as transit;
pub use geo;

pub use annotation::{OverlayCoordinator, StationMarker, Transition};
pub use config::AnnotationConfig;
pub use map::{MapEngine, MapSurface, SurfaceListener};
