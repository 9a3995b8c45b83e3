pub mod engine;
pub mod route;
pub mod surface;

pub use engine::MapEngine;
pub use route::{
    LegSummary, PathSegment, RouteRenderer, SegmentKind, SelectedRoute, SelectionState,
};
pub use surface::{MapSurface, Notice, SurfaceListener};
