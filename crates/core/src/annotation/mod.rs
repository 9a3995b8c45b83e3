//! The annotation layer: overlay arbitration, placement and timed reveal.

use std::cell::Cell;

pub mod coordinator;
pub mod geometry;
pub mod marker;
pub mod timer;

pub use coordinator::{OverlayCoordinator, OverlayEvent, Subscription, Transition};
pub use geometry::{PixelOffset, compute_offset};
pub use marker::{OverlayContent, StationFlights, StationMarker};
pub use timer::Timer;

/// Proof that a non-reentrant section is running.
///
/// Obtained with [`InProgress::enter`]; the section is released when the
/// token drops.
pub(crate) struct InProgress<'a>(&'a Cell<bool>);

impl<'a> InProgress<'a> {
    /// `None` if the section is already running further up the stack
    pub(crate) fn enter(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
