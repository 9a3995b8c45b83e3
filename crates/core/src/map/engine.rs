//! The seam to whatever actually draws the map.
//!
//! Pan, zoom and tile drawing live behind this trait. The annotation layer
//! only mounts markers, opens and closes their overlays, and draws paths.

use geo::Point;
use skyroute_transit::{Station, StationCode, StationRole};

use crate::annotation::geometry::PixelOffset;
use crate::map::route::PathSegment;

pub trait MapEngine {
    fn set_view(&self, center: Point, zoom: u8);

    fn mount_marker(&self, station: &Station, role: StationRole, tooltip: &str);
    fn unmount_marker(&self, code: &StationCode);

    /// Show the overlay of `code`, displaced from its anchor by `offset`
    fn open_overlay(&self, code: &StationCode, offset: PixelOffset);
    fn close_overlay(&self, code: &StationCode);

    fn draw_path(&self, segment: &PathSegment);
    fn clear_paths(&self);
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    pub enum EngineCall {
        SetView { zoom: u8 },
        Mount(String),
        Unmount(String),
        Open(String, PixelOffset),
        Close(String),
        Draw { route: String, highlighted: bool },
        ClearPaths,
    }

    type Hook = Box<dyn Fn(&StationCode)>;

    /// Records every call; optionally echoes overlay closes back like a
    /// real map widget firing its own close event.
    #[derive(Default)]
    pub struct RecordingEngine {
        calls: RefCell<Vec<EngineCall>>,
        on_close: RefCell<Option<Hook>>,
    }

    impl RecordingEngine {
        pub fn calls(&self) -> Vec<EngineCall> {
            self.calls.borrow().clone()
        }

        pub fn take_calls(&self) -> Vec<EngineCall> {
            std::mem::take(&mut *self.calls.borrow_mut())
        }

        pub fn echo_close(&self, hook: impl Fn(&StationCode) + 'static) {
            *self.on_close.borrow_mut() = Some(Box::new(hook));
        }

        pub fn opened(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    EngineCall::Open(code, _) => Some(code),
                    _ => None,
                })
                .collect()
        }

        fn record(&self, call: EngineCall) {
            self.calls.borrow_mut().push(call);
        }
    }

    impl MapEngine for RecordingEngine {
        fn set_view(&self, _center: Point, zoom: u8) {
            self.record(EngineCall::SetView { zoom });
        }

        fn mount_marker(&self, station: &Station, _role: StationRole, _tooltip: &str) {
            self.record(EngineCall::Mount(station.code.to_string()));
        }

        fn unmount_marker(&self, code: &StationCode) {
            self.record(EngineCall::Unmount(code.to_string()));
        }

        fn open_overlay(&self, code: &StationCode, offset: PixelOffset) {
            self.record(EngineCall::Open(code.to_string(), offset));
        }

        fn close_overlay(&self, code: &StationCode) {
            self.record(EngineCall::Close(code.to_string()));
            if let Some(hook) = self.on_close.borrow().as_ref() {
                hook(code);
            }
        }

        fn draw_path(&self, segment: &PathSegment) {
            self.record(EngineCall::Draw {
                route: segment.route_id.to_string(),
                highlighted: segment.highlighted,
            });
        }

        fn clear_paths(&self) {
            self.record(EngineCall::ClearPaths);
        }
    }
}
