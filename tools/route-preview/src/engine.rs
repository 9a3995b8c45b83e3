//! A map engine that draws nothing and logs everything.

use skyroute_core::annotation::PixelOffset;
use skyroute_core::geo::Point;
use skyroute_core::map::{Notice, PathSegment, SelectedRoute};
use skyroute_core::transit::{Station, StationCode, StationRole};
use skyroute_core::{MapEngine, SurfaceListener};
use tracing::{info, warn};

pub struct LogEngine;

impl MapEngine for LogEngine {
    fn set_view(&self, center: Point, zoom: u8) {
        info!("view centred on ({:.2}, {:.2}) at zoom {zoom}", center.y(), center.x());
    }

    fn mount_marker(&self, station: &Station, role: StationRole, tooltip: &str) {
        info!(
            "marker {} [{role}] at ({:.2}, {:.2}): {tooltip}",
            station.display_code(),
            station.latitude,
            station.longitude
        );
    }

    fn unmount_marker(&self, code: &StationCode) {
        info!("marker {code} removed");
    }

    fn open_overlay(&self, code: &StationCode, offset: PixelOffset) {
        info!("overlay {code} shown at offset ({:.0}, {:.0})", offset.dx, offset.dy);
    }

    fn close_overlay(&self, code: &StationCode) {
        info!("overlay {code} hidden");
    }

    fn draw_path(&self, segment: &PathSegment) {
        let marker = if segment.highlighted { "==" } else { "--" };
        info!(
            "path {} {}{}{} {}",
            segment.from.display_code(),
            marker,
            segment.route_id,
            marker,
            segment.to.display_code()
        );
    }

    fn clear_paths(&self) {}
}

pub struct LogListener;

impl SurfaceListener for LogListener {
    fn on_overlay_activation_change(&self, active: Option<&StationCode>) {
        match active {
            Some(code) => info!("active overlay: {code}"),
            None => info!("active overlay: none"),
        }
    }

    fn on_route_select(&self, route: &SelectedRoute) {
        info!("route selected: {}", route.id());
    }

    fn on_notice(&self, notice: &Notice) {
        match notice {
            Notice::NoRoutesFound(query) => {
                warn!("No flights found for {query}. Try another departure airport.")
            }
            Notice::SearchFailed(reason) => warn!("Failed to search flights: {reason}"),
        }
    }
}
