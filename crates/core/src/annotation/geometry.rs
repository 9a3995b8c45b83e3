//! Overlay placement.
//!
//! Pushes a station's overlay sideways, away from the line towards its
//! related station, so the panel does not sit on top of the flight path.

use skyroute_transit::{Station, StationRole};

/// Horizontal swing applied along the bearing to the other station
const SWING_PX: f64 = -160.0;
/// Origins are pulled down to clear the tooltip drawn above the marker
const ORIGIN_DROP_PX: f64 = 100.0;

const FALLBACK_DX: f64 = -200.0;
const FALLBACK_ORIGIN_DY: f64 = 60.0;

/// Screen-space displacement of an overlay from its anchor, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PixelOffset {
    pub dx: f64,
    pub dy: f64,
}

impl PixelOffset {
    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }
}

/// Planar bearing from `from` to `to` in degrees, counter-clockwise from east.
///
/// Coincident (or non-finite) coordinates yield 0.
pub fn bearing_degrees(from: &Station, to: &Station) -> f64 {
    let delta = to.location() - from.location();
    let angle = delta.y().atan2(delta.x()).to_degrees();
    if angle.is_finite() { angle } else { 0.0 }
}

fn fallback(role: StationRole) -> PixelOffset {
    let dy = match role {
        StationRole::Origin => FALLBACK_ORIGIN_DY,
        _ => 0.0,
    };
    PixelOffset::new(FALLBACK_DX, dy)
}

/// Offset for the overlay of `station`, given the station it is paired with.
pub fn compute_offset(
    station: &Station,
    other: Option<&Station>,
    role: StationRole,
) -> PixelOffset {
    let Some(other) = other else {
        return fallback(role);
    };

    let angle = bearing_degrees(station, other);
    match role {
        StationRole::Origin => {
            PixelOffset::new(angle.to_radians().cos() * SWING_PX, ORIGIN_DROP_PX)
        }
        StationRole::Destination => {
            PixelOffset::new((angle + 180.0).to_radians().cos() * SWING_PX, 0.0)
        }
        StationRole::Connection => fallback(role),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn at(code: &str, lat: f64, lng: f64) -> Station {
        Station::new(code, lat, lng)
    }

    fn assert_offset(actual: PixelOffset, dx: f64, dy: f64) {
        assert_abs_diff_eq!(actual.dx, dx, epsilon = 1e-9);
        assert_abs_diff_eq!(actual.dy, dy, epsilon = 1e-9);
    }

    #[test]
    fn test_no_other_station() {
        let a = at("A", 10.0, 10.0);
        assert_offset(compute_offset(&a, None, StationRole::Origin), -200.0, 60.0);
        assert_offset(compute_offset(&a, None, StationRole::Destination), -200.0, 0.0);
        assert_offset(compute_offset(&a, None, StationRole::Connection), -200.0, 0.0);
    }

    #[test]
    fn test_origin_destination_symmetry() {
        let a = at("A", 0.0, 0.0);
        let b = at("B", 0.0, 1.0);

        assert_offset(compute_offset(&a, Some(&b), StationRole::Origin), -160.0, 100.0);
        assert_offset(compute_offset(&b, Some(&a), StationRole::Destination), -160.0, 0.0);
    }

    #[test]
    fn test_origin_facing_west() {
        let a = at("A", 0.0, 0.0);
        let west = at("W", 0.0, -5.0);
        assert_offset(compute_offset(&a, Some(&west), StationRole::Origin), 160.0, 100.0);
    }

    #[test]
    fn test_due_north_has_no_swing() {
        let a = at("A", 0.0, 0.0);
        let north = at("N", 10.0, 0.0);
        assert_abs_diff_eq!(bearing_degrees(&a, &north), 90.0, epsilon = 1e-9);
        assert_offset(compute_offset(&a, Some(&north), StationRole::Origin), 0.0, 100.0);
    }

    #[test]
    fn test_connection_ignores_other() {
        let a = at("A", 0.0, 0.0);
        let b = at("B", 3.0, 4.0);
        assert_offset(compute_offset(&a, Some(&b), StationRole::Connection), -200.0, 0.0);
    }

    #[test]
    fn test_coincident_stations() {
        let a = at("A", 35.5, 139.7);
        let same = at("A2", 35.5, 139.7);
        assert_eq!(bearing_degrees(&a, &same), 0.0);
        assert_offset(compute_offset(&a, Some(&same), StationRole::Origin), -160.0, 100.0);
        assert_offset(compute_offset(&a, Some(&same), StationRole::Destination), 160.0, 0.0);
    }

    #[test]
    fn test_non_finite_coordinates() {
        let a = at("A", f64::NAN, 0.0);
        let b = at("B", 0.0, 1.0);
        assert_eq!(bearing_degrees(&a, &b), 0.0);
    }
}
