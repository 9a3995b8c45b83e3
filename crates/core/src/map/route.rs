//! Derives what the map draws from a route set: the deduplicated stations,
//! one path segment per flown leg, and the highlight state of each segment.

use chrono::NaiveDateTime;
use itertools::Itertools;
use skyroute_transit::{MultiLegRoute, Route, RouteIdentifier, RouteSet, Station, StationCode};

use crate::annotation::marker::StationFlights;

// ============================================================================
// Selection
// ============================================================================

/// The route the user last picked, if any.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: Option<RouteIdentifier>,
}

impl SelectionState {
    pub fn select(&mut self, id: RouteIdentifier) {
        self.selected = Some(id);
    }

    pub fn selected(&self) -> Option<&RouteIdentifier> {
        self.selected.as_ref()
    }

    pub fn is_selected(&self, id: &RouteIdentifier) -> bool {
        self.selected.as_ref() == Some(id)
    }
}

/// What a selection resolved to, as reported upwards.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectedRoute {
    Direct(Route),
    Itinerary(MultiLegRoute),
    Leg { itinerary: MultiLegRoute, leg: Route },
}

impl SelectedRoute {
    pub fn id(&self) -> &RouteIdentifier {
        match self {
            SelectedRoute::Direct(route) => &route.id,
            SelectedRoute::Itinerary(itinerary) => &itinerary.id,
            SelectedRoute::Leg { leg, .. } => &leg.id,
        }
    }
}

// ============================================================================
// Path segments
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    Direct,
    Connecting {
        itinerary: RouteIdentifier,
        leg_index: usize,
    },
}

/// One line of the informational tooltip on a path.
#[derive(Clone, Debug, PartialEq)]
pub struct LegSummary {
    pub flight_number: String,
    pub airline: String,
    pub departure_time: NaiveDateTime,
    pub arrival_time: NaiveDateTime,
    pub duration_minutes: u32,
    pub price: f64,
}

impl LegSummary {
    fn priced(route: &Route, price: f64) -> Self {
        Self {
            flight_number: route.flight_number.to_string(),
            airline: route.airline.to_string(),
            departure_time: route.departure_time,
            arrival_time: route.arrival_time,
            duration_minutes: route.duration_minutes,
            price,
        }
    }
}

/// A drawable path between two stations.
#[derive(Clone, Debug, PartialEq)]
pub struct PathSegment {
    /// The direct route or the leg this segment draws
    pub route_id: RouteIdentifier,
    pub kind: SegmentKind,
    pub from: Station,
    pub to: Station,
    pub highlighted: bool,
    pub legs: Vec<LegSummary>,
}

// ============================================================================
// Renderer
// ============================================================================

pub struct RouteRenderer {
    routes: RouteSet,
    default_direct_price: f64,
}

impl RouteRenderer {
    pub fn new(routes: RouteSet, default_direct_price: f64) -> Self {
        Self {
            routes,
            default_direct_price,
        }
    }

    /// Every endpoint of every leg, keyed by code. First occurrence wins.
    pub fn stations(&self) -> Vec<Station> {
        self.routes
            .all_legs()
            .flat_map(|route| [&route.departure, &route.arrival])
            .unique_by(|station| station.code.clone())
            .cloned()
            .collect()
    }

    pub fn segments(&self, selection: &SelectionState) -> Vec<PathSegment> {
        let direct = self.routes.direct_routes.iter().map(|route| PathSegment {
            route_id: route.id.clone(),
            kind: SegmentKind::Direct,
            from: route.departure.clone(),
            to: route.arrival.clone(),
            highlighted: selection.is_selected(&route.id),
            legs: vec![LegSummary::priced(
                route,
                route.price.unwrap_or(self.default_direct_price),
            )],
        });

        let connecting = self
            .routes
            .multi_leg_routes
            .iter()
            .flat_map(|itinerary| Self::itinerary_segments(itinerary, selection));

        direct.chain(connecting).collect()
    }

    fn itinerary_segments(
        itinerary: &MultiLegRoute,
        selection: &SelectionState,
    ) -> Vec<PathSegment> {
        let price = itinerary.price_per_leg();
        let summaries: Vec<LegSummary> = itinerary
            .legs
            .iter()
            .map(|leg| LegSummary::priced(leg, price))
            .collect();
        let itinerary_selected = selection.is_selected(&itinerary.id);

        itinerary
            .legs
            .iter()
            .enumerate()
            .map(|(index, leg)| {
                // Draw to where the next leg departs, not to where the feed
                // says this one arrived
                let to = itinerary
                    .legs
                    .get(index + 1)
                    .map_or(&leg.arrival, |next| &next.departure);

                PathSegment {
                    route_id: leg.id.clone(),
                    kind: SegmentKind::Connecting {
                        itinerary: itinerary.id.clone(),
                        leg_index: index,
                    },
                    from: leg.departure.clone(),
                    to: to.clone(),
                    highlighted: itinerary_selected || selection.is_selected(&leg.id),
                    legs: summaries.clone(),
                }
            })
            .collect()
    }

    pub fn flights_for(&self, code: &StationCode) -> StationFlights {
        StationFlights {
            departures: self
                .routes
                .direct_routes
                .iter()
                .filter(|r| r.departure.code == *code)
                .cloned()
                .collect(),
            arrivals: self
                .routes
                .direct_routes
                .iter()
                .filter(|r| r.arrival.code == *code)
                .cloned()
                .collect(),
            connections: self
                .routes
                .multi_leg_routes
                .iter()
                .filter(|m| m.touches(code))
                .cloned()
                .collect(),
        }
    }

    /// Resolve a route id the way the highlight rule reads it.
    pub fn find(&self, id: &RouteIdentifier) -> Option<SelectedRoute> {
        if let Some(route) = self.routes.direct_routes.iter().find(|r| r.id == *id) {
            return Some(SelectedRoute::Direct(route.clone()));
        }

        self.routes.multi_leg_routes.iter().find_map(|itinerary| {
            if itinerary.id == *id {
                return Some(SelectedRoute::Itinerary(itinerary.clone()));
            }
            itinerary
                .legs
                .iter()
                .find(|leg| leg.id == *id)
                .map(|leg| SelectedRoute::Leg {
                    itinerary: itinerary.clone(),
                    leg: leg.clone(),
                })
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::NaiveDate;

    pub fn station(code: &str, lat: f64, lng: f64) -> Station {
        Station::new(code, lat, lng).with_name(format!("{code} International"))
    }

    pub fn lhr() -> Station {
        station("LHR", 51.47, -0.45).with_city("London")
    }

    pub fn dxb() -> Station {
        station("DXB", 25.25, 55.36)
    }

    pub fn hnd() -> Station {
        station("HND", 35.55, 139.78).with_city("Tokyo")
    }

    pub fn flight(id: &str, from: &Station, to: &Station) -> Route {
        let day = NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid date");
        Route {
            id: RouteIdentifier::new(id),
            departure: from.clone(),
            arrival: to.clone(),
            departure_time: day.and_hms_opt(9, 0, 0).expect("valid time"),
            arrival_time: day.and_hms_opt(22, 0, 0).expect("valid time"),
            duration_minutes: 780,
            flight_number: id.into(),
            airline: "Test Air".into(),
            price: None,
        }
    }

    pub fn itinerary(id: &str, legs: Vec<Route>, price: f64) -> MultiLegRoute {
        MultiLegRoute::new(id, legs, price).expect("fixture itinerary has two or more legs")
    }

    /// LHR-HND direct plus LHR-DXB-HND via one itinerary
    pub fn london_tokyo() -> RouteSet {
        RouteSet::new(
            vec![flight("JL44", &lhr(), &hnd())],
            vec![itinerary(
                "EK-1",
                vec![flight("EK2", &lhr(), &dxb()), flight("EK312", &dxb(), &hnd())],
                1200.0,
            )],
        )
    }
}
