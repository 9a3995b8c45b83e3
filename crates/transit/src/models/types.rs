//! Core data types and enums for flight-map data.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use geo::Point;

use crate::identifiers::*;

// ============================================================================
// Enums
// ============================================================================

/// What a station is to the current search. Decides overlay content and the
/// sign convention of the overlay offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StationRole {
    Origin,
    Destination,
    Connection,
}

impl fmt::Display for StationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StationRole::Origin => "origin",
            StationRole::Destination => "destination",
            StationRole::Connection => "connection",
        })
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A geo-located airport.
///
/// Immutable once received from the route-data provider.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Station {
    pub code: StationCode,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<Arc<str>>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub city: Option<Arc<str>>,
    pub latitude: f64,
    pub longitude: f64,
}

impl Station {
    pub fn new(code: impl Into<StationCode>, latitude: f64, longitude: f64) -> Self {
        Self {
            code: code.into(),
            name: None,
            city: None,
            latitude,
            longitude,
        }
    }

    pub fn with_name(mut self, name: impl AsRef<str>) -> Self {
        self.name = Some(name.as_ref().into());
        self
    }

    pub fn with_city(mut self, city: impl AsRef<str>) -> Self {
        self.city = Some(city.as_ref().into());
        self
    }

    /// Location as a geo point (x = longitude, y = latitude)
    pub fn location(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }

    /// The code, or "N/A" when the feed left it blank
    pub fn display_code(&self) -> &str {
        if self.code.is_empty() {
            "N/A"
        } else {
            self.code.as_str()
        }
    }

    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Airport {}", self.display_code()),
        }
    }

    /// Short human label: city first, then the display name.
    pub fn label(&self) -> String {
        match &self.city {
            Some(city) if !city.is_empty() => city.to_string(),
            _ => self.display_name(),
        }
    }
}

/// A single direct flight between two stations.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Route {
    pub id: RouteIdentifier,
    pub departure: Station,
    pub arrival: Station,
    pub departure_time: NaiveDateTime,
    pub arrival_time: NaiveDateTime,
    pub duration_minutes: u32,
    pub flight_number: Arc<str>,
    pub airline: Arc<str>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub price: Option<f64>,
}

impl Route {
    pub fn touches(&self, code: &StationCode) -> bool {
        self.departure.code == *code || self.arrival.code == *code
    }
}

/// An ordered chain of legs sold as one itinerary.
///
/// Leg `i` arriving where leg `i + 1` departs is conceptual only; path
/// rendering does not rely on the feed being spatially continuous.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MultiLegRoute {
    pub id: RouteIdentifier,
    pub legs: Vec<Route>,
    pub price: f64,
}

impl MultiLegRoute {
    pub fn new(id: impl Into<RouteIdentifier>, legs: Vec<Route>, price: f64) -> Result<Self> {
        let route = Self {
            id: id.into(),
            legs,
            price,
        };
        route.validate()?;
        Ok(route)
    }

    pub fn validate(&self) -> Result<()> {
        if self.legs.len() < 2 {
            return Err(TransitError::InvalidData(format!(
                "Multi-leg route {} has {} leg(s), expected at least 2",
                self.id,
                self.legs.len()
            )));
        }
        Ok(())
    }

    pub fn leg_count(&self) -> usize {
        self.legs.len()
    }

    /// Equal split of the aggregate price across legs. Display only.
    pub fn price_per_leg(&self) -> f64 {
        if self.legs.is_empty() {
            return self.price;
        }
        self.price / self.legs.len() as f64
    }

    pub fn touches(&self, code: &StationCode) -> bool {
        self.legs.iter().any(|leg| leg.touches(code))
    }
}

/// Origin/destination pair a search is keyed by.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteQuery {
    pub origin: StationCode,
    pub destination: StationCode,
}

impl RouteQuery {
    pub fn new(origin: impl Into<StationCode>, destination: impl Into<StationCode>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
        }
    }

    pub fn role_of(&self, code: &StationCode) -> StationRole {
        if *code == self.origin {
            StationRole::Origin
        } else if *code == self.destination {
            StationRole::Destination
        } else {
            StationRole::Connection
        }
    }
}

impl fmt::Display for RouteQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.origin, self.destination)
    }
}

/// Everything one search returned.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteSet {
    #[cfg_attr(feature = "serde", serde(default))]
    pub direct_routes: Vec<Route>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub multi_leg_routes: Vec<MultiLegRoute>,
}

impl RouteSet {
    pub fn new(direct_routes: Vec<Route>, multi_leg_routes: Vec<MultiLegRoute>) -> Self {
        Self {
            direct_routes,
            multi_leg_routes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.direct_routes.is_empty() && self.multi_leg_routes.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        self.multi_leg_routes.iter().try_for_each(MultiLegRoute::validate)
    }

    /// Every direct route followed by every leg of every itinerary
    pub fn all_legs(&self) -> impl Iterator<Item = &Route> {
        self.direct_routes
            .iter()
            .chain(self.multi_leg_routes.iter().flat_map(|m| m.legs.iter()))
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransitError {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Route data unavailable for {query}: {reason}")]
    Unavailable { query: RouteQuery, reason: String },
}

pub type Result<T> = std::result::Result<T, TransitError>;
