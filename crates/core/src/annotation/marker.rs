//! One station bound to the map and to the overlay coordinator.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use skyroute_transit::{MultiLegRoute, Route, Station, StationCode, StationRole};
use tracing::{debug, trace};

use crate::annotation::{
    InProgress,
    coordinator::{OverlayCoordinator, OverlayEvent, Subscription, Transition},
    geometry::{PixelOffset, compute_offset},
    timer::Timer,
};
use crate::map::engine::MapEngine;

/// Flights relevant to a single station.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StationFlights {
    /// Direct routes leaving the station
    pub departures: Vec<Route>,
    /// Direct routes arriving at the station
    pub arrivals: Vec<Route>,
    /// Itineraries with at least one leg touching the station
    pub connections: Vec<MultiLegRoute>,
}

impl StationFlights {
    pub fn has_flights(&self, role: StationRole) -> bool {
        !self.departures.is_empty()
            || !self.arrivals.is_empty()
            || (role != StationRole::Origin && !self.connections.is_empty())
    }
}

/// What the schedule-table renderer is asked to draw inside an overlay.
#[derive(Clone, Debug, PartialEq)]
pub enum OverlayContent<'a> {
    NoFlights,
    /// The station has flights, just none of the kind its role lists
    Empty,
    Schedule {
        title: &'static str,
        role: StationRole,
        flights: &'a [Route],
        connections: &'a [MultiLegRoute],
    },
}

struct MarkerInner {
    station: Station,
    role: StationRole,
    flights: StationFlights,
    offset: PixelOffset,
    coordinator: Rc<OverlayCoordinator>,
    engine: Rc<dyn MapEngine>,
    open: Cell<bool>,
    dismissed: Cell<bool>,
    handling: Cell<bool>,
    reveal: RefCell<Option<Timer>>,
}

/// A station's marker plus its local projection of the coordinator state.
///
/// Dropping the marker cancels its auto-reveal, releases its overlay if it
/// holds the open one, deregisters it from the coordinator and removes it
/// from the map.
pub struct StationMarker {
    inner: Rc<MarkerInner>,
    _subscription: Subscription,
}

impl StationMarker {
    /// Mount `station` on the map.
    ///
    /// `other` is the station the overlay should keep clear of. An eligible
    /// origin arms its auto-reveal here.
    ///
    /// # Panics
    ///
    /// Panics if an auto-reveal is armed outside a [`tokio::task::LocalSet`].
    pub fn mount(
        station: Station,
        role: StationRole,
        other: Option<&Station>,
        flights: StationFlights,
        coordinator: Rc<OverlayCoordinator>,
        engine: Rc<dyn MapEngine>,
    ) -> Self {
        let offset = compute_offset(&station, other, role);
        let inner = Rc::new(MarkerInner {
            station,
            role,
            flights,
            offset,
            coordinator: Rc::clone(&coordinator),
            engine,
            open: Cell::new(false),
            dismissed: Cell::new(false),
            handling: Cell::new(false),
            reveal: RefCell::new(None),
        });

        inner
            .engine
            .mount_marker(&inner.station, role, &inner.tooltip());

        let weak = Rc::downgrade(&inner);
        let subscription =
            coordinator.subscribe_station(inner.station.code.clone(), role, move |event| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_event(event);
                }
            });

        if inner.reveal_eligible() {
            let delay = coordinator.config().auto_reveal_delay();
            debug!(
                "arming auto-reveal for {} in {}ms",
                inner.station.code,
                delay.as_millis()
            );
            let weak = Rc::downgrade(&inner);
            let timer = Timer::after(delay, move || {
                if let Some(inner) = weak.upgrade() {
                    inner.auto_reveal();
                }
            });
            *inner.reveal.borrow_mut() = Some(timer);
        }

        Self {
            inner,
            _subscription: subscription,
        }
    }

    pub fn station(&self) -> &Station {
        &self.inner.station
    }

    pub fn code(&self) -> &StationCode {
        &self.inner.station.code
    }

    pub fn role(&self) -> StationRole {
        self.inner.role
    }

    pub fn offset(&self) -> PixelOffset {
        self.inner.offset
    }

    pub fn flights(&self) -> &StationFlights {
        &self.inner.flights
    }

    pub fn has_flights(&self) -> bool {
        self.inner.flights.has_flights(self.inner.role)
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.get()
    }

    pub fn reveal_pending(&self) -> bool {
        self.inner.reveal.borrow().is_some()
    }

    pub fn tooltip(&self) -> String {
        self.inner.tooltip()
    }

    /// User gesture: the overlay was opened on the map.
    pub fn on_overlay_opened(&self) -> Transition {
        self.inner.on_overlay_opened()
    }

    /// User gesture: the overlay was closed on the map.
    pub fn on_overlay_closed(&self) -> Transition {
        self.inner.on_overlay_closed()
    }

    pub fn overlay_content(&self) -> OverlayContent<'_> {
        let flights = &self.inner.flights;
        if !self.has_flights() {
            return OverlayContent::NoFlights;
        }

        match self.inner.role {
            StationRole::Origin => OverlayContent::Schedule {
                title: "All Flights to Destination",
                role: StationRole::Origin,
                flights: &flights.departures,
                connections: &flights.connections,
            },
            StationRole::Destination if !flights.arrivals.is_empty() => OverlayContent::Schedule {
                title: "Arriving Flights",
                role: StationRole::Destination,
                flights: &flights.arrivals,
                connections: &flights.connections,
            },
            StationRole::Connection if !flights.connections.is_empty() => {
                OverlayContent::Schedule {
                    title: "Connecting Flights",
                    role: StationRole::Connection,
                    flights: &flights.departures,
                    connections: &[],
                }
            }
            _ => OverlayContent::Empty,
        }
    }
}

impl Drop for StationMarker {
    fn drop(&mut self) {
        let code = &self.inner.station.code;
        self.inner.cancel_reveal();
        if self.inner.coordinator.is_open(code) {
            self.inner.coordinator.release(code);
        }
        self.inner.engine.unmount_marker(code);
    }
}

impl MarkerInner {
    fn tooltip(&self) -> String {
        let label = self.station.label();
        match self.role {
            StationRole::Origin => format!("Click to view flights from {label}"),
            StationRole::Destination => format!("Click to view flights to {label}"),
            StationRole::Connection => format!("Click to view connections via {label}"),
        }
    }

    fn reveal_eligible(&self) -> bool {
        self.role == StationRole::Origin
            && self.flights.has_flights(self.role)
            && !self.open.get()
            && !self.dismissed.get()
            && self.coordinator.active().is_none()
            && !self.coordinator.is_suppressed()
    }

    fn cancel_reveal(&self) {
        if self.reveal.borrow_mut().take().is_some() {
            trace!("auto-reveal for {} cancelled", self.station.code);
        }
    }

    fn auto_reveal(&self) {
        // One-shot: the fired timer is spent either way
        self.reveal.borrow_mut().take();

        if self.open.get() || self.dismissed.get() {
            return;
        }
        let Some(_token) = InProgress::enter(&self.handling) else {
            return;
        };

        if self.coordinator.request_reveal(&self.station.code) == Transition::Opened {
            debug!("opened overlay for {} (origin) on initial load", self.station.code);
        }
    }

    fn on_overlay_opened(&self) -> Transition {
        let Some(_token) = InProgress::enter(&self.handling) else {
            return Transition::Reentrant;
        };

        self.open.set(true);
        self.cancel_reveal();
        debug!("overlay opened for {}", self.station.code);
        let transition = self.coordinator.request_open(&self.station.code);
        if transition == Transition::Ignored {
            // Refused during the suppression window; undo the gesture
            self.open.set(false);
            self.engine.close_overlay(&self.station.code);
        }
        transition
    }

    fn on_overlay_closed(&self) -> Transition {
        let Some(_token) = InProgress::enter(&self.handling) else {
            return Transition::Reentrant;
        };

        self.open.set(false);
        self.cancel_reveal();
        if self.role == StationRole::Origin {
            self.dismissed.set(true);
        }
        debug!("overlay closed for {}", self.station.code);

        if self.coordinator.is_open(&self.station.code) {
            self.coordinator.request_close(&self.station.code)
        } else {
            Transition::Unchanged
        }
    }

    /// Align the map with the coordinator. Engine callbacks triggered from
    /// here find `handling` set and do not echo back.
    fn on_event(&self, event: &OverlayEvent) {
        let _token = InProgress::enter(&self.handling);
        let code = &self.station.code;

        match event {
            OverlayEvent::Activated(active) => {
                self.cancel_reveal();
                if active == code && !self.open.get() {
                    self.open.set(true);
                    self.engine.open_overlay(code, self.offset);
                    debug!("opening overlay for {code} by coordinator");
                } else if active != code && self.open.get() {
                    self.open.set(false);
                    self.engine.close_overlay(code);
                    debug!("closing overlay for {code}, {active} took over");
                }
            }
            OverlayEvent::Cleared(closed) => {
                if closed == code && self.open.get() {
                    self.open.set(false);
                    self.engine.close_overlay(code);
                    debug!("closing overlay for {code} by coordinator");
                }
            }
            OverlayEvent::SuppressionStarted => self.cancel_reveal(),
            OverlayEvent::SuppressionLifted => {}
        }
    }
}
