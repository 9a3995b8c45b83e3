//! Single-active-overlay arbitration.
//!
//! One [`OverlayCoordinator`] exists per mounted surface. It owns the only
//! shared mutable state of the layer (which station's overlay is open and
//! whether auto-reveal is suppressed) and fans every change out to its
//! subscribers before the triggering call returns.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use skyroute_transit::{StationCode, StationRole};
use tracing::{debug, trace};

use crate::annotation::{InProgress, timer::Timer};
use crate::config::AnnotationConfig;

/// Change broadcast to every subscriber.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OverlayEvent {
    /// `code` now owns the single open overlay
    Activated(StationCode),
    /// The overlay of `code` was closed and nothing is open
    Cleared(StationCode),
    SuppressionStarted,
    SuppressionLifted,
}

/// Outcome of a coordinator operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Opened,
    Closed,
    /// The request matched the current state
    Unchanged,
    /// A guard refused the request (wrong owner, suppressed, already taken)
    Ignored,
    /// Issued from inside a notification and dropped
    Reentrant,
}

/// The shared `activeKey` / `suppressed` pair.
#[derive(Debug, Default)]
struct OverlayRequestState {
    active: Option<StationCode>,
    suppressed: bool,
    suppression_timer: Option<Timer>,
}

type Callback = Rc<dyn Fn(&OverlayEvent)>;

struct Subscriber {
    station: Option<(StationCode, StationRole)>,
    callback: Callback,
}

pub struct OverlayCoordinator {
    config: AnnotationConfig,
    this: Weak<OverlayCoordinator>,
    state: RefCell<OverlayRequestState>,
    subscribers: RefCell<BTreeMap<u64, Subscriber>>,
    next_subscriber: Cell<u64>,
    dispatching: Cell<bool>,
}

impl OverlayCoordinator {
    pub fn new(config: AnnotationConfig) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            config,
            this: this.clone(),
            state: RefCell::new(OverlayRequestState::default()),
            subscribers: RefCell::new(BTreeMap::new()),
            next_subscriber: Cell::new(0),
            dispatching: Cell::new(false),
        })
    }

    pub fn config(&self) -> &AnnotationConfig {
        &self.config
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Register a station. Its role decides whether closing it starts the
    /// suppression window.
    pub fn subscribe_station(
        &self,
        code: StationCode,
        role: StationRole,
        callback: impl Fn(&OverlayEvent) + 'static,
    ) -> Subscription {
        self.insert_subscriber(Some((code, role)), Rc::new(callback))
    }

    /// Register a passive observer
    pub fn subscribe(&self, callback: impl Fn(&OverlayEvent) + 'static) -> Subscription {
        self.insert_subscriber(None, Rc::new(callback))
    }

    fn insert_subscriber(
        &self,
        station: Option<(StationCode, StationRole)>,
        callback: Callback,
    ) -> Subscription {
        let id = self.next_subscriber.get();
        self.next_subscriber.set(id + 1);
        self.subscribers
            .borrow_mut()
            .insert(id, Subscriber { station, callback });

        Subscription {
            coordinator: self.this.clone(),
            id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    fn role_of(&self, code: &StationCode) -> Option<StationRole> {
        let subscribers = self.subscribers.borrow();
        let mut roles = subscribers
            .values()
            .filter_map(|s| s.station.as_ref())
            .filter(|(c, _)| c == code)
            .map(|(_, role)| *role);
        // Duplicate registrations: any origin wins
        let first = roles.next()?;
        Some(if roles.any(|r| r == StationRole::Origin) {
            StationRole::Origin
        } else {
            first
        })
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn is_open(&self, code: &StationCode) -> bool {
        self.state.borrow().active.as_ref() == Some(code)
    }

    pub fn is_suppressed(&self) -> bool {
        self.state.borrow().suppressed
    }

    pub fn active(&self) -> Option<StationCode> {
        self.state.borrow().active.clone()
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Give `code` the single open overlay, closing whichever one held it.
    pub fn request_open(&self, code: &StationCode) -> Transition {
        if self.dispatching.get() {
            trace!("ignoring nested open request for {code}");
            return Transition::Reentrant;
        }

        {
            let mut state = self.state.borrow_mut();
            if state.active.as_ref() == Some(code) {
                return Transition::Unchanged;
            }
            if state.suppressed && self.config.suppression_blocks_manual_open {
                debug!("open request for {code} refused during suppression window");
                return Transition::Ignored;
            }
            state.active = Some(code.clone());
        }

        debug!("overlay opened for {code}");
        self.dispatch(&[OverlayEvent::Activated(code.clone())]);
        Transition::Opened
    }

    /// Close the overlay of `code` if it is the open one.
    ///
    /// Closing an origin starts the suppression window.
    pub fn request_close(&self, code: &StationCode) -> Transition {
        if self.dispatching.get() {
            trace!("ignoring nested close request for {code}");
            return Transition::Reentrant;
        }

        let suppress = self.role_of(code) == Some(StationRole::Origin);
        {
            let mut state = self.state.borrow_mut();
            if state.active.as_ref() != Some(code) {
                return Transition::Ignored;
            }
            state.active = None;
            if suppress {
                state.suppressed = true;
                // Replacing an armed timer restarts the window
                state.suppression_timer = Some(self.arm_suppression_timer());
            }
        }

        debug!("overlay closed for {code}");
        if suppress {
            debug!(
                "auto-reveal suppressed for {}ms",
                self.config.suppression_window_ms
            );
            self.dispatch(&[
                OverlayEvent::Cleared(code.clone()),
                OverlayEvent::SuppressionStarted,
            ]);
        } else {
            self.dispatch(&[OverlayEvent::Cleared(code.clone())]);
        }
        Transition::Closed
    }

    /// Drop the overlay of `code` without starting suppression, e.g. when its
    /// station is unmounted while open.
    pub fn release(&self, code: &StationCode) -> Transition {
        if self.dispatching.get() {
            trace!("ignoring nested release of {code}");
            return Transition::Reentrant;
        }

        {
            let mut state = self.state.borrow_mut();
            if state.active.as_ref() != Some(code) {
                return Transition::Ignored;
            }
            state.active = None;
        }

        debug!("overlay for {code} released");
        self.dispatch(&[OverlayEvent::Cleared(code.clone())]);
        Transition::Closed
    }

    /// Timed auto-reveal. Only succeeds while nothing is open and the
    /// suppression window is not running.
    pub fn request_reveal(&self, code: &StationCode) -> Transition {
        if self.dispatching.get() {
            return Transition::Reentrant;
        }

        {
            let mut state = self.state.borrow_mut();
            if state.active.as_ref() == Some(code) {
                return Transition::Unchanged;
            }
            if state.suppressed || state.active.is_some() {
                debug!("auto-reveal for {code} blocked");
                return Transition::Ignored;
            }
            state.active = Some(code.clone());
        }

        debug!("overlay auto-revealed for {code}");
        self.dispatch(&[OverlayEvent::Activated(code.clone())]);
        Transition::Opened
    }

    /// Forget the open overlay and any suppression, e.g. before a new search.
    pub fn reset(&self) -> Transition {
        if self.dispatching.get() {
            return Transition::Reentrant;
        }

        let (closed, timer) = {
            let mut state = self.state.borrow_mut();
            state.suppressed = false;
            (state.active.take(), state.suppression_timer.take())
        };
        drop(timer);

        match closed {
            Some(code) => {
                debug!("overlay for {code} cleared by reset");
                self.dispatch(&[OverlayEvent::Cleared(code)]);
                Transition::Closed
            }
            None => Transition::Unchanged,
        }
    }

    fn arm_suppression_timer(&self) -> Timer {
        let coordinator = self.this.clone();
        Timer::after(self.config.suppression_window(), move || {
            if let Some(coordinator) = coordinator.upgrade() {
                coordinator.lift_suppression();
            }
        })
    }

    fn lift_suppression(&self) {
        let timer = {
            let mut state = self.state.borrow_mut();
            if !state.suppressed {
                return;
            }
            state.suppressed = false;
            state.suppression_timer.take()
        };
        // This is the timer currently running us; aborting it is a no-op now
        drop(timer);

        debug!("suppression window elapsed");
        self.dispatch(&[OverlayEvent::SuppressionLifted]);
    }

    fn dispatch(&self, events: &[OverlayEvent]) {
        let Some(_token) = InProgress::enter(&self.dispatching) else {
            return;
        };

        let callbacks: Vec<Callback> = self
            .subscribers
            .borrow()
            .values()
            .map(|s| Rc::clone(&s.callback))
            .collect();

        for event in events {
            trace!(?event, subscribers = callbacks.len(), "dispatching");
            for callback in &callbacks {
                callback(event);
            }
        }
    }
}

/// Keeps a subscriber registered until dropped.
pub struct Subscription {
    coordinator: Weak<OverlayCoordinator>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(coordinator) = self.coordinator.upgrade() {
            coordinator.subscribers.borrow_mut().remove(&self.id);
        }
    }
}
