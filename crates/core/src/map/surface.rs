//! Composition root: one viewport, one coordinator, a marker per station
//! and a path per flown leg.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use skyroute_transit::{
    RouteIdentifier, RouteProvider, RouteQuery, RouteSet, Station, StationCode, StationRole,
};
use tracing::{debug, info, warn};

use crate::annotation::{
    coordinator::{OverlayCoordinator, OverlayEvent, Subscription, Transition},
    marker::StationMarker,
};
use crate::config::AnnotationConfig;
use crate::map::engine::MapEngine;
use crate::map::route::{PathSegment, RouteRenderer, SelectedRoute, SelectionState};

/// Non-blocking messages for the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    NoRoutesFound(RouteQuery),
    SearchFailed(String),
}

/// Events the surface reports upwards. Every method defaults to a no-op.
///
/// Callbacks run synchronously; coordinator requests issued from
/// `on_overlay_activation_change` are dropped as reentrant.
pub trait SurfaceListener {
    fn on_overlay_activation_change(&self, _active: Option<&StationCode>) {}
    fn on_route_select(&self, _route: &SelectedRoute) {}
    fn on_notice(&self, _notice: &Notice) {}
}

#[derive(Default)]
struct SurfaceContent {
    query: Option<RouteQuery>,
    renderer: Option<RouteRenderer>,
    markers: Vec<Rc<StationMarker>>,
}

pub struct MapSurface {
    config: AnnotationConfig,
    engine: Rc<dyn MapEngine>,
    listener: Rc<dyn SurfaceListener>,
    coordinator: Rc<OverlayCoordinator>,
    content: RefCell<SurfaceContent>,
    selection: RefCell<SelectionState>,
    loading: Cell<bool>,
    _activation: Subscription,
}

impl MapSurface {
    /// Create the viewport. Must run inside a `LocalSet`.
    pub fn mount(
        engine: Rc<dyn MapEngine>,
        listener: Rc<dyn SurfaceListener>,
        config: AnnotationConfig,
    ) -> Self {
        let coordinator = OverlayCoordinator::new(config.clone());

        let upward = Rc::clone(&listener);
        let activation = coordinator.subscribe(move |event| match event {
            OverlayEvent::Activated(code) => upward.on_overlay_activation_change(Some(code)),
            OverlayEvent::Cleared(_) => upward.on_overlay_activation_change(None),
            OverlayEvent::SuppressionStarted | OverlayEvent::SuppressionLifted => {}
        });

        let view = config.initial_view;
        engine.set_view(view.center(), view.zoom);

        Self {
            config,
            engine,
            listener,
            coordinator,
            content: RefCell::new(SurfaceContent::default()),
            selection: RefCell::new(SelectionState::default()),
            loading: Cell::new(false),
            _activation: activation,
        }
    }

    pub fn coordinator(&self) -> &Rc<OverlayCoordinator> {
        &self.coordinator
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    pub fn query(&self) -> Option<RouteQuery> {
        self.content.borrow().query.clone()
    }

    // ========================================================================
    // Data lifecycle
    // ========================================================================

    /// Fetch routes for `query` and replace whatever the surface shows.
    ///
    /// # Panics
    ///
    /// Panics if the result arms an auto-reveal outside a
    /// [`tokio::task::LocalSet`].
    pub async fn search(&self, provider: &dyn RouteProvider, query: RouteQuery) {
        info!("searching flights {query}");
        self.clear();
        self.loading.set(true);

        let result = provider.fetch(&query).await;
        self.loading.set(false);

        match result.and_then(|routes| routes.validate().map(|()| routes)) {
            Ok(routes) => self.load(query, routes),
            Err(err) => {
                warn!("search for {query} failed: {err}");
                self.listener
                    .on_notice(&Notice::SearchFailed(err.to_string()));
            }
        }
    }

    /// Show `routes` as the result of `query`.
    ///
    /// # Panics
    ///
    /// Panics if an origin arms its auto-reveal outside a
    /// [`tokio::task::LocalSet`].
    pub fn load(&self, query: RouteQuery, routes: RouteSet) {
        self.clear();

        info!(
            "loaded {} direct and {} connecting flights for {query}",
            routes.direct_routes.len(),
            routes.multi_leg_routes.len()
        );
        for itinerary in &routes.multi_leg_routes {
            debug!("itinerary {} with {} legs", itinerary.id, itinerary.leg_count());
        }

        let empty = routes.is_empty();
        let renderer = RouteRenderer::new(routes, self.config.default_direct_price);
        let stations = renderer.stations();

        let markers: Vec<Rc<StationMarker>> = stations
            .iter()
            .map(|station| {
                let role = query.role_of(&station.code);
                let other = Self::paired_station(&stations, &query, role);
                Rc::new(StationMarker::mount(
                    station.clone(),
                    role,
                    other,
                    renderer.flights_for(&station.code),
                    Rc::clone(&self.coordinator),
                    Rc::clone(&self.engine),
                ))
            })
            .collect();

        {
            let mut content = self.content.borrow_mut();
            content.query = Some(query.clone());
            content.renderer = Some(renderer);
            content.markers = markers;
        }
        self.redraw_paths();

        if empty {
            self.listener.on_notice(&Notice::NoRoutesFound(query));
        }
    }

    /// Unmount every marker and path and close any overlay.
    pub fn clear(&self) {
        let markers = {
            let mut content = self.content.borrow_mut();
            content.query = None;
            content.renderer = None;
            std::mem::take(&mut content.markers)
        };
        self.coordinator.reset();
        // Dropping unmounts and cancels pending reveals
        drop(markers);
        self.engine.clear_paths();
    }

    fn paired_station<'a>(
        stations: &'a [Station],
        query: &RouteQuery,
        role: StationRole,
    ) -> Option<&'a Station> {
        let code = match role {
            StationRole::Origin => &query.destination,
            StationRole::Destination => &query.origin,
            StationRole::Connection => return None,
        };
        stations.iter().find(|s| s.code == *code)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn stations(&self) -> Vec<Station> {
        self.content
            .borrow()
            .markers
            .iter()
            .map(|m| m.station().clone())
            .collect()
    }

    pub fn segments(&self) -> Vec<PathSegment> {
        let content = self.content.borrow();
        match &content.renderer {
            Some(renderer) => renderer.segments(&self.selection.borrow()),
            None => Vec::new(),
        }
    }

    pub fn marker(&self, code: &StationCode) -> Option<Rc<StationMarker>> {
        self.content
            .borrow()
            .markers
            .iter()
            .find(|m| m.code() == code)
            .cloned()
    }

    pub fn active_overlay(&self) -> Option<StationCode> {
        self.coordinator.active()
    }

    pub fn selected_route(&self) -> Option<RouteIdentifier> {
        self.selection.borrow().selected().cloned()
    }

    // ========================================================================
    // User interaction
    // ========================================================================

    /// The map reported that the user opened the overlay of `code`.
    pub fn overlay_opened(&self, code: &StationCode) -> Transition {
        match self.marker(code) {
            Some(marker) => marker.on_overlay_opened(),
            None => Transition::Ignored,
        }
    }

    /// The map reported that the user closed the overlay of `code`.
    pub fn overlay_closed(&self, code: &StationCode) -> Transition {
        match self.marker(code) {
            Some(marker) => marker.on_overlay_closed(),
            None => Transition::Ignored,
        }
    }

    /// The user picked a path segment (or an itinerary elsewhere in the UI).
    pub fn select_route(&self, id: RouteIdentifier) -> Option<SelectedRoute> {
        let found = self
            .content
            .borrow()
            .renderer
            .as_ref()
            .and_then(|renderer| renderer.find(&id));

        debug!("selected route {id}");
        self.selection.borrow_mut().select(id);
        self.redraw_paths();

        if let Some(route) = &found {
            self.listener.on_route_select(route);
        }
        found
    }

    fn redraw_paths(&self) {
        let segments = self.segments();
        self.engine.clear_paths();
        for segment in &segments {
            self.engine.draw_path(segment);
        }
    }
}

impl Drop for MapSurface {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::engine::testing::{EngineCall, RecordingEngine};
    use crate::map::route::fixtures::*;
    use skyroute_transit::StaticRouteProvider;
    use std::time::Duration;
    use tokio::task::LocalSet;

    #[derive(Default)]
    struct RecordingListener {
        activations: RefCell<Vec<Option<String>>>,
        selections: RefCell<Vec<String>>,
        notices: RefCell<Vec<Notice>>,
    }

    impl SurfaceListener for RecordingListener {
        fn on_overlay_activation_change(&self, active: Option<&StationCode>) {
            self.activations
                .borrow_mut()
                .push(active.map(|c| c.to_string()));
        }

        fn on_route_select(&self, route: &SelectedRoute) {
            self.selections.borrow_mut().push(route.id().to_string());
        }

        fn on_notice(&self, notice: &Notice) {
            self.notices.borrow_mut().push(notice.clone());
        }
    }

    struct Harness {
        engine: Rc<RecordingEngine>,
        listener: Rc<RecordingListener>,
        surface: MapSurface,
    }

    fn harness() -> Harness {
        let engine = Rc::new(RecordingEngine::default());
        let listener = Rc::new(RecordingListener::default());
        let surface = MapSurface::mount(
            Rc::clone(&engine) as Rc<dyn MapEngine>,
            Rc::clone(&listener) as Rc<dyn SurfaceListener>,
            AnnotationConfig::default(),
        );
        Harness {
            engine,
            listener,
            surface,
        }
    }

    fn query() -> RouteQuery {
        RouteQuery::new("LHR", "HND")
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_sets_initial_view() {
        LocalSet::new()
            .run_until(async {
                let h = harness();
                assert_eq!(h.engine.calls(), vec![EngineCall::SetView { zoom: 2 }]);
                assert!(h.surface.stations().is_empty());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_mounts_markers_and_paths() {
        LocalSet::new()
            .run_until(async {
                let h = harness();
                h.surface.load(query(), london_tokyo());

                let codes: Vec<_> = h
                    .surface
                    .stations()
                    .iter()
                    .map(|s| s.code.to_string())
                    .collect();
                assert_eq!(codes, vec!["LHR", "HND", "DXB"]);

                let role = |code: &str| h.surface.marker(&code.into()).unwrap().role();
                assert_eq!(role("LHR"), StationRole::Origin);
                assert_eq!(role("HND"), StationRole::Destination);
                assert_eq!(role("DXB"), StationRole::Connection);

                let draws = h
                    .engine
                    .calls()
                    .into_iter()
                    .filter(|c| matches!(c, EngineCall::Draw { .. }))
                    .count();
                assert_eq!(draws, 3);
                assert!(h.listener.notices.borrow().is_empty());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_origin_auto_reveal_on_load() {
        LocalSet::new()
            .run_until(async {
                let h = harness();
                h.surface.load(query(), london_tokyo());

                assert!(h.surface.marker(&"LHR".into()).unwrap().reveal_pending());
                assert!(!h.surface.marker(&"HND".into()).unwrap().reveal_pending());

                tokio::time::sleep(ms(7501)).await;
                assert_eq!(h.surface.active_overlay(), Some("LHR".into()));
                assert_eq!(*h.listener.activations.borrow(), vec![Some("LHR".to_string())]);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_active_across_surface() {
        LocalSet::new()
            .run_until(async {
                let h = harness();
                h.surface.load(query(), london_tokyo());

                for code in ["DXB", "HND", "LHR", "DXB"] {
                    h.surface.overlay_opened(&code.into());
                    let open: Vec<_> = ["LHR", "HND", "DXB"]
                        .into_iter()
                        .filter(|c| h.surface.marker(&(*c).into()).unwrap().is_open())
                        .collect();
                    assert_eq!(open, vec![code]);
                }

                assert_eq!(h.surface.overlay_closed(&"DXB".into()), Transition::Closed);
                assert_eq!(h.surface.active_overlay(), None);
                assert_eq!(
                    h.listener.activations.borrow().last().cloned(),
                    Some(None)
                );
                assert_eq!(h.surface.overlay_opened(&"JFK".into()), Transition::Ignored);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_route_highlights_and_reports() {
        LocalSet::new()
            .run_until(async {
                let h = harness();
                h.surface.load(query(), london_tokyo());
                h.engine.take_calls();

                let picked = h.surface.select_route("EK312".into());
                assert!(matches!(picked, Some(SelectedRoute::Leg { .. })));
                assert_eq!(*h.listener.selections.borrow(), vec!["EK312".to_string()]);

                let calls = h.engine.take_calls();
                assert_eq!(calls.first(), Some(&EngineCall::ClearPaths));
                let lit: Vec<_> = calls
                    .iter()
                    .filter_map(|c| match c {
                        EngineCall::Draw { route, highlighted: true } => Some(route.as_str()),
                        _ => None,
                    })
                    .collect();
                assert_eq!(lit, vec!["EK2", "EK312"]);

                assert_eq!(h.surface.select_route("gone".into()), None);
                assert!(h.surface.segments().iter().all(|s| !s.highlighted));
                assert_eq!(h.surface.selected_route(), Some("gone".into()));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_replaces_previous_result() {
        LocalSet::new()
            .run_until(async {
                let h = harness();
                let provider = StaticRouteProvider::new().with_routes(query(), london_tokyo());

                h.surface.search(&provider, query()).await;
                assert!(!h.surface.is_loading());
                assert_eq!(h.surface.stations().len(), 3);

                h.surface.overlay_opened(&"HND".into());
                tokio::time::sleep(ms(1000)).await;

                let other = RouteQuery::new("CDG", "HND");
                h.surface.search(&provider, other.clone()).await;

                assert!(h.surface.stations().is_empty());
                assert_eq!(h.surface.active_overlay(), None);
                assert_eq!(h.surface.coordinator().subscriber_count(), 1);
                assert_eq!(
                    *h.listener.notices.borrow(),
                    vec![Notice::NoRoutesFound(other)]
                );

                // The first result's reveal died with its markers
                tokio::time::sleep(ms(10_000)).await;
                assert_eq!(h.surface.active_overlay(), None);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_search_leaves_surface_empty() {
        LocalSet::new()
            .run_until(async {
                let h = harness();
                h.surface.load(query(), london_tokyo());

                let mut provider = StaticRouteProvider::new();
                provider.fail(query(), "rate limited");
                h.surface.search(&provider, query()).await;

                assert!(h.surface.stations().is_empty());
                assert!(h.surface.segments().is_empty());
                assert_eq!(h.surface.query(), None);
                match h.listener.notices.borrow().as_slice() {
                    [Notice::SearchFailed(message)] => assert!(message.contains("rate limited")),
                    other => panic!("unexpected notices {other:?}"),
                }
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_unmounts_everything() {
        LocalSet::new()
            .run_until(async {
                let h = harness();
                h.surface.load(query(), london_tokyo());
                let engine = Rc::clone(&h.engine);
                drop(h);

                let unmounted = engine
                    .calls()
                    .into_iter()
                    .filter(|c| matches!(c, EngineCall::Unmount(_)))
                    .count();
                assert_eq!(unmounted, 3);
            })
            .await;
    }
}
