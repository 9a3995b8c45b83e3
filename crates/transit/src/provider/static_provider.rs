//! In-memory route provider.
//!
//! Holds pre-built route sets keyed by query. Useful for offline previews and
//! for tests that need a provider without a network.

use std::collections::HashMap;
use std::future::{self, Future};
use std::pin::Pin;

use crate::models::types::*;
use crate::provider::RouteProvider;

#[derive(Default)]
pub struct StaticRouteProvider {
    routes: HashMap<RouteQuery, RouteSet>,
    failures: HashMap<RouteQuery, String>,
}

impl StaticRouteProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_routes(mut self, query: RouteQuery, routes: RouteSet) -> Self {
        self.insert(query, routes);
        self
    }

    pub fn insert(&mut self, query: RouteQuery, routes: RouteSet) {
        self.failures.remove(&query);
        self.routes.insert(query, routes);
    }

    /// Make every fetch for `query` fail with `reason`
    pub fn fail(&mut self, query: RouteQuery, reason: impl Into<String>) {
        self.routes.remove(&query);
        self.failures.insert(query, reason.into());
    }

    fn lookup(&self, query: &RouteQuery) -> Result<RouteSet> {
        if let Some(reason) = self.failures.get(query) {
            return Err(TransitError::Unavailable {
                query: query.clone(),
                reason: reason.clone(),
            });
        }

        // Unknown pairs simply have no flights
        let routes = self.routes.get(query).cloned().unwrap_or_default();
        routes.validate()?;
        Ok(routes)
    }
}

impl RouteProvider for StaticRouteProvider {
    fn fetch<'a>(
        &'a self,
        query: &'a RouteQuery,
    ) -> Pin<Box<dyn Future<Output = Result<RouteSet>> + 'a>> {
        Box::pin(future::ready(self.lookup(query)))
    }
}
