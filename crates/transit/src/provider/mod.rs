//! Route-data providers.
//!
//! The map layer never fetches anything itself; it awaits a provider and
//! treats whatever comes back as already validated.

pub mod static_provider;

use std::future::Future;
use std::pin::Pin;

use crate::models::types::{Result, RouteQuery, RouteSet};

pub use static_provider::StaticRouteProvider;

/// Fetch the direct and multi-leg routes for an origin/destination pair
pub trait RouteProvider {
    fn fetch<'a>(
        &'a self,
        query: &'a RouteQuery,
    ) -> Pin<Box<dyn Future<Output = Result<RouteSet>> + 'a>>;
}
