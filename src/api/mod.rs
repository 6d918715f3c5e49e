pub mod extractors;
pub mod format;
pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::handlers::Dispatcher;
use crate::search::DEFAULT_PAGE_SIZE;
use axum::http::{header::HOST, HeaderMap};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,

    /// Prefix the item routes are mounted under
    pub route_base: String,

    /// Page size used when a request asks for zero or fewer items
    pub default_page_size: usize,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, route_base: impl Into<String>) -> Self {
        Self {
            dispatcher,
            route_base: route_base.into(),
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_default_page_size(mut self, page_size: usize) -> Self {
        if page_size > 0 {
            self.default_page_size = page_size;
        }
        self
    }

    /// Link builder for a request, absolute when it carried a `Host` header
    pub fn link_builder(&self, headers: &HeaderMap) -> LinkBuilder {
        let host = headers
            .get(HOST)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty());
        LinkBuilder::new(host, &self.route_base)
    }
}
