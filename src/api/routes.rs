use crate::api::{handlers, AppState};
use axum::{
    routing::{get, MethodRouter},
    Router,
};
use reqwest::Url;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use uuid::Uuid;

/// Handler set mounted on a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAction {
    QueryViaItem,
    Search,
    SearchViaItem,
    Children,
    /// Get, update and delete by id
    Item,
    /// Get by path and create
    ContentPath,
}

/// A named item-service route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDefinition {
    pub name: &'static str,

    /// Path below the route base; `:id` is the item id segment
    pub template: &'static str,

    pub action: RouteAction,
}

impl RouteDefinition {
    /// Path below the route base with `id` substituted
    pub fn path(&self, id: Option<Uuid>) -> String {
        match id {
            Some(id) => self.template.replace(":id", &id.to_string()),
            None => self.template.to_string(),
        }
    }

    fn method_router(&self) -> MethodRouter<AppState> {
        match self.action {
            RouteAction::QueryViaItem => get(handlers::query_via_item),
            RouteAction::Search => get(handlers::search_items),
            RouteAction::SearchViaItem => get(handlers::search_via_item),
            RouteAction::Children => get(handlers::get_children),
            RouteAction::Item => get(handlers::get_item)
                .patch(handlers::update_item)
                .delete(handlers::delete_item),
            RouteAction::ContentPath => get(handlers::get_item_by_path).post(handlers::create_item),
        }
    }
}

pub const QUERY_VIA_ITEM_ROUTE: RouteDefinition = RouteDefinition {
    name: "ItemService-QueryViaItem",
    template: "/item/:id/query",
    action: RouteAction::QueryViaItem,
};

pub const SEARCH_ROUTE: RouteDefinition = RouteDefinition {
    name: "ItemService-Search",
    template: "/item/search",
    action: RouteAction::Search,
};

pub const SEARCH_VIA_ITEM_ROUTE: RouteDefinition = RouteDefinition {
    name: "ItemService-SearchViaItem",
    template: "/item/:id/search",
    action: RouteAction::SearchViaItem,
};

pub const CHILDREN_ROUTE: RouteDefinition = RouteDefinition {
    name: "ItemService-Children",
    template: "/item/:id/children",
    action: RouteAction::Children,
};

pub const ITEM_ROUTE: RouteDefinition = RouteDefinition {
    name: "ItemService",
    template: "/item/:id",
    action: RouteAction::Item,
};

pub const CONTENT_PATH_ROUTE: RouteDefinition = RouteDefinition {
    name: "ItemService-ContentPath",
    template: "/item",
    action: RouteAction::ContentPath,
};

/// Every item route, mounted by `build_router`
pub const ROUTES: [RouteDefinition; 6] = [
    QUERY_VIA_ITEM_ROUTE,
    SEARCH_ROUTE,
    SEARCH_VIA_ITEM_ROUTE,
    CHILDREN_ROUTE,
    ITEM_ROUTE,
    CONTENT_PATH_ROUTE,
];

/// Builds hrefs for route links.
///
/// Links are absolute when the request named a host, relative otherwise.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    origin: Option<Url>,
    route_base: String,
}

impl LinkBuilder {
    pub fn new(host: Option<&str>, route_base: &str) -> Self {
        Self {
            origin: host.and_then(|host| Url::parse(&format!("http://{}", host)).ok()),
            route_base: route_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn is_absolute(&self) -> bool {
        self.origin.is_some()
    }

    pub fn href(&self, route: &RouteDefinition, id: Option<Uuid>, params: &[(&str, String)]) -> String {
        let path = format!("{}{}", self.route_base, route.path(id));
        let query = match Url::parse("http://localhost/") {
            Ok(mut scratch) if !params.is_empty() => {
                scratch
                    .query_pairs_mut()
                    .extend_pairs(params.iter().map(|(key, value)| (*key, value.as_str())));
                scratch.query().map(str::to_string)
            }
            _ => None,
        };

        let relative = match query {
            Some(query) => format!("{}?{}", path, query),
            None => path,
        };

        match self.origin {
            Some(ref origin) => origin
                .join(&relative)
                .map(|url| url.to_string())
                .unwrap_or(relative),
            None => relative,
        }
    }
}

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    let items = ROUTES.iter().fold(Router::new(), |router, route| {
        tracing::debug!(route = route.name, path = route.template, "Mounting item route");
        router.route(route.template, route.method_router())
    });

    let route_base = state.route_base.trim_end_matches('/').to_string();
    let api = if route_base.is_empty() {
        items
    } else {
        Router::new().nest(&route_base, items)
    };

    Router::new()
        // Health and metrics endpoints
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .merge(api)
        // Add state
        .with_state(state)
        // Add middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_paths() {
        let id = Uuid::new_v4();
        assert_eq!(CHILDREN_ROUTE.path(Some(id)), format!("/item/{}/children", id));
        assert_eq!(SEARCH_ROUTE.path(None), "/item/search");
        assert_eq!(ROUTES.iter().filter(|r| r.template.contains(":id")).count(), 4);

        let mut names: Vec<&str> = ROUTES.iter().map(|r| r.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ROUTES.len());
    }

    #[test]
    fn test_relative_links_without_host() {
        let links = LinkBuilder::new(None, "/sitecore/api/ssc/");
        let href = links.href(
            &SEARCH_ROUTE,
            None,
            &[("term", "lorem ipsum".to_string()), ("page", "1".to_string())],
        );
        assert_eq!(href, "/sitecore/api/ssc/item/search?term=lorem+ipsum&page=1");
        assert!(!links.is_absolute());
    }

    #[test]
    fn test_absolute_links_with_host() {
        let id = Uuid::new_v4();
        let links = LinkBuilder::new(Some("cms.example.com:8080"), "/sitecore/api/ssc");
        let href = links.href(&ITEM_ROUTE, Some(id), &[("database", "web".to_string())]);
        assert_eq!(
            href,
            format!("http://cms.example.com:8080/sitecore/api/ssc/item/{}?database=web", id)
        );
    }
}
