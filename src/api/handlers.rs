use crate::api::extractors::{ApiJson, ApiQuery, ItemId};
use crate::api::format::{self, link_params, FieldSelection, PageLinks, PagedResponse};
use crate::api::routes::{ITEM_ROUTE, QUERY_VIA_ITEM_ROUTE, SEARCH_ROUTE, SEARCH_VIA_ITEM_ROUTE};
use crate::api::AppState;
use crate::error::Result;
use crate::handlers::{ItemRequest, RequestOrigin};
use crate::metrics::gather_metrics;
use crate::models::*;
use crate::search::{ItemSearchResults, SearchQuery};
use axum::{
    extract::State,
    http::{
        header::{CONTENT_TYPE, LOCATION},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Prometheus scrape endpoint
pub async fn metrics() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}

/// Parameters shared by the item reads; each route reads the ones it lists
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemParams {
    pub path: String,
    pub database: String,
    pub language: String,
    pub version: String,
    pub fields: String,
    pub include_standard_template_fields: bool,
    pub page: i64,
    pub page_size: i64,
}

impl ItemParams {
    fn scope(&self) -> ItemScope {
        ItemScope::new(&self.database, &self.language).with_version(&self.version)
    }

    fn selection(&self) -> FieldSelection {
        FieldSelection::new(&self.fields, self.include_standard_template_fields)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchParams {
    pub term: String,
    pub database: String,
    pub language: String,
    pub sorting: String,
    pub facet: String,
    pub fields: String,
    pub include_standard_template_fields: bool,
    pub page: i64,
    pub page_size: i64,
}

impl SearchParams {
    /// Parameters repeated in page links
    fn link_params(&self) -> Vec<(&'static str, String)> {
        let include = if self.include_standard_template_fields { "true" } else { "" };
        link_params([
            ("term", self.term.as_str()),
            ("database", self.database.as_str()),
            ("language", self.language.as_str()),
            ("sorting", self.sorting.as_str()),
            ("facet", self.facet.as_str()),
            ("fields", self.fields.as_str()),
            ("includeStandardTemplateFields", include),
        ])
    }
}

/// Coordinates for create, update and delete
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WriteParams {
    pub path: String,
    pub database: String,
    pub language: String,
    pub version: String,
}

impl WriteParams {
    fn scope(&self) -> ItemScope {
        ItemScope::new(&self.database, &self.language).with_version(&self.version)
    }
}

/// Clamp a requested page and page size
pub fn paging(page: i64, page_size: i64, default_page_size: usize) -> (usize, usize) {
    let page = usize::try_from(page).unwrap_or(0);
    let page_size = match usize::try_from(page_size) {
        Ok(size) if size > 0 => size,
        _ => default_page_size,
    };
    (page, page_size)
}

/// Get an item by id
pub async fn get_item(
    State(state): State<AppState>,
    origin: RequestOrigin,
    ItemId(id): ItemId,
    ApiQuery(params): ApiQuery<ItemParams>,
) -> Result<Json<Value>> {
    let request = ItemRequest::GetItemById(GetItemByIdQuery {
        id,
        scope: params.scope(),
    });
    let item: Item = state.dispatcher.dispatch_as(request, &origin).await?;

    Ok(Json(format::item_json(&item, &params.selection())))
}

/// Get an item by content path
pub async fn get_item_by_path(
    State(state): State<AppState>,
    origin: RequestOrigin,
    ApiQuery(params): ApiQuery<ItemParams>,
) -> Result<Json<Value>> {
    let request = ItemRequest::GetItemByContentPath(GetItemByContentPathQuery {
        path: params.path.clone(),
        scope: params.scope(),
    });
    let item: Item = state.dispatcher.dispatch_as(request, &origin).await?;

    Ok(Json(format::item_json(&item, &params.selection())))
}

/// List the children of an item
pub async fn get_children(
    State(state): State<AppState>,
    origin: RequestOrigin,
    ItemId(id): ItemId,
    ApiQuery(params): ApiQuery<ItemParams>,
) -> Result<Json<Vec<Value>>> {
    let request = ItemRequest::GetItemChildren(GetItemChildrenQuery {
        id,
        scope: params.scope(),
    });
    let children: Vec<Item> = state.dispatcher.dispatch_as(request, &origin).await?;

    Ok(Json(format::items_json(&children, &params.selection())))
}

/// Run the content-path query stored on an item
pub async fn query_via_item(
    State(state): State<AppState>,
    origin: RequestOrigin,
    headers: HeaderMap,
    ItemId(id): ItemId,
    ApiQuery(params): ApiQuery<ItemParams>,
) -> Result<Json<PagedResponse>> {
    let (page, page_size) = paging(params.page, params.page_size, state.default_page_size);
    let request = ItemRequest::QueryViaItem(QueryViaItemQuery {
        id,
        scope: params.scope(),
    });
    let items: Vec<Item> = state.dispatcher.dispatch_as(request, &origin).await?;

    let include = if params.include_standard_template_fields { "true" } else { "" };
    let builder = state.link_builder(&headers);
    let links = PageLinks {
        builder: &builder,
        route: &QUERY_VIA_ITEM_ROUTE,
        id: Some(id),
        params: link_params([
            ("database", params.database.as_str()),
            ("language", params.language.as_str()),
            ("version", params.version.as_str()),
            ("fields", params.fields.as_str()),
            ("includeStandardTemplateFields", include),
        ]),
    };

    Ok(Json(format::item_page(
        &items,
        page,
        page_size,
        &params.selection(),
        &links,
    )))
}

/// Search the index of a database
pub async fn search_items(
    State(state): State<AppState>,
    origin: RequestOrigin,
    headers: HeaderMap,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<PagedResponse>> {
    let (page, page_size) = paging(params.page, params.page_size, state.default_page_size);
    let query = SearchQuery {
        term: params.term.clone(),
        database: params.database.clone(),
        language: params.language.clone(),
        sorting: params.sorting.clone(),
        page,
        page_size,
        facet: params.facet.clone(),
        root: None,
    };
    let results: ItemSearchResults = state
        .dispatcher
        .dispatch_as(ItemRequest::Search(query), &origin)
        .await?;

    debug!(total = results.total_count, page, page_size, "Search page formatted");

    let builder = state.link_builder(&headers);
    let links = PageLinks {
        builder: &builder,
        route: &SEARCH_ROUTE,
        id: None,
        params: params.link_params(),
    };
    let selection = FieldSelection::new(&params.fields, params.include_standard_template_fields);

    Ok(Json(format::search_page(&results, page, page_size, &selection, &links)))
}

/// Search below an item using the settings saved on it
pub async fn search_via_item(
    State(state): State<AppState>,
    origin: RequestOrigin,
    headers: HeaderMap,
    ItemId(id): ItemId,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<PagedResponse>> {
    let (page, page_size) = paging(params.page, params.page_size, state.default_page_size);
    let query = SearchViaItemQuery {
        id,
        term: params.term.clone(),
        database: params.database.clone(),
        language: params.language.clone(),
        sorting: params.sorting.clone(),
        facet: params.facet.clone(),
        fields: params.fields.clone(),
        include_standard_template_fields: params.include_standard_template_fields,
        page,
        page_size,
    };
    let response: SearchViaItemResponse = state
        .dispatcher
        .dispatch_as(ItemRequest::SearchViaItem(query), &origin)
        .await?;

    let builder = state.link_builder(&headers);
    let links = PageLinks {
        builder: &builder,
        route: &SEARCH_VIA_ITEM_ROUTE,
        id: Some(id),
        params: params.link_params(),
    };
    let definition = &response.definition;
    let selection = FieldSelection::new(&definition.fields, definition.include_standard_template_fields);

    Ok(Json(format::search_page(
        &response.results,
        page,
        page_size,
        &selection,
        &links,
    )))
}

/// Create an item below `path`
pub async fn create_item(
    State(state): State<AppState>,
    origin: RequestOrigin,
    headers: HeaderMap,
    ApiQuery(params): ApiQuery<WriteParams>,
    ApiJson(model): ApiJson<ItemModel>,
) -> Result<Response> {
    let command = CreateItemCommand {
        path: params.path.clone(),
        model,
        scope: params.scope(),
    };
    let created: CreateItemResponse = state
        .dispatcher
        .dispatch_as(ItemRequest::CreateItem(command), &origin)
        .await?;

    let mut response = StatusCode::CREATED.into_response();

    let builder = state.link_builder(&headers);
    if builder.is_absolute() {
        let location = builder.href(
            &ITEM_ROUTE,
            Some(created.item_id),
            &[("database", created.database), ("language", created.language)],
        );
        if let Ok(value) = HeaderValue::from_str(&location) {
            response.headers_mut().insert(LOCATION, value);
        }
    }

    Ok(response)
}

/// Update an item's fields
pub async fn update_item(
    State(state): State<AppState>,
    origin: RequestOrigin,
    ItemId(id): ItemId,
    ApiQuery(params): ApiQuery<WriteParams>,
    ApiJson(model): ApiJson<ItemModel>,
) -> Result<StatusCode> {
    let command = UpdateItemCommand {
        id,
        model,
        scope: params.scope(),
    };
    state
        .dispatcher
        .dispatch_as::<()>(ItemRequest::UpdateItem(command), &origin)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Delete an item and its descendants
pub async fn delete_item(
    State(state): State<AppState>,
    origin: RequestOrigin,
    ItemId(id): ItemId,
    ApiQuery(params): ApiQuery<WriteParams>,
) -> Result<StatusCode> {
    let command = DeleteItemCommand {
        id,
        scope: params.scope(),
    };
    state
        .dispatcher
        .dispatch_as::<()>(ItemRequest::DeleteItem(command), &origin)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paging_defaults() {
        assert_eq!(paging(0, 0, 10), (0, 10));
        assert_eq!(paging(2, -5, 10), (2, 10));
        assert_eq!(paging(-1, 25, 10), (0, 25));
    }

    #[test]
    fn test_search_params_binding() {
        let params: SearchParams = serde_json::from_value(serde_json::json!({
            "term": "lorem",
            "pageSize": 5,
            "includeStandardTemplateFields": true
        }))
        .unwrap();

        assert_eq!(params.term, "lorem");
        assert_eq!(params.page_size, 5);
        assert!(params.include_standard_template_fields);

        let link_params = params.link_params();
        assert_eq!(
            link_params,
            vec![
                ("term", "lorem".to_string()),
                ("includeStandardTemplateFields", "true".to_string())
            ]
        );
    }
}
