//! Search handlers

use crate::error::{invalid_parameter_message, ServiceError};
use crate::handlers::{unexpected_request, ItemRequest, ItemResponse, QueryKind, RequestHandler};
use crate::models::{Item, ItemScope, SearchDefinition, SearchViaItemQuery, SearchViaItemResponse};
use crate::search::{ItemSearch, SearchQuery};
use crate::state::ItemRepository;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Fields a search-definition item may set
mod definition_fields {
    pub const ROOT_ITEM: &str = "RootItem";
    pub const DATABASE: &str = "Database";
    pub const LANGUAGE: &str = "Language";
    pub const SORTING: &str = "Sorting";
    pub const FACET: &str = "Facet";
    pub const FIELDS: &str = "Fields";
    pub const INCLUDE_STANDARD_TEMPLATE_FIELDS: &str = "IncludeStandardTemplateFields";
}

pub struct SearchHandler {
    search: Arc<ItemSearch>,
}

impl SearchHandler {
    pub fn new(search: Arc<ItemSearch>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl RequestHandler for SearchHandler {
    async fn handle(&self, request: ItemRequest) -> Result<ItemResponse, ServiceError> {
        let query = match request {
            ItemRequest::Search(query) => query,
            other => return Err(unexpected_request(QueryKind::Search, &other)),
        };

        let results = self.search.search(&query).await?;
        Ok(ItemResponse::SearchResults(results))
    }
}

/// Searches with the settings saved on a definition item
pub struct SearchViaItemHandler {
    repository: Arc<dyn ItemRepository>,
    search: Arc<ItemSearch>,
}

impl SearchViaItemHandler {
    pub fn new(repository: Arc<dyn ItemRepository>, search: Arc<ItemSearch>) -> Self {
        Self { repository, search }
    }
}

fn non_empty<'a>(item: &'a Item, field: &str) -> Option<&'a str> {
    item.field(field).map(str::trim).filter(|value| !value.is_empty())
}

/// Apply a definition item's saved settings over the request's own
pub fn resolve_definition(
    item: &Item,
    query: &SearchViaItemQuery,
) -> Result<SearchDefinition, ServiceError> {
    use self::definition_fields::*;

    let root = match non_empty(item, ROOT_ITEM) {
        Some(raw) => Uuid::parse_str(raw).map_err(|_| {
            ServiceError::InvalidArgument(invalid_parameter_message(ROOT_ITEM, raw))
        })?,
        None => item.id,
    };

    let setting = |field: &str, requested: &str| {
        non_empty(item, field)
            .map(str::to_string)
            .unwrap_or_else(|| requested.to_string())
    };

    let include_standard_template_fields = match non_empty(item, INCLUDE_STANDARD_TEMPLATE_FIELDS) {
        Some(raw) => raw == "1" || raw.eq_ignore_ascii_case("true"),
        None => query.include_standard_template_fields,
    };

    Ok(SearchDefinition {
        root,
        database: setting(DATABASE, &query.database),
        language: setting(LANGUAGE, &query.language),
        sorting: setting(SORTING, &query.sorting),
        facet: setting(FACET, &query.facet),
        fields: setting(FIELDS, &query.fields),
        include_standard_template_fields,
    })
}

#[async_trait]
impl RequestHandler for SearchViaItemHandler {
    async fn handle(&self, request: ItemRequest) -> Result<ItemResponse, ServiceError> {
        let query = match request {
            ItemRequest::SearchViaItem(query) => query,
            other => return Err(unexpected_request(QueryKind::SearchViaItem, &other)),
        };

        if query.term.trim().is_empty() {
            return Err(ServiceError::InvalidArgument("Missing search term".to_string()));
        }

        let scope = ItemScope::new(&query.database, &query.language);
        let item = self
            .repository
            .get_item(query.id, &scope)
            .await?
            .ok_or_else(|| ServiceError::ItemNotFound(query.id.to_string()))?;

        let definition = resolve_definition(&item, &query)?;

        let search_query = SearchQuery {
            term: query.term.clone(),
            database: definition.database.clone(),
            language: definition.language.clone(),
            sorting: definition.sorting.clone(),
            page: query.page,
            page_size: query.page_size,
            facet: definition.facet.clone(),
            root: Some(definition.root),
        };

        let results = self.search.search(&search_query).await?;
        Ok(ItemResponse::SearchViaItem(SearchViaItemResponse {
            results,
            definition,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SearchViaItemQuery {
        SearchViaItemQuery {
            id: Uuid::new_v4(),
            term: "lorem".to_string(),
            database: "web".to_string(),
            language: "en".to_string(),
            sorting: String::new(),
            facet: String::new(),
            fields: String::new(),
            include_standard_template_fields: false,
            page: 0,
            page_size: 10,
        }
    }

    fn definition_item() -> Item {
        let root = Item::root(Uuid::new_v4(), "sitecore", "web", "en");
        Item::child_of(&root, Uuid::new_v4(), "Site Search", "Search Definition")
    }

    #[test]
    fn test_definition_defaults_to_request() {
        let item = definition_item();
        let definition = resolve_definition(&item, &request()).unwrap();

        assert_eq!(definition.root, item.id);
        assert_eq!(definition.database, "web");
        assert_eq!(definition.language, "en");
        assert!(!definition.include_standard_template_fields);
    }

    #[test]
    fn test_definition_overrides() {
        let root = Uuid::new_v4();
        let item = definition_item()
            .with_field("RootItem", format!("{{{}}}", root.to_string().to_uppercase()))
            .with_field("Language", "all")
            .with_field("Facet", "_templatename")
            .with_field("Sorting", "d_name")
            .with_field("IncludeStandardTemplateFields", "1");

        let definition = resolve_definition(&item, &request()).unwrap();
        assert_eq!(definition.root, root);
        assert_eq!(definition.language, "all");
        assert_eq!(definition.facet, "_templatename");
        assert_eq!(definition.sorting, "d_name");
        assert!(definition.include_standard_template_fields);
    }

    #[test]
    fn test_invalid_root_item() {
        let item = definition_item().with_field("RootItem", "not-a-guid");
        let err = resolve_definition(&item, &request()).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }
}
