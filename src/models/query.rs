//! Typed queries and commands bound from HTTP requests

use crate::models::ItemModel;
use crate::search::ItemSearchResults;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Database/language/version coordinates as supplied by the caller.
///
/// Values are raw; empty strings mean "use the default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemScope {
    pub database: String,
    pub language: String,
    pub version: String,
}

impl ItemScope {
    pub fn new(database: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            language: language.into(),
            version: String::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct GetItemByIdQuery {
    pub id: Uuid,
    pub scope: ItemScope,
}

#[derive(Debug, Clone)]
pub struct GetItemByContentPathQuery {
    pub path: String,
    pub scope: ItemScope,
}

#[derive(Debug, Clone)]
pub struct GetItemChildrenQuery {
    pub id: Uuid,
    pub scope: ItemScope,
}

#[derive(Debug, Clone)]
pub struct QueryViaItemQuery {
    pub id: Uuid,
    pub scope: ItemScope,
}

/// Search driven by a saved search-definition item
#[derive(Debug, Clone)]
pub struct SearchViaItemQuery {
    pub id: Uuid,
    pub term: String,
    pub database: String,
    pub language: String,
    pub sorting: String,
    pub facet: String,
    pub fields: String,
    pub include_standard_template_fields: bool,
    pub page: usize,
    pub page_size: usize,
}

/// The effective search request after applying a definition item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchDefinition {
    pub root: Uuid,
    pub database: String,
    pub language: String,
    pub sorting: String,
    pub facet: String,
    pub fields: String,
    pub include_standard_template_fields: bool,
}

#[derive(Debug, Clone)]
pub struct SearchViaItemResponse {
    pub results: ItemSearchResults,
    pub definition: SearchDefinition,
}

#[derive(Debug, Clone)]
pub struct CreateItemCommand {
    pub path: String,
    pub model: ItemModel,
    pub scope: ItemScope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateItemResponse {
    pub item_id: Uuid,
    pub database: String,
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct UpdateItemCommand {
    pub id: Uuid,
    pub model: ItemModel,
    pub scope: ItemScope,
}

#[derive(Debug, Clone)]
pub struct DeleteItemCommand {
    pub id: Uuid,
    pub scope: ItemScope,
}
