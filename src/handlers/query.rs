//! Content-path queries stored on items

use crate::error::ServiceError;
use crate::handlers::{unexpected_request, ItemRequest, ItemResponse, QueryKind, RequestHandler};
use crate::models::{ItemScope, QUERY_FIELD};
use crate::state::ItemRepository;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// What a stored content-path query selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathQuery {
    /// The item at the path
    Item(String),
    /// `path/*`
    Children(String),
    /// `path//*`
    Descendants(String),
}

impl PathQuery {
    pub fn parse(query: &str) -> Option<Self> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        let parsed = if let Some(base) = query.strip_suffix("//*") {
            PathQuery::Descendants(base.to_string())
        } else if let Some(base) = query.strip_suffix("/*") {
            PathQuery::Children(base.to_string())
        } else {
            PathQuery::Item(query.to_string())
        };
        Some(parsed)
    }

    fn base(&self) -> &str {
        match self {
            PathQuery::Item(path) | PathQuery::Children(path) | PathQuery::Descendants(path) => path,
        }
    }
}

/// Runs the query held in an item's `Query` field
pub struct QueryViaItemHandler {
    repository: Arc<dyn ItemRepository>,
}

impl QueryViaItemHandler {
    pub fn new(repository: Arc<dyn ItemRepository>) -> Self {
        Self { repository }
    }

    async fn item_at(&self, path: &str, scope: &ItemScope) -> Result<crate::models::Item, ServiceError> {
        self.repository
            .get_item_by_path(path, scope)
            .await?
            .ok_or_else(|| ServiceError::ItemNotFound(path.to_string()))
    }
}

#[async_trait]
impl RequestHandler for QueryViaItemHandler {
    async fn handle(&self, request: ItemRequest) -> Result<ItemResponse, ServiceError> {
        let query = match request {
            ItemRequest::QueryViaItem(query) => query,
            other => return Err(unexpected_request(QueryKind::QueryViaItem, &other)),
        };

        let definition = self
            .repository
            .get_item(query.id, &query.scope)
            .await?
            .ok_or_else(|| ServiceError::ItemNotFound(query.id.to_string()))?;

        let path_query = definition
            .field(QUERY_FIELD)
            .and_then(PathQuery::parse)
            .ok_or_else(|| {
                ServiceError::InvalidArgument(format!("Item {} has no query", definition.path))
            })?;

        debug!(item_id = %query.id, query = ?path_query, "Running item query");

        // Results are read in the definition's language
        let scope = ItemScope::new(&definition.database, &definition.language);
        let base = self.item_at(path_query.base(), &scope).await?;

        let items = match path_query {
            PathQuery::Item(_) => vec![base],
            PathQuery::Children(_) => self.repository.get_children(base.id, &scope).await?,
            PathQuery::Descendants(_) => self.repository.get_descendants(base.id, &scope).await?,
        };

        Ok(ItemResponse::Items(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_query_forms() {
        assert_eq!(
            PathQuery::parse("/sitecore/content/Home"),
            Some(PathQuery::Item("/sitecore/content/Home".to_string()))
        );
        assert_eq!(
            PathQuery::parse("/sitecore/content/Home/*"),
            Some(PathQuery::Children("/sitecore/content/Home".to_string()))
        );
        assert_eq!(
            PathQuery::parse(" /sitecore/content//* "),
            Some(PathQuery::Descendants("/sitecore/content".to_string()))
        );
        assert_eq!(PathQuery::parse("  "), None);
    }
}
