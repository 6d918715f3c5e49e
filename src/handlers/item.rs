//! Item read and write handlers

use crate::error::{invalid_parameter_message, ServiceError};
use crate::handlers::{unexpected_request, ItemRequest, ItemResponse, QueryKind, RequestHandler};
use crate::models::CreateItemResponse;
use crate::search::ItemSearch;
use crate::state::ItemRepository;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

pub struct GetItemByIdHandler {
    repository: Arc<dyn ItemRepository>,
}

impl GetItemByIdHandler {
    pub fn new(repository: Arc<dyn ItemRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl RequestHandler for GetItemByIdHandler {
    async fn handle(&self, request: ItemRequest) -> Result<ItemResponse, ServiceError> {
        let query = match request {
            ItemRequest::GetItemById(query) => query,
            other => return Err(unexpected_request(QueryKind::GetItemById, &other)),
        };

        self.repository
            .get_item(query.id, &query.scope)
            .await?
            .map(ItemResponse::Item)
            .ok_or_else(|| ServiceError::ItemNotFound(query.id.to_string()))
    }
}

pub struct GetItemByContentPathHandler {
    repository: Arc<dyn ItemRepository>,
}

impl GetItemByContentPathHandler {
    pub fn new(repository: Arc<dyn ItemRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl RequestHandler for GetItemByContentPathHandler {
    async fn handle(&self, request: ItemRequest) -> Result<ItemResponse, ServiceError> {
        let query = match request {
            ItemRequest::GetItemByContentPath(query) => query,
            other => return Err(unexpected_request(QueryKind::GetItemByContentPath, &other)),
        };

        if query.path.trim().is_empty() {
            return Err(ServiceError::InvalidArgument(invalid_parameter_message(
                "path",
                &query.path,
            )));
        }

        self.repository
            .get_item_by_path(&query.path, &query.scope)
            .await?
            .map(ItemResponse::Item)
            .ok_or(ServiceError::ItemNotFound(query.path))
    }
}

pub struct GetItemChildrenHandler {
    repository: Arc<dyn ItemRepository>,
}

impl GetItemChildrenHandler {
    pub fn new(repository: Arc<dyn ItemRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl RequestHandler for GetItemChildrenHandler {
    async fn handle(&self, request: ItemRequest) -> Result<ItemResponse, ServiceError> {
        let query = match request {
            ItemRequest::GetItemChildren(query) => query,
            other => return Err(unexpected_request(QueryKind::GetItemChildren, &other)),
        };

        let children = self.repository.get_children(query.id, &query.scope).await?;
        Ok(ItemResponse::Items(children))
    }
}

/// Creates items and adds them to the search index
pub struct CreateItemHandler {
    repository: Arc<dyn ItemRepository>,
    search: Arc<ItemSearch>,
}

impl CreateItemHandler {
    pub fn new(repository: Arc<dyn ItemRepository>, search: Arc<ItemSearch>) -> Self {
        Self { repository, search }
    }
}

#[async_trait]
impl RequestHandler for CreateItemHandler {
    async fn handle(&self, request: ItemRequest) -> Result<ItemResponse, ServiceError> {
        let command = match request {
            ItemRequest::CreateItem(command) => command,
            other => return Err(unexpected_request(QueryKind::CreateItem, &other)),
        };

        command.model.validate()?;

        let item = self
            .repository
            .create_item(&command.path, &command.model, &command.scope)
            .await?;

        // Index failures do not fail the write
        if let Err(e) = self.search.index_items(std::slice::from_ref(&item)).await {
            warn!(item_id = %item.id, error = %e, "Failed to index created item");
        }

        info!(item_id = %item.id, path = %item.path, "Item created");
        Ok(ItemResponse::Created(CreateItemResponse {
            item_id: item.id,
            database: item.database,
            language: item.language,
        }))
    }
}

pub struct UpdateItemHandler {
    repository: Arc<dyn ItemRepository>,
    search: Arc<ItemSearch>,
}

impl UpdateItemHandler {
    pub fn new(repository: Arc<dyn ItemRepository>, search: Arc<ItemSearch>) -> Self {
        Self { repository, search }
    }
}

#[async_trait]
impl RequestHandler for UpdateItemHandler {
    async fn handle(&self, request: ItemRequest) -> Result<ItemResponse, ServiceError> {
        let command = match request {
            ItemRequest::UpdateItem(command) => command,
            other => return Err(unexpected_request(QueryKind::UpdateItem, &other)),
        };

        command.model.validate()?;

        let changed = self
            .repository
            .update_item(command.id, &command.model, &command.scope)
            .await?;

        if let Err(e) = self.search.index_items(&changed).await {
            warn!(item_id = %command.id, error = %e, "Failed to re-index updated items");
        }

        info!(item_id = %command.id, changed = changed.len(), "Item updated");
        Ok(ItemResponse::Empty)
    }
}

pub struct DeleteItemHandler {
    repository: Arc<dyn ItemRepository>,
    search: Arc<ItemSearch>,
}

impl DeleteItemHandler {
    pub fn new(repository: Arc<dyn ItemRepository>, search: Arc<ItemSearch>) -> Self {
        Self { repository, search }
    }
}

#[async_trait]
impl RequestHandler for DeleteItemHandler {
    async fn handle(&self, request: ItemRequest) -> Result<ItemResponse, ServiceError> {
        let command = match request {
            ItemRequest::DeleteItem(command) => command,
            other => return Err(unexpected_request(QueryKind::DeleteItem, &other)),
        };

        let removed = self
            .repository
            .delete_item(command.id, &command.scope)
            .await?;

        if let Err(e) = self
            .search
            .remove_items(&command.scope.database, &removed)
            .await
        {
            warn!(item_id = %command.id, error = %e, "Failed to remove deleted items from index");
        }

        info!(item_id = %command.id, removed = removed.len(), "Item deleted");
        Ok(ItemResponse::Empty)
    }
}
