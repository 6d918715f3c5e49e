//! Request handlers and the dispatch pipeline
//!
//! Every HTTP operation is bound into an [`ItemRequest`], routed by its
//! [`QueryKind`] through the [`HandlerRegistry`] and executed by a
//! [`RequestHandler`]. The [`Dispatcher`] turns handler failures into
//! API-facing [`AppError`](crate::error::AppError)s.

mod dispatch;
mod item;
mod query;
mod registry;
mod search;

pub use dispatch::{classify, Dispatcher, RequestOrigin};
pub use item::{
    CreateItemHandler, DeleteItemHandler, GetItemByContentPathHandler, GetItemByIdHandler,
    GetItemChildrenHandler, UpdateItemHandler,
};
pub use query::QueryViaItemHandler;
pub use registry::HandlerRegistry;
pub use search::{SearchHandler, SearchViaItemHandler};

use crate::error::ServiceError;
use crate::models::*;
use crate::search::{ItemSearchResults, SearchQuery};
use async_trait::async_trait;
use std::convert::TryFrom;

/// Kinds of request the service handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum QueryKind {
    GetItemById,
    GetItemByContentPath,
    GetItemChildren,
    QueryViaItem,
    Search,
    SearchViaItem,
    CreateItem,
    UpdateItem,
    DeleteItem,
}

/// A typed request bound from HTTP input
#[derive(Debug, Clone)]
pub enum ItemRequest {
    GetItemById(GetItemByIdQuery),
    GetItemByContentPath(GetItemByContentPathQuery),
    GetItemChildren(GetItemChildrenQuery),
    QueryViaItem(QueryViaItemQuery),
    Search(SearchQuery),
    SearchViaItem(SearchViaItemQuery),
    CreateItem(CreateItemCommand),
    UpdateItem(UpdateItemCommand),
    DeleteItem(DeleteItemCommand),
}

impl ItemRequest {
    pub fn kind(&self) -> QueryKind {
        match self {
            ItemRequest::GetItemById(_) => QueryKind::GetItemById,
            ItemRequest::GetItemByContentPath(_) => QueryKind::GetItemByContentPath,
            ItemRequest::GetItemChildren(_) => QueryKind::GetItemChildren,
            ItemRequest::QueryViaItem(_) => QueryKind::QueryViaItem,
            ItemRequest::Search(_) => QueryKind::Search,
            ItemRequest::SearchViaItem(_) => QueryKind::SearchViaItem,
            ItemRequest::CreateItem(_) => QueryKind::CreateItem,
            ItemRequest::UpdateItem(_) => QueryKind::UpdateItem,
            ItemRequest::DeleteItem(_) => QueryKind::DeleteItem,
        }
    }
}

/// Successful handler output
#[derive(Debug, Clone)]
pub enum ItemResponse {
    Item(Item),
    Items(Vec<Item>),
    SearchResults(ItemSearchResults),
    SearchViaItem(SearchViaItemResponse),
    Created(CreateItemResponse),
    Empty,
}

macro_rules! response_conversion {
    ($variant:ident, $target:ty) => {
        impl TryFrom<ItemResponse> for $target {
            type Error = ItemResponse;

            fn try_from(response: ItemResponse) -> Result<Self, Self::Error> {
                match response {
                    ItemResponse::$variant(value) => Ok(value),
                    other => Err(other),
                }
            }
        }
    };
}

response_conversion!(Item, Item);
response_conversion!(Items, Vec<Item>);
response_conversion!(SearchResults, ItemSearchResults);
response_conversion!(SearchViaItem, SearchViaItemResponse);
response_conversion!(Created, CreateItemResponse);

impl TryFrom<ItemResponse> for () {
    type Error = ItemResponse;

    fn try_from(response: ItemResponse) -> Result<Self, Self::Error> {
        match response {
            ItemResponse::Empty => Ok(()),
            other => Err(other),
        }
    }
}

/// Executes one kind of request
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: ItemRequest) -> Result<ItemResponse, ServiceError>;
}

/// Failure for a request routed to a handler of another kind
pub(crate) fn unexpected_request(expected: QueryKind, request: &ItemRequest) -> ServiceError {
    ServiceError::Other(anyhow::anyhow!(
        "{} handler received a {} request",
        expected,
        request.kind()
    ))
}
