use crate::handlers::{
    CreateItemHandler, DeleteItemHandler, GetItemByContentPathHandler, GetItemByIdHandler,
    GetItemChildrenHandler, QueryKind, QueryViaItemHandler, RequestHandler, SearchHandler,
    SearchViaItemHandler, UpdateItemHandler,
};
use crate::search::ItemSearch;
use crate::state::ItemRepository;
use std::collections::HashMap;
use std::sync::Arc;

/// Handlers keyed by the kind of request they serve.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<QueryKind, Arc<dyn RequestHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the standard handler for every query kind
    pub fn with_defaults(repository: Arc<dyn ItemRepository>, search: Arc<ItemSearch>) -> Self {
        Self::new()
            .with(
                QueryKind::GetItemById,
                GetItemByIdHandler::new(repository.clone()),
            )
            .with(
                QueryKind::GetItemByContentPath,
                GetItemByContentPathHandler::new(repository.clone()),
            )
            .with(
                QueryKind::GetItemChildren,
                GetItemChildrenHandler::new(repository.clone()),
            )
            .with(
                QueryKind::QueryViaItem,
                QueryViaItemHandler::new(repository.clone()),
            )
            .with(QueryKind::Search, SearchHandler::new(search.clone()))
            .with(
                QueryKind::SearchViaItem,
                SearchViaItemHandler::new(repository.clone(), search.clone()),
            )
            .with(
                QueryKind::CreateItem,
                CreateItemHandler::new(repository.clone(), search.clone()),
            )
            .with(
                QueryKind::UpdateItem,
                UpdateItemHandler::new(repository.clone(), search.clone()),
            )
            .with(
                QueryKind::DeleteItem,
                DeleteItemHandler::new(repository, search),
            )
    }

    /// Register `handler` for `kind`, replacing any earlier one
    pub fn with(mut self, kind: QueryKind, handler: impl RequestHandler + 'static) -> Self {
        self.handlers.insert(kind, Arc::new(handler));
        self
    }

    pub fn get(&self, kind: QueryKind) -> Option<Arc<dyn RequestHandler>> {
        self.handlers.get(&kind).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
