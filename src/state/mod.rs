pub mod seed;
pub mod store;

pub use seed::seed_sample_content;
pub use store::InMemoryItemRepository;

use crate::error::ServiceError;
use crate::models::{Item, ItemModel, ItemScope};
use async_trait::async_trait;
use uuid::Uuid;

pub type RepositoryResult<T> = std::result::Result<T, ServiceError>;

/// Trait for content repository operations
///
/// Reads return `Ok(None)` for items that do not exist in the requested
/// language and version; a denied permission is an `AccessViolation`.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Get one version of an item; an empty scope version means latest
    async fn get_item(&self, id: Uuid, scope: &ItemScope) -> RepositoryResult<Option<Item>>;

    /// Get an item by its content path (case-insensitive)
    async fn get_item_by_path(&self, path: &str, scope: &ItemScope)
        -> RepositoryResult<Option<Item>>;

    /// Readable direct children, ordered by name
    async fn get_children(&self, id: Uuid, scope: &ItemScope) -> RepositoryResult<Vec<Item>>;

    /// Readable descendants at any depth, ordered by path
    async fn get_descendants(&self, id: Uuid, scope: &ItemScope) -> RepositoryResult<Vec<Item>>;

    /// Create an item under the item at `parent_path`
    async fn create_item(
        &self,
        parent_path: &str,
        model: &ItemModel,
        scope: &ItemScope,
    ) -> RepositoryResult<Item>;

    /// Update one version of an item.
    ///
    /// Returns every item version whose stored state changed; a rename
    /// also changes the paths of all descendants.
    async fn update_item(
        &self,
        id: Uuid,
        model: &ItemModel,
        scope: &ItemScope,
    ) -> RepositoryResult<Vec<Item>>;

    /// Delete an item with its descendants in every language.
    ///
    /// Returns the ids removed.
    async fn delete_item(&self, id: Uuid, scope: &ItemScope) -> RepositoryResult<Vec<Uuid>>;

    /// Latest version of every item in every language
    async fn latest_versions(&self) -> RepositoryResult<Vec<Item>>;
}
