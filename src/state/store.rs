use crate::config::RepositoryConfig;
use crate::error::{invalid_parameter_message, AccessViolation, ServiceError};
use crate::models::{
    canonical_language, is_valid_item_name, AccessRight, Item, ItemModel, ItemScope,
    DEFAULT_TEMPLATE,
};
use crate::state::{ItemRepository, RepositoryResult};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Id of the `/sitecore` root item in every database
pub const ROOT_ITEM_ID: Uuid = Uuid::from_u128(0x11111111_1111_1111_1111_111111111111);

/// Id of `/sitecore/content` in every database
pub const CONTENT_ITEM_ID: Uuid = Uuid::from_u128(0x0de95ae4_41ab_4d01_9eb0_67441b7c2450);

pub const CONTENT_PATH: &str = "/sitecore/content";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ItemKey {
    database: String,
    id: Uuid,
    language: String,
}

impl ItemKey {
    fn of(item: &Item) -> Self {
        Self {
            database: item.database.clone(),
            id: item.id,
            language: item.language.clone(),
        }
    }
}

/// Case-insensitive path lookup key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PathKey {
    database: String,
    path: String,
}

impl PathKey {
    fn new(database: &str, path: &str) -> Self {
        Self {
            database: database.to_string(),
            path: normalize_path(path),
        }
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_lowercase()
    } else {
        format!("/{}", trimmed.to_lowercase())
    }
}

/// Scope with database and language validated
struct ResolvedScope {
    database: String,
    language: String,
    version: Option<u32>,
}

fn select_version(versions: &[Item], version: Option<u32>) -> Option<&Item> {
    match version {
        None => versions.last(),
        Some(version) => versions.iter().find(|item| item.version == version),
    }
}

fn denied(right: AccessRight, item: &Item) -> ServiceError {
    AccessViolation(format!("{} access to {} denied", right, item.path)).into()
}

/// In-memory content repository (for MVP and testing)
#[derive(Clone)]
pub struct InMemoryItemRepository {
    config: RepositoryConfig,

    /// Versions of one item in one language, ascending
    items: Arc<DashMap<ItemKey, Vec<Item>>>,
    paths: Arc<DashMap<PathKey, Uuid>>,
}

impl InMemoryItemRepository {
    /// Create a repository holding `/sitecore` and `/sitecore/content` in
    /// every configured database
    pub fn new(config: RepositoryConfig) -> Self {
        let language =
            canonical_language(&config.default_language, "en").unwrap_or_else(|| "en".to_string());

        let repository = Self {
            config,
            items: Arc::new(DashMap::new()),
            paths: Arc::new(DashMap::new()),
        };

        for database in repository.config.databases.clone() {
            let root = Item::root(ROOT_ITEM_ID, "sitecore", &database, &language);
            let content = Item::child_of(&root, CONTENT_ITEM_ID, "content", "Main section");
            repository.insert(root);
            repository.insert(content);
        }

        repository
    }

    /// Store an item version as-is, replacing an existing copy of that version
    pub fn insert(&self, item: Item) {
        self.paths
            .insert(PathKey::new(&item.database, &item.path), item.id);

        let mut versions = self.items.entry(ItemKey::of(&item)).or_default();
        versions.retain(|existing| existing.version != item.version);
        versions.push(item);
        versions.sort_by_key(|existing| existing.version);
    }

    fn resolve(&self, scope: &ItemScope) -> RepositoryResult<ResolvedScope> {
        let database = self.config.known_database(&scope.database).ok_or_else(|| {
            ServiceError::InvalidArgument(invalid_parameter_message("Database", &scope.database))
        })?;

        let language = canonical_language(&scope.language, &self.config.default_language)
            .ok_or_else(|| {
                ServiceError::InvalidArgument(invalid_parameter_message("Language", &scope.language))
            })?;

        let version = match scope.version.trim() {
            "" => None,
            raw => Some(raw.parse::<u32>().map_err(|_| {
                ServiceError::InvalidArgument(invalid_parameter_message("Version", raw))
            })?),
        };

        Ok(ResolvedScope {
            database: database.to_string(),
            language,
            version,
        })
    }

    fn read(&self, id: Uuid, scope: &ResolvedScope) -> RepositoryResult<Option<Item>> {
        let key = ItemKey {
            database: scope.database.clone(),
            id,
            language: scope.language.clone(),
        };

        let item = self
            .items
            .get(&key)
            .and_then(|versions| select_version(&versions, scope.version).cloned());

        match item {
            Some(item) if item.denies(AccessRight::Read) => Err(denied(AccessRight::Read, &item)),
            other => Ok(other),
        }
    }

    /// Latest version of an item in any language
    fn structural(&self, database: &str, id: Uuid) -> Option<Item> {
        self.items
            .iter()
            .find(|entry| entry.key().database == database && entry.key().id == id)
            .and_then(|entry| entry.value().last().cloned())
    }

    /// Latest readable versions in one language matching `predicate`
    fn collect_latest(&self, scope: &ResolvedScope, predicate: impl Fn(&Item) -> bool) -> Vec<Item> {
        self.items
            .iter()
            .filter(|entry| {
                entry.key().database == scope.database && entry.key().language == scope.language
            })
            .filter_map(|entry| entry.value().last().cloned())
            .filter(|item| predicate(item) && !item.denies(AccessRight::Read))
            .collect()
    }

    /// Keys of every language of `id` and its descendants
    fn subtree_keys(&self, database: &str, id: Uuid) -> Vec<ItemKey> {
        self.items
            .iter()
            .filter(|entry| {
                entry.key().database == database
                    && entry.value().iter().any(|item| item.is_under(&id))
            })
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Rewrite the paths of a renamed item and its descendants
    fn rename_subtree(
        &self,
        database: &str,
        id: Uuid,
        old_path: &str,
        new_name: &str,
    ) -> RepositoryResult<Vec<ItemKey>> {
        let parent_path = match old_path.rfind('/') {
            Some(position) if position > 0 => &old_path[..position],
            _ => {
                return Err(ServiceError::InvalidArgument(
                    "Root items cannot be renamed".to_string(),
                ))
            }
        };
        let new_path = format!("{}/{}", parent_path, new_name);

        match self.paths.entry(PathKey::new(database, &new_path)) {
            Entry::Occupied(existing) if *existing.get() != id => {
                return Err(ServiceError::InvalidArgument(format!(
                    "An item named '{}' already exists under {}",
                    new_name, parent_path
                )));
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let affected = self.subtree_keys(database, id);
        for key in &affected {
            if let Some(mut versions) = self.items.get_mut(key) {
                for version in versions.iter_mut() {
                    if version.id == id {
                        version.name = new_name.to_string();
                    }
                    version.path = format!("{}{}", new_path, &version.path[old_path.len()..]);
                }
            }
        }

        let old_lower = normalize_path(old_path);
        let stale: Vec<(PathKey, Uuid)> = self
            .paths
            .iter()
            .filter(|entry| {
                let key = entry.key();
                key.database == database
                    && (key.path == old_lower || key.path.starts_with(&format!("{}/", old_lower)))
            })
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();

        for (key, item_id) in stale {
            self.paths.remove(&key);
            let renamed = format!("{}{}", new_path, &key.path[old_lower.len()..]);
            self.paths.insert(PathKey::new(database, &renamed), item_id);
        }

        Ok(affected)
    }
}

impl Default for InMemoryItemRepository {
    fn default() -> Self {
        Self::new(RepositoryConfig::default())
    }
}

#[async_trait]
impl ItemRepository for InMemoryItemRepository {
    async fn get_item(&self, id: Uuid, scope: &ItemScope) -> RepositoryResult<Option<Item>> {
        let scope = self.resolve(scope)?;
        self.read(id, &scope)
    }

    async fn get_item_by_path(
        &self,
        path: &str,
        scope: &ItemScope,
    ) -> RepositoryResult<Option<Item>> {
        let scope = self.resolve(scope)?;
        let id = self
            .paths
            .get(&PathKey::new(&scope.database, path))
            .map(|entry| *entry.value());

        match id {
            Some(id) => self.read(id, &scope),
            None => Ok(None),
        }
    }

    async fn get_children(&self, id: Uuid, scope: &ItemScope) -> RepositoryResult<Vec<Item>> {
        let scope = self.resolve(scope)?;
        if self.read(id, &scope)?.is_none() {
            return Err(ServiceError::ItemNotFound(id.to_string()));
        }

        let mut children = self.collect_latest(&scope, |item| item.parent_id == Some(id));
        children.sort_by_key(|item| item.name.to_lowercase());
        Ok(children)
    }

    async fn get_descendants(&self, id: Uuid, scope: &ItemScope) -> RepositoryResult<Vec<Item>> {
        let scope = self.resolve(scope)?;
        if self.read(id, &scope)?.is_none() {
            return Err(ServiceError::ItemNotFound(id.to_string()));
        }

        let mut descendants = self.collect_latest(&scope, |item| item.id != id && item.is_under(&id));
        descendants.sort_by_key(|item| item.path.to_lowercase());
        Ok(descendants)
    }

    async fn create_item(
        &self,
        parent_path: &str,
        model: &ItemModel,
        scope: &ItemScope,
    ) -> RepositoryResult<Item> {
        let scope = self.resolve(scope)?;

        let name = model.item_name.as_deref().unwrap_or_default();
        if !is_valid_item_name(name) {
            return Err(ServiceError::InvalidArgument(invalid_parameter_message(
                "ItemName", name,
            )));
        }

        let parent = self
            .paths
            .get(&PathKey::new(&scope.database, parent_path))
            .map(|entry| *entry.value())
            .and_then(|parent_id| self.structural(&scope.database, parent_id))
            .ok_or_else(|| ServiceError::ItemNotFound(parent_path.to_string()))?;

        if parent.denies(AccessRight::Write) {
            return Err(denied(AccessRight::Write, &parent));
        }

        let template = model
            .template_name
            .as_deref()
            .filter(|template| !template.trim().is_empty())
            .unwrap_or(DEFAULT_TEMPLATE);

        let mut item = Item::child_of(&parent, Uuid::new_v4(), name, template);
        item.language = scope.language.clone();
        item.fields = model.fields.clone();
        if let Some(ref display_name) = model.display_name {
            item.display_name = display_name.clone();
        }

        match self.paths.entry(PathKey::new(&scope.database, &item.path)) {
            Entry::Occupied(_) => {
                return Err(ServiceError::InvalidArgument(format!(
                    "An item named '{}' already exists under {}",
                    name, parent.path
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(item.id);
            }
        }

        self.items.insert(ItemKey::of(&item), vec![item.clone()]);
        tracing::debug!(item_id = %item.id, path = %item.path, "Item created");
        Ok(item)
    }

    async fn update_item(
        &self,
        id: Uuid,
        model: &ItemModel,
        scope: &ItemScope,
    ) -> RepositoryResult<Vec<Item>> {
        let scope = self.resolve(scope)?;
        if let Some(ref name) = model.item_name {
            if !is_valid_item_name(name) {
                return Err(ServiceError::InvalidArgument(invalid_parameter_message(
                    "ItemName", name,
                )));
            }
        }

        let key = ItemKey {
            database: scope.database.clone(),
            id,
            language: scope.language.clone(),
        };

        // The entry guard must be released before the subtree is rewritten
        let (old_path, rename, edited_version) = {
            let mut versions = self
                .items
                .get_mut(&key)
                .ok_or_else(|| ServiceError::ItemNotFound(id.to_string()))?;

            let item = match scope.version {
                None => versions.last_mut(),
                Some(version) => versions.iter_mut().find(|item| item.version == version),
            }
            .ok_or_else(|| ServiceError::ItemNotFound(id.to_string()))?;

            if item.denies(AccessRight::Write) {
                return Err(denied(AccessRight::Write, item));
            }

            if let Some(ref template_name) = model.template_name {
                item.template_name = template_name.clone();
            }
            if let Some(ref display_name) = model.display_name {
                item.display_name = display_name.clone();
            }
            item.fields
                .extend(model.fields.iter().map(|(name, value)| (name.clone(), value.clone())));

            let rename = model
                .item_name
                .clone()
                .filter(|name| *name != item.name);
            (item.path.clone(), rename, item.version)
        };

        let affected = match rename {
            Some(new_name) => self.rename_subtree(&scope.database, id, &old_path, &new_name)?,
            None => vec![key.clone()],
        };

        tracing::debug!(item_id = %id, affected = affected.len(), "Item updated");
        Ok(affected
            .iter()
            .filter_map(|affected_key| {
                let versions = self.items.get(affected_key)?;
                // The edited key reports the version that was changed
                let version = (*affected_key == key).then_some(edited_version);
                select_version(&versions, version).cloned()
            })
            .collect())
    }

    async fn delete_item(&self, id: Uuid, scope: &ItemScope) -> RepositoryResult<Vec<Uuid>> {
        let scope = self.resolve(scope)?;
        let item = self
            .structural(&scope.database, id)
            .ok_or_else(|| ServiceError::ItemNotFound(id.to_string()))?;

        if item.denies(AccessRight::Delete) {
            return Err(denied(AccessRight::Delete, &item));
        }
        if item.parent_id.is_none() {
            return Err(ServiceError::InvalidArgument(
                "Root items cannot be deleted".to_string(),
            ));
        }

        let mut removed = Vec::new();
        for key in self.subtree_keys(&scope.database, id) {
            if self.items.remove(&key).is_some() && !removed.contains(&key.id) {
                removed.push(key.id);
            }
        }
        self.paths
            .retain(|key, item_id| !(key.database == scope.database && removed.contains(item_id)));

        tracing::debug!(item_id = %id, removed = removed.len(), "Item deleted");
        Ok(removed)
    }

    async fn latest_versions(&self) -> RepositoryResult<Vec<Item>> {
        Ok(self
            .items
            .iter()
            .filter_map(|entry| entry.value().last().cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SECURITY_FIELD;

    fn scope() -> ItemScope {
        ItemScope::new("master", "en")
    }

    fn model(name: &str) -> ItemModel {
        ItemModel {
            item_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_roots_exist_per_database() {
        let repo = InMemoryItemRepository::default();

        let content = repo
            .get_item_by_path("/Sitecore/Content/", &ItemScope::new("web", ""))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(content.id, CONTENT_ITEM_ID);
        assert_eq!(content.path, CONTENT_PATH);
        assert_eq!(content.language, "en");
    }

    #[tokio::test]
    async fn test_create_and_get_item() {
        let repo = InMemoryItemRepository::default();
        let mut body = model("Home");
        body.fields.insert("Title".to_string(), "Welcome".to_string());

        let created = repo.create_item(CONTENT_PATH, &body, &scope()).await.unwrap();
        assert_eq!(created.path, "/sitecore/content/Home");
        assert_eq!(created.template_name, DEFAULT_TEMPLATE);

        let fetched = repo.get_item(created.id, &scope()).await.unwrap().unwrap();
        assert_eq!(fetched.field("Title"), Some("Welcome"));

        // Other languages have no version
        let danish = repo
            .get_item(created.id, &ItemScope::new("master", "da"))
            .await
            .unwrap();
        assert!(danish.is_none());
    }

    #[tokio::test]
    async fn test_create_rejections() {
        let repo = InMemoryItemRepository::default();

        let missing_parent = repo
            .create_item("/sitecore/content/nowhere", &model("Home"), &scope())
            .await;
        assert!(matches!(missing_parent, Err(ServiceError::ItemNotFound(_))));

        let bad_name = repo.create_item(CONTENT_PATH, &model("a/b"), &scope()).await;
        assert!(matches!(bad_name, Err(ServiceError::InvalidArgument(_))));

        repo.create_item(CONTENT_PATH, &model("Home"), &scope()).await.unwrap();
        let duplicate = repo.create_item(CONTENT_PATH, &model("home"), &scope()).await;
        assert!(matches!(duplicate, Err(ServiceError::InvalidArgument(_))));

        let unknown_db = repo
            .create_item(CONTENT_PATH, &model("Other"), &ItemScope::new("staging", "en"))
            .await;
        assert!(matches!(unknown_db, Err(ServiceError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_version_selection() {
        let repo = InMemoryItemRepository::default();
        let created = repo.create_item(CONTENT_PATH, &model("Home"), &scope()).await.unwrap();

        let mut second = created.clone().with_field("Title", "v2");
        second.version = 2;
        repo.insert(second);

        let latest = repo.get_item(created.id, &scope()).await.unwrap().unwrap();
        assert_eq!(latest.version, 2);

        let first = repo
            .get_item(created.id, &scope().with_version("1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.version, 1);

        assert!(repo
            .get_item(created.id, &scope().with_version("7"))
            .await
            .unwrap()
            .is_none());

        let bad = repo.get_item(created.id, &scope().with_version("latest")).await;
        assert!(matches!(bad, Err(ServiceError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_update_older_version_returns_that_version() {
        let repo = InMemoryItemRepository::default();
        let created = repo.create_item(CONTENT_PATH, &model("Home"), &scope()).await.unwrap();

        let mut second = created.clone();
        second.version = 2;
        repo.insert(second);

        let mut body = ItemModel::default();
        body.fields.insert("Title".to_string(), "first edit".to_string());
        let updated = repo
            .update_item(created.id, &body, &scope().with_version("1"))
            .await
            .unwrap();

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].version, 1);
        assert_eq!(updated[0].fields.get("Title").map(String::as_str), Some("first edit"));

        let latest = repo.get_item(created.id, &scope()).await.unwrap().unwrap();
        assert_eq!(latest.version, 2);
        assert!(latest.fields.get("Title").is_none());
    }

    #[tokio::test]
    async fn test_security_rules() {
        let repo = InMemoryItemRepository::default();
        let mut body = model("Secret");
        body.fields
            .insert(SECURITY_FIELD.to_string(), "-item:read|-item:delete".to_string());
        let created = repo.create_item(CONTENT_PATH, &body, &scope()).await.unwrap();

        let read = repo.get_item(created.id, &scope()).await.unwrap_err();
        assert!(read.is_access_violation());

        let delete = repo.delete_item(created.id, &scope()).await.unwrap_err();
        assert!(delete.is_access_violation());

        // Unreadable children are left out of listings
        let children = repo.get_children(CONTENT_ITEM_ID, &scope()).await.unwrap();
        assert!(children.is_empty());
    }

    #[tokio::test]
    async fn test_rename_moves_descendant_paths() {
        let repo = InMemoryItemRepository::default();
        let home = repo.create_item(CONTENT_PATH, &model("Home"), &scope()).await.unwrap();
        let news = repo
            .create_item("/sitecore/content/home", &model("News"), &scope())
            .await
            .unwrap();

        let changed = repo.update_item(home.id, &model("Start"), &scope()).await.unwrap();
        assert_eq!(changed.len(), 2);

        let moved = repo
            .get_item_by_path("/sitecore/content/start/news", &scope())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.id, news.id);
        assert_eq!(moved.path, "/sitecore/content/Start/News");
        assert!(repo
            .get_item_by_path("/sitecore/content/home", &scope())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_subtree_in_all_languages() {
        let repo = InMemoryItemRepository::default();
        let home = repo.create_item(CONTENT_PATH, &model("Home"), &scope()).await.unwrap();
        let news = repo
            .create_item("/sitecore/content/Home", &model("News"), &scope())
            .await
            .unwrap();

        let mut danish = home.clone();
        danish.language = "da".to_string();
        repo.insert(danish);

        let removed = repo.delete_item(home.id, &scope()).await.unwrap();
        assert_eq!(removed.len(), 2);
        assert!(removed.contains(&news.id));

        for language in ["en", "da"] {
            assert!(repo
                .get_item(home.id, &ItemScope::new("master", language))
                .await
                .unwrap()
                .is_none());
        }

        let again = repo.delete_item(home.id, &scope()).await;
        assert!(matches!(again, Err(ServiceError::ItemNotFound(_))));
    }
}
