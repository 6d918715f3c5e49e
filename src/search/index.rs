//! Search index management

use crate::models::Item;
use crate::search::config::SearchConfig;
use crate::search::document::{build_item_schema, fields, ItemDocument, SearchDocument, DOCUMENT_KEY};
use crate::search::error::{SearchError, SearchResult};
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tantivy::collector::Count;
use tantivy::query::AllQuery;
use tantivy::schema::{Facet, Field, FieldType, Schema, Value};
use tantivy::tokenizer::TokenStream;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// One physical content index
pub struct ContentIndex {
    /// Index id, e.g. `sitecore_web_index`
    id: String,

    /// The Tantivy index
    index: Index,

    /// The schema
    schema: Schema,

    /// Index writer (wrapped in RwLock for thread-safety)
    writer: Arc<RwLock<IndexWriter>>,

    /// Index reader, reloaded after every commit
    reader: IndexReader,

    /// Number of search contexts currently open
    active_contexts: AtomicUsize,
}

impl ContentIndex {
    /// Open the index `id`, on disk under `config.index_path` or in memory
    pub fn open(id: &str, config: &SearchConfig) -> SearchResult<Self> {
        let schema = build_item_schema();

        let index = match config.index_path {
            Some(ref root) => {
                let path = root.join(id);
                std::fs::create_dir_all(&path).map_err(|e| {
                    SearchError::IndexInitFailed(format!(
                        "Failed to create index directory {}: {}",
                        path.display(),
                        e
                    ))
                })?;

                if Self::index_exists(&path) {
                    Index::open_in_dir(&path).map_err(|e| {
                        SearchError::IndexInitFailed(format!("Failed to open index {}: {}", id, e))
                    })?
                } else {
                    Index::create_in_dir(&path, schema.clone()).map_err(|e| {
                        SearchError::IndexInitFailed(format!("Failed to create index {}: {}", id, e))
                    })?
                }
            }
            None => Index::create_in_ram(schema.clone()),
        };

        let writer: IndexWriter = index
            .writer_with_num_threads(1, config.writer_heap_size)
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create writer: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create reader: {}", e)))?;

        debug!(index = %id, persistent = config.index_path.is_some(), "Opened content index");

        Ok(Self {
            id: id.to_string(),
            schema: index.schema(),
            index,
            writer: Arc::new(RwLock::new(writer)),
            reader,
            active_contexts: AtomicUsize::new(0),
        })
    }

    /// Create an in-memory index with default settings
    pub fn in_memory(id: &str) -> SearchResult<Self> {
        Self::open(id, &SearchConfig::default())
    }

    fn index_exists(path: &Path) -> bool {
        path.join("meta.json").exists()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<Field> {
        self.schema.get_field(name).ok()
    }

    /// Look up a field that holds analyzed text
    pub fn text_field(&self, name: &str) -> Option<Field> {
        self.field(name)
            .filter(|field| matches!(self.schema.get_field_entry(*field).field_type(), FieldType::Str(_)))
    }

    /// Open a search context over the latest committed state.
    ///
    /// The context is released when the returned guard is dropped.
    pub fn create_search_context(&self) -> SearchContext<'_> {
        self.active_contexts.fetch_add(1, Ordering::SeqCst);
        SearchContext {
            index: self,
            searcher: self.reader.searcher(),
        }
    }

    /// Number of search contexts not yet released
    pub fn active_contexts(&self) -> usize {
        self.active_contexts.load(Ordering::SeqCst)
    }

    /// Split `text` into the terms the index stores for `field`
    pub fn analyze(&self, field: Field, text: &str) -> SearchResult<Vec<String>> {
        let mut analyzer = self
            .index
            .tokenizer_for_field(field)
            .map_err(|e| SearchError::search_failed(&self.id, e))?;

        let mut tokens = Vec::new();
        let mut stream = analyzer.token_stream(text);
        stream.process(&mut |token| tokens.push(token.text.clone()));
        Ok(tokens)
    }

    /// Index (or re-index) item versions and make them searchable
    pub async fn index_items(&self, items: &[Item]) -> SearchResult<usize> {
        let key_field = self
            .field(DOCUMENT_KEY)
            .ok_or_else(|| SearchError::IndexingFailed(format!("{} field missing", DOCUMENT_KEY)))?;

        let mut writer = self.writer.write().await;
        let mut indexed = 0;

        for item in items {
            let document = ItemDocument::from(item);

            // Replace any earlier copy of this version
            writer.delete_term(Term::from_field_text(key_field, &document.document_id()));

            let mut doc = document.to_tantivy_doc(&self.schema);
            self.add_facet_terms(&mut doc)?;

            writer
                .add_document(doc)
                .map_err(|e| {
                    SearchError::IndexingFailed(format!("Failed to add item {}: {}", item.id, e))
                })?;
            indexed += 1;
        }

        self.commit(&mut writer)?;
        debug!(index = %self.id, indexed, "Indexed items");
        Ok(indexed)
    }

    /// Remove every language and version of the given items
    pub async fn remove_items(&self, ids: &[Uuid]) -> SearchResult<()> {
        let id_field = self
            .field(fields::ID)
            .ok_or_else(|| SearchError::IndexingFailed(format!("{} field missing", fields::ID)))?;

        let mut writer = self.writer.write().await;
        for id in ids {
            writer.delete_term(Term::from_field_text(id_field, &id.to_string()));
        }

        self.commit(&mut writer)
    }

    /// Copy each faceted field's analyzed terms into its facet field
    fn add_facet_terms(&self, doc: &mut TantivyDocument) -> SearchResult<()> {
        for name in fields::FACETED {
            let (Some(source), Some(target)) = (self.field(name), self.field(&fields::facet_field(name)))
            else {
                continue;
            };

            let mut terms = BTreeSet::new();
            for value in doc.get_all(source).filter_map(|value| value.as_str()) {
                terms.extend(self.analyze(source, value)?);
            }
            for term in terms.into_iter().filter(|term| !term.is_empty()) {
                doc.add_facet(target, Facet::from_path([term]));
            }
        }
        Ok(())
    }

    fn commit(&self, writer: &mut IndexWriter) -> SearchResult<()> {
        writer
            .commit()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to commit: {}", e)))?;
        self.reader
            .reload()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to reload reader: {}", e)))
    }

    /// Number of searchable documents
    pub fn document_count(&self) -> SearchResult<usize> {
        self.reader
            .searcher()
            .search(&AllQuery, &Count)
            .map_err(|e| SearchError::search_failed(&self.id, e))
    }
}

/// A scoped read view of one index.
///
/// Holds a searcher pinned to the segments committed when it was created.
pub struct SearchContext<'a> {
    index: &'a ContentIndex,
    searcher: Searcher,
}

impl<'a> SearchContext<'a> {
    pub fn index(&self) -> &'a ContentIndex {
        self.index
    }

    pub fn searcher(&self) -> &Searcher {
        &self.searcher
    }
}

impl Drop for SearchContext<'_> {
    fn drop(&mut self) {
        self.index.active_contexts.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Source of index handles by index id
pub trait IndexProvider: Send + Sync {
    /// Acquire the index registered as `index_id`
    fn get_index(&self, index_id: &str) -> SearchResult<Arc<ContentIndex>>;
}

/// Process-wide set of open indexes
#[derive(Default)]
pub struct IndexRegistry {
    indexes: DashMap<String, Arc<ContentIndex>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open every index named in the database mapping
    pub fn open(config: &SearchConfig) -> SearchResult<Self> {
        let registry = Self::new();
        for index_id in config.indexes.values() {
            if registry.indexes.contains_key(index_id) {
                continue;
            }
            registry.register(ContentIndex::open(index_id, config)?);
        }

        info!(count = registry.indexes.len(), "Content indexes ready");
        Ok(registry)
    }

    pub fn register(&self, index: ContentIndex) -> Arc<ContentIndex> {
        let index = Arc::new(index);
        self.indexes.insert(index.id().to_string(), index.clone());
        index
    }

    /// Unregister an index; searches against it fail afterwards
    pub fn remove(&self, index_id: &str) -> Option<Arc<ContentIndex>> {
        self.indexes.remove(index_id).map(|(_, index)| index)
    }

    pub fn index_ids(&self) -> Vec<String> {
        self.indexes.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl IndexProvider for IndexRegistry {
    fn get_index(&self, index_id: &str) -> SearchResult<Arc<ContentIndex>> {
        self.indexes
            .get(index_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SearchError::IndexUnavailable {
                index: index_id.to_string(),
                source: Box::new(SearchError::IndexNotFound(index_id.to_string())),
            })
    }
}
