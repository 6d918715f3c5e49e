//! Main search service implementation

use crate::config::RepositoryConfig;
use crate::error::invalid_parameter_message;
use crate::metrics::{SEARCH_DURATION_SECONDS, SEARCH_HITS_TOTAL};
use crate::models::Item;
use crate::search::config::SearchConfig;
use crate::search::error::{SearchError, SearchResult};
use crate::search::index::{ContentIndex, IndexProvider};
use crate::search::pager::{ItemSearchResults, ResultPager};
use crate::search::query::{QueryBuilder, SearchQuery};
use crate::search::resolver::IndexResolver;
use crate::state::ItemRepository;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Faceted, paged full-text search over repository items
pub struct ItemSearch {
    resolver: IndexResolver,
    provider: Arc<dyn IndexProvider>,
    builder: QueryBuilder,
    pager: ResultPager,
    default_database: String,
    default_page_size: usize,
}

impl ItemSearch {
    pub fn new(
        config: &SearchConfig,
        repository_config: &RepositoryConfig,
        provider: Arc<dyn IndexProvider>,
        repository: Arc<dyn ItemRepository>,
    ) -> Self {
        Self {
            resolver: IndexResolver::new(&config.indexes),
            provider,
            builder: QueryBuilder::new(config, repository_config.default_language.clone()),
            pager: ResultPager::new(repository),
            default_database: repository_config.default_database.clone(),
            default_page_size: config.default_page_size.max(1),
        }
    }

    /// Run a search and return one page of results with facets
    pub async fn search(&self, query: &SearchQuery) -> SearchResult<ItemSearchResults> {
        let start_time = Instant::now();

        if query.term.trim().is_empty() {
            return Err(SearchError::InvalidArgument("Missing search term".to_string()));
        }

        let database = if query.database.trim().is_empty() {
            self.default_database.as_str()
        } else {
            query.database.as_str()
        };

        let index = self.index_for(database)?;
        let built = self.builder.build(query)?;
        let page_size = if query.page_size == 0 {
            self.default_page_size
        } else {
            query.page_size
        };

        debug!(
            index = %index.id(),
            term = %query.term,
            clauses = built.clauses.len(),
            filters = built.filters.len(),
            "Executing search"
        );

        let results = {
            let context = index.create_search_context();
            self.pager.page(&context, &built, query.page, page_size).await
        };

        SEARCH_DURATION_SECONDS
            .with_label_values(&[index.id()])
            .observe(start_time.elapsed().as_secs_f64());

        let results = results?;
        SEARCH_HITS_TOTAL
            .with_label_values(&[index.id()])
            .inc_by(results.total_count as f64);

        info!(
            index = %index.id(),
            total = results.total_count,
            page = query.page,
            page_size,
            returned = results.items.len(),
            "Search completed"
        );

        Ok(results)
    }

    /// Resolve and acquire the index serving `database`
    pub fn index_for(&self, database: &str) -> SearchResult<Arc<ContentIndex>> {
        let index_id = self.resolver.resolve(database)?.ok_or_else(|| {
            SearchError::InvalidArgument(invalid_parameter_message("Database", database))
        })?;

        self.provider.get_index(index_id).map_err(|e| match e {
            unavailable @ SearchError::IndexUnavailable { .. } => unavailable,
            other => SearchError::IndexUnavailable {
                index: index_id.to_string(),
                source: Box::new(other),
            },
        })
    }

    /// Index items into the index of their database
    pub async fn index_items(&self, items: &[Item]) -> SearchResult<usize> {
        let mut by_index: HashMap<&str, Vec<Item>> = HashMap::new();
        for item in items {
            match self.resolver.resolve(&item.database)? {
                Some(index_id) => by_index.entry(index_id).or_default().push(item.clone()),
                None => warn!(database = %item.database, item_id = %item.id, "No index for database"),
            }
        }

        let mut indexed = 0;
        for (index_id, batch) in by_index {
            indexed += self.provider.get_index(index_id)?.index_items(&batch).await?;
        }
        Ok(indexed)
    }

    /// Remove items from the index of `database`
    pub async fn remove_items(&self, database: &str, ids: &[Uuid]) -> SearchResult<()> {
        let database = if database.trim().is_empty() {
            self.default_database.as_str()
        } else {
            database
        };

        match self.resolver.resolve(database)? {
            Some(index_id) => self.provider.get_index(index_id)?.remove_items(ids).await,
            None => Ok(()),
        }
    }
}
