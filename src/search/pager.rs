//! Paged execution of built queries

use crate::models::{Item, ItemScope};
use crate::search::document::fields;
use crate::search::error::{SearchError, SearchResult};
use crate::search::index::{ContentIndex, SearchContext};
use crate::search::query::{ItemQuery, SortOrder};
use crate::state::ItemRepository;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tantivy::collector::{Count, FacetCollector, MultiCollector, TopDocs};
use tantivy::query::Query;
use tantivy::schema::{Facet, Field, Value};
use tantivy::{DocAddress, DocId, Searcher, SegmentReader, TantivyDocument};
use tracing::debug;
use uuid::Uuid;

/// Facet count result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    pub name: String,
    pub count: u64,
}

/// Buckets of one registered facet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetResult {
    pub name: String,

    /// Ordered by count descending, then value ascending
    pub values: Vec<FacetCount>,
}

/// One page of search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSearchResults {
    /// Matches before paging
    pub total_count: usize,
    pub number_of_pages: usize,
    pub items: Vec<Item>,

    /// Facets in registration order
    pub facets: Vec<FacetResult>,
}

impl ItemSearchResults {
    pub fn facet(&self, name: &str) -> Option<&[FacetCount]> {
        self.facets
            .iter()
            .find(|facet| facet.name == name)
            .map(|facet| facet.values.as_slice())
    }
}

/// Index coordinates of a hit, used to load the item
#[derive(Debug, Clone)]
struct HitKey {
    id: Uuid,
    database: String,
    language: String,
    version: String,
}

/// Runs an `ItemQuery` for counts, facets and one page of items
pub struct ResultPager {
    repository: Arc<dyn ItemRepository>,
}

impl ResultPager {
    pub fn new(repository: Arc<dyn ItemRepository>) -> Self {
        Self { repository }
    }

    pub async fn page(
        &self,
        context: &SearchContext<'_>,
        query: &ItemQuery,
        page: usize,
        page_size: usize,
    ) -> SearchResult<ItemSearchResults> {
        let index = context.index();
        let searcher = context.searcher();
        let page_size = page_size.max(1);
        let compiled = query.to_tantivy(index)?;

        // Unpaged pass
        let (total_count, facets) = count_and_facets(index, searcher, &*compiled, &query.facets)?;

        // Paged pass, never asking for more hits than remain
        let skip = page_size.saturating_mul(page);
        let page_hits = if skip >= total_count {
            Vec::new()
        } else {
            let take = page_size.min(total_count - skip);
            let sort = query.resolved_sort(index);
            if sort.is_empty() {
                relevance_page(index, searcher, &*compiled, skip, take)?
            } else {
                sorted_page(index, searcher, &*compiled, sort, skip, take)?
            }
        };

        let keys = page_hits
            .into_iter()
            .map(|address| hit_key(index, searcher, address))
            .collect::<SearchResult<Vec<_>>>()?;

        let items = self.materialize(keys.into_iter().flatten()).await?;

        Ok(ItemSearchResults {
            total_count,
            number_of_pages: total_count.div_ceil(page_size),
            items,
            facets,
        })
    }

    /// Load hit items; hits the repository cannot return are dropped
    async fn materialize(&self, keys: impl Iterator<Item = HitKey>) -> SearchResult<Vec<Item>> {
        let mut items = Vec::new();
        for key in keys {
            let scope = ItemScope::new(&key.database, &key.language).with_version(&key.version);
            match self.repository.get_item(key.id, &scope).await {
                Ok(Some(item)) => items.push(item),
                Ok(None) => debug!(item_id = %key.id, "Dropping hit with no matching item"),
                Err(e) if e.is_access_violation() => {
                    debug!(item_id = %key.id, "Dropping hit the caller may not read")
                }
                Err(e) => return Err(SearchError::Materialization(e)),
            }
        }
        Ok(items)
    }
}

fn load_doc(index: &ContentIndex, searcher: &Searcher, address: DocAddress) -> SearchResult<TantivyDocument> {
    searcher
        .doc::<TantivyDocument>(address)
        .map_err(|e| SearchError::search_failed(index.id(), e))
}

fn first_text(doc: &TantivyDocument, field: Option<Field>) -> Option<String> {
    field.and_then(|field| doc.get_first(field).and_then(|v| v.as_str()).map(str::to_string))
}

fn hit_key(index: &ContentIndex, searcher: &Searcher, address: DocAddress) -> SearchResult<Option<HitKey>> {
    let doc = load_doc(index, searcher, address)?;

    let id = first_text(&doc, index.field(fields::ID)).and_then(|id| Uuid::parse_str(&id).ok());
    Ok(id.map(|id| HitKey {
        id,
        database: first_text(&doc, index.field(fields::DATABASE)).unwrap_or_default(),
        language: first_text(&doc, index.field(fields::LANGUAGE)).unwrap_or_default(),
        version: first_text(&doc, index.field(fields::VERSION)).unwrap_or_default(),
    }))
}

/// Count all matches and the facet buckets of every registered facet in one pass.
///
/// Facet names without a facet field get an empty bucket list.
fn count_and_facets(
    index: &ContentIndex,
    searcher: &Searcher,
    query: &dyn Query,
    names: &[String],
) -> SearchResult<(usize, Vec<FacetResult>)> {
    let mut collectors = MultiCollector::new();
    let count_handle = collectors.add_collector(Count);

    let mut facet_handles = Vec::with_capacity(names.len());
    for name in names {
        let facet_field = fields::facet_field(name);
        let handle = index.field(&facet_field).map(|_| {
            let mut collector = FacetCollector::for_field(&facet_field);
            collector.add_facet(Facet::from("/"));
            collectors.add_collector(collector)
        });
        facet_handles.push((name, handle));
    }

    let mut fruits = searcher
        .search(query, &collectors)
        .map_err(|e| SearchError::search_failed(index.id(), e))?;
    let total_count = count_handle.extract(&mut fruits);

    let facets = facet_handles
        .into_iter()
        .map(|(name, handle)| {
            let mut values = match handle {
                Some(handle) => {
                    let counts = handle.extract(&mut fruits);
                    let values: Vec<FacetCount> = counts
                        .get("/")
                        .filter_map(|(facet, count)| {
                            facet.to_path().last().map(|value| FacetCount {
                                name: value.to_string(),
                                count,
                            })
                        })
                        .collect();
                    values
                }
                None => Vec::new(),
            };
            values.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));

            FacetResult {
                name: name.clone(),
                values,
            }
        })
        .collect();

    Ok((total_count, facets))
}

fn relevance_page(
    index: &ContentIndex,
    searcher: &Searcher,
    query: &dyn Query,
    skip: usize,
    take: usize,
) -> SearchResult<Vec<DocAddress>> {
    Ok(searcher
        .search(query, &TopDocs::with_limit(take).and_offset(skip))
        .map_err(|e| SearchError::search_failed(index.id(), e))?
        .into_iter()
        .map(|(_score, address)| address)
        .collect())
}

/// Lower-cased fast-column values of one hit; the greatest key ranks first
#[derive(Debug, Clone, PartialEq, Eq)]
struct SortKey(Vec<(String, SortOrder)>);

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|((a, order), (b, _))| match order {
                SortOrder::Ascending => b.cmp(a),
                SortOrder::Descending => a.cmp(b),
            })
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Order matches by the fast columns of the sort fields and cut one page
fn sorted_page(
    index: &ContentIndex,
    searcher: &Searcher,
    query: &dyn Query,
    sort: Vec<(String, SortOrder)>,
    skip: usize,
    take: usize,
) -> SearchResult<Vec<DocAddress>> {
    let collector = TopDocs::with_limit(take)
        .and_offset(skip)
        .custom_score(move |segment_reader: &SegmentReader| {
            let columns: Vec<_> = sort
                .iter()
                .map(|(name, order)| (segment_reader.fast_fields().str(name).ok().flatten(), *order))
                .collect();

            move |doc: DocId| {
                SortKey(
                    columns
                        .iter()
                        .map(|(column, order)| {
                            let mut value = String::new();
                            if let Some(column) = column {
                                if let Some(ord) = column.term_ords(doc).next() {
                                    if column.ord_to_str(ord, &mut value).is_err() {
                                        value.clear();
                                    }
                                }
                            }
                            (value.to_lowercase(), *order)
                        })
                        .collect(),
                )
            }
        });

    Ok(searcher
        .search(query, &collector)
        .map_err(|e| SearchError::search_failed(index.id(), e))?
        .into_iter()
        .map(|(_key, address)| address)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facet_lookup() {
        let results = ItemSearchResults {
            total_count: 0,
            number_of_pages: 0,
            items: Vec::new(),
            facets: vec![FacetResult {
                name: "_language".to_string(),
                values: vec![FacetCount {
                    name: "en".to_string(),
                    count: 3,
                }],
            }],
        };

        assert_eq!(results.facet("_language").map(|v| v.len()), Some(1));
        assert!(results.facet("_templatename").is_none());
    }

    #[test]
    fn test_sort_key_ranks_by_direction() {
        let key = |name: &str, order| SortKey(vec![(name.to_string(), order)]);

        assert!(key("a", SortOrder::Ascending) > key("b", SortOrder::Ascending));
        assert!(key("b", SortOrder::Descending) > key("a", SortOrder::Descending));

        let mixed = |first: &str, second: &str| {
            SortKey(vec![
                (first.to_string(), SortOrder::Descending),
                (second.to_string(), SortOrder::Ascending),
            ])
        };
        assert!(mixed("x", "b") > mixed("w", "a"));
        assert!(mixed("x", "a") > mixed("x", "b"));
    }
}
