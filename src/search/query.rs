//! Search query parsing and building

use crate::error::invalid_parameter_message;
use crate::models::{canonical_language, is_all_languages};
use crate::search::config::SearchConfig;
use crate::search::document::fields;
use crate::search::error::{SearchError, SearchResult};
use crate::search::index::ContentIndex;
use serde::{Deserialize, Serialize};
use tantivy::query::{AllQuery, BooleanQuery, EmptyQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::Term;
use uuid::Uuid;

/// Page size used when a caller supplies none
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Input to a single search invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free text, optionally carrying `;`-separated `[+|-]field:value` clauses
    pub term: String,

    /// Repository database; empty means the configured default
    pub database: String,

    /// Language to restrict to, or `all`
    pub language: String,

    /// `|`-separated `a<field>` / `d<field>` entries
    pub sorting: String,

    /// Zero-based page index
    pub page: usize,

    pub page_size: usize,

    /// `field` or `field|value`
    pub facet: String,

    /// Restrict results to the subtree under this item
    pub root: Option<Uuid>,
}

impl SearchQuery {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            database: String::new(),
            language: String::new(),
            sorting: String::new(),
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
            facet: String::new(),
            root: None,
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_sorting(mut self, sorting: impl Into<String>) -> Self {
        self.sorting = sorting.into();
        self
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_facet(mut self, facet: impl Into<String>) -> Self {
        self.facet = facet.into();
        self
    }

    pub fn with_root(mut self, root: Uuid) -> Self {
        self.root = Some(root);
        self
    }
}

/// How a clause combines with the others
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Must,
    Not,
    Should,
}

impl Operation {
    fn occur(self) -> Occur {
        match self {
            Operation::Must => Occur::Must,
            Operation::Not => Occur::MustNot,
            Operation::Should => Occur::Should,
        }
    }
}

/// One structured match clause extracted from a search term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStringModel {
    /// Pipe-delimited field names
    pub field_selector: String,
    pub value: String,
    pub operation: Operation,
}

impl SearchStringModel {
    /// Extract the clauses embedded in `term`.
    ///
    /// Segments are separated by `;` and read `[+|-]selector:value`. Segments
    /// without a selector or a value yield nothing.
    pub fn extract(term: &str) -> Vec<Self> {
        term.split(';')
            .filter_map(|segment| {
                let segment = segment.trim();
                let (operation, rest) = match segment.chars().next()? {
                    '+' => (Operation::Must, &segment[1..]),
                    '-' => (Operation::Not, &segment[1..]),
                    _ => (Operation::Should, segment),
                };

                let (selector, value) = rest.split_once(':')?;
                let (selector, value) = (selector.trim(), value.trim());
                if selector.is_empty() || value.is_empty() {
                    return None;
                }

                Some(Self {
                    field_selector: selector.to_string(),
                    value: value.to_string(),
                    operation,
                })
            })
            .collect()
    }

    /// The clause used when a term carries no structured clauses
    pub fn default_for(term: &str) -> Self {
        Self {
            field_selector: fields::DEFAULT_SEARCH_FIELDS.join("|"),
            value: term.trim().to_lowercase(),
            operation: Operation::Must,
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.field_selector
            .split('|')
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Equality filter and facet registrations derived from a facet parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetFilter {
    pub field: String,
    pub value: String,

    /// Every `|` segment, each registered as its own facet
    pub facets: Vec<String>,
}

impl FacetFilter {
    /// Segments are taken verbatim, empty ones included
    pub fn parse(facet: &str) -> Option<Self> {
        if facet.is_empty() {
            return None;
        }
        let segments: Vec<String> = facet.split('|').map(str::to_string).collect();

        let field = segments.first()?.clone();
        let value = segments.last()?.clone();
        Some(Self {
            field,
            value,
            facets: segments,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub order: SortOrder,
}

impl SortField {
    /// Parse `|`-separated `a<field>` / `d<field>` entries.
    ///
    /// Malformed entries are skipped.
    pub fn parse_list(sorting: &str) -> Vec<Self> {
        sorting
            .split('|')
            .map(str::trim)
            .filter_map(|entry| {
                let mut chars = entry.chars();
                let order = match chars.next()?.to_ascii_lowercase() {
                    'a' => SortOrder::Ascending,
                    'd' => SortOrder::Descending,
                    _ => return None,
                };
                let field = chars.as_str().trim();
                if field.is_empty() {
                    return None;
                }
                Some(Self {
                    field: field.to_string(),
                    order,
                })
            })
            .collect()
    }
}

/// Exact-value restriction on one index field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: String,
    pub value: String,
}

impl FieldFilter {
    fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// A composed query that has not been executed yet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    pub clauses: Vec<SearchStringModel>,
    pub filters: Vec<FieldFilter>,

    /// Facet names in registration order, without duplicates
    pub facets: Vec<String>,
    pub sort: Vec<SortField>,
}

impl ItemQuery {
    fn register_facet(&mut self, name: &str) {
        if !self.facets.iter().any(|existing| existing == name) {
            self.facets.push(name.to_string());
        }
    }

    /// Compile into a Tantivy query against `index`
    pub fn to_tantivy(&self, index: &ContentIndex) -> SearchResult<Box<dyn Query>> {
        let mut text: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for clause in &self.clauses {
            text.push((clause.operation.occur(), clause_query(index, clause)?));
        }

        // A purely negative query needs something to subtract from
        if text.iter().all(|(occur, _)| *occur == Occur::MustNot) {
            text.push((Occur::Must, Box::new(AllQuery)));
        }

        let text_query: Box<dyn Query> = Box::new(BooleanQuery::new(text));
        let mut subqueries = vec![(Occur::Must, text_query)];

        for filter in &self.filters {
            let query: Box<dyn Query> = match index.text_field(&filter.field) {
                Some(field) => field_query(index, field, &filter.value)?,
                None => Box::new(EmptyQuery),
            };
            subqueries.push((Occur::Must, query));
        }

        Ok(Box::new(BooleanQuery::new(subqueries)))
    }

    /// Sort entries naming fields with a fast column
    pub fn resolved_sort(&self, index: &ContentIndex) -> Vec<(String, SortOrder)> {
        self.sort
            .iter()
            .filter(|sort| {
                index
                    .field(&sort.field)
                    .is_some_and(|field| index.schema().get_field_entry(field).is_fast())
            })
            .map(|sort| (sort.field.clone(), sort.order))
            .collect()
    }
}

/// A clause matches when any of its selector fields does
fn clause_query(index: &ContentIndex, clause: &SearchStringModel) -> SearchResult<Box<dyn Query>> {
    let mut per_field = Vec::new();
    for name in clause.fields() {
        if let Some(field) = index.text_field(name) {
            per_field.push(field_query(index, field, &clause.value)?);
        }
    }

    let query: Box<dyn Query> = match per_field.len() {
        0 => Box::new(EmptyQuery),
        1 => per_field.remove(0),
        _ => Box::new(BooleanQuery::union(per_field)),
    };
    Ok(query)
}

/// All of the value's terms must occur in the field
fn field_query(index: &ContentIndex, field: Field, value: &str) -> SearchResult<Box<dyn Query>> {
    let mut terms: Vec<Box<dyn Query>> = index
        .analyze(field, value)?
        .iter()
        .map(|token| -> Box<dyn Query> {
            Box::new(TermQuery::new(
                Term::from_field_text(field, token),
                IndexRecordOption::Basic,
            ))
        })
        .collect();

    let query: Box<dyn Query> = match terms.len() {
        0 => Box::new(EmptyQuery),
        1 => terms.remove(0),
        _ => Box::new(BooleanQuery::intersection(terms)),
    };
    Ok(query)
}

/// Turns search parameters into an `ItemQuery`
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    use_default_facets: bool,
    default_language: String,
}

impl QueryBuilder {
    pub fn new(config: &SearchConfig, default_language: impl Into<String>) -> Self {
        Self {
            use_default_facets: config.use_default_facets,
            default_language: default_language.into(),
        }
    }

    pub fn build(&self, query: &SearchQuery) -> SearchResult<ItemQuery> {
        let mut built = ItemQuery::default();

        built.clauses = SearchStringModel::extract(&query.term);
        if built.clauses.is_empty() {
            built.clauses.push(SearchStringModel::default_for(&query.term));
        }

        if self.use_default_facets {
            for name in fields::DEFAULT_FACETS {
                built.register_facet(name);
            }
        }

        if let Some(facet) = FacetFilter::parse(&query.facet) {
            built
                .filters
                .push(FieldFilter::new(facet.field.clone(), facet.value.clone()));
            for name in &facet.facets {
                built.register_facet(name);
            }
        }

        if !is_all_languages(&query.language) {
            let language = canonical_language(&query.language, &self.default_language)
                .ok_or_else(|| {
                    SearchError::InvalidArgument(invalid_parameter_message(
                        "Language",
                        &query.language,
                    ))
                })?;
            built.filters.push(FieldFilter::new(fields::LANGUAGE, language));
        }

        if let Some(root) = query.root {
            built
                .filters
                .push(FieldFilter::new(fields::PATH, root.to_string()));
        }

        built.sort = SortField::parse_list(&query.sorting);

        Ok(built)
    }
}
