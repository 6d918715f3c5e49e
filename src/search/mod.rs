//! Faceted full-text item search powered by Tantivy
//!
//! A search runs in three stages:
//!
//! - **Resolution**: the repository database is mapped to an index id and the
//!   index handle is acquired from an [`IndexProvider`].
//! - **Building**: the term is parsed into match clauses and combined with
//!   facet, language, scope and sort settings into an [`ItemQuery`].
//! - **Paging**: the query runs once unpaged for the total count and facet
//!   buckets, then again for one page whose hits are loaded from the
//!   item repository.
//!
//! ```text
//!  SearchQuery ──► IndexResolver ──► IndexProvider ──► ContentIndex
//!       │                                                  │
//!       ▼                                                  ▼
//!  QueryBuilder ──► ItemQuery ──► ResultPager ◄── SearchContext
//!                                     │
//!                                     ▼
//!                              ItemSearchResults
//! ```
//!
//! # Example
//!
//! ```no_run
//! use item_service::search::SearchQuery;
//!
//! let query = SearchQuery::new("lorem")
//!     .with_database("web")
//!     .with_language("all")
//!     .with_facet("_templatename")
//!     .with_page_size(10);
//! assert_eq!(query.page, 0);
//! ```

mod config;
mod document;
mod error;
mod index;
mod pager;
mod query;
mod resolver;
mod service;

pub use config::{SearchConfig, SearchConfigBuilder};
pub use document::{build_item_schema, fields, ItemDocument, SearchDocument};
pub use error::{SearchError, SearchResult};
pub use index::{ContentIndex, IndexProvider, IndexRegistry, SearchContext};
pub use pager::{FacetCount, FacetResult, ItemSearchResults, ResultPager};
pub use query::{
    FacetFilter, FieldFilter, ItemQuery, Operation, QueryBuilder, SearchQuery, SearchStringModel,
    SortField, SortOrder, DEFAULT_PAGE_SIZE,
};
pub use resolver::IndexResolver;
pub use service::ItemSearch;
