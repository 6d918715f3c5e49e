//! Error types for search operations

use crate::error::ServiceError;

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during search operations
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Caller supplied an unusable value
    #[error("{0}")]
    InvalidArgument(String),

    /// No index is registered under the id
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// Index handle could not be acquired
    #[error("Failed to get index ({index})")]
    IndexUnavailable {
        index: String,
        #[source]
        source: BoxError,
    },

    /// Query execution against the index failed
    #[error("Search against index ({index}) failed")]
    SearchFailed {
        index: String,
        #[source]
        source: BoxError,
    },

    /// Index initialization failed
    #[error("Index initialization failed: {0}")]
    IndexInitFailed(String),

    /// Document indexing failed
    #[error("Document indexing failed: {0}")]
    IndexingFailed(String),

    /// A hit could not be turned back into an item
    #[error(transparent)]
    Materialization(ServiceError),
}

impl SearchError {
    pub fn search_failed(index: &str, source: impl Into<BoxError>) -> Self {
        SearchError::SearchFailed {
            index: index.to_string(),
            source: source.into(),
        }
    }
}

impl From<SearchError> for ServiceError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidArgument(msg) => ServiceError::InvalidArgument(msg),
            SearchError::Materialization(inner) => inner,
            err @ (SearchError::IndexUnavailable { .. } | SearchError::SearchFailed { .. }) => {
                ServiceError::Unavailable {
                    message: err.to_string(),
                    source: Some(Box::new(err)),
                }
            }
            other => ServiceError::Other(anyhow::Error::new(other)),
        }
    }
}
