//! Logical database to physical index mapping

use crate::search::error::{SearchError, SearchResult};
use std::collections::HashMap;

/// Maps repository database names to index ids
#[derive(Debug, Clone)]
pub struct IndexResolver {
    /// Keyed by lower-cased database name
    indexes: HashMap<String, String>,
}

impl IndexResolver {
    pub fn new(indexes: &HashMap<String, String>) -> Self {
        Self {
            indexes: indexes
                .iter()
                .map(|(database, index)| (database.to_lowercase(), index.clone()))
                .collect(),
        }
    }

    /// Resolve the index id for `database`.
    ///
    /// Returns `Ok(None)` for a database with no index.
    pub fn resolve(&self, database: &str) -> SearchResult<Option<&str>> {
        let database = database.trim();
        if database.is_empty() {
            return Err(SearchError::InvalidArgument(
                "Database name must not be empty".to_string(),
            ));
        }

        Ok(self
            .indexes
            .get(&database.to_lowercase())
            .map(String::as_str))
    }
}
