//! Search configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Search engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Directory holding one sub-directory per index; in-memory indexes when unset
    #[serde(default)]
    pub index_path: Option<PathBuf>,

    /// Index writer heap size in bytes (default: 50MB)
    #[serde(default = "default_writer_heap_size")]
    pub writer_heap_size: usize,

    /// Register facets on content, template, creator and language for every search
    #[serde(default)]
    pub use_default_facets: bool,

    /// Page size used when a caller supplies none or a non-positive one
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Logical database name to physical index id
    #[serde(default = "default_indexes")]
    pub indexes: HashMap<String, String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_path: None,
            writer_heap_size: default_writer_heap_size(),
            use_default_facets: false,
            default_page_size: default_page_size(),
            indexes: default_indexes(),
        }
    }
}

fn default_writer_heap_size() -> usize {
    50_000_000 // 50MB
}

fn default_page_size() -> usize {
    10
}

fn default_indexes() -> HashMap<String, String> {
    [
        ("master", "sitecore_master_index"),
        ("web", "sitecore_web_index"),
        ("core", "sitecore_core_index"),
    ]
    .into_iter()
    .map(|(database, index)| (database.to_string(), index.to_string()))
    .collect()
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn index_path(mut self, path: PathBuf) -> Self {
        self.config.index_path = Some(path);
        self
    }

    pub fn writer_heap_size(mut self, size: usize) -> Self {
        self.config.writer_heap_size = size;
        self
    }

    pub fn use_default_facets(mut self, enabled: bool) -> Self {
        self.config.use_default_facets = enabled;
        self
    }

    pub fn default_page_size(mut self, size: usize) -> Self {
        self.config.default_page_size = size.max(1);
        self
    }

    pub fn index(mut self, database: impl Into<String>, index_id: impl Into<String>) -> Self {
        self.config.indexes.insert(database.into(), index_id.into());
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
