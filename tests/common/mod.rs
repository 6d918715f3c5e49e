//! Shared fixtures for the integration tests
//!
//! Builds the full service stack over an in-memory repository and in-memory
//! indexes, plus helpers to populate content and read HTTP responses.

#![allow(dead_code)]

use axum::{body::Body, http::Response, Router};
use item_service::{
    api::{build_router, AppState},
    config::Config,
    handlers::{Dispatcher, HandlerRegistry},
    models::{Item, ItemModel, ItemScope},
    search::{IndexRegistry, ItemSearch},
    state::{InMemoryItemRepository, ItemRepository},
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub const ROUTE_BASE: &str = "/sitecore/api/ssc";

/// The assembled service
pub struct TestService {
    pub config: Config,
    pub repository: Arc<InMemoryItemRepository>,
    pub indexes: Arc<IndexRegistry>,
    pub search: Arc<ItemSearch>,
    pub dispatcher: Dispatcher,
}

impl TestService {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let repository = Arc::new(InMemoryItemRepository::new(config.repository.clone()));
        let indexes = Arc::new(IndexRegistry::open(&config.search).unwrap());
        let shared: Arc<dyn ItemRepository> = repository.clone();
        let search = Arc::new(ItemSearch::new(
            &config.search,
            &config.repository,
            indexes.clone(),
            shared.clone(),
        ));
        let dispatcher = Dispatcher::new(HandlerRegistry::with_defaults(shared, search.clone()));

        Self {
            config,
            repository,
            indexes,
            search,
            dispatcher,
        }
    }

    pub fn router(&self) -> Router {
        build_router(AppState::new(self.dispatcher.clone(), ROUTE_BASE))
    }

    /// Create an item below `parent_path` and index it
    pub async fn create(
        &self,
        parent_path: &str,
        name: &str,
        template: &str,
        fields: &[(&str, &str)],
        scope: &ItemScope,
    ) -> Item {
        let item = self
            .repository
            .create_item(parent_path, &model(name, template, fields), scope)
            .await
            .unwrap();
        self.search
            .index_items(std::slice::from_ref(&item))
            .await
            .unwrap();
        item
    }

    /// Create `count` articles mentioning "lorem" under a new folder
    pub async fn seed_articles(&self, database: &str, folder: &str, count: usize) -> Item {
        let scope = ItemScope::new(database, "en");
        let folder = self
            .create("/sitecore/content", folder, "Folder", &[], &scope)
            .await;

        for n in 0..count {
            let name = format!("Article {:02}", n);
            let text = format!("Lorem ipsum dolor sit amet number {}", n);
            self.create(&folder.path, &name, "Article", &[("Text", text.as_str())], &scope)
                .await;
        }
        folder
    }
}

/// Defaults with in-memory indexes and the smallest writer heap
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.search.index_path = None;
    config.search.writer_heap_size = 15_000_000;
    config
}

pub fn model(name: &str, template: &str, fields: &[(&str, &str)]) -> ItemModel {
    ItemModel {
        item_name: Some(name.to_string()),
        template_name: Some(template.to_string()),
        display_name: None,
        fields: fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect::<BTreeMap<_, _>>(),
    }
}

pub fn item_url(path: &str) -> String {
    format!("{}{}", ROUTE_BASE, path)
}

/// Read a response body as JSON
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Read a response body as text
pub async fn text_body(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Parse Prometheus exposition output into metric name -> lines
pub fn parse_prometheus_output(output: &str) -> HashMap<String, Vec<String>> {
    let mut metrics = HashMap::new();
    let mut current_metric = String::new();

    for line in output.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if line.starts_with("# HELP") || line.starts_with("# TYPE") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 3 {
                current_metric = parts[2].to_string();
                metrics
                    .entry(current_metric.clone())
                    .or_insert_with(Vec::new)
                    .push(line.to_string());
            }
        } else if !line.starts_with('#') && !current_metric.is_empty() {
            metrics
                .entry(current_metric.clone())
                .or_insert_with(Vec::new)
                .push(line.to_string());
        }
    }

    metrics
}
