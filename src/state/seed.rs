//! Sample content for local runs

use crate::models::{ItemModel, ItemScope, QUERY_FIELD};
use crate::state::{ItemRepository, RepositoryResult};
use std::collections::BTreeMap;
use tracing::info;

const ARTICLES: [(&str, &str); 3] = [
    ("Launch", "Lorem ipsum dolor sit amet, consectetur adipiscing elit."),
    ("Roadmap", "Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua."),
    ("Release Notes", "Ut enim ad minim veniam, quis nostrud lorem exercitation."),
];

fn model(name: &str, template: &str, fields: &[(&str, &str)]) -> ItemModel {
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

/// Create a small site under `/sitecore/content` in `database`.
///
/// Returns the created items so they can be indexed.
pub async fn seed_sample_content(
    repository: &dyn ItemRepository,
    database: &str,
) -> RepositoryResult<Vec<crate::models::Item>> {
    let scope = ItemScope::new(database, "");
    let mut created = Vec::new();

    let home = repository
        .create_item(
            "/sitecore/content",
            &model(
                "Home",
                "Sample Item",
                &[("Title", "Sitecore"), ("Text", "Welcome to the lorem ipsum sample site")],
            ),
            &scope,
        )
        .await?;
    created.push(home.clone());

    for parent in ["News", "Queries", "Searches"] {
        created.push(
            repository
                .create_item(&home.path, &model(parent, "Folder", &[]), &scope)
                .await?,
        );
    }

    let news_path = format!("{}/News", home.path);
    for (name, text) in ARTICLES {
        created.push(
            repository
                .create_item(&news_path, &model(name, "Article", &[("Title", name), ("Text", text)]), &scope)
                .await?,
        );
    }

    let news_query = format!("{}/*", news_path);
    created.push(
        repository
            .create_item(
                &format!("{}/Queries", home.path),
                &model("Latest News", "Query Definition", &[(QUERY_FIELD, news_query.as_str())]),
                &scope,
            )
            .await?,
    );

    let root = home.id.to_string();
    created.push(
        repository
            .create_item(
                &format!("{}/Searches", home.path),
                &model(
                    "Site Search",
                    "Search Definition",
                    &[("RootItem", root.as_str()), ("Facet", "_templatename"), ("Sorting", "a_name")],
                ),
                &scope,
            )
            .await?,
    );

    info!(database, items = created.len(), "Seeded sample content");
    Ok(created)
}
