//! Search document structures and indexing

use crate::models::Item;
use serde::{Deserialize, Serialize};
use tantivy::schema::*;
use tantivy::TantivyDocument;

/// Index field names
pub mod fields {
    /// Item id (hyphenated, lower-case)
    pub const ID: &str = "_id";
    /// Item name, full-text
    pub const NAME: &str = "_name";
    /// Display name, full-text
    pub const DISPLAY_NAME: &str = "_displayname";
    /// Concatenated field values, full-text
    pub const CONTENT: &str = "_content";
    pub const TEMPLATE_NAME: &str = "_templatename";
    pub const CREATED_BY: &str = "_createdby";
    pub const LANGUAGE: &str = "_language";
    pub const DATABASE: &str = "_database";
    pub const VERSION: &str = "_version";
    /// Lower-cased content path
    pub const FULL_PATH: &str = "_fullpath";
    /// Ids of the item and all its ancestors (multi-valued)
    pub const PATH: &str = "_path";
    pub const PARENT: &str = "_parent";
    /// Creation time as RFC 3339, sortable as text
    pub const CREATED: &str = "_created";

    /// Fields searched when a term carries no structured clauses
    pub const DEFAULT_SEARCH_FIELDS: [&str; 3] = [CONTENT, NAME, DISPLAY_NAME];

    /// Fields faceted on every search when default faceting is enabled
    pub const DEFAULT_FACETS: [&str; 4] = [CONTENT, TEMPLATE_NAME, CREATED_BY, LANGUAGE];

    /// Fields with a facet field holding their analyzed terms
    pub const FACETED: [&str; 13] = [
        ID,
        NAME,
        DISPLAY_NAME,
        CONTENT,
        TEMPLATE_NAME,
        CREATED_BY,
        LANGUAGE,
        DATABASE,
        VERSION,
        FULL_PATH,
        PATH,
        PARENT,
        CREATED,
    ];

    /// Facet field mirroring `name`
    pub fn facet_field(name: &str) -> String {
        format!("{}_facet", name)
    }
}

/// Trait for documents that can be indexed and searched
pub trait SearchDocument {
    /// Convert to Tantivy document
    fn to_tantivy_doc(&self, schema: &Schema) -> TantivyDocument;

    /// Get document ID
    fn document_id(&self) -> String;
}

/// Item document for search indexing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDocument {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub content: String,
    pub template_name: String,
    pub created_by: String,
    pub language: String,
    pub database: String,
    pub version: String,
    pub full_path: String,
    pub ancestry: Vec<String>,
    pub parent: Option<String>,
    pub created: String,
}

impl ItemDocument {
    /// Unique key of one language version of an item
    pub fn version_key(id: &str, language: &str, version: &str) -> String {
        format!("{}|{}|{}", id, language, version)
    }
}

impl From<&Item> for ItemDocument {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.name.clone(),
            display_name: item.display_name.clone(),
            content: item.content(),
            template_name: item.template_name.clone(),
            created_by: item.created_by.clone(),
            language: item.language.clone(),
            database: item.database.clone(),
            version: item.version.to_string(),
            full_path: item.path.to_lowercase(),
            ancestry: item.ancestry.iter().map(|id| id.to_string()).collect(),
            parent: item.parent_id.map(|id| id.to_string()),
            created: item.created.to_rfc3339(),
        }
    }
}

impl SearchDocument for ItemDocument {
    fn to_tantivy_doc(&self, schema: &Schema) -> TantivyDocument {
        let mut doc = TantivyDocument::new();

        let single_values = [
            (fields::ID, &self.id),
            (fields::NAME, &self.name),
            (fields::DISPLAY_NAME, &self.display_name),
            (fields::CONTENT, &self.content),
            (fields::TEMPLATE_NAME, &self.template_name),
            (fields::CREATED_BY, &self.created_by),
            (fields::LANGUAGE, &self.language),
            (fields::DATABASE, &self.database),
            (fields::VERSION, &self.version),
            (fields::FULL_PATH, &self.full_path),
            (fields::CREATED, &self.created),
        ];
        for (name, value) in single_values {
            if let Ok(field) = schema.get_field(name) {
                doc.add_text(field, value);
            }
        }

        // Ancestry (multi-valued)
        if let Ok(field) = schema.get_field(fields::PATH) {
            for id in &self.ancestry {
                doc.add_text(field, id);
            }
        }

        if let Some(ref parent) = self.parent {
            if let Ok(field) = schema.get_field(fields::PARENT) {
                doc.add_text(field, parent);
            }
        }

        doc
    }

    fn document_id(&self) -> String {
        Self::version_key(&self.id, &self.language, &self.version)
    }
}

/// Field holding `ItemDocument::document_id`, used to replace documents
pub const DOCUMENT_KEY: &str = "_uniqueid";

/// Build the search schema for content items
pub fn build_item_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    schema_builder.add_text_field(DOCUMENT_KEY, STRING | STORED);
    schema_builder.add_text_field(fields::ID, STRING | STORED | FAST);

    // Full-text fields; the fast column of names keeps the whole value for sorting
    schema_builder.add_text_field(fields::NAME, TEXT | STORED | FAST);
    schema_builder.add_text_field(fields::DISPLAY_NAME, TEXT | STORED | FAST);
    schema_builder.add_text_field(fields::CONTENT, TEXT | STORED);

    // Exact-match fields used for filtering and sorting
    schema_builder.add_text_field(fields::TEMPLATE_NAME, STRING | STORED | FAST);
    schema_builder.add_text_field(fields::CREATED_BY, STRING | STORED | FAST);
    schema_builder.add_text_field(fields::LANGUAGE, STRING | STORED | FAST);
    schema_builder.add_text_field(fields::DATABASE, STRING | STORED | FAST);
    schema_builder.add_text_field(fields::VERSION, STRING | STORED | FAST);
    schema_builder.add_text_field(fields::FULL_PATH, STRING | STORED | FAST);
    schema_builder.add_text_field(fields::PATH, STRING | STORED);
    schema_builder.add_text_field(fields::PARENT, STRING | STORED | FAST);
    schema_builder.add_text_field(fields::CREATED, STRING | STORED | FAST);

    // Facet fields, filled from the analyzed terms at indexing time
    for name in fields::FACETED {
        schema_builder.add_facet_field(&fields::facet_field(name), INDEXED);
    }

    schema_builder.build()
}
