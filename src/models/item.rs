use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

/// Standard field holding the item's security rules
pub const SECURITY_FIELD: &str = "__Security";

/// Field holding a content-path query on query-definition items
pub const QUERY_FIELD: &str = "Query";

/// Template assigned when a create request names none
pub const DEFAULT_TEMPLATE: &str = "Sample Item";

/// Characters that may not appear in an item name
const INVALID_NAME_CHARS: &[char] = &['\\', '/', ':', '?', '"', '<', '>', '|', '[', ']'];

/// Whether a field is a standard template field
pub fn is_standard_field(name: &str) -> bool {
    name.starts_with("__")
}

/// Whether a name can be used as an item name
pub fn is_valid_item_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty()
        && trimmed.len() == name.len()
        && !name.contains(INVALID_NAME_CHARS)
        && !name.ends_with('.')
}

/// Rights checked against an item's security rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum AccessRight {
    Read,
    Write,
    Delete,
}

impl AccessRight {
    fn denial_token(&self) -> &'static str {
        match self {
            AccessRight::Read => "-item:read",
            AccessRight::Write => "-item:write",
            AccessRight::Delete => "-item:delete",
        }
    }
}

/// A versioned, language-specific content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub path: String,
    pub parent_id: Option<Uuid>,
    pub template_name: String,
    pub database: String,
    pub language: String,
    pub version: u32,
    pub created_by: String,
    pub created: DateTime<Utc>,
    pub fields: BTreeMap<String, String>,

    /// Ids from the root down to and including this item
    pub ancestry: Vec<Uuid>,
}

impl Item {
    /// Create a root item (no parent)
    pub fn root(id: Uuid, name: &str, database: &str, language: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            display_name: name.to_string(),
            path: format!("/{}", name),
            parent_id: None,
            template_name: "Root".to_string(),
            database: database.to_string(),
            language: language.to_string(),
            version: 1,
            created_by: "system".to_string(),
            created: Utc::now(),
            fields: BTreeMap::new(),
            ancestry: vec![id],
        }
    }

    /// Create a first version of a child of `parent`
    pub fn child_of(parent: &Item, id: Uuid, name: &str, template_name: &str) -> Self {
        let mut ancestry = parent.ancestry.clone();
        ancestry.push(id);

        Self {
            id,
            name: name.to_string(),
            display_name: name.to_string(),
            path: format!("{}/{}", parent.path, name),
            parent_id: Some(parent.id),
            template_name: template_name.to_string(),
            database: parent.database.clone(),
            language: parent.language.clone(),
            version: 1,
            created_by: "api".to_string(),
            created: Utc::now(),
            fields: BTreeMap::new(),
            ancestry,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Whether the item's security rules deny `right`
    pub fn denies(&self, right: AccessRight) -> bool {
        self.field(SECURITY_FIELD)
            .map(|rules| rules.contains(right.denial_token()))
            .unwrap_or(false)
    }

    /// Whether `ancestor` is this item or one of its ancestors
    pub fn is_under(&self, ancestor: &Uuid) -> bool {
        self.ancestry.contains(ancestor)
    }

    /// Concatenated non-standard field values, used as full-text content
    pub fn content(&self) -> String {
        self.fields
            .iter()
            .filter(|(name, _)| !is_standard_field(name))
            .map(|(_, value)| value.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Item body accepted by create and update requests
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ItemModel {
    #[serde(rename = "ItemName", default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub item_name: Option<String>,

    #[serde(rename = "TemplateName", default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub template_name: Option<String>,

    #[serde(rename = "DisplayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Field values keyed by field name
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Item {
        let root = Item::root(Uuid::new_v4(), "sitecore", "master", "en");
        Item::child_of(&root, Uuid::new_v4(), "home", "Page")
    }

    #[test]
    fn test_child_inherits_path_and_ancestry() {
        let root = Item::root(Uuid::new_v4(), "sitecore", "master", "en");
        let child = Item::child_of(&root, Uuid::new_v4(), "content", "Folder");

        assert_eq!(child.path, "/sitecore/content");
        assert_eq!(child.parent_id, Some(root.id));
        assert!(child.is_under(&root.id));
        assert!(child.is_under(&child.id));
        assert_eq!(child.database, "master");
    }

    #[test]
    fn test_security_denials() {
        let item = sample().with_field(SECURITY_FIELD, "ar|sitecore\\Anonymous|pe|-item:write|");
        assert!(item.denies(AccessRight::Write));
        assert!(!item.denies(AccessRight::Read));
        assert!(!sample().denies(AccessRight::Delete));
    }

    #[test]
    fn test_content_skips_standard_fields() {
        let item = sample()
            .with_field("Title", "Lorem")
            .with_field("Text", "ipsum")
            .with_field("__Sortorder", "100");
        assert_eq!(item.content(), "ipsum Lorem");
    }

    #[test]
    fn test_item_name_validation() {
        assert!(is_valid_item_name("Home"));
        assert!(is_valid_item_name("About us"));
        assert!(!is_valid_item_name(""));
        assert!(!is_valid_item_name(" padded"));
        assert!(!is_valid_item_name("a/b"));
        assert!(!is_valid_item_name("trailing."));
    }

    #[test]
    fn test_item_model_flattens_fields() {
        let model: ItemModel = serde_json::from_str(
            r#"{"ItemName": "News", "TemplateName": "Folder", "Title": "Latest"}"#,
        )
        .unwrap();
        assert_eq!(model.item_name.as_deref(), Some("News"));
        assert_eq!(model.fields.get("Title").map(String::as_str), Some("Latest"));
        assert!(!model.fields.contains_key("ItemName"));
    }
}
