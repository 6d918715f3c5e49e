//! JSON shapes returned by the item routes

use crate::api::routes::{LinkBuilder, RouteDefinition};
use crate::models::{is_standard_field, Item};
use crate::search::{FacetResult, ItemSearchResults};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Which item properties a response carries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelection {
    /// Lower-cased property names; `None` keeps everything
    only: Option<Vec<String>>,
    include_standard_fields: bool,
}

impl FieldSelection {
    /// `fields` is a comma-separated property list; empty means all
    pub fn new(fields: &str, include_standard_fields: bool) -> Self {
        let only: Vec<String> = fields
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_lowercase)
            .collect();

        Self {
            only: if only.is_empty() { None } else { Some(only) },
            include_standard_fields,
        }
    }

    fn allows(&self, name: &str) -> bool {
        match self.only {
            Some(ref only) => only.iter().any(|allowed| allowed.eq_ignore_ascii_case(name)),
            None => true,
        }
    }
}

/// Flatten an item into its JSON representation
pub fn item_json(item: &Item, selection: &FieldSelection) -> Value {
    let parent_id = item.parent_id.map(|id| id.to_string()).unwrap_or_default();
    let properties = [
        ("ItemID", item.id.to_string()),
        ("ItemName", item.name.clone()),
        ("ItemPath", item.path.clone()),
        ("ParentID", parent_id),
        ("TemplateName", item.template_name.clone()),
        ("ItemLanguage", item.language.clone()),
        ("ItemVersion", item.version.to_string()),
        ("Database", item.database.clone()),
        ("DisplayName", item.display_name.clone()),
        ("CreatedBy", item.created_by.clone()),
    ];

    let mut object = Map::new();
    for (name, value) in properties {
        if selection.allows(name) {
            object.insert(name.to_string(), Value::String(value));
        }
    }

    for (name, value) in &item.fields {
        if is_standard_field(name) && !selection.include_standard_fields {
            continue;
        }
        if selection.allows(name) {
            object.insert(name.clone(), Value::String(value.clone()));
        }
    }

    Value::Object(object)
}

pub fn items_json(items: &[Item], selection: &FieldSelection) -> Vec<Value> {
    items.iter().map(|item| item_json(item, selection)).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Link {
    pub href: String,
    pub rel: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FacetValueJson {
    pub name: String,
    pub aggregate_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FacetJson {
    pub name: String,
    pub values: Vec<FacetValueJson>,
}

impl From<&FacetResult> for FacetJson {
    fn from(facet: &FacetResult) -> Self {
        Self {
            name: facet.name.clone(),
            values: facet
                .values
                .iter()
                .map(|value| FacetValueJson {
                    name: value.name.clone(),
                    aggregate_count: value.count,
                })
                .collect(),
        }
    }
}

/// A page of formatted items
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PagedResponse {
    pub total_count: usize,
    pub total_page: usize,
    pub links: Vec<Link>,
    pub results: Vec<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub facets: Option<Vec<FacetJson>>,
}

/// Links between the pages of one paged route
pub struct PageLinks<'a> {
    pub builder: &'a LinkBuilder,
    pub route: &'a RouteDefinition,
    pub id: Option<Uuid>,

    /// Request parameters other than paging, carried into every link
    pub params: Vec<(&'static str, String)>,
}

impl PageLinks<'_> {
    fn href(&self, page: usize, page_size: usize) -> String {
        let mut params = self.params.clone();
        params.push(("page", page.to_string()));
        params.push(("pageSize", page_size.to_string()));
        self.builder.href(self.route, self.id, &params)
    }

    fn link(&self, rel: &str, page: usize, page_size: usize) -> Link {
        Link {
            href: self.href(page, page_size),
            rel: rel.to_string(),
            method: "GET".to_string(),
        }
    }

    pub fn links(&self, page: usize, page_size: usize, total_pages: usize) -> Vec<Link> {
        let mut links = vec![self.link("self", page, page_size)];
        if page > 0 {
            links.push(self.link("prevPage", page - 1, page_size));
        }
        if page + 1 < total_pages {
            links.push(self.link("nextPage", page + 1, page_size));
        }
        links
    }
}

/// Keep only non-empty parameters for link building
pub fn link_params<'a>(
    params: impl IntoIterator<Item = (&'static str, &'a str)>,
) -> Vec<(&'static str, String)> {
    params
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| (name, value.to_string()))
        .collect()
}

/// Format one page of search results
pub fn search_page(
    results: &ItemSearchResults,
    page: usize,
    page_size: usize,
    selection: &FieldSelection,
    links: &PageLinks<'_>,
) -> PagedResponse {
    PagedResponse {
        total_count: results.total_count,
        total_page: results.number_of_pages,
        links: links.links(page, page_size, results.number_of_pages),
        results: items_json(&results.items, selection),
        facets: Some(results.facets.iter().map(FacetJson::from).collect()),
    }
}

/// Page an already materialized item list
pub fn item_page(
    items: &[Item],
    page: usize,
    page_size: usize,
    selection: &FieldSelection,
    links: &PageLinks<'_>,
) -> PagedResponse {
    let page_size = page_size.max(1);
    let total_page = items.len().div_ceil(page_size);
    let page_items: Vec<Item> = items
        .iter()
        .skip(page.saturating_mul(page_size))
        .take(page_size)
        .cloned()
        .collect();

    PagedResponse {
        total_count: items.len(),
        total_page,
        links: links.links(page, page_size, total_page),
        results: items_json(&page_items, selection),
        facets: None,
    }
}
