//! Dispatch pipeline tests: handler routing and failure classification

mod common;

use async_trait::async_trait;
use common::{model, TestService};
use item_service::error::{AccessViolation, AppError, ServiceError};
use item_service::handlers::*;
use item_service::models::*;
use item_service::search::{ItemSearchResults, SearchQuery};
use uuid::Uuid;

fn origin() -> RequestOrigin {
    RequestOrigin("198.51.100.4".to_string())
}

fn get_by_id(id: Uuid, database: &str) -> ItemRequest {
    ItemRequest::GetItemById(GetItemByIdQuery {
        id,
        scope: ItemScope::new(database, "en"),
    })
}

#[tokio::test]
async fn test_get_item_by_id() {
    let service = TestService::new();
    let folder = service.seed_articles("master", "News", 1).await;

    let item: Item = service
        .dispatcher
        .dispatch_as(get_by_id(folder.id, "master"), &origin())
        .await
        .unwrap();
    assert_eq!(item.path, "/sitecore/content/News");
}

#[tokio::test]
async fn test_missing_item_is_not_found() {
    let service = TestService::new();

    let err = service
        .dispatcher
        .dispatch(get_by_id(Uuid::new_v4(), "master"), &origin())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_unknown_database_is_invalid_argument() {
    let service = TestService::new();

    let err = service
        .dispatcher
        .dispatch(get_by_id(Uuid::new_v4(), "staging"), &origin())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AppError::InvalidArgument("Invalid Database parameter value: 'staging'".to_string())
    );
}

#[tokio::test]
async fn test_read_denied_is_access_denied() {
    let service = TestService::new();
    let scope = ItemScope::new("master", "en");
    let secret = service
        .create(
            "/sitecore/content",
            "Secret",
            "Page",
            &[(SECURITY_FIELD, "ar|Everyone|pe|-item:read|")],
            &scope,
        )
        .await;

    let err = service
        .dispatcher
        .dispatch(get_by_id(secret.id, "master"), &origin())
        .await
        .unwrap_err();
    assert_eq!(err, AppError::AccessDenied);
    assert_eq!(err.to_string(), "Access denied");
}

#[tokio::test]
async fn test_delete_item() {
    let service = TestService::new();
    let folder = service.seed_articles("master", "News", 2).await;
    let delete = |id| {
        ItemRequest::DeleteItem(DeleteItemCommand {
            id,
            scope: ItemScope::new("master", ""),
        })
    };

    service
        .dispatcher
        .dispatch_as::<()>(delete(folder.id), &origin())
        .await
        .unwrap();

    let err = service
        .dispatcher
        .dispatch(get_by_id(folder.id, "master"), &origin())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // Deleting again finds nothing
    let err = service
        .dispatcher
        .dispatch(delete(folder.id), &origin())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let search = ItemRequest::Search(SearchQuery::new("lorem").with_database("master"));
    let results: ItemSearchResults = service
        .dispatcher
        .dispatch_as(search, &origin())
        .await
        .unwrap();
    assert_eq!(results.total_count, 0);
}

#[tokio::test]
async fn test_create_then_search() {
    let service = TestService::new();
    let command = CreateItemCommand {
        path: "/sitecore/content".to_string(),
        model: model("Launch", "Article", &[("Text", "Lorem launch notes")]),
        scope: ItemScope::new("web", ""),
    };

    let created: CreateItemResponse = service
        .dispatcher
        .dispatch_as(ItemRequest::CreateItem(command), &origin())
        .await
        .unwrap();
    assert_eq!(created.database, "web");
    assert_eq!(created.language, "en");

    let search = ItemRequest::Search(SearchQuery::new("launch").with_database("web"));
    let results: ItemSearchResults = service
        .dispatcher
        .dispatch_as(search, &origin())
        .await
        .unwrap();
    assert_eq!(results.total_count, 1);
    assert_eq!(results.items[0].id, created.item_id);
}

#[tokio::test]
async fn test_create_with_invalid_name() {
    let service = TestService::new();
    let command = CreateItemCommand {
        path: "/sitecore/content".to_string(),
        model: model("a/b", "Article", &[]),
        scope: ItemScope::new("web", ""),
    };

    let err = service
        .dispatcher
        .dispatch(ItemRequest::CreateItem(command), &origin())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_create_under_missing_parent() {
    let service = TestService::new();
    let command = CreateItemCommand {
        path: "/sitecore/content/Nowhere".to_string(),
        model: model("Page", "Article", &[]),
        scope: ItemScope::new("web", ""),
    };

    let err = service
        .dispatcher
        .dispatch(ItemRequest::CreateItem(command), &origin())
        .await
        .unwrap_err();
    assert_eq!(err, AppError::NotFound("/sitecore/content/Nowhere".to_string()));
}

#[tokio::test]
async fn test_rename_updates_paths_and_index() {
    let service = TestService::new();
    let folder = service.seed_articles("web", "News", 2).await;

    let command = UpdateItemCommand {
        id: folder.id,
        model: ItemModel {
            item_name: Some("Stories".to_string()),
            ..Default::default()
        },
        scope: ItemScope::new("web", "en"),
    };
    service
        .dispatcher
        .dispatch_as::<()>(ItemRequest::UpdateItem(command), &origin())
        .await
        .unwrap();

    let by_path = ItemRequest::GetItemByContentPath(GetItemByContentPathQuery {
        path: "/sitecore/content/stories/article 01".to_string(),
        scope: ItemScope::new("web", "en"),
    });
    let article: Item = service
        .dispatcher
        .dispatch_as(by_path, &origin())
        .await
        .unwrap();
    assert_eq!(article.path, "/sitecore/content/Stories/Article 01");

    let search = ItemRequest::Search(SearchQuery::new("stories").with_database("web"));
    let results: ItemSearchResults = service
        .dispatcher
        .dispatch_as(search, &origin())
        .await
        .unwrap();
    assert_eq!(results.total_count, 1);
}

#[tokio::test]
async fn test_empty_search_term() {
    let service = TestService::new();

    let err = service
        .dispatcher
        .dispatch(ItemRequest::Search(SearchQuery::new("")), &origin())
        .await
        .unwrap_err();
    assert_eq!(err, AppError::InvalidArgument("Missing search term".to_string()));
}

#[tokio::test]
async fn test_missing_index_is_service_unavailable() {
    let service = TestService::new();
    service.indexes.remove("sitecore_web_index");

    let search = ItemRequest::Search(SearchQuery::new("lorem").with_database("web"));
    let err = service.dispatcher.dispatch(search, &origin()).await.unwrap_err();
    assert_eq!(
        err,
        AppError::ServiceUnavailable("Failed to get index (sitecore_web_index)".to_string())
    );
}

#[tokio::test]
async fn test_query_via_item() {
    let service = TestService::new();
    let scope = ItemScope::new("web", "en");
    let folder = service.seed_articles("web", "News", 3).await;
    let query_item = service
        .create(
            "/sitecore/content",
            "Latest News",
            "Query",
            &[(QUERY_FIELD, "/sitecore/content/News/*")],
            &scope,
        )
        .await;

    let request = ItemRequest::QueryViaItem(QueryViaItemQuery {
        id: query_item.id,
        scope: scope.clone(),
    });
    let items: Vec<Item> = service
        .dispatcher
        .dispatch_as(request, &origin())
        .await
        .unwrap();
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|item| item.parent_id == Some(folder.id)));

    // An item without a query
    let request = ItemRequest::QueryViaItem(QueryViaItemQuery {
        id: folder.id,
        scope,
    });
    let err = service.dispatcher.dispatch(request, &origin()).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_search_via_item() {
    let service = TestService::new();
    let scope = ItemScope::new("web", "en");
    let news = service.seed_articles("web", "News", 3).await;
    service.seed_articles("web", "Blog", 2).await;
    let root = format!("{{{}}}", news.id.to_string().to_uppercase());

    let definition = service
        .create(
            "/sitecore/content",
            "News Search",
            "Search Definition",
            &[
                ("RootItem", root.as_str()),
                ("Facet", "_templatename|Article"),
                ("Sorting", "a_name"),
            ],
            &scope,
        )
        .await;

    let request = ItemRequest::SearchViaItem(SearchViaItemQuery {
        id: definition.id,
        term: "lorem".to_string(),
        database: "web".to_string(),
        language: "en".to_string(),
        sorting: String::new(),
        facet: String::new(),
        fields: String::new(),
        include_standard_template_fields: false,
        page: 0,
        page_size: 10,
    });
    let response: SearchViaItemResponse = service
        .dispatcher
        .dispatch_as(request, &origin())
        .await
        .unwrap();

    assert_eq!(response.definition.root, news.id);
    assert_eq!(response.results.total_count, 3);
    let names: Vec<&str> = response.results.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Article 00", "Article 01", "Article 02"]);
    assert_eq!(response.results.facet("_templatename").unwrap()[0].count, 3);
}

#[tokio::test]
async fn test_unregistered_kind_is_internal() {
    let dispatcher = Dispatcher::new(HandlerRegistry::new());

    let err = dispatcher
        .dispatch(get_by_id(Uuid::new_v4(), "master"), &origin())
        .await
        .unwrap_err();
    assert_eq!(err, AppError::Internal);
    assert_eq!(err.to_string(), "Internal server error");
}

/// Fails with an access violation buried under context
struct WrappedViolationHandler;

#[async_trait]
impl RequestHandler for WrappedViolationHandler {
    async fn handle(&self, _request: ItemRequest) -> Result<ItemResponse, ServiceError> {
        let err = anyhow::Error::new(AccessViolation("read /sitecore/system".to_string()))
            .context("Loading item")
            .context("Resolving request");
        Err(ServiceError::Other(err))
    }
}

/// Fails with an unclassified error
struct BrokenHandler;

#[async_trait]
impl RequestHandler for BrokenHandler {
    async fn handle(&self, _request: ItemRequest) -> Result<ItemResponse, ServiceError> {
        Err(ServiceError::Other(anyhow::anyhow!("disk on fire")))
    }
}

/// Answers with the wrong response shape
struct EmptyHandler;

#[async_trait]
impl RequestHandler for EmptyHandler {
    async fn handle(&self, _request: ItemRequest) -> Result<ItemResponse, ServiceError> {
        Ok(ItemResponse::Empty)
    }
}

#[tokio::test]
async fn test_wrapped_access_violation_is_access_denied() {
    let registry = HandlerRegistry::new().with(QueryKind::GetItemById, WrappedViolationHandler);
    let dispatcher = Dispatcher::new(registry);

    let err = dispatcher
        .dispatch(get_by_id(Uuid::new_v4(), "master"), &origin())
        .await
        .unwrap_err();
    assert_eq!(err, AppError::AccessDenied);
}

#[tokio::test]
async fn test_unclassified_failure_is_internal() {
    let registry = HandlerRegistry::new().with(QueryKind::GetItemById, BrokenHandler);
    let dispatcher = Dispatcher::new(registry);

    let err = dispatcher
        .dispatch(get_by_id(Uuid::new_v4(), "master"), &origin())
        .await
        .unwrap_err();
    assert_eq!(err, AppError::Internal);
}

#[tokio::test]
async fn test_unexpected_response_is_internal() {
    let registry = HandlerRegistry::new().with(QueryKind::GetItemById, EmptyHandler);
    let dispatcher = Dispatcher::new(registry);

    let err = dispatcher
        .dispatch_as::<Item>(get_by_id(Uuid::new_v4(), "master"), &origin())
        .await
        .unwrap_err();
    assert_eq!(err, AppError::Internal);
}

#[test]
fn test_default_registry_covers_every_kind() {
    use strum::IntoEnumIterator;

    let service = TestService::new();
    let registry = HandlerRegistry::with_defaults(
        service.repository.clone(),
        service.search.clone(),
    );

    assert_eq!(registry.len(), QueryKind::iter().count());
    assert!(QueryKind::iter().all(|kind| registry.get(kind).is_some()));
}
