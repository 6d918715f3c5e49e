//! Request extractors for the item routes.
//!
//! Rejections are mapped onto [`AppError`] so every failure shares the JSON
//! error body.

use crate::error::AppError;
use crate::handlers::RequestOrigin;
use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use uuid::Uuid;

static GUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\{?[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\}?$")
        .expect("GUID pattern is valid")
});

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Parse a route id, optionally wrapped in braces
pub fn parse_item_id(raw: &str) -> Option<Uuid> {
    if !GUID_PATTERN.is_match(raw) {
        return None;
    }
    Uuid::parse_str(raw.trim_start_matches('{').trim_end_matches('}')).ok()
}

/// Item id path segment; anything but a GUID is a 404
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for ItemId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::NotFound(parts.uri.path().to_string()))?;

        parse_item_id(&raw)
            .map(ItemId)
            .ok_or(AppError::NotFound(raw))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestOrigin
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get(FORWARDED_FOR)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        if let Some(address) = forwarded {
            return Ok(RequestOrigin(address.to_string()));
        }

        Ok(parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| RequestOrigin(addr.ip().to_string()))
            .unwrap_or_else(RequestOrigin::unknown))
    }
}

/// Query-string extractor whose rejection is an invalid-argument error
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::InvalidArgument(rejection.body_text()))?;
        Ok(ApiQuery(value))
    }
}

/// JSON body extractor whose rejection is an invalid-argument error
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::InvalidArgument(rejection.body_text()))?;
        Ok(ApiJson(value))
    }
}
