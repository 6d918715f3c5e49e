//! Item service: REST access to a hierarchical content repository with
//! faceted full-text search.

pub mod api;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod search;
pub mod state;

pub use error::{AppError, Result, ServiceError};
