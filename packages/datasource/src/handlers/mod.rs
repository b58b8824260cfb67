//! HTTP request handlers.
//!
//! Handlers are thin: they decode the request, call into the shared
//! [`Datasource`], and return `Result<impl IntoResponse, AppError>`.

pub mod channels;
pub mod query;

use std::sync::Arc;

use crate::datasource::Datasource;

/// Shared application state threaded through all Axum handlers via [`axum::extract::State`].
#[derive(Clone)]
pub struct AppState {
    pub datasource: Arc<Datasource>,
}
