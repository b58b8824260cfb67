//! Assembles the Axum [`Router`] from the handler modules.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{
    datasource::Datasource,
    handlers::{channels, query, AppState},
};

/// Build the complete application router around one datasource instance.
pub fn build_router(datasource: Arc<Datasource>) -> Router {
    let state = AppState { datasource };

    Router::new()
        .route("/v1/query", post(query::query))
        .route("/v1/channels/{channel_id}", get(channels::get_channel))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
