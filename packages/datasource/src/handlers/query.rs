//! `POST /v1/query`: run a batch of queries.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use piweb_api::{QueryDataRequest, QueryDataResponse};

use crate::error::AppError;

use super::AppState;

/// `POST /v1/query`
///
/// Always answers 200 once the body decodes; per-query failures are carried
/// in each RefID's `errors`. Returns 400 for a body that is not a valid
/// [`QueryDataRequest`].
///
/// If the caller goes away mid-request, the request token is cancelled and
/// outstanding PI Web API calls are abandoned.
pub async fn query(
    State(state): State<AppState>,
    body: Result<Json<QueryDataRequest>, JsonRejection>,
) -> Result<Json<QueryDataResponse>, AppError> {
    let Json(request) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let cancel = state.datasource.request_token();
    let _guard = cancel.clone().drop_guard();

    tracing::debug!("query: {} queries", request.queries.len());
    let response = state.datasource.query_data(&request, &cancel).await;
    Ok(Json(response))
}
