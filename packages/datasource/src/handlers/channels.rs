//! `GET /v1/channels/{channel_id}`: look up a streaming channel.

use axum::{
    extract::{Path, State},
    Json,
};
use piweb_api::ChannelInfo;

use crate::error::AppError;

use super::AppState;

/// `GET /v1/channels/{channel_id}`
///
/// Returns the WebID and interval a channel re-polls, or 404 if no such
/// channel was minted (or the datasource has since been disposed).
pub async fn get_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<Json<ChannelInfo>, AppError> {
    let channel = state
        .datasource
        .channels()
        .get(&channel_id)
        .ok_or_else(|| AppError::NotFound(format!("channel {channel_id} not found")))?;

    Ok(Json(ChannelInfo {
        channel_id,
        web_id: channel.web_id,
        interval_nanos: channel.interval_nanos,
    }))
}
