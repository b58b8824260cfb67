//! Per-segment working state of one query.

use crate::classify::ClassifiedResponse;
use crate::error::QueryError;
use crate::query::Query;
use crate::target::TargetSegment;
use crate::uri::resource_url;
use crate::wire::BatchSubRequest;

/// One resolved (or failed) target segment of a [`Query`].
///
/// Created per request and dropped once frames have been assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedQuery {
    /// Frame name; the leaf of the target path.
    pub label: String,
    pub full_path: String,
    /// `None` when resolution failed.
    pub web_id: Option<String>,
    pub datasource_uid: String,
    /// Outer polling interval, kept for the streaming channel.
    pub interval_nanos: u64,
    pub is_pi_point: bool,
    pub streamable: bool,
    /// `None` when there was nothing to submit.
    pub batch_request: Option<BatchSubRequest>,
    /// Filled in by the batch call.
    pub response: Option<ClassifiedResponse>,
    /// Resolution or transport failure for this segment.
    pub error: Option<QueryError>,
}

impl ProcessedQuery {
    /// A segment whose path resolved to `web_id`, with its sub-request built
    /// against `base_url`.
    pub fn resolved(
        query: &Query,
        segment: TargetSegment,
        datasource_uid: &str,
        base_url: &str,
        web_id: String,
    ) -> Self {
        let batch_request = BatchSubRequest::get(resource_url(base_url, query, &web_id));
        Self {
            label: segment.label,
            full_path: segment.full_path,
            web_id: Some(web_id),
            datasource_uid: datasource_uid.to_string(),
            interval_nanos: query.interval_nanos,
            is_pi_point: query.pi.is_pi_point,
            streamable: query.is_streamable(),
            batch_request: Some(batch_request),
            response: None,
            error: None,
        }
    }

    /// A segment whose path could not be resolved. It is never submitted but
    /// still gets a frame.
    pub fn unresolved(
        query: &Query,
        segment: TargetSegment,
        datasource_uid: &str,
        error: QueryError,
    ) -> Self {
        Self {
            label: segment.label,
            full_path: segment.full_path,
            web_id: None,
            datasource_uid: datasource_uid.to_string(),
            interval_nanos: query.interval_nanos,
            is_pi_point: query.pi.is_pi_point,
            streamable: query.is_streamable(),
            batch_request: None,
            response: None,
            error: Some(error),
        }
    }
}
