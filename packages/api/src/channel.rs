//! Streaming channel lookup: `GET /v1/channels/{channel_id}`.

use serde::{Deserialize, Serialize};

/// What the push-delivery side needs to re-poll a streamed result: the
/// stream's WebID and the polling interval.
///
/// ```json
/// {
///   "channel_id": "01926f3a-...",
///   "web_id": "F1DPmN...",
///   "interval_nanos": 30000000000
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelInfo {
    pub channel_id: String,
    pub web_id: String,
    pub interval_nanos: u64,
}
