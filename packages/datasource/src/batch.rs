//! Batch orchestration.
//!
//! Every RefID gets exactly one `POST <base>/batch` carrying all of its
//! sub-requests, keyed by position. The answers are mapped back by index,
//! never by any other key, and classified one by one.
//!
//! RefIDs are independent: their batches run concurrently, and a failed
//! batch only affects its own RefID.

use std::collections::BTreeMap;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use piweb_query::{classify, decode_batch, encode_batch, BatchSubRequest, ClassifiedResponse, QueryError};

use crate::client::PiWebClient;

/// Per-position results of one batch. `None` marks a position the remote
/// left unanswered.
pub type BatchResult = Result<Vec<Option<ClassifiedResponse>>, QueryError>;

pub struct BatchOrchestrator {
    client: PiWebClient,
}

impl BatchOrchestrator {
    pub fn new(client: PiWebClient) -> Self {
        Self { client }
    }

    /// Execute one RefID's sub-requests as a single batch call.
    ///
    /// An empty list makes no call.
    pub async fn execute_one(
        &self,
        requests: &[BatchSubRequest],
        cancel: &CancellationToken,
    ) -> BatchResult {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let body = encode_batch(requests);
        let raw = self
            .client
            .post_batch(&body, cancel)
            .await
            .map_err(|e| e.into_query_error(QueryError::BatchTransport))?;

        let slots = decode_batch(&raw, requests.len())?;
        Ok(slots
            .into_iter()
            .map(|slot| slot.as_ref().map(classify))
            .collect())
    }

    /// Execute every RefID's batch concurrently.
    ///
    /// The result has exactly the keys of `requests`.
    pub async fn execute(
        &self,
        requests: BTreeMap<String, Vec<BatchSubRequest>>,
        cancel: &CancellationToken,
    ) -> BTreeMap<String, BatchResult> {
        let calls = requests.into_iter().map(|(ref_id, subs)| async move {
            debug!("batch: {ref_id}: submitting {} sub-requests", subs.len());
            let result = self.execute_one(&subs, cancel).await;
            if let Err(e) = &result {
                warn!("batch: {ref_id}: {e}");
            }
            (ref_id, result)
        });
        join_all(calls).await.into_iter().collect()
    }
}
