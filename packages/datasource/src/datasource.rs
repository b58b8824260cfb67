//! One PI Web API datasource instance and its query pipeline.
//!
//! [`Datasource::query_data`] runs the whole request:
//!
//! 1. **Translate + resolve.** Each query's target is expanded into path
//!    segments; each segment is resolved to a WebID (cache first) and turned
//!    into a [`ProcessedQuery`] with its batch sub-request. A segment that
//!    fails to resolve is kept, unsubmitted, so it still gets a frame.
//! 2. **Batch.** One batch call per RefID, all RefIDs concurrently.
//! 3. **Classify + assemble.** Each sub-response is classified and turned
//!    into a frame; every resolved streamable frame gets a fresh channel,
//!    even when its sub-response failed.
//!
//! Nothing here fails the request as a whole. Every RefID of the request
//! appears in the response, carrying its frames and the errors that hit it.
//!
//! The instance owns a background task that sweeps the WebID cache. It is
//! stopped by [`Datasource::dispose`] (or on drop).

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use piweb_api::{QueryDataRequest, QueryDataResponse};
use piweb_query::{assemble, expand, BatchSubRequest, ProcessedQuery, Query, QueryError};

use crate::batch::BatchOrchestrator;
use crate::channels::ChannelRegistry;
use crate::client::{ClientError, PiWebClient};
use crate::config::DatasourceConfig;
use crate::resolver::{spawn_eviction, WebIdCache, WebIdResolver};

pub struct Datasource {
    config: DatasourceConfig,
    client: PiWebClient,
    resolver: WebIdResolver,
    batch: BatchOrchestrator,
    channels: ChannelRegistry,
    shutdown: CancellationToken,
    eviction: Mutex<Option<JoinHandle<()>>>,
}

impl Datasource {
    /// Create an instance from `config` and start its cache eviction task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: DatasourceConfig) -> Result<Self, ClientError> {
        let client = PiWebClient::from_config(&config)?;
        Ok(Self::with_client(config, client))
    }

    /// Like [`Datasource::new`] with a caller-supplied client.
    pub fn with_client(config: DatasourceConfig, client: PiWebClient) -> Self {
        let cache = Arc::new(WebIdCache::new(config.webid_ttl()));
        let shutdown = CancellationToken::new();
        let eviction = spawn_eviction(Arc::clone(&cache), config.webid_ttl(), shutdown.clone());

        Self {
            resolver: WebIdResolver::new(client.clone(), cache),
            batch: BatchOrchestrator::new(client.clone()),
            channels: ChannelRegistry::new(),
            eviction: Mutex::new(Some(eviction)),
            shutdown,
            client,
            config,
        }
    }

    pub fn config(&self) -> &DatasourceConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<WebIdCache> {
        self.resolver.cache()
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    /// A token for one request. It fires when the datasource is disposed.
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    /// Stop the eviction task and drop all cached WebIDs and channels.
    ///
    /// Idempotent.
    pub fn dispose(&self) {
        self.shutdown.cancel();
        let handle = self
            .eviction
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
            info!("datasource: {} disposed", self.config.datasource_uid);
        }
        self.cache().clear();
        self.channels.clear();
    }

    /// Run every query of `request` and return frames per RefID.
    ///
    /// `cancel` bounds all outbound calls: once it fires, pending
    /// resolutions and batches stop and their segments come back empty.
    pub async fn query_data(
        &self,
        request: &QueryDataRequest,
        cancel: &CancellationToken,
    ) -> QueryDataResponse {
        let uid = request
            .datasource_uid
            .as_deref()
            .unwrap_or(&self.config.datasource_uid);

        let mut response = QueryDataResponse::default();
        let mut processed: BTreeMap<String, Vec<ProcessedQuery>> = BTreeMap::new();

        // Translate + resolve.
        for raw in &request.queries {
            let query = match Query::from_value(raw) {
                Ok(query) => query,
                Err(e) => {
                    let ref_id = Query::ref_id_of(raw).unwrap_or_default();
                    warn!("datasource: {ref_id}: {e}");
                    response
                        .responses
                        .entry(ref_id.to_string())
                        .or_default()
                        .errors
                        .push(e);
                    continue;
                }
            };
            let data = response.responses.entry(query.ref_id.clone()).or_default();
            match self.process_query(&query, uid, cancel).await {
                Ok(segments) => {
                    data.errors
                        .extend(segments.iter().filter_map(|p| p.error.clone()));
                    processed
                        .entry(query.ref_id.clone())
                        .or_default()
                        .extend(segments);
                }
                Err(e) => {
                    warn!("datasource: {}: {e}", query.ref_id);
                    data.errors.push(e);
                }
            }
        }

        // Batch.
        let requests: BTreeMap<String, Vec<BatchSubRequest>> = processed
            .iter()
            .map(|(ref_id, list)| {
                let subs = list
                    .iter()
                    .filter_map(|p| p.batch_request.clone())
                    .collect();
                (ref_id.clone(), subs)
            })
            .collect();

        for (ref_id, result) in self.batch.execute(requests, cancel).await {
            let Some(list) = processed.get_mut(&ref_id) else {
                continue;
            };
            let submitted = list.iter_mut().filter(|p| p.batch_request.is_some());
            match result {
                Ok(responses) => {
                    for (p, r) in submitted.zip(responses) {
                        p.response = r;
                    }
                }
                Err(e) => {
                    for p in submitted {
                        p.error = Some(e.clone());
                    }
                    response.responses.entry(ref_id).or_default().errors.push(e);
                }
            }
        }

        // Classify + assemble.
        for (ref_id, list) in &processed {
            let data = response.responses.entry(ref_id.clone()).or_default();
            for p in list {
                let mut frame = assemble(ref_id, p);
                if let Some(e) = p.response.as_ref().and_then(|r| r.error()) {
                    data.errors.push(e);
                }
                if p.streamable {
                    if let Some(web_id) = &p.web_id {
                        let channel = self.channels.mint(&p.datasource_uid, web_id, p.interval_nanos);
                        frame.meta.channel = Some(channel.path);
                    }
                }
                data.frames.push(frame);
            }
        }

        response
    }

    /// Expand and resolve one query into its segments.
    ///
    /// Segments resolve concurrently; the result keeps target order.
    async fn process_query(
        &self,
        query: &Query,
        uid: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProcessedQuery>, QueryError> {
        let segments = expand(&query.pi.target, query.pi.is_pi_point)?;
        let base_url = self.client.base_url();

        let resolutions = segments.into_iter().map(|segment| async move {
            match self
                .resolver
                .resolve(&segment.full_path, query.pi.is_pi_point, cancel)
                .await
            {
                Ok(web_id) => ProcessedQuery::resolved(query, segment, uid, base_url, web_id),
                Err(e) => {
                    warn!("resolver: {}: {e}", query.ref_id);
                    ProcessedQuery::unresolved(query, segment, uid, e)
                }
            }
        });
        Ok(join_all(resolutions).await)
    }
}

impl Drop for Datasource {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
