//! Thin PI Web API HTTP client.
//!
//! Wraps a [`reqwest::Client`] with the configured base URL and optional
//! basic-auth credentials. Every call races the caller's
//! [`CancellationToken`]: when the token fires, the in-flight request is
//! dropped and [`ClientError::Cancelled`] is returned. There are no retries.

use std::collections::BTreeMap;
use std::future::Future;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use piweb_query::{BatchSubRequest, QueryError};

use crate::config::{Credentials, DatasourceConfig};

/// Errors from a single PI Web API call.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request or response body failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote answered with a non-2xx status code.
    #[error("PI Web API returned status {0}")]
    BadStatus(u16),

    /// The caller's cancellation token fired first.
    #[error("request cancelled")]
    Cancelled,
}

impl ClientError {
    /// Map onto the pipeline's error kinds, using `wrap` for everything
    /// except cancellation.
    pub fn into_query_error(self, wrap: impl FnOnce(String) -> QueryError) -> QueryError {
        match self {
            ClientError::Cancelled => QueryError::Cancelled,
            other => wrap(other.to_string()),
        }
    }
}

/// HTTP access to one PI Web API server.
///
/// Cheap to clone: `reqwest::Client` wraps an `Arc` internally.
#[derive(Debug, Clone)]
pub struct PiWebClient {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl PiWebClient {
    pub fn new(client: Client, base_url: impl Into<String>, credentials: Option<Credentials>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Build a client with the configured timeout and credentials.
    pub fn from_config(config: &DatasourceConfig) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(config.http_timeout()).build()?;
        Ok(Self::new(client, &config.url, config.credentials.clone()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(c) => req.basic_auth(&c.username, Some(&c.password)),
            None => req,
        }
    }

    /// `GET url` and decode the JSON body as `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<T, ClientError> {
        cancellable(cancel, async {
            let response = self.authorize(self.client.get(url)).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ClientError::BadStatus(status.as_u16()));
            }
            Ok(response.json::<T>().await?)
        })
        .await
    }

    /// `POST <base>/batch` with `body` and return the raw response bytes.
    pub async fn post_batch(
        &self,
        body: &BTreeMap<String, BatchSubRequest>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, ClientError> {
        let url = format!("{}/batch", self.base_url);
        cancellable(cancel, async {
            let response = self
                .authorize(self.client.post(&url))
                .json(body)
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ClientError::BadStatus(status.as_u16()));
            }
            Ok(response.bytes().await?.to_vec())
        })
        .await
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    call: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, ClientError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ClientError::Cancelled),
        result = call => result,
    }
}
