//! PI Web API wire types and batch encoding.
//!
//! A batch call is `POST <base>/batch` with a JSON object keyed by decimal
//! index strings:
//!
//! ```json
//! { "0": { "Method": "GET", "Resource": "https://.../streamsets/plot?...&webid=F1" } }
//! ```
//!
//! and answers with an object keyed the same way:
//!
//! ```json
//! { "0": { "Status": 200, "Headers": { ... }, "Content": { ... } } }
//! ```
//!
//! The `Content` payload is polymorphic; see [`crate::classify`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// One sub-request inside a batch call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchSubRequest {
    #[serde(rename = "Method")]
    pub method: String,
    #[serde(rename = "Resource")]
    pub resource: String,
}

impl BatchSubRequest {
    pub fn get(resource: impl Into<String>) -> Self {
        Self {
            method: "GET".into(),
            resource: resource.into(),
        }
    }
}

/// A timestamped value as returned in any stream `Items` list.
///
/// `value` is passed through untouched: numbers, strings and digital-state
/// objects all survive verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct TimedValue {
    pub timestamp: String,
    pub value: serde_json::Value,
    pub units_abbreviation: String,
    pub good: bool,
    pub questionable: bool,
    pub substituted: bool,
    pub annotated: bool,
}

/// `Content` of a non-200 sub-response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct ErrorContent {
    pub errors: Vec<String>,
}

/// `Content` whose `Items` are themselves stream values (no `WebId` on the
/// first item).
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct FlatContent {
    pub items: Vec<TimedValue>,
    pub units_abbreviation: String,
}

/// One stream inside a stream-set response.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct StreamItems {
    pub web_id: String,
    pub name: String,
    pub path: String,
    pub items: Vec<TimedValue>,
    pub units_abbreviation: String,
}

/// `Content` whose `Items` are streams, each carrying its own `Items`.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct NestedContent {
    pub items: Vec<StreamItems>,
}

/// Body of a point/attribute/element lookup; only the WebID matters here.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WebIdLookup {
    #[serde(rename = "WebId")]
    pub web_id: String,
}

/// Build the batch request body for `requests`, keyed by position.
pub fn encode_batch(requests: &[BatchSubRequest]) -> BTreeMap<String, BatchSubRequest> {
    requests
        .iter()
        .enumerate()
        .map(|(i, r)| (i.to_string(), r.clone()))
        .collect()
}

/// Split a raw batch response back into per-position sub-responses.
///
/// The result always has `expected` slots. A slot is `None` when the
/// response carried no entry for that index; indices at or beyond
/// `expected` are ignored. Key order in the JSON object is irrelevant.
///
/// Fails with [`QueryError::BatchTransport`] when the body is not a JSON
/// object or a key is not a decimal index.
pub fn decode_batch(
    body: &[u8],
    expected: usize,
) -> Result<Vec<Option<serde_json::Value>>, QueryError> {
    let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(body)
        .map_err(|e| QueryError::BatchTransport(format!("undecodable batch response: {e}")))?;

    let mut slots = vec![None; expected];
    for (key, value) in raw {
        let index: usize = key
            .parse()
            .map_err(|_| QueryError::BatchTransport(format!("unexpected batch key {key:?}")))?;
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(value);
        }
    }
    Ok(slots)
}
