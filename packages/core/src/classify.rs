//! Sub-response classification.
//!
//! PI Web API gives no discriminant for the shape of a batch sub-response's
//! `Content`, so the shape is sniffed from its structure:
//!
//! 1. `Status` ≠ 200 → [`BatchContent::Error`] with the remote `Errors` list.
//! 2. `Content.Items[0]` has no `WebId` → [`BatchContent::FlatItems`]:
//!    `Content.Items` is the value list, units from `Content.UnitsAbbreviation`.
//! 3. `Content.Items[0]` has a `WebId` → [`BatchContent::NestedItems`]:
//!    `Content.Items[0].Items` is the value list, units from
//!    `Content.Items[0].UnitsAbbreviation`.
//! 4. Anything else → [`BatchContent::Error`] with [`UNPROCESSABLE`].

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::QueryError;
use crate::wire::{ErrorContent, FlatContent, NestedContent, TimedValue};

/// Message used when a 200 response matches no known shape.
pub const UNPROCESSABLE: &str = "Could not process response from PI Web API";

/// The three content shapes a sub-response can take.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchContent {
    Error {
        errors: Vec<String>,
    },
    FlatItems {
        units: String,
        items: Vec<TimedValue>,
    },
    NestedItems {
        web_id: String,
        name: String,
        units: String,
        items: Vec<TimedValue>,
    },
}

impl BatchContent {
    fn unprocessable() -> Self {
        BatchContent::Error {
            errors: vec![UNPROCESSABLE.to_string()],
        }
    }

    /// Units abbreviation; empty for errors.
    pub fn units(&self) -> &str {
        match self {
            BatchContent::Error { .. } => "",
            BatchContent::FlatItems { units, .. } | BatchContent::NestedItems { units, .. } => {
                units
            }
        }
    }

    /// Value list; empty for errors.
    pub fn items(&self) -> &[TimedValue] {
        match self {
            BatchContent::Error { .. } => &[],
            BatchContent::FlatItems { items, .. } | BatchContent::NestedItems { items, .. } => {
                items
            }
        }
    }

    pub fn errors(&self) -> &[String] {
        match self {
            BatchContent::Error { errors } => errors,
            _ => &[],
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, BatchContent::Error { .. })
    }
}

/// A classified sub-response: envelope plus content shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedResponse {
    pub status: u16,
    pub headers: BTreeMap<String, Value>,
    pub content: BatchContent,
}

impl ClassifiedResponse {
    /// The error this response represents, if any.
    ///
    /// Non-200 statuses are remote API errors; a 200 that could not be
    /// classified is a shape error.
    pub fn error(&self) -> Option<QueryError> {
        let BatchContent::Error { errors } = &self.content else {
            return None;
        };
        let message = errors.join("; ");
        if self.status == 200 {
            Some(QueryError::ResponseShape(message))
        } else {
            Some(QueryError::RemoteApi(message))
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Envelope {
    #[serde(rename = "Status")]
    status: u16,
    #[serde(rename = "Headers")]
    headers: BTreeMap<String, Value>,
}

/// Classify one raw sub-response.
pub fn classify(raw: &Value) -> ClassifiedResponse {
    // A malformed envelope reads as status 0, which lands on the error path.
    let envelope: Envelope = serde_json::from_value(raw.clone()).unwrap_or_default();
    let content = raw.get("Content");

    let content = if envelope.status != 200 {
        remote_error(envelope.status, content)
    } else {
        content.map_or_else(BatchContent::unprocessable, classify_content)
    };

    ClassifiedResponse {
        status: envelope.status,
        headers: envelope.headers,
        content,
    }
}

fn remote_error(status: u16, content: Option<&Value>) -> BatchContent {
    let errors = content
        .and_then(|c| serde_json::from_value::<ErrorContent>(c.clone()).ok())
        .map(|c| c.errors)
        .filter(|errors| !errors.is_empty())
        .unwrap_or_else(|| vec![format!("PI Web API returned status {status}")]);
    BatchContent::Error { errors }
}

fn classify_content(content: &Value) -> BatchContent {
    let Some(first) = content
        .get("Items")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(Value::as_object)
    else {
        return BatchContent::unprocessable();
    };

    if first.get("WebId").and_then(Value::as_str).is_none() {
        return match serde_json::from_value::<FlatContent>(content.clone()) {
            Ok(flat) => BatchContent::FlatItems {
                units: flat.units_abbreviation,
                items: flat.items,
            },
            Err(_) => BatchContent::unprocessable(),
        };
    }

    match serde_json::from_value::<NestedContent>(content.clone()) {
        Ok(nested) => match nested.items.into_iter().next() {
            Some(stream) => BatchContent::NestedItems {
                web_id: stream.web_id,
                name: stream.name,
                units: stream.units_abbreviation,
                items: stream.items,
            },
            None => BatchContent::unprocessable(),
        },
        Err(_) => BatchContent::unprocessable(),
    }
}
