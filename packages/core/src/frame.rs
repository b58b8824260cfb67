//! Output frames handed back to the host.

use serde::{Deserialize, Serialize};

use crate::processed::ProcessedQuery;
use crate::wire::TimedValue;

/// Notice severity, as the host renders it next to a frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FrameMeta {
    /// The sub-request URL that produced this frame; empty when nothing was
    /// submitted.
    pub executed_query_string: String,

    /// `ds/<datasource-uid>/<channel-id>` for streamable frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
}

/// Normalized values of one target segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    pub name: String,
    pub ref_id: String,
    pub units: String,
    pub values: Vec<TimedValue>,
    pub meta: FrameMeta,
}

impl Frame {
    pub fn new(name: impl Into<String>, ref_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ref_id: ref_id.into(),
            units: String::new(),
            values: Vec::new(),
            meta: FrameMeta::default(),
        }
    }

    pub fn push_notice(&mut self, severity: Severity, text: impl Into<String>) {
        self.meta.notices.push(Notice {
            severity,
            text: text.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.meta
            .notices
            .iter()
            .any(|n| n.severity == Severity::Error)
    }
}

/// Build the frame for one processed segment.
///
/// Always yields a frame: failures become error notices on an empty value
/// list rather than a missing frame.
pub fn assemble(ref_id: &str, processed: &ProcessedQuery) -> Frame {
    let mut frame = Frame::new(&processed.label, ref_id);
    if let Some(request) = &processed.batch_request {
        frame.meta.executed_query_string = request.resource.clone();
    }
    if let Some(error) = &processed.error {
        frame.push_notice(Severity::Error, error.to_string());
    }

    match &processed.response {
        Some(response) => {
            frame.units = response.content.units().to_string();
            frame.values = response.content.items().to_vec();
            if let Some(error) = response.error() {
                frame.push_notice(Severity::Error, error.to_string());
            }
        }
        None if processed.error.is_none() => {
            frame.push_notice(Severity::Warning, "no response received for this query");
        }
        None => {}
    }
    frame
}
