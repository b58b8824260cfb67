//! Error kinds surfaced by the query pipeline.
//!
//! None of these is fatal: each one is attached to the affected RefID (and,
//! where possible, to the affected frame as a notice) and the rest of the
//! request carries on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Something that went wrong for one path segment, one RefID's batch, or
/// one sub-response.
///
/// Serialises as `{ "kind": "resolution", "message": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum QueryError {
    /// A hierarchical path could not be mapped to a WebID. Aborts only the
    /// affected segment.
    #[error("could not resolve WebID: {0}")]
    Resolution(String),

    /// The batch call failed to send or its envelope failed to decode.
    /// Aborts every sub-request of that RefID.
    #[error("batch request failed: {0}")]
    BatchTransport(String),

    /// A sub-response matched none of the known content shapes.
    #[error("unexpected response shape: {0}")]
    ResponseShape(String),

    /// The remote API answered a sub-request with a non-200 status.
    #[error("PI Web API error: {0}")]
    RemoteApi(String),

    /// The query itself could not be decoded. Only its own RefID is
    /// affected.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The target string does not follow the `<base>;<leaf>...` grammar.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// The caller gave up before the remote call completed.
    #[error("request cancelled")]
    Cancelled,
}
