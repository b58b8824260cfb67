//! Pure query logic for the PI Web API adapter.
//!
//! This crate turns host queries into PI Web API sub-requests and turns the
//! batched answers back into frames. It does no I/O and no logging: every
//! function returns its outcome and the caller decides how to report it.
//! The `piweb-datasource` crate supplies the HTTP, caching and streaming
//! bookkeeping around it.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`query`] | Host query model: [`Query`], [`PiQuery`], interval and point-count resolution |
//! | [`target`] | `<base>;<leaf>...` target grammar |
//! | [`uri`] | Stream/calculation URI construction |
//! | [`wire`] | PI Web API wire types, batch encode/decode |
//! | [`classify`] | Sub-response shape detection |
//! | [`processed`] | Per-segment working state |
//! | [`frame`] | Output frames and their assembly |
//! | [`error`] | [`QueryError`] kinds |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use piweb_query::{classify, frame, target, uri, ProcessedQuery};
//!
//! for segment in target::expand(&query.pi.target, query.pi.is_pi_point)? {
//!     let web_id = resolve(&segment.full_path)?;
//!     let processed = ProcessedQuery::resolved(&query, segment, uid, base_url, web_id);
//!     // ... submit processed.batch_request, then:
//!     // processed.response = Some(classify::classify(&raw));
//!     let frame = frame::assemble(&query.ref_id, &processed);
//! }
//! ```

pub mod classify;
pub mod error;
pub mod frame;
pub mod processed;
pub mod query;
pub mod target;
pub mod uri;
pub mod wire;

pub use classify::{classify, BatchContent, ClassifiedResponse};
pub use error::QueryError;
pub use frame::{assemble, Frame, FrameMeta, Notice, Severity};
pub use processed::ProcessedQuery;
pub use query::{PiQuery, Query, QuerySummary, Selection, SelectionValue, TimeRange, Toggle};
pub use target::{expand, TargetSegment};
pub use uri::{query_uri, resource_url};
pub use wire::{decode_batch, encode_batch, BatchSubRequest, TimedValue, WebIdLookup};
