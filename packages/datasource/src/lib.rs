//! PI Web API datasource service.
//!
//! Resolves hierarchical PI/AF paths to WebIDs, runs one batched PI Web API
//! call per query, classifies the sub-responses into frames, and keeps the
//! streaming channel registry. [`router::build_router`] exposes it over HTTP.

pub mod batch;
pub mod channels;
pub mod client;
pub mod config;
pub mod datasource;
pub mod error;
pub mod handlers;
pub mod resolver;
pub mod router;

pub use config::DatasourceConfig;
pub use datasource::Datasource;
pub use router::build_router;
