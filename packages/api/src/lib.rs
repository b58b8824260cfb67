//! Request and response types for the PI Web API datasource service.
//!
//! # Endpoints covered
//!
//! | Method | Path | Type |
//! |--------|------|------|
//! | POST | `/v1/query` | [`QueryDataRequest`] → [`QueryDataResponse`] |
//! | GET | `/v1/channels/{channel_id}` | → [`ChannelInfo`] |
//!
//! Errors on either endpoint use [`ErrorResponse`].

pub mod channel;
pub mod error;
pub mod query;

pub use channel::ChannelInfo;
pub use error::ErrorResponse;
pub use query::{DataResponse, QueryDataRequest, QueryDataResponse};
