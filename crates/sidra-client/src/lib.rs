//! Read-only client for the public IBGE REST API.
//!
//! The portal never writes upstream: everything here is unauthenticated
//! HTTP GET built from path templates. The collector issues one request
//! per indicator with all-settle semantics; the pacer throttles the
//! locality sync loop.

pub mod client;
pub mod collector;
pub mod endpoints;
pub mod error;
pub mod pacer;

pub use client::IbgeClient;
pub use collector::{IndicatorQuery, IndicatorResult, collect_all, collect_indicators};
pub use endpoints::{aggregate_data_path, indicator_path};
pub use error::UpstreamError;
pub use pacer::Pacer;
