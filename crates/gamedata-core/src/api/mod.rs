//! HTTP fetch layer.
//!
//! This module provides the `FetchClient` used by the managers to reach
//! Enka.Network and the announcement API, the `Transport` seam it sends
//! through, and per-call `RequestOptions`.

pub mod client;
pub mod options;
pub mod transport;

pub use client::FetchClient;
pub use options::RequestOptions;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
