//! Mock implementations for testing.
//!
//! Lets the streaming and fallback paths run without network access.
//!
//! # Available Mocks
//!
//! - [`MockHttpClient`] - HTTP client with scripted blocking and streaming responses

pub mod http;

pub use http::{MockHttpClient, MockResponse, RecordedRequest, RequestKind};
