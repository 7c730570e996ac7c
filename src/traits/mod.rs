//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - blocking and streaming POST against the chat endpoint

pub mod http;

pub use http::{ByteStream, Headers, HttpClient, HttpError, Response};
