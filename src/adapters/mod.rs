//! Concrete implementations of trait abstractions.
//!
//! # Adapters
//!
//! - [`ReqwestHttpClient`] - HTTP client using reqwest
//!
//! # Mock Implementations
//!
//! The [`mock`] submodule provides [`mock::MockHttpClient`], a scripted
//! transport for tests.

pub mod mock;
pub mod reqwest_http;

pub use mock::MockHttpClient;
pub use reqwest_http::ReqwestHttpClient;
