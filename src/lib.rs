//! difychat - a terminal chat client for Dify-style conversational AI APIs
//!
//! This library exposes modules for use in the binary and integration tests.

pub mod adapters;
pub mod cli;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod models;
pub mod session;
pub mod sse;
pub mod stream;
pub mod traits;
