//! Client configuration.
//!
//! Values come from the environment:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DIFY_API_URL` | `https://api.dify.ai/v1` |
//! | `DIFY_API_KEY` | required |
//! | `DIFY_USER` | `user` |
//! | `DIFY_TIMEOUT_SECS` | `120` |
//! | `DIFY_APP_NAME` | `采购专家助手` |
//! | `DIFY_APP_DESCRIPTION` | `专业的政府采购法律顾问AI` |

use std::time::Duration;

use crate::client::{DEFAULT_API_URL, DEFAULT_USER};
use crate::error::ChatError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_APP_NAME: &str = "采购专家助手";
pub const DEFAULT_APP_DESCRIPTION: &str = "专业的政府采购法律顾问AI";

/// Configuration for [`DifyClient`](crate::client::DifyClient) and the REPL.
///
/// # Example
///
/// ```
/// use difychat::config::ChatConfig;
///
/// let config = ChatConfig::default()
///     .with_api_key("app-123")
///     .with_user("alice");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Base URL of the API, without the `/chat-messages` path
    pub api_url: String,
    /// App API key sent as a bearer token
    pub api_key: String,
    /// End-user identifier sent with every request
    pub user: String,
    /// Applies to the whole request, streamed body included
    pub request_timeout: Duration,
    /// Shown in the REPL banner
    pub app_name: String,
    /// Shown under the name in the REPL banner
    pub app_description: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            user: DEFAULT_USER.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            app_name: DEFAULT_APP_NAME.to_string(),
            app_description: DEFAULT_APP_DESCRIPTION.to_string(),
        }
    }
}

impl ChatConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values count as unset. An unparsable timeout keeps the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("DIFY_API_URL") {
            config.api_url = url;
        }
        if let Some(key) = get("DIFY_API_KEY") {
            config.api_key = key;
        }
        if let Some(user) = get("DIFY_USER") {
            config.user = user;
        }
        if let Some(name) = get("DIFY_APP_NAME") {
            config.app_name = name;
        }
        if let Some(description) = get("DIFY_APP_DESCRIPTION") {
            config.app_description = description;
        }
        if let Some(raw) = get("DIFY_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %raw, "Ignoring invalid DIFY_TIMEOUT_SECS"),
            }
        }

        config
    }

    /// Check that every required value is present.
    pub fn validate(&self) -> Result<(), ChatError> {
        let mut missing = Vec::new();
        if self.api_key.trim().is_empty() {
            missing.push("DIFY_API_KEY");
        }
        if self.api_url.trim().is_empty() {
            missing.push("DIFY_API_URL");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ChatError::Config(missing.join(", ")))
        }
    }
}
