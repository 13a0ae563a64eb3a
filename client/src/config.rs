//! Client configuration.
//!
//! The only setting is the server base URL, read from `DRAWBOARD_URL` and
//! defaulting to a local development server.

use canvas::doc::BoardId;

use crate::error::SyncError;

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

/// Base URL used when `DRAWBOARD_URL` is unset or blank.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";

/// Where the drawboard server lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
}

impl ClientConfig {
    /// Build a config for `base_url`. A trailing slash is dropped.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self { base_url: base_url.trim_end_matches('/').to_owned() }
    }

    /// Read `DRAWBOARD_URL`, falling back to [`DEFAULT_BASE_URL`].
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = std::env::var("DRAWBOARD_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        Self::new(base_url)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a REST path such as `/strokes`.
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Relay WebSocket URL for `board`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidBaseUrl`] if the base URL is neither
    /// `http://` nor `https://`.
    pub fn ws_url(&self, board: &BoardId) -> Result<String, SyncError> {
        if let Some(rest) = self.base_url.strip_prefix("http://") {
            return Ok(format!("ws://{rest}/ws?boardId={board}"));
        }
        if let Some(rest) = self.base_url.strip_prefix("https://") {
            return Ok(format!("wss://{rest}/ws?boardId={board}"));
        }
        Err(SyncError::InvalidBaseUrl(self.base_url.clone()))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
