//! REST client for strokes and board codes.
//!
//! ERROR HANDLING
//! ==============
//! Transport failures surface as [`SyncError::Http`]; non-2xx answers as
//! [`SyncError::Status`] carrying the response body, so callers can log the
//! server's reason without parsing it.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use canvas::camera::Point;
use canvas::doc::{BoardId, Stroke, StrokeId};
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::error::SyncError;

/// Body of `POST /strokes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStroke {
    pub board_id: BoardId,
    pub path: Vec<Point>,
    pub color: String,
}

#[derive(Debug, Deserialize)]
struct GeneratedId {
    id: BoardId,
}

/// Stroke persistence calls. Enables mocking in tests.
#[async_trait::async_trait]
pub trait StrokeApi: Send + Sync {
    /// Every stroke on `board`, ascending by creation.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] if the request fails or the server rejects it.
    async fn fetch_strokes(&self, board: &BoardId) -> Result<Vec<Stroke>, SyncError>;

    /// Persist a stroke and return it with its server-assigned id.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] if the request fails or the server rejects it.
    async fn create_stroke(&self, stroke: &NewStroke) -> Result<Stroke, SyncError>;

    /// Delete a persisted stroke.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] if the request fails or the server rejects it.
    async fn delete_stroke(&self, board: &BoardId, id: StrokeId) -> Result<(), SyncError>;

    /// Ask the server for a fresh, unused board code.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] if the request fails or the server rejects it.
    async fn generate_board_id(&self) -> Result<BoardId, SyncError>;
}

/// [`StrokeApi`] over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpStrokeApi {
    http: reqwest::Client,
    config: ClientConfig,
}

impl HttpStrokeApi {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self { http: reqwest::Client::new(), config }
    }
}

#[async_trait::async_trait]
impl StrokeApi for HttpStrokeApi {
    async fn fetch_strokes(&self, board: &BoardId) -> Result<Vec<Stroke>, SyncError> {
        let response = self
            .http
            .get(self.config.api_url("/strokes"))
            .query(&[("boardId", board.as_str())])
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn create_stroke(&self, stroke: &NewStroke) -> Result<Stroke, SyncError> {
        let response = self.http.post(self.config.api_url("/strokes")).json(stroke).send().await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn delete_stroke(&self, board: &BoardId, id: StrokeId) -> Result<(), SyncError> {
        let response = self
            .http
            .delete(self.config.api_url("/strokes"))
            .query(&[("strokeId", id.to_string()), ("boardId", board.to_string())])
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn generate_board_id(&self) -> Result<BoardId, SyncError> {
        let response = self.http.get(self.config.api_url("/generate-id")).send().await?;
        let generated: GeneratedId = ensure_success(response).await?.json().await?;
        Ok(generated.id)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SyncError::Status { status: status.as_u16(), body })
}
