//! Worklist API seam.
//!
//! [`WorklistApi`] is the only way the session talks to the outside world.
//! The HTTP adapter targets the content-pipeline service; the local store in
//! [`crate::db`] implements the same trait over SQLite.

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use tracing::debug;

use crate::db::LocalStore;
use crate::error::ApiError;
use crate::types::{SaveAck, SaveDecisionsRequest, WorklistId, WorklistItem};
use crate::wire::{normalize_item, RawWorklistItem};

#[async_trait]
pub trait WorklistApi: Send + Sync {
    /// Fetches and normalises one worklist item.
    async fn fetch_item(&self, worklist_id: WorklistId) -> Result<WorklistItem, ApiError>;

    /// Submits one batch of decisions, optionally moving the item to a new
    /// workflow stage.
    async fn save_decisions(
        &self,
        worklist_id: WorklistId,
        request: &SaveDecisionsRequest,
    ) -> Result<SaveAck, ApiError>;
}

#[derive(Clone)]
pub struct HttpWorklistApi {
    base_url: String,
    client: Client,
}

impl HttpWorklistApi {
    /// Builds a client for `base_url`. `token`, when present, is sent as a
    /// bearer token on every request.
    ///
    /// # Errors
    ///
    /// `ApiError::Configuration` for an empty base URL, a token that is not a
    /// valid header value, or a client that fails to build.
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self, ApiError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ApiError::Configuration("api base_url is empty".to_owned()));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let value = header::HeaderValue::from_str(&format!("Bearer {token}")).map_err(|error| {
                ApiError::Configuration(format!("PROOFDESK_API_TOKEN is invalid: {error}"))
            })?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder().default_headers(headers).build().map_err(|error| {
            ApiError::Configuration(format!("failed to build HTTP client: {error}"))
        })?;

        Ok(Self { base_url: base_url.to_owned(), client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|error| ApiError::Http(error.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| ApiError::Http(format!("response read failed: {error}")))?;

        if status.is_success() {
            Ok(body)
        } else {
            debug!(%status, "worklist request rejected");
            Err(ApiError::Status { status: status.as_u16(), message: server_message(&body) })
        }
    }
}

#[async_trait]
impl WorklistApi for HttpWorklistApi {
    async fn fetch_item(&self, worklist_id: WorklistId) -> Result<WorklistItem, ApiError> {
        let url = self.endpoint(&format!("worklist/{worklist_id}"));
        let body = self.send(self.client.get(url)).await?;
        let raw: RawWorklistItem =
            serde_json::from_str(&body).map_err(|error| ApiError::Decode(error.to_string()))?;
        Ok(normalize_item(raw))
    }

    async fn save_decisions(
        &self,
        worklist_id: WorklistId,
        request: &SaveDecisionsRequest,
    ) -> Result<SaveAck, ApiError> {
        let url = self.endpoint(&format!("worklist/{worklist_id}/review-decisions"));
        let body = self.send(self.client.post(url).json(request)).await?;
        if body.trim().is_empty() {
            return Ok(SaveAck::default());
        }
        serde_json::from_str(&body).map_err(|error| ApiError::Decode(error.to_string()))
    }
}

/// Pulls the human-readable message out of an error body. FastAPI-style
/// `detail`, then `message`, then `error`; falls back to the raw body.
fn server_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let field = parsed.as_ref().and_then(|value| {
        ["detail", "message", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
    });
    match field {
        Some(message) => message.to_owned(),
        None => body.trim().to_owned(),
    }
}

/// Where review data lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Http { base_url: String, token: Option<String> },
    Local { path: PathBuf },
}

impl Backend {
    /// Opens the backend.
    ///
    /// # Errors
    ///
    /// Configuration errors for the HTTP client, storage errors when the
    /// local database cannot be opened or migrated.
    pub async fn connect(&self) -> Result<Box<dyn WorklistApi>, ApiError> {
        match self {
            Backend::Http { base_url, token } => {
                Ok(Box::new(HttpWorklistApi::new(base_url, token.as_deref())?))
            }
            Backend::Local { path } => Ok(Box::new(LocalStore::open(path).await?)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Backend::Http { base_url, .. } => base_url.clone(),
            Backend::Local { path } => path.display().to_string(),
        }
    }
}
