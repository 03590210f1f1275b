//! HTTP embedding provider
//!
//! Enabled when `HERMES_EMBEDDING_URL` and `HERMES_EMBEDDING_MODEL` are set.
//! The request is a JSON POST of `{model, input}` with an optional bearer
//! key; the response carries the vector under `embedding`. Disabled is a
//! first-class mode — callers fall back to the offline embedder.

use serde::{Deserialize, Serialize};

use crate::error::{HermesError, Result};

pub const ENDPOINT_VAR: &str = "HERMES_EMBEDDING_URL";
pub const MODEL_VAR: &str = "HERMES_EMBEDDING_MODEL";
pub const API_KEY_VAR: &str = "HERMES_EMBEDDING_API_KEY";

pub struct RemoteProvider {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl RemoteProvider {
    /// Construct from the environment; `None` when not configured.
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var(ENDPOINT_VAR).ok()?;
        let model = std::env::var(MODEL_VAR).ok()?;
        let api_key = std::env::var(API_KEY_VAR).ok();
        Some(Self {
            endpoint,
            model,
            api_key,
            client: reqwest::blocking::Client::new(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: text,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .map_err(|e| HermesError::embedding(format!("request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(HermesError::embedding(format!("provider returned {status}")));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .map_err(|e| HermesError::embedding(format!("malformed response: {e}")))?;
        Ok(parsed.embedding)
    }
}
