//! Embeddings from an OpenAI-compatible HTTP API.
//!
//! The provider is called with `POST {base_url}/embeddings` and a bearer
//! credential. Calls are blocking and bounded by `timeout_ms`; they are never
//! retried here. Throttling surfaces as [`Error::RateLimited`], everything
//! else that goes wrong on the wire as [`Error::ProviderUnavailable`].

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::blocking::Client;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{Error, Result};

/// Provider name used in errors and logs.
const PROVIDER_NAME: &str = "openai";

/// Default embeddings model.
pub const DEFAULT_PROVIDER_MODEL: &str = "text-embedding-3-small";

/// Default API root.
pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://api.openai.com/v1";

/// Environment variables consulted for the credential, in order.
pub const DEFAULT_API_KEY_ENV_VARS: [&str; 2] = ["OPENAI_API_KEY", "CHROMA_OPENAI_API_KEY"];

const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Output dimension a model produces when no `dimensions` override is sent.
fn native_dimension(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

/// Configuration of the provider codec. Persisted with the collection,
/// except for an explicitly supplied credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Model identifier sent with every request.
    pub model: String,
    /// Vector length the collection expects back.
    pub dimension: usize,
    /// API root, without the trailing `/embeddings`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout_ms: u64,
    /// Environment variables searched for the credential.
    pub api_key_env: Vec<String>,
    #[serde(skip)]
    api_key: Option<String>,
}

impl ProviderConfig {
    /// Creates a config for `model` with its native dimension.
    pub fn new(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            dimension: native_dimension(&model),
            model,
            base_url: DEFAULT_PROVIDER_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            api_key_env: DEFAULT_API_KEY_ENV_VARS
                .iter()
                .map(|v| v.to_string())
                .collect(),
            api_key: None,
        }
    }

    /// Requests shortened embeddings. Chainable.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Points the codec at another OpenAI-compatible endpoint. Chainable.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the request timeout. Chainable.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Uses an explicit credential instead of the environment. Chainable.
    ///
    /// The credential is never written to disk.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Replaces the environment variables searched for the credential.
    pub fn with_api_key_env<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.api_key_env = vars.into_iter().map(Into::into).collect();
        self
    }

    /// The explicit credential, else the first non-empty environment variable.
    fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| {
                self.api_key_env
                    .iter()
                    .filter_map(|var| std::env::var(var).ok())
                    .find(|k| !k.is_empty())
            })
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PROVIDER_MODEL)
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Embedder backed by the provider API.
pub struct ProviderEmbedder {
    config: ProviderConfig,
    api_key: Option<String>,
    client: Mutex<Option<Client>>,
}

impl ProviderEmbedder {
    /// Creates the embedder and resolves its credential.
    ///
    /// A missing credential is not an error here: it is reported by
    /// [`embed`](Self::embed), so stored data stays readable without one.
    pub fn new(config: ProviderConfig) -> Self {
        let api_key = config.resolve_api_key();
        if api_key.is_none() {
            warn!(
                provider = PROVIDER_NAME,
                model = %config.model,
                "no credential configured, embedding calls will fail"
            );
        }
        Self {
            config,
            api_key,
            client: Mutex::new(None),
        }
    }

    #[inline]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    /// Returns true if a credential was found.
    #[inline]
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Embeds a batch of texts with one API call, preserving order.
    pub fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::CredentialMissing {
                provider: PROVIDER_NAME.to_string(),
                env_vars: self.config.api_key_env.join(", "),
            })?;

        debug!(
            provider = PROVIDER_NAME,
            batch_size = texts.len(),
            model = %self.config.model,
            "embedding batch"
        );

        let client = self.client()?;
        let url = format!("{}/embeddings", self.config.base_url.trim_end_matches('/'));
        let dimensions =
            (self.config.dimension != native_dimension(&self.config.model)).then_some(self.config.dimension);

        let response = client
            .post(&url)
            .bearer_auth(api_key)
            .json(&EmbeddingRequest {
                model: &self.config.model,
                input: texts,
                dimensions,
            })
            .send()
            .map_err(|e| {
                error!(provider = PROVIDER_NAME, error = %e, "request failed");
                self.unavailable(self.describe_transport_error(&e))
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            warn!(provider = PROVIDER_NAME, ?retry_after_secs, "rate limited");
            return Err(Error::RateLimited {
                provider: PROVIDER_NAME.to_string(),
                retry_after_secs,
            });
        }

        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            error!(provider = PROVIDER_NAME, %status, "API error");
            return Err(self.unavailable(format!("API returned {status}: {detail}")));
        }

        let mut parsed: EmbeddingResponse = response.json().map_err(|e| {
            error!(provider = PROVIDER_NAME, error = %e, "failed to parse response");
            self.unavailable(format!("failed to parse response: {e}"))
        })?;

        if parsed.data.len() != texts.len() {
            return Err(self.unavailable(format!(
                "API returned {} embeddings for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);
        if let Some((position, d)) = parsed
            .data
            .iter()
            .enumerate()
            .find(|(position, d)| d.index != *position)
        {
            error!(provider = PROVIDER_NAME, index = d.index, "unexpected embedding index");
            return Err(self.unavailable(format!(
                "API returned index {} where {} was expected",
                d.index, position
            )));
        }
        parsed
            .data
            .into_iter()
            .map(|d| {
                if d.embedding.len() != self.config.dimension {
                    return Err(Error::DimensionMismatch {
                        expected: self.config.dimension,
                        got: d.embedding.len(),
                    });
                }
                Ok(d.embedding)
            })
            .collect()
    }

    /// Returns the HTTP client, building it on first use.
    fn client(&self) -> Result<Client> {
        let mut slot = self.client.lock();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .build()
            .map_err(|e| self.unavailable(format!("failed to create HTTP client: {e}")))?;
        *slot = Some(client.clone());
        Ok(client)
    }

    fn describe_transport_error(&self, err: &reqwest::Error) -> String {
        if err.is_timeout() {
            format!("request timed out after {}ms", self.config.timeout_ms)
        } else {
            format!("request failed: {err}")
        }
    }

    fn unavailable(&self, reason: String) -> Error {
        Error::ProviderUnavailable {
            provider: PROVIDER_NAME.to_string(),
            reason,
        }
    }
}

impl fmt::Debug for ProviderEmbedder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEmbedder")
            .field("config", &self.config)
            .field("has_credential", &self.has_credential())
            .finish()
    }
}
