//! Vector codecs: turning document text into embeddings.
//!
//! A collection is bound to one codec at creation. The codec fixes the
//! collection's dimension and is persisted with it, so reopening a
//! collection embeds new text exactly as before.

pub mod local;
pub mod provider;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use local::{LocalEmbedder, DEFAULT_LOCAL_DIMENSION};
pub use provider::{
    ProviderConfig, ProviderEmbedder, DEFAULT_API_KEY_ENV_VARS, DEFAULT_PROVIDER_BASE_URL,
    DEFAULT_PROVIDER_MODEL,
};

/// Persisted choice of embedding codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmbeddingConfig {
    /// Offline feature-hashing model.
    Local { dimension: usize },
    /// OpenAI-compatible embeddings API.
    Provider(ProviderConfig),
}

impl EmbeddingConfig {
    /// The local model at its default dimension.
    pub fn local() -> Self {
        EmbeddingConfig::Local {
            dimension: DEFAULT_LOCAL_DIMENSION,
        }
    }

    /// The local model at a custom dimension.
    pub fn local_with_dimension(dimension: usize) -> Self {
        EmbeddingConfig::Local { dimension }
    }

    /// A provider-backed codec.
    pub fn provider(config: ProviderConfig) -> Self {
        EmbeddingConfig::Provider(config)
    }

    /// Vector length produced by this codec.
    pub fn dimension(&self) -> usize {
        match self {
            EmbeddingConfig::Local { dimension } => *dimension,
            EmbeddingConfig::Provider(config) => config.dimension,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.dimension() == 0 {
            return Err(Error::InvalidArgument(
                "embedding dimension must be positive".into(),
            ));
        }
        if let EmbeddingConfig::Provider(config) = self {
            if config.model.is_empty() {
                return Err(Error::InvalidArgument("provider model must not be empty".into()));
            }
            if config.timeout_ms == 0 {
                return Err(Error::InvalidArgument("provider timeout must be positive".into()));
            }
        }
        Ok(())
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::local()
    }
}

/// A live codec built from an [`EmbeddingConfig`].
#[derive(Debug)]
pub enum VectorCodec {
    Local(LocalEmbedder),
    Provider(ProviderEmbedder),
}

impl VectorCodec {
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        match config {
            EmbeddingConfig::Local { dimension } => VectorCodec::Local(LocalEmbedder::new(*dimension)),
            EmbeddingConfig::Provider(config) => {
                VectorCodec::Provider(ProviderEmbedder::new(config.clone()))
            }
        }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        match self {
            VectorCodec::Local(e) => e.dimension(),
            VectorCodec::Provider(e) => e.dimension(),
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            VectorCodec::Local(_) => "local",
            VectorCodec::Provider(_) => "provider",
        }
    }

    /// Embeds a batch of texts, one vector per text in the same order.
    pub fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        match self {
            VectorCodec::Local(e) => Ok(e.embed(texts)),
            VectorCodec::Provider(e) => e.embed(texts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_local() {
        let config = EmbeddingConfig::default();
        assert_eq!(config, EmbeddingConfig::local());
        assert_eq!(config.dimension(), DEFAULT_LOCAL_DIMENSION);
    }

    #[test]
    fn test_config_serde_tagged() {
        let json = serde_json::to_value(EmbeddingConfig::local_with_dimension(16)).unwrap();
        assert_eq!(json["type"], "local");
        assert_eq!(json["dimension"], 16);

        let provider = EmbeddingConfig::provider(ProviderConfig::default().with_api_key("sk-x"));
        let json = serde_json::to_string(&provider).unwrap();
        assert!(json.contains("\"type\":\"provider\""));
        assert!(!json.contains("sk-x"));

        let back: EmbeddingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.dimension(), 1536);
    }

    #[test]
    fn test_validate_rejects_zero_dimension() {
        assert!(EmbeddingConfig::local_with_dimension(0).validate().is_err());
        assert!(EmbeddingConfig::local().validate().is_ok());
    }

    #[test]
    fn test_local_codec_embeds() {
        let codec = VectorCodec::from_config(&EmbeddingConfig::local_with_dimension(32));
        assert_eq!(codec.name(), "local");
        let vectors = codec.embed(&["a b", "c"]).unwrap();
        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|v| v.len() == 32));
    }
}
