use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::TopicError;
use crate::topics::embeddings::DEFAULT_EMBEDDING_MODEL;
use crate::topics::vectorizer::VectorizerParams;

/// Seed used when neither the CLI nor `JURTOPICS_SEED` supplies one.
pub const DEFAULT_SEED: u64 = 42;

/// Keywords reported per topic unless overridden.
pub const DEFAULT_TOP_N: usize = 10;

/// Inclusive bounds on the number of topics a run may request.
pub const MIN_TOPICS: usize = 2;
pub const MAX_TOPICS: usize = 20;

/// Which factorization backs the topic model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    /// Non-negative matrix factorization (Frobenius objective)
    Nmf,
    /// Latent Dirichlet Allocation (batch variational Bayes)
    Lda,
}

impl FromStr for ModelType {
    type Err = TopicError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nmf" => Ok(ModelType::Nmf),
            "lda" => Ok(ModelType::Lda),
            _ => Err(TopicError::InvalidModelType {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelType::Nmf => write!(f, "nmf"),
            ModelType::Lda => write!(f, "lda"),
        }
    }
}

/// Options for a single pipeline run. Validated before any matrix is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub model_type: ModelType,
    pub n_topics: usize,
    pub top_n: usize,
    pub seed: u64,
    pub vectorizer: VectorizerParams,
    /// Overrides the factorization's own iteration cap
    pub max_iter: Option<usize>,
}

impl PipelineConfig {
    /// Build a config with defaults for everything but the model and topic count.
    pub fn new(model_type: ModelType, n_topics: usize) -> Self {
        Self {
            model_type,
            n_topics,
            top_n: DEFAULT_TOP_N,
            seed: DEFAULT_SEED,
            vectorizer: VectorizerParams::default(),
            max_iter: None,
        }
    }

    /// Parse the model name and build a config. Unknown names fail here,
    /// before any document is touched.
    pub fn from_name(model_type: &str, n_topics: usize) -> crate::error::Result<Self> {
        Ok(Self::new(model_type.parse()?, n_topics))
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_vectorizer(mut self, params: VectorizerParams) -> Self {
        self.vectorizer = params;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = Some(max_iter);
        self
    }

    /// Check the ranges that do not depend on the data.
    ///
    /// The data-dependent bound (k no larger than the vocabulary or the
    /// document count) is checked by the topic model at fit time.
    pub fn validate(&self) -> crate::error::Result<()> {
        if !(MIN_TOPICS..=MAX_TOPICS).contains(&self.n_topics) {
            return Err(TopicError::InvalidTopicCount {
                requested: self.n_topics,
                max: MAX_TOPICS,
            });
        }
        if self.top_n == 0 {
            return Err(TopicError::InvalidConfig {
                reason: "top_n must be at least 1".to_string(),
            });
        }
        if let Some(0) = self.max_iter {
            return Err(TopicError::InvalidConfig {
                reason: "max_iter must be at least 1".to_string(),
            });
        }
        self.vectorizer.validate()
    }
}

/// Process-level configuration loaded from environment variables.
///
/// The .env file is loaded at startup via dotenvy; everything here has a
/// default so the CLI works with no environment at all.
pub struct Config {
    /// Directory containing the ONNX sentence embedding model
    pub model_dir: PathBuf,
    /// Seed used when the CLI does not pass one
    pub seed: u64,
    /// When false, titles always use the keyword fallback
    pub embeddings_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        let model_dir = env::var("JURTOPICS_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_model_dir());

        let seed = match env::var("JURTOPICS_SEED") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|e| {
                anyhow::anyhow!("JURTOPICS_SEED must be a non-negative integer: {e}")
            })?,
            Err(_) => DEFAULT_SEED,
        };

        let embeddings_enabled = !matches!(
            env::var("JURTOPICS_EMBEDDINGS").as_deref(),
            Ok("off") | Ok("0") | Ok("false")
        );

        Ok(Self {
            model_dir,
            seed,
            embeddings_enabled,
        })
    }
}

/// Returns the default directory for the embedding model files.
/// Uses the platform data directory: ~/.local/share/jurtopics/models/ on Linux.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jurtopics")
        .join("models")
        .join(DEFAULT_EMBEDDING_MODEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_parse() {
        assert_eq!("nmf".parse::<ModelType>().unwrap(), ModelType::Nmf);
        assert_eq!(" LDA ".parse::<ModelType>().unwrap(), ModelType::Lda);
    }

    #[test]
    fn test_model_type_unknown() {
        let err = "xgboost".parse::<ModelType>().unwrap_err();
        assert_eq!(
            err,
            TopicError::InvalidModelType {
                name: "xgboost".to_string()
            }
        );
    }

    #[test]
    fn test_validate_topic_bounds() {
        assert!(PipelineConfig::new(ModelType::Nmf, 2).validate().is_ok());
        assert!(PipelineConfig::new(ModelType::Nmf, 20).validate().is_ok());
        assert!(matches!(
            PipelineConfig::new(ModelType::Nmf, 1).validate(),
            Err(TopicError::InvalidTopicCount { requested: 1, .. })
        ));
        assert!(matches!(
            PipelineConfig::new(ModelType::Lda, 21).validate(),
            Err(TopicError::InvalidTopicCount { requested: 21, .. })
        ));
    }

    #[test]
    fn test_validate_top_n_zero() {
        let config = PipelineConfig::new(ModelType::Nmf, 3).with_top_n(0);
        assert!(matches!(
            config.validate(),
            Err(TopicError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::new(ModelType::Lda, 5);
        assert_eq!(config.seed, 42);
        assert_eq!(config.top_n, 10);
        assert_eq!(config.vectorizer.min_df, 2);
    }
}
