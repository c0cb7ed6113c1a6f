// Error taxonomy for a pipeline run.
//
// Configuration and vocabulary errors abort the run. Embedding errors are
// absorbed by the labeler and only degrade titles to the keyword fallback.

/// Errors raised by the topic pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TopicError {
    #[error("invalid model type '{name}': choose 'nmf' or 'lda'")]
    InvalidModelType { name: String },

    #[error("invalid topic count {requested}: must be between 2 and {max}")]
    InvalidTopicCount { requested: usize, max: usize },

    #[error("empty vocabulary: no terms survived document-frequency filtering")]
    EmptyVocabulary,

    #[error("embedding unavailable: {reason}")]
    EmbeddingUnavailable { reason: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("matrix shape mismatch: {reason}")]
    MatrixShape { reason: String },
}

pub type Result<T> = std::result::Result<T, TopicError>;
