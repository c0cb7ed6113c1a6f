// Topic model trait: the factorization seam.
//
// Both variants take the TF-IDF matrix and a topic count and produce a
// document-topic matrix W (documents × k) and a topic-term matrix H
// (k × vocabulary). Which one runs is picked by ModelType, never by
// inspecting the model at runtime.

pub mod lda;
pub mod nmf;

use ndarray::Array2;

use crate::config::{ModelType, MIN_TOPICS};
use crate::error::{Result, TopicError};

pub use lda::Lda;
pub use nmf::Nmf;

/// Output of one factorization run.
#[derive(Debug, Clone, PartialEq)]
pub struct Factorization {
    /// Document-topic affinities (documents × k), all non-negative
    pub doc_topic: Array2<f64>,
    /// Topic-term weights (k × vocabulary), all non-negative
    pub topic_term: Array2<f64>,
    /// Outer iterations actually run
    pub n_iter: usize,
    /// Frobenius norm of X - WH, when the model minimizes it
    pub reconstruction_err: Option<f64>,
}

impl Factorization {
    pub fn n_topics(&self) -> usize {
        self.topic_term.nrows()
    }
}

/// A factorization of the term-document matrix into k topics.
///
/// Implementations must be deterministic for a fixed seed and input.
pub trait TopicModel: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Factorize `matrix` (documents × terms) into `k` topics.
    fn fit(&self, matrix: &Array2<f64>, k: usize, seed: u64) -> Result<Factorization>;
}

/// Build the model selected by `model_type`, optionally overriding its
/// iteration cap.
pub fn build_model(model_type: ModelType, max_iter: Option<usize>) -> Box<dyn TopicModel> {
    match model_type {
        ModelType::Nmf => {
            let mut nmf = Nmf::default();
            if let Some(n) = max_iter {
                nmf.max_iter = n;
            }
            Box::new(nmf)
        }
        ModelType::Lda => {
            let mut lda = Lda::default();
            if let Some(n) = max_iter {
                lda.max_iter = n;
            }
            Box::new(lda)
        }
    }
}

/// Reject topic counts the data cannot support: fewer than two topics, or
/// more topics than there are documents or vocabulary terms.
pub fn validate_topic_count(matrix: &Array2<f64>, k: usize) -> Result<()> {
    let (n_docs, n_terms) = matrix.dim();
    let max = n_docs.min(n_terms);
    if k < MIN_TOPICS || k > max {
        return Err(TopicError::InvalidTopicCount { requested: k, max });
    }
    Ok(())
}
