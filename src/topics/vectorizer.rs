// TF-IDF vectorization with document-frequency filtering.
//
// Each preprocessed document is treated as a bag of whitespace-separated
// terms. Terms appearing in too many documents (ratio above max_df) or too
// few (count below min_df) are dropped, the survivors are capped at
// max_features by document frequency, and the remaining vocabulary is
// sorted lexicographically so the column order is stable for the run.
//
// Weights: raw term count × smoothed idf, idf = ln((1 + n) / (1 + df)) + 1,
// with each document row scaled to unit L2 norm.

use std::collections::{BTreeMap, HashMap};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TopicError};

/// Frequency filters and caps applied while building the vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizerParams {
    /// Drop terms present in more than this fraction of documents
    pub max_df: f64,
    /// Drop terms present in fewer than this many documents
    pub min_df: usize,
    /// Keep at most this many terms (highest document frequency first)
    pub max_features: usize,
    /// Ignore tokens shorter than this many characters
    pub min_token_len: usize,
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            max_df: 0.95,
            min_df: 2,
            max_features: 1000,
            min_token_len: 2,
        }
    }
}

impl VectorizerParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.max_df > 0.0 && self.max_df <= 1.0) {
            return Err(TopicError::InvalidConfig {
                reason: format!("max_df must be in (0, 1], got {}", self.max_df),
            });
        }
        if self.min_df == 0 {
            return Err(TopicError::InvalidConfig {
                reason: "min_df must be at least 1".to_string(),
            });
        }
        if self.max_features == 0 {
            return Err(TopicError::InvalidConfig {
                reason: "max_features must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Ordered set of terms defining the columns of the term-document matrix
/// and of the topic-term matrix. Fixed once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    terms: Vec<String>,
    index: HashMap<String, usize>,
}

impl From<Vec<String>> for Vocabulary {
    fn from(terms: Vec<String>) -> Self {
        Self::new(terms)
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.terms
    }
}

impl Vocabulary {
    /// Build from terms in column order. Duplicates keep their first position.
    pub fn new(terms: Vec<String>) -> Self {
        let mut index = HashMap::with_capacity(terms.len());
        let mut unique = Vec::with_capacity(terms.len());
        for term in terms {
            if !index.contains_key(&term) {
                index.insert(term.clone(), unique.len());
                unique.push(term);
            }
        }
        Self {
            terms: unique,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Term at a column index.
    pub fn term(&self, idx: usize) -> Option<&str> {
        self.terms.get(idx).map(String::as_str)
    }

    /// Column index of a term.
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

/// Builds the vocabulary and the weighted (documents × terms) matrix.
#[derive(Debug, Clone, Default)]
pub struct TfIdfVectorizer {
    pub params: VectorizerParams,
}

impl TfIdfVectorizer {
    pub fn new(params: VectorizerParams) -> Self {
        Self { params }
    }

    /// Fit the vocabulary on `documents` and return their TF-IDF matrix.
    ///
    /// Rows follow input order. Fails with `EmptyVocabulary` when the corpus
    /// is empty or filtering removes every term.
    pub fn fit_transform(&self, documents: &[String]) -> Result<(Array2<f64>, Vocabulary)> {
        self.params.validate()?;

        let n_docs = documents.len();
        if n_docs == 0 {
            return Err(TopicError::EmptyVocabulary);
        }

        // Per-document raw counts, plus document frequency per term
        let counts: Vec<HashMap<&str, f64>> = documents
            .iter()
            .map(|doc| {
                let mut tf: HashMap<&str, f64> = HashMap::new();
                for token in doc.split_whitespace() {
                    if token.chars().count() >= self.params.min_token_len {
                        *tf.entry(token).or_insert(0.0) += 1.0;
                    }
                }
                tf
            })
            .collect();

        let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
        for tf in &counts {
            for term in tf.keys() {
                *doc_freq.entry(*term).or_insert(0) += 1;
            }
        }

        let max_doc_count = self.params.max_df * n_docs as f64;
        let mut kept: Vec<(&str, usize)> = doc_freq
            .into_iter()
            .filter(|&(_, df)| df >= self.params.min_df && (df as f64) <= max_doc_count)
            .collect();

        if kept.len() > self.params.max_features {
            // Highest document frequency wins; lexical order breaks ties
            kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            kept.truncate(self.params.max_features);
            kept.sort_by(|a, b| a.0.cmp(b.0));
        }

        if kept.is_empty() {
            return Err(TopicError::EmptyVocabulary);
        }

        let idf: Vec<f64> = kept
            .iter()
            .map(|&(_, df)| ((1.0 + n_docs as f64) / (1.0 + df as f64)).ln() + 1.0)
            .collect();
        let vocabulary = Vocabulary::new(kept.iter().map(|(t, _)| t.to_string()).collect());

        let mut matrix = Array2::<f64>::zeros((n_docs, vocabulary.len()));
        for (d, tf) in counts.iter().enumerate() {
            for (term, &count) in tf {
                if let Some(col) = vocabulary.index_of(term) {
                    matrix[[d, col]] = count * idf[col];
                }
            }
            let mut row = matrix.row_mut(d);
            let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                row.mapv_inplace(|v| v / norm);
            }
        }

        debug!(
            documents = n_docs,
            vocabulary = vocabulary.len(),
            "Built TF-IDF matrix"
        );

        Ok((matrix, vocabulary))
    }
}
