// Ranked keyword extraction from the topic-term matrix.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use ndarray::Array2;

use super::vectorizer::Vocabulary;
use crate::error::{Result, TopicError};

/// Top `top_n` terms of every topic row of `topic_term`, highest weight first.
///
/// Ties go to the lower vocabulary index, so the output is fully
/// determined by H and the vocabulary.
pub fn extract_topics(
    topic_term: &Array2<f64>,
    vocabulary: &Vocabulary,
    top_n: usize,
) -> Result<BTreeMap<usize, Vec<String>>> {
    if topic_term.ncols() != vocabulary.len() {
        return Err(TopicError::MatrixShape {
            reason: format!(
                "topic-term matrix has {} columns but vocabulary has {} terms",
                topic_term.ncols(),
                vocabulary.len()
            ),
        });
    }

    let mut topics = BTreeMap::new();
    for (topic_idx, row) in topic_term.rows().into_iter().enumerate() {
        let mut ranked: Vec<(usize, f64)> = row.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        let words: Vec<String> = ranked
            .into_iter()
            .take(top_n)
            .filter_map(|(idx, _)| vocabulary.term(idx).map(str::to_string))
            .collect();
        topics.insert(topic_idx, words);
    }

    Ok(topics)
}
