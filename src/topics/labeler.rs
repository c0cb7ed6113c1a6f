// Topic titles from representative documents.
//
// A document represents a topic when that topic holds its largest
// document-topic affinity. The topic's keywords and up to five of its
// representative documents are embedded; the document closest to the
// keywords (cosine similarity) supplies its first sentence as the title.
// With no representative documents, or when embedding fails, the title is
// the top three keywords.

use std::sync::LazyLock;

use ndarray::Array2;
use regex_lite::Regex;
use tracing::{debug, warn};

use super::embeddings::cosine_similarity;
use crate::error::TopicError;
use crate::output::truncate_chars;

/// Sentence terminator followed by whitespace or end of text, so that
/// "Lei 8.078/90" is not cut at the thousands separator.
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+(\s|$)").expect("sentence regex is valid"));

/// Text embedding capability injected into the labeler.
///
/// Returns one vector per input text, in order.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f64>>>;
}

/// Any `Fn(&str) -> Result<Vec<f64>>` works as an embedder, one text at a time.
impl<F> Embedder for F
where
    F: Fn(&str) -> anyhow::Result<Vec<f64>> + Send + Sync,
{
    fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f64>>> {
        texts.iter().map(|t| self(t.as_str())).collect()
    }
}

/// Builds one title per topic.
pub struct TopicLabeler<'a> {
    embedder: Option<&'a dyn Embedder>,
    /// Representative documents compared against the keywords
    pub max_documents: usize,
    /// Character budget for a title before "..." is appended
    pub max_title_chars: usize,
    /// Keywords joined for the fallback title
    pub fallback_words: usize,
}

impl<'a> TopicLabeler<'a> {
    pub fn new(embedder: Option<&'a dyn Embedder>) -> Self {
        Self {
            embedder,
            max_documents: 5,
            max_title_chars: 50,
            fallback_words: 3,
        }
    }

    /// Title for a topic given its ranked keywords and representative documents.
    ///
    /// Never fails: embedding problems degrade to the keyword title.
    pub fn label(&self, topic_words: &[String], representative_docs: &[&str]) -> String {
        if representative_docs.is_empty() {
            return self.keyword_title(topic_words);
        }

        match self.embedding_title(topic_words, representative_docs) {
            Ok(Some(title)) => title,
            Ok(None) => self.keyword_title(topic_words),
            Err(e) => {
                warn!(error = %e, "Falling back to keyword title");
                self.keyword_title(topic_words)
            }
        }
    }

    /// The first `fallback_words` keywords joined by spaces.
    pub fn keyword_title(&self, topic_words: &[String]) -> String {
        topic_words
            .iter()
            .take(self.fallback_words)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// First sentence of the document most similar to the keywords, or
    /// None when that sentence is blank.
    fn embedding_title(
        &self,
        topic_words: &[String],
        representative_docs: &[&str],
    ) -> Result<Option<String>, TopicError> {
        let embedder = self.embedder.ok_or_else(|| TopicError::EmbeddingUnavailable {
            reason: "no embedding model loaded".to_string(),
        })?;

        let candidates: Vec<&str> = representative_docs
            .iter()
            .take(self.max_documents)
            .copied()
            .collect();
        if candidates.is_empty() {
            return Ok(None);
        }

        let mut texts = Vec::with_capacity(candidates.len() + 1);
        texts.push(topic_words.join(" "));
        texts.extend(candidates.iter().map(|d| d.to_string()));

        let vectors = embedder
            .embed(&texts)
            .map_err(|e| TopicError::EmbeddingUnavailable {
                reason: e.to_string(),
            })?;
        if vectors.len() != texts.len() {
            return Err(TopicError::EmbeddingUnavailable {
                reason: format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    vectors.len()
                ),
            });
        }

        let query = &vectors[0];
        let mut best_idx = 0;
        let mut best_sim = f64::NEG_INFINITY;
        for (idx, doc_vec) in vectors[1..].iter().enumerate() {
            let sim = cosine_similarity(query, doc_vec);
            // Strict comparison keeps the first document on ties
            if sim > best_sim {
                best_sim = sim;
                best_idx = idx;
            }
        }

        debug!(
            document = best_idx,
            similarity = best_sim,
            "Selected representative document"
        );

        let sentence = first_sentence(candidates[best_idx]);
        if sentence.is_empty() {
            return Ok(None);
        }
        Ok(Some(truncate_chars(sentence, self.max_title_chars)))
    }
}

/// Documents whose largest affinity in `doc_topic` is to `topic`.
///
/// A document tied across several topics represents each of them. Rows
/// that are entirely zero represent none.
pub fn representative_documents<'d>(
    doc_topic: &Array2<f64>,
    topic: usize,
    documents: &'d [String],
) -> Vec<&'d str> {
    doc_topic
        .rows()
        .into_iter()
        .zip(documents.iter())
        .filter(|(row, _)| {
            let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            max > 0.0 && row.get(topic).is_some_and(|&v| v == max)
        })
        .map(|(_, doc)| doc.as_str())
        .collect()
}

/// Text up to the first sentence terminator, trimmed.
pub fn first_sentence(text: &str) -> &str {
    let end = SENTENCE_END
        .find(text)
        .map(|m| m.start())
        .unwrap_or(text.len());
    text[..end].trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn words(ws: &[&str]) -> Vec<String> {
        ws.iter().map(|w| w.to_string()).collect()
    }

    /// Embeds text as counts of a few marker words.
    fn marker_embedder(text: &str) -> anyhow::Result<Vec<f64>> {
        let lower = text.to_lowercase();
        Ok(["dano", "moral", "tributo", "imposto"]
            .iter()
            .map(|m| lower.matches(m).count() as f64)
            .collect())
    }

    fn failing_embedder(_text: &str) -> anyhow::Result<Vec<f64>> {
        anyhow::bail!("model offline")
    }

    #[test]
    fn test_picks_most_similar_document() {
        let embedder = marker_embedder;
        let labeler = TopicLabeler::new(Some(&embedder));
        let docs = [
            "Cobrança de imposto sobre serviços. Recurso provido.",
            "Indenização por dano moral. Sentença mantida.",
        ];
        let title = labeler.label(&words(&["dano", "moral"]), &docs);
        assert_eq!(title, "Indenização por dano moral");
    }

    #[test]
    fn test_ties_keep_first_document() {
        let embedder = |_: &str| -> anyhow::Result<Vec<f64>> { Ok(vec![1.0, 1.0]) };
        let labeler = TopicLabeler::new(Some(&embedder));
        let docs = ["Primeira ementa. Resto.", "Segunda ementa."];
        assert_eq!(labeler.label(&words(&["x"]), &docs), "Primeira ementa");
    }

    #[test]
    fn test_long_sentence_is_truncated() {
        let embedder = marker_embedder;
        let labeler = TopicLabeler::new(Some(&embedder));
        let doc = "Apelação cível em ação de indenização por dano moral decorrente de inscrição indevida";
        let title = labeler.label(&words(&["dano"]), &[doc]);
        assert_eq!(title.chars().count(), 53);
        assert!(title.ends_with("..."));
        assert!(doc.starts_with(title.trim_end_matches("...")));
    }

    #[test]
    fn test_failing_embedder_falls_back_to_keywords() {
        let embedder = failing_embedder;
        let labeler = TopicLabeler::new(Some(&embedder));
        let title = labeler.label(&words(&["dano", "moral", "consumidor", "banco"]), &["Doc."]);
        assert_eq!(title, "dano moral consumidor");
    }

    #[test]
    fn test_missing_embedder_falls_back_to_keywords() {
        let labeler = TopicLabeler::new(None);
        let title = labeler.label(&words(&["tributo", "icms"]), &["Doc."]);
        assert_eq!(title, "tributo icms");
    }

    #[test]
    fn test_wrong_embedding_count_falls_back() {
        struct Short;
        impl Embedder for Short {
            fn embed(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f64>>> {
                Ok(vec![vec![1.0]])
            }
        }
        let short = Short;
        let labeler = TopicLabeler::new(Some(&short));
        assert_eq!(labeler.label(&words(&["a", "b"]), &["Doc one."]), "a b");
    }

    #[test]
    fn test_no_documents_uses_keywords() {
        let embedder = marker_embedder;
        let labeler = TopicLabeler::new(Some(&embedder));
        assert_eq!(labeler.label(&words(&["dano", "moral"]), &[]), "dano moral");
    }

    #[test]
    fn test_blank_first_sentence_uses_keywords() {
        let embedder = marker_embedder;
        let labeler = TopicLabeler::new(Some(&embedder));
        assert_eq!(labeler.label(&words(&["dano"]), &[". Dano moral."]), "dano");
    }

    #[test]
    fn test_only_first_five_documents_considered() {
        let embedder = marker_embedder;
        let labeler = TopicLabeler::new(Some(&embedder));
        let docs = [
            "Imposto um.",
            "Imposto dois.",
            "Imposto três.",
            "Imposto quatro.",
            "Imposto cinco.",
            "Dano moral seis.",
        ];
        // The sixth document matches best but is never embedded
        let title = labeler.label(&words(&["dano", "moral"]), &docs);
        assert_eq!(title, "Imposto um");
    }

    #[test]
    fn test_zero_document_budget_uses_keywords() {
        let embedder = marker_embedder;
        let mut labeler = TopicLabeler::new(Some(&embedder));
        labeler.max_documents = 0;
        let title = labeler.label(&words(&["dano", "moral"]), &["Dano moral. Sentença."]);
        assert_eq!(title, "dano moral");
    }

    #[test]
    fn test_representative_documents() {
        let w = array![[0.9, 0.1], [0.2, 0.8], [0.5, 0.5], [0.0, 0.0]];
        let docs = words(&["a", "b", "c", "d"]);
        assert_eq!(representative_documents(&w, 0, &docs), vec!["a", "c"]);
        assert_eq!(representative_documents(&w, 1, &docs), vec!["b", "c"]);
    }

    #[test]
    fn test_first_sentence() {
        assert_eq!(first_sentence("Lei 8.078/90 aplicável. Recurso."), "Lei 8.078/90 aplicável");
        assert_eq!(first_sentence("Sem ponto final"), "Sem ponto final");
        assert_eq!(first_sentence("Pergunta? Resposta."), "Pergunta");
        assert_eq!(first_sentence(""), "");
    }
}
