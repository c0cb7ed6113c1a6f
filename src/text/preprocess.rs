// Document preprocessing: lowercase, word tokenization, stopword removal.
//
// Tokens are runs of word characters (letters, digits, underscore). Only
// purely alphabetic tokens survive, so numbers, article references like
// "art123" and snake_case identifiers are dropped along with stopwords.

use std::collections::HashSet;

use rayon::prelude::*;
use stop_words::{get, LANGUAGE};

/// Normalizes raw document text into space-joined content words.
///
/// Holds its own stopword set; build one per run rather than sharing a
/// process-wide instance.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    stop_words: HashSet<String>,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::portuguese()
    }
}

impl Preprocessor {
    /// Preprocessor using NLTK's Portuguese stopword list (the corpus language).
    ///
    /// Function words only: domain nouns such as "estado" or "valor" are kept.
    pub fn portuguese() -> Self {
        Self::with_stop_words(get(LANGUAGE::Portuguese))
    }

    /// Preprocessor with a caller-supplied stopword list. Entries are lowercased.
    pub fn with_stop_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            stop_words: words
                .into_iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Normalize one document. Empty input yields an empty string.
    pub fn preprocess(&self, text: &str) -> String {
        let lower = text.to_lowercase();
        lower
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|token| !token.is_empty())
            .filter(|token| token.chars().all(char::is_alphabetic))
            .filter(|token| !self.stop_words.contains(*token))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Normalize a batch of documents, preserving order.
    ///
    /// Documents are independent, so the work is spread across rayon's pool.
    pub fn preprocess_batch(&self, texts: &[String]) -> Vec<String> {
        texts.par_iter().map(|t| self.preprocess(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Preprocessor {
        Preprocessor::with_stop_words(["de", "a", "o", "que"])
    }

    #[test]
    fn test_lowercases_and_drops_stop_words() {
        let p = small();
        assert_eq!(p.preprocess("Recurso de Apelação"), "recurso apelação");
    }

    #[test]
    fn test_drops_non_alphabetic_tokens() {
        let p = small();
        assert_eq!(
            p.preprocess("Art. 5º, inciso 12 da Lei 8.078/90 snake_case"),
            "art inciso da lei"
        );
    }

    #[test]
    fn test_empty_input() {
        let p = small();
        assert_eq!(p.preprocess(""), "");
        assert_eq!(p.preprocess("  ... 123 "), "");
    }

    #[test]
    fn test_batch_preserves_order() {
        let p = small();
        let docs = vec![
            "Gato".to_string(),
            String::new(),
            "o carro".to_string(),
        ];
        assert_eq!(p.preprocess_batch(&docs), vec!["gato", "", "carro"]);
    }

    #[test]
    fn test_stop_words_are_case_insensitive() {
        let p = Preprocessor::with_stop_words(["DE"]);
        assert!(p.is_stop_word("de"));
        assert_eq!(p.preprocess("Dano DE trânsito"), "dano trânsito");
    }

    #[test]
    fn test_portuguese_list_keeps_legal_terms() {
        let out = Preprocessor::portuguese()
            .preprocess("Valor da causa contra o Estado. Trabalho e parte autora. Questão de nome.");
        let tokens: Vec<&str> = out.split(' ').collect();
        for kept in ["valor", "estado", "trabalho", "parte", "questão", "nome"] {
            assert!(tokens.contains(&kept), "{kept} missing from {out:?}");
        }
        for dropped in ["de", "o", "que", "da", "e"] {
            assert!(!tokens.contains(&dropped), "{dropped} kept in {out:?}");
        }
        assert_eq!(Preprocessor::portuguese().preprocess("o que de"), "");
    }
}
