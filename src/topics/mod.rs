// Topic modeling: vectorization, factorization, keyword extraction,
// importance weights and titles.

pub mod embeddings;
pub mod extractor;
pub mod labeler;
pub mod model;
pub mod vectorizer;
pub mod weights;
