// The topic pipeline: one run from raw documents to titled topics.
//
//   raw documents -> Preprocessor -> TfIdfVectorizer -> TopicModel
//     -> { extract_topics, aggregate } -> TopicLabeler -> TopicReport
//
// Every run builds its own preprocessor, vocabulary and matrices; nothing is
// shared between runs. The run is CPU-bound and synchronous; `spawn_run`
// moves it onto tokio's blocking pool so an interactive caller stays
// responsive and is notified through the join handle.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::{ModelType, PipelineConfig};
use crate::error::Result;
use crate::text::preprocess::Preprocessor;
use crate::topics::extractor::extract_topics;
use crate::topics::labeler::{representative_documents, Embedder, TopicLabeler};
use crate::topics::model::{build_model, Factorization};
use crate::topics::vectorizer::{TfIdfVectorizer, Vocabulary};
use crate::topics::weights::{aggregate, chart_series, ChartBar};

/// A discovered topic. Built once per run and never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    /// 0-based topic index (row of H, column of W)
    pub index: usize,
    /// Keywords, highest topic-term weight first
    pub words: Vec<String>,
    /// Human-readable title
    pub title: String,
    /// Mean document affinity to this topic
    pub weight: f64,
}

/// Final output of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicReport {
    pub model_type: ModelType,
    pub document_count: usize,
    pub vocabulary_size: usize,
    pub topics: BTreeMap<usize, Topic>,
    /// Topic weights as (label, value) bars for a chart renderer
    pub chart: Vec<ChartBar>,
}

/// A report together with the intermediate results it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub vocabulary: Vocabulary,
    pub factorization: Factorization,
    pub report: TopicReport,
}

/// Run the pipeline and return only the report.
pub fn run(
    documents: &[String],
    config: &PipelineConfig,
    embedder: Option<&dyn Embedder>,
) -> Result<TopicReport> {
    run_detailed(documents, config, embedder).map(|out| out.report)
}

/// Run the pipeline, keeping the vocabulary and the W/H matrices.
///
/// Configuration errors surface before any document is processed;
/// `EmptyVocabulary` and data-dependent `InvalidTopicCount` surface before
/// labeling. Embedding failures never abort the run.
pub fn run_detailed(
    documents: &[String],
    config: &PipelineConfig,
    embedder: Option<&dyn Embedder>,
) -> Result<PipelineOutput> {
    config.validate()?;

    info!(
        documents = documents.len(),
        model = %config.model_type,
        topics = config.n_topics,
        seed = config.seed,
        "Starting topic pipeline"
    );

    let preprocessor = Preprocessor::portuguese();
    let cleaned = preprocessor.preprocess_batch(documents);

    let vectorizer = TfIdfVectorizer::new(config.vectorizer.clone());
    let (matrix, vocabulary) = vectorizer.fit_transform(&cleaned)?;
    info!(vocabulary = vocabulary.len(), "Vectorized corpus");

    let model = build_model(config.model_type, config.max_iter);
    let factorization = model.fit(&matrix, config.n_topics, config.seed)?;
    info!(
        model = model.name(),
        iterations = factorization.n_iter,
        reconstruction_err = ?factorization.reconstruction_err,
        "Factorization finished"
    );

    let keywords = extract_topics(&factorization.topic_term, &vocabulary, config.top_n)?;
    let weights = aggregate(&factorization.doc_topic);

    let labeler = TopicLabeler::new(embedder);
    let mut topics = BTreeMap::new();
    for (index, words) in keywords {
        let docs = representative_documents(&factorization.doc_topic, index, documents);
        let title = labeler.label(&words, &docs);
        let weight = weights.get(index).copied().unwrap_or(0.0);
        topics.insert(
            index,
            Topic {
                index,
                words,
                title,
                weight,
            },
        );
    }

    let report = TopicReport {
        model_type: config.model_type,
        document_count: documents.len(),
        vocabulary_size: vocabulary.len(),
        topics,
        chart: chart_series(&weights),
    };

    info!(topics = report.topics.len(), "Topic pipeline complete");

    Ok(PipelineOutput {
        vocabulary,
        factorization,
        report,
    })
}

/// Start a run on the blocking thread pool and return its handle.
///
/// Awaiting the handle yields the run's result; a panic inside the run
/// surfaces as a `JoinError`.
pub fn spawn_run(
    documents: Vec<String>,
    config: PipelineConfig,
    embedder: Option<Arc<dyn Embedder>>,
) -> JoinHandle<Result<TopicReport>> {
    tokio::task::spawn_blocking(move || run(&documents, &config, embedder.as_deref()))
}

/// Run in the background and wait for completion or failure.
pub async fn run_in_background(
    documents: Vec<String>,
    config: PipelineConfig,
    embedder: Option<Arc<dyn Embedder>>,
) -> anyhow::Result<TopicReport> {
    let report = spawn_run(documents, config, embedder)
        .await
        .context("topic pipeline task panicked")??;
    Ok(report)
}
