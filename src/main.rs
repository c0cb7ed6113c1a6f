use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use jurtopics::config::{Config, PipelineConfig, DEFAULT_TOP_N};
use jurtopics::topics::embeddings::{model_files_present, SentenceEmbedder};
use jurtopics::topics::labeler::Embedder;
use jurtopics::topics::vectorizer::VectorizerParams;

/// jurtopics: topic discovery for legal-decision texts.
///
/// Finds latent topics in a collection of court decision summaries and
/// reports, per topic, its keywords, mean importance and a short title.
#[derive(Parser)]
#[command(name = "jurtopics", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover topics in a corpus file
    Run {
        /// Topic model: nmf or lda
        #[arg(long)]
        model: String,

        /// Number of topics (2-20)
        #[arg(long, default_value = "5")]
        topics: usize,

        /// Keywords per topic
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,

        /// Seed for the factorization (default: JURTOPICS_SEED or 42)
        #[arg(long)]
        seed: Option<u64>,

        /// Corpus file: one document per line, or JSON Lines
        #[arg(long)]
        input: PathBuf,

        /// JSON field holding the document text (implies JSON Lines input)
        #[arg(long)]
        field: Option<String>,

        /// Drop terms present in more than this fraction of documents
        #[arg(long, default_value = "0.95")]
        max_df: f64,

        /// Drop terms present in fewer than this many documents
        #[arg(long, default_value = "2")]
        min_df: usize,

        /// Vocabulary size cap
        #[arg(long, default_value = "1000")]
        max_features: usize,

        /// Override the model's iteration cap
        #[arg(long)]
        max_iter: Option<usize>,

        /// Print the report as JSON instead of the terminal view
        #[arg(long)]
        json: bool,
    },

    /// Show configuration and whether the embedding model is available
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("jurtopics=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            model,
            topics,
            top_n,
            seed,
            input,
            field,
            max_df,
            min_df,
            max_features,
            max_iter,
            json,
        } => {
            let config = Config::load()?;

            let vectorizer = VectorizerParams {
                max_df,
                min_df,
                max_features,
                ..VectorizerParams::default()
            };
            let mut pipeline_config = PipelineConfig::from_name(&model, topics)?
                .with_top_n(top_n)
                .with_seed(seed.unwrap_or(config.seed))
                .with_vectorizer(vectorizer);
            if let Some(n) = max_iter {
                pipeline_config = pipeline_config.with_max_iter(n);
            }
            pipeline_config.validate()?;

            let documents = jurtopics::corpus::load_documents(&input, field.as_deref())?;
            info!(documents = documents.len(), "Corpus loaded");

            let embedder = load_embedder(&config);
            let report =
                jurtopics::pipeline::run_in_background(documents, pipeline_config, embedder)
                    .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                jurtopics::output::terminal::display_report(&report);
            }
        }

        Commands::Status => {
            let config = Config::load()?;
            println!("Embedding model dir: {}", config.model_dir.display());
            if !config.embeddings_enabled {
                println!("Embedding titles: disabled (JURTOPICS_EMBEDDINGS=off)");
            } else if model_files_present(&config.model_dir) {
                println!("Embedding titles: {}", "model present".green());
            } else {
                println!(
                    "Embedding titles: {} (keyword titles will be used)",
                    "model missing".yellow()
                );
            }
            println!("Default seed: {}", config.seed);
        }
    }

    Ok(())
}

/// Load the sentence embedder if enabled and present. Titles fall back to
/// keywords without it, so failures are logged rather than returned.
fn load_embedder(config: &Config) -> Option<Arc<dyn Embedder>> {
    if !config.embeddings_enabled {
        info!("Embedding titles disabled, using keyword titles");
        return None;
    }
    if !model_files_present(&config.model_dir) {
        warn!(
            model_dir = %config.model_dir.display(),
            "Embedding model not found, using keyword titles"
        );
        return None;
    }
    match SentenceEmbedder::load(&config.model_dir) {
        Ok(embedder) => Some(Arc::new(embedder)),
        Err(e) => {
            warn!(error = %e, "Embedding model failed to load, using keyword titles");
            None
        }
    }
}
