use chrono::Utc;
use clap::{Parser, ValueEnum};
use rag_index_core::{
    build_index, EmbeddingBackend, HttpEmbeddingConfig, IndexOptions, IndexSummary,
    DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "rag-index",
    version,
    about = "Build a lightweight retrieval index from Markdown sources"
)]
struct Cli {
    /// Root directory with Markdown files
    #[arg(long, default_value = "book")]
    input_dir: PathBuf,

    /// Output directory for index files
    #[arg(long, default_value = ".rag")]
    out_dir: PathBuf,

    /// Approx. characters per chunk
    #[arg(long, default_value_t = 1000)]
    chunk_size: usize,

    /// Characters overlap between chunks
    #[arg(long, default_value_t = 120)]
    chunk_overlap: usize,

    /// Keywords kept per chunk
    #[arg(long, default_value_t = 10)]
    keywords_per_chunk: usize,

    /// Neighbors per chunk
    #[arg(long, default_value_t = 5)]
    knn: usize,

    /// Embedding capability used for the neighbor graph.
    #[arg(long, value_enum, default_value_t = EmbeddingMode::Auto)]
    embeddings: EmbeddingMode,

    /// Base URL of an OpenAI-compatible embeddings API
    #[arg(long, env = "RAG_EMBEDDING_ENDPOINT")]
    embedding_endpoint: Option<String>,

    /// Bearer token for the embeddings API
    #[arg(long, env = "RAG_EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_api_key: Option<String>,

    /// Model name sent to the embeddings API
    #[arg(long, default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Vector size of the offline n-gram embedder
    #[arg(long, default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    ngram_dimensions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EmbeddingMode {
    /// HTTP embeddings when an endpoint is configured, tf-idf otherwise.
    Auto,
    /// Always use tf-idf neighbors.
    #[value(name = "none")]
    Lexical,
    /// Offline character n-gram embeddings.
    Ngram,
    /// HTTP embeddings; requires --embedding-endpoint.
    Http,
}

impl Cli {
    fn embedding_backend(&self) -> EmbeddingBackend {
        let http = || {
            self.embedding_endpoint.as_ref().map(|endpoint| {
                let mut config = HttpEmbeddingConfig::new(endpoint.clone());
                config.api_key = self.embedding_api_key.clone();
                config.model = self.embedding_model.clone();
                EmbeddingBackend::Http(config)
            })
        };

        match self.embeddings {
            EmbeddingMode::Lexical => EmbeddingBackend::None,
            EmbeddingMode::Ngram => EmbeddingBackend::Ngram {
                dimensions: self.ngram_dimensions,
            },
            EmbeddingMode::Auto => http().unwrap_or(EmbeddingBackend::None),
            EmbeddingMode::Http => http().unwrap_or_else(|| {
                warn!("--embeddings http without --embedding-endpoint, using tf-idf neighbors");
                EmbeddingBackend::None
            }),
        }
    }

    fn into_options(self) -> IndexOptions {
        let embedding = self.embedding_backend();
        IndexOptions {
            input_dir: self.input_dir,
            out_dir: self.out_dir,
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            keywords_per_chunk: self.keywords_per_chunk,
            knn: self.knn,
            embedding,
            ..IndexOptions::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let options = Cli::parse().into_options();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        input_dir = %options.input_dir.display(),
        out_dir = %options.out_dir.display(),
        "rag-index boot"
    );

    let input_dir = options.input_dir.clone();
    let summary = tokio::task::spawn_blocking(move || build_index(&options))
        .await
        .map_err(|error| anyhow::anyhow!("index build task failed: {error}"))?
        .map_err(|error| anyhow::anyhow!(error.to_string()))?;

    for notice in input_notices(&summary, &input_dir) {
        eprintln!("{notice}");
    }
    for skipped in &summary.skipped_files {
        warn!(path = %skipped.display(), "skipped unreadable document");
    }

    println!(
        "[rag-index] Done. Wrote {} chunks | {} toc entries | neighbors via {}",
        summary.chunks, summary.toc_entries, summary.similarity
    );
    println!(
        "[rag-index] Artifacts in: {}/ ({ARTIFACT_LIST})",
        summary.out_dir.display()
    );

    Ok(())
}

const ARTIFACT_LIST: &str =
    "chunks.jsonl, keywords.jsonl, neighbors.jsonl, toc.json, manifest.json";

/// Stderr notices about the input: nothing found, or files found but skipped.
fn input_notices(summary: &IndexSummary, input_dir: &Path) -> Vec<String> {
    if summary.is_empty() {
        return vec![format!(
            "[rag-index] No markdown files found under: {}",
            input_dir.display()
        )];
    }
    if summary.skipped_files.is_empty() {
        return Vec::new();
    }
    vec![format!(
        "[rag-index] Skipped {} of {} markdown files under {} (unreadable)",
        summary.skipped_files.len(),
        summary.discovered,
        input_dir.display()
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_index_core::SimilarityStrategy;

    #[test]
    fn defaults_match_documented_knobs() {
        let options = Cli::parse_from(["rag-index"]).into_options();
        assert_eq!(options.input_dir, PathBuf::from("book"));
        assert_eq!(options.out_dir, PathBuf::from(".rag"));
        assert_eq!(options.chunk_size, 1000);
        assert_eq!(options.chunk_overlap, 120);
        assert_eq!(options.keywords_per_chunk, 10);
        assert_eq!(options.knn, 5);
    }

    #[test]
    fn auto_mode_uses_http_only_with_endpoint() {
        let cli = Cli::parse_from([
            "rag-index",
            "--embedding-endpoint",
            "http://localhost:8080/v1",
        ]);
        assert!(matches!(cli.embedding_backend(), EmbeddingBackend::Http(_)));

        let cli = Cli::parse_from([
            "rag-index",
            "--embeddings",
            "none",
            "--embedding-endpoint",
            "http://x",
        ]);
        assert_eq!(cli.embedding_backend(), EmbeddingBackend::None);
    }

    #[test]
    fn negative_sizes_are_rejected() {
        assert!(Cli::try_parse_from(["rag-index", "--chunk-size", "-5"]).is_err());
    }

    fn summary(discovered: usize, skipped: &[&str]) -> IndexSummary {
        IndexSummary {
            discovered,
            documents: discovered - skipped.len(),
            chunks: 0,
            toc_entries: 0,
            skipped_files: skipped.iter().map(PathBuf::from).collect(),
            similarity: SimilarityStrategy::Sparse,
            out_dir: PathBuf::from(".rag"),
        }
    }

    #[test]
    fn empty_input_gets_the_not_found_notice() {
        let notices = input_notices(&summary(0, &[]), Path::new("book"));
        assert_eq!(notices, vec!["[rag-index] No markdown files found under: book"]);
    }

    #[test]
    fn unreadable_files_are_not_reported_as_missing() {
        let notices = input_notices(&summary(1, &["book/broken.md"]), Path::new("book"));
        assert_eq!(notices.len(), 1);
        assert!(!notices[0].contains("No markdown files found"));
        assert!(notices[0].contains("Skipped 1 of 1"));
    }

    #[test]
    fn clean_run_has_no_input_notices() {
        assert!(input_notices(&summary(3, &[]), Path::new("book")).is_empty());
    }
}
