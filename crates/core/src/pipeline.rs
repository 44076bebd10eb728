use crate::chunking::ChunkingConfig;
use crate::error::Result;
use crate::ingest::ingest_folder;
use crate::keywords::build_keywords;
use crate::models::{IndexManifest, IndexOptions, ManifestOptions, SimilarityStrategy};
use crate::neighbors::{build_neighbors, select_provider, SimilarityProvider};
use crate::writer::{write_index, IndexArtifacts};
use chrono::Utc;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct IndexSummary {
    /// Markdown files found under the input directory, readable or not.
    pub discovered: usize,
    pub documents: usize,
    pub chunks: usize,
    pub toc_entries: usize,
    pub skipped_files: Vec<PathBuf>,
    pub similarity: SimilarityStrategy,
    pub out_dir: PathBuf,
}

impl IndexSummary {
    /// True when the input directory held no Markdown files at all.
    pub fn is_empty(&self) -> bool {
        self.discovered == 0
    }
}

/// Builds the index with the similarity provider chosen from `options.embedding`.
pub fn build_index(options: &IndexOptions) -> Result<IndexSummary> {
    let provider = select_provider(&options.embedding);
    build_index_with(options, provider.as_ref())
}

pub fn build_index_with(
    options: &IndexOptions,
    provider: &dyn SimilarityProvider,
) -> Result<IndexSummary> {
    let report = ingest_folder(&options.input_dir, ChunkingConfig::from(options));
    if report.discovered == 0 {
        warn!(input_dir = %options.input_dir.display(), "no markdown files found");
    } else if report.documents == 0 {
        warn!(
            input_dir = %options.input_dir.display(),
            skipped = report.skipped_files.len(),
            "no markdown file could be read"
        );
    }
    info!(
        discovered = report.discovered,
        documents = report.documents,
        chunks = report.chunks.len(),
        toc_entries = report.toc.len(),
        "corpus chunked"
    );

    let keywords = build_keywords(
        &report.chunks,
        options.keywords_per_chunk,
        options.max_features,
    );
    let graph = build_neighbors(&report.chunks, options.knn, provider);
    info!(similarity = %graph.strategy, "neighbor graph built");

    let skipped_files: Vec<PathBuf> = report
        .skipped_files
        .iter()
        .map(|skipped| skipped.path.clone())
        .collect();
    let manifest = IndexManifest {
        built_at: Utc::now(),
        input_dir: options.input_dir.to_string_lossy().replace('\\', "/"),
        documents: report.documents,
        chunks: report.chunks.len(),
        toc_entries: report.toc.len(),
        similarity: graph.strategy,
        corpus_digest: report.corpus_digest.clone(),
        skipped_files: skipped_files
            .iter()
            .map(|path| path.to_string_lossy().replace('\\', "/"))
            .collect(),
        options: ManifestOptions::from(options),
    };

    write_index(
        &options.out_dir,
        &IndexArtifacts {
            chunks: &report.chunks,
            toc: &report.toc,
            keywords: &keywords,
            neighbors: &graph.entries,
            manifest: &manifest,
        },
    )?;

    Ok(IndexSummary {
        discovered: report.discovered,
        documents: report.documents,
        chunks: report.chunks.len(),
        toc_entries: report.toc.len(),
        skipped_files,
        similarity: graph.strategy,
        out_dir: options.out_dir.clone(),
    })
}
