use crate::embeddings::EmbeddingBackend;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A decoded input file. Lives only while its chunks are being built.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub text: String,
}

impl Document {
    /// Path as written into artifacts: forward slashes on every platform.
    pub fn display_path(&self) -> String {
        self.path.to_string_lossy().replace('\\', "/")
    }

    /// File name without directory or extension.
    pub fn title(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub title: String,
    /// Character offset of the heading line in the normalized text.
    pub position: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TocEntry {
    pub path: String,
    pub level: u8,
    pub title: String,
    pub anchor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,
    pub path: String,
    pub title: String,
    pub heading: String,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeywordEntry {
    pub id: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NeighborEntry {
    pub id: String,
    pub neighbors: Vec<(String, f32)>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityStrategy {
    Dense,
    Sparse,
}

impl std::fmt::Display for SimilarityStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimilarityStrategy::Dense => f.write_str("dense"),
            SimilarityStrategy::Sparse => f.write_str("sparse"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub input_dir: PathBuf,
    pub out_dir: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub keywords_per_chunk: usize,
    pub knn: usize,
    /// Vocabulary cap for keyword extraction; `None` keeps every term.
    pub max_features: Option<usize>,
    pub embedding: EmbeddingBackend,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("book"),
            out_dir: PathBuf::from(".rag"),
            chunk_size: 1_000,
            chunk_overlap: 120,
            keywords_per_chunk: 10,
            knn: 5,
            max_features: Some(50_000),
            embedding: EmbeddingBackend::None,
        }
    }
}

/// Knobs recorded in the manifest so a loader can tell how the index was cut.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub keywords_per_chunk: usize,
    pub knn: usize,
}

impl From<&IndexOptions> for ManifestOptions {
    fn from(value: &IndexOptions) -> Self {
        Self {
            chunk_size: value.chunk_size,
            chunk_overlap: value.chunk_overlap,
            keywords_per_chunk: value.keywords_per_chunk,
            knn: value.knn,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManifest {
    pub built_at: DateTime<Utc>,
    pub input_dir: String,
    pub documents: usize,
    pub chunks: usize,
    pub toc_entries: usize,
    pub similarity: SimilarityStrategy,
    pub corpus_digest: String,
    pub skipped_files: Vec<String>,
    pub options: ManifestOptions,
}
