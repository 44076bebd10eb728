pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod ingest;
pub mod keywords;
pub mod markdown;
pub mod models;
pub mod neighbors;
pub mod pipeline;
pub mod stopwords;
pub mod tfidf;
pub mod writer;

pub use chunking::{
    chunk_document, roll_chunks, step, ChunkState, ChunkingConfig, DraftChunk, Frame,
};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, EmbeddingBackend, HttpEmbedder, HttpEmbeddingConfig,
    DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL,
};
pub use error::{EmbeddingError, IndexError};
pub use ingest::{
    discover_markdown_files, ingest_folder, read_document, IngestionReport, SkippedDocument,
};
pub use keywords::build_keywords;
pub use markdown::{parse_headings, slugify, split_paragraphs, strip_front_matter};
pub use models::{
    Chunk, Document, Heading, IndexManifest, IndexOptions, KeywordEntry, NeighborEntry,
    SimilarityStrategy, TocEntry,
};
pub use neighbors::{
    build_neighbors, select_provider, DenseEmbeddingProvider, NeighborGraph, SimilarityProvider,
    SparseLexicalProvider,
};
pub use pipeline::{build_index, build_index_with, IndexSummary};
pub use tfidf::{SparseVector, TfidfMatrix, TfidfVectorizer};
pub use writer::{write_index, IndexArtifacts};
