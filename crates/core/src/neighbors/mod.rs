//! Neighbor graph construction.
//!
//! Two providers sit behind [`SimilarityProvider`]: a dense one backed by an
//! [`Embedder`] and a sparse tf-idf one that needs nothing external. The
//! provider is picked once per run by [`select_provider`]; if the dense
//! provider fails mid-run, [`build_neighbors`] reruns the sparse one so the
//! caller always gets a complete graph and can read which strategy ran.

pub mod index;

use crate::embeddings::{normalize, EmbeddingBackend, Embedder};
use crate::error::{EmbeddingError, Result};
use crate::models::{Chunk, NeighborEntry, SimilarityStrategy};
use crate::tfidf::TfidfVectorizer;
use index::{exclude_self, FlatInnerProductIndex, NearestNeighborIndex, SparseCosineIndex};
use tracing::{debug, info, warn};

pub trait SimilarityProvider {
    fn strategy(&self) -> SimilarityStrategy;

    /// One entry per chunk, in chunk order, each with at most `k` other chunks.
    fn rank_neighbors(&self, chunks: &[Chunk], k: usize) -> Result<Vec<NeighborEntry>>;
}

pub struct DenseEmbeddingProvider {
    embedder: Box<dyn Embedder>,
}

impl DenseEmbeddingProvider {
    pub fn new(embedder: Box<dyn Embedder>) -> Self {
        Self { embedder }
    }
}

impl SimilarityProvider for DenseEmbeddingProvider {
    fn strategy(&self) -> SimilarityStrategy {
        SimilarityStrategy::Dense
    }

    fn rank_neighbors(&self, chunks: &[Chunk], k: usize) -> Result<Vec<NeighborEntry>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        let mut vectors = self.embedder.embed_batch(&texts)?;
        if vectors.len() != chunks.len() {
            return Err(EmbeddingError::BackendResponse {
                backend: self.embedder.name().to_string(),
                details: format!("{} vectors for {} chunks", vectors.len(), chunks.len()),
            }
            .into());
        }

        let dimensions = vectors[0].len();
        for vector in &mut vectors {
            if vector.len() != dimensions {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: dimensions,
                    actual: vector.len(),
                }
                .into());
            }
            normalize(vector);
        }
        debug!(embedder = self.embedder.name(), dimensions, "chunks embedded");

        let mut index = FlatInnerProductIndex::default();
        index.add(vectors.clone());
        let hits = index.search(&vectors, k.saturating_add(1).min(index.len()));
        Ok(into_entries(chunks, hits, k))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SparseLexicalProvider;

impl SimilarityProvider for SparseLexicalProvider {
    fn strategy(&self) -> SimilarityStrategy {
        SimilarityStrategy::Sparse
    }

    fn rank_neighbors(&self, chunks: &[Chunk], k: usize) -> Result<Vec<NeighborEntry>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        let matrix = TfidfVectorizer::default().fit_transform(&texts);

        let mut index = SparseCosineIndex::default();
        index.add(matrix.rows.clone());
        let hits = index.search(&matrix.rows, k.saturating_add(1).min(index.len()));
        Ok(into_entries(chunks, hits, k))
    }
}

fn into_entries(chunks: &[Chunk], hits: Vec<Vec<(usize, f32)>>, k: usize) -> Vec<NeighborEntry> {
    chunks
        .iter()
        .zip(hits)
        .enumerate()
        .map(|(row, (chunk, row_hits))| NeighborEntry {
            id: chunk.id.clone(),
            neighbors: exclude_self(row_hits, row, k)
                .into_iter()
                .map(|(other, score)| (chunks[other].id.clone(), score))
                .collect(),
        })
        .collect()
}

/// Dense when an embedding capability is configured and constructible, sparse otherwise.
pub fn select_provider(backend: &EmbeddingBackend) -> Box<dyn SimilarityProvider> {
    match backend.create_embedder() {
        Ok(Some(embedder)) => {
            info!(embedder = embedder.name(), "using dense embedding neighbors");
            Box::new(DenseEmbeddingProvider::new(embedder))
        }
        Ok(None) => {
            info!("no embedding backend configured, using tf-idf neighbors");
            Box::new(SparseLexicalProvider)
        }
        Err(error) => {
            warn!(%error, "embedding backend unavailable, using tf-idf neighbors");
            Box::new(SparseLexicalProvider)
        }
    }
}

#[derive(Debug, Clone)]
pub struct NeighborGraph {
    /// The strategy whose output is in `entries`.
    pub strategy: SimilarityStrategy,
    pub entries: Vec<NeighborEntry>,
}

pub fn build_neighbors(
    chunks: &[Chunk],
    k: usize,
    provider: &dyn SimilarityProvider,
) -> NeighborGraph {
    match provider.rank_neighbors(chunks, k) {
        Ok(entries) => NeighborGraph {
            strategy: provider.strategy(),
            entries,
        },
        Err(error) => {
            warn!(
                %error,
                strategy = %provider.strategy(),
                "neighbor ranking failed, falling back to tf-idf"
            );
            sparse_graph(chunks, k)
        }
    }
}

fn sparse_graph(chunks: &[Chunk], k: usize) -> NeighborGraph {
    let provider = SparseLexicalProvider;
    let entries = match provider.rank_neighbors(chunks, k) {
        Ok(entries) => entries,
        Err(error) => {
            warn!(%error, "tf-idf ranking failed, emitting empty neighbor lists");
            chunks
                .iter()
                .map(|chunk| NeighborEntry {
                    id: chunk.id.clone(),
                    neighbors: Vec::new(),
                })
                .collect()
        }
    };
    NeighborGraph {
        strategy: provider.strategy(),
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;

    fn chunk(index: usize, text: &str) -> Chunk {
        Chunk {
            id: format!("doc.md:chunk-{index:04}"),
            path: "doc.md".to_string(),
            title: "doc".to_string(),
            heading: String::new(),
            start: 0,
            end: text.chars().count(),
            text: text.to_string(),
        }
    }

    fn corpus() -> Vec<Chunk> {
        [
            "ownership and borrowing in rust",
            "borrowing rules and lifetimes in rust",
            "async executors and futures",
            "futures polling in async runtimes",
            "cargo workspaces and crates",
            "publishing crates with cargo",
            "text chunking for retrieval",
        ]
        .iter()
        .enumerate()
        .map(|(index, text)| chunk(index, text))
        .collect()
    }

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn name(&self) -> &str {
            "failing"
        }

        fn embed_batch(
            &self,
            _texts: &[&str],
        ) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::Config("offline".to_string()))
        }
    }

    fn assert_graph_shape(chunks: &[Chunk], graph: &NeighborGraph, k: usize) {
        assert_eq!(graph.entries.len(), chunks.len());
        for (chunk, entry) in chunks.iter().zip(&graph.entries) {
            assert_eq!(entry.id, chunk.id);
            assert!(entry.neighbors.iter().all(|(id, _)| id != &chunk.id));
            assert_eq!(entry.neighbors.len(), k.min(chunks.len() - 1));
            for pair in entry.neighbors.windows(2) {
                assert!(pair[0].1 >= pair[1].1);
            }
        }
    }

    #[test]
    fn sparse_neighbors_find_lexical_twins() {
        let chunks = corpus();
        let graph = build_neighbors(&chunks, 3, &SparseLexicalProvider);

        assert_eq!(graph.strategy, SimilarityStrategy::Sparse);
        assert_graph_shape(&chunks, &graph, 3);
        assert_eq!(graph.entries[4].neighbors[0].0, "doc.md:chunk-0005");
    }

    #[test]
    fn dense_neighbors_share_the_output_shape() {
        let chunks = corpus();
        let provider = DenseEmbeddingProvider::new(Box::new(CharacterNgramEmbedder::default()));
        let graph = build_neighbors(&chunks, 3, &provider);

        assert_eq!(graph.strategy, SimilarityStrategy::Dense);
        assert_graph_shape(&chunks, &graph, 3);
    }

    #[test]
    fn failing_embedder_falls_back_to_sparse() {
        let chunks = corpus();
        let provider = DenseEmbeddingProvider::new(Box::new(FailingEmbedder));
        let graph = build_neighbors(&chunks, 2, &provider);

        assert_eq!(graph.strategy, SimilarityStrategy::Sparse);
        assert_graph_shape(&chunks, &graph, 2);
    }

    #[test]
    fn small_corpus_lists_every_other_chunk() {
        let chunks = corpus().into_iter().take(3).collect::<Vec<_>>();
        let graph = build_neighbors(&chunks, 5, &SparseLexicalProvider);
        assert_graph_shape(&chunks, &graph, 5);
        assert_eq!(graph.entries[0].neighbors.len(), 2);
    }

    #[test]
    fn unbounded_k_lists_every_other_chunk() {
        let chunks = corpus().into_iter().take(3).collect::<Vec<_>>();
        let sparse = build_neighbors(&chunks, usize::MAX, &SparseLexicalProvider);
        let provider = DenseEmbeddingProvider::new(Box::new(CharacterNgramEmbedder::default()));
        let dense = build_neighbors(&chunks, usize::MAX, &provider);

        for graph in [&sparse, &dense] {
            assert_graph_shape(&chunks, graph, usize::MAX);
            assert!(graph.entries.iter().all(|entry| entry.neighbors.len() == 2));
        }
        assert_eq!(dense.strategy, SimilarityStrategy::Dense);
    }

    #[test]
    fn duplicate_texts_never_list_themselves() {
        let chunks = vec![chunk(0, "same words here"), chunk(1, "same words here")];
        let provider = DenseEmbeddingProvider::new(Box::new(CharacterNgramEmbedder::default()));
        let graph = build_neighbors(&chunks, 1, &provider);
        assert_eq!(graph.entries[0].neighbors[0].0, chunks[1].id);
        assert_eq!(graph.entries[1].neighbors[0].0, chunks[0].id);
    }

    #[test]
    fn single_chunk_has_empty_neighbors() {
        let chunks = vec![chunk(0, "alone in the corpus")];
        let graph = build_neighbors(&chunks, 5, &SparseLexicalProvider);
        assert_eq!(graph.entries.len(), 1);
        assert!(graph.entries[0].neighbors.is_empty());
    }

    #[test]
    fn empty_corpus_has_empty_graph() {
        let graph = build_neighbors(&[], 5, &SparseLexicalProvider);
        assert!(graph.entries.is_empty());
    }

    #[test]
    fn provider_selection_is_observable() {
        assert_eq!(
            select_provider(&EmbeddingBackend::None).strategy(),
            SimilarityStrategy::Sparse
        );
        assert_eq!(
            select_provider(&EmbeddingBackend::Ngram { dimensions: 64 }).strategy(),
            SimilarityStrategy::Dense
        );
    }
}
