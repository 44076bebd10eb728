//! Exact nearest-neighbour indexes for dense and sparse vectors.

use crate::tfidf::SparseVector;

/// `fit` once, then `search` with any number of queries.
pub trait NearestNeighborIndex {
    type Vector;

    fn add(&mut self, vectors: Vec<Self::Vector>);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `k` `(row, similarity)` pairs per query, most similar first.
    fn search(&self, queries: &[Self::Vector], k: usize) -> Vec<Vec<(usize, f32)>>;
}

/// Brute-force inner-product index; on unit vectors the score is cosine similarity.
#[derive(Debug, Clone, Default)]
pub struct FlatInnerProductIndex {
    vectors: Vec<Vec<f32>>,
}

impl NearestNeighborIndex for FlatInnerProductIndex {
    type Vector = Vec<f32>;

    fn add(&mut self, vectors: Vec<Vec<f32>>) {
        self.vectors.extend(vectors);
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn search(&self, queries: &[Vec<f32>], k: usize) -> Vec<Vec<(usize, f32)>> {
        queries
            .iter()
            .map(|query| {
                let scores = self
                    .vectors
                    .iter()
                    .enumerate()
                    .map(|(row, vector)| (row, inner_product(query, vector)))
                    .collect();
                top_k(scores, k)
            })
            .collect()
    }
}

/// Brute-force cosine index over tf-idf rows. Scores are `1 - cosine distance`.
#[derive(Debug, Clone, Default)]
pub struct SparseCosineIndex {
    vectors: Vec<SparseVector>,
    norms: Vec<f64>,
}

impl NearestNeighborIndex for SparseCosineIndex {
    type Vector = SparseVector;

    fn add(&mut self, vectors: Vec<SparseVector>) {
        self.norms.extend(vectors.iter().map(SparseVector::norm));
        self.vectors.extend(vectors);
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn search(&self, queries: &[SparseVector], k: usize) -> Vec<Vec<(usize, f32)>> {
        queries
            .iter()
            .map(|query| {
                let query_norm = query.norm();
                let scores = self
                    .vectors
                    .iter()
                    .zip(&self.norms)
                    .enumerate()
                    .map(|(row, (vector, norm))| {
                        let denominator = query_norm * norm;
                        let cosine = if denominator > 0.0 {
                            query.dot(vector) / denominator
                        } else {
                            0.0
                        };
                        let distance = 1.0 - cosine;
                        (row, (1.0 - distance) as f32)
                    })
                    .collect();
                top_k(scores, k)
            })
            .collect()
    }
}

pub fn inner_product(left: &[f32], right: &[f32]) -> f32 {
    left.iter().zip(right).map(|(a, b)| a * b).sum()
}

/// Sorts by score descending, lower row first on ties, and keeps `k`.
pub fn top_k(mut scores: Vec<(usize, f32)>, k: usize) -> Vec<(usize, f32)> {
    scores.sort_by(|(left_row, left), (right_row, right)| {
        right.total_cmp(left).then_with(|| left_row.cmp(right_row))
    });
    scores.truncate(k);
    scores
}

/// Drops the query's own row and keeps the first `k` remaining hits.
pub fn exclude_self(hits: Vec<(usize, f32)>, own_row: usize, k: usize) -> Vec<(usize, f32)> {
    hits.into_iter()
        .filter(|(row, _)| *row != own_row)
        .take(k)
        .collect()
}
