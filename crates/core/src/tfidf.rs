//! Term-frequency / inverse-document-frequency weighting over a chunk corpus.
//!
//! Tokens are runs of two or more word characters in accent-folded,
//! lower-cased text, English stop words are dropped, the idf is smoothed
//! (`ln((1 + n) / (1 + df)) + 1`) and every row is L2-normalised, so the
//! dot product of two rows is their cosine similarity.

use crate::stopwords::is_stop_word;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").unwrap());

/// Sparse row sorted by column index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    pub fn new(mut entries: Vec<(usize, f64)>) -> Self {
        entries.sort_by_key(|(index, _)| *index);
        Self { entries }
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn norm(&self) -> f64 {
        self.entries
            .iter()
            .map(|(_, value)| value * value)
            .sum::<f64>()
            .sqrt()
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut left, mut right) = (0, 0);
        let mut total = 0.0;
        while left < self.entries.len() && right < other.entries.len() {
            let (left_index, left_value) = self.entries[left];
            let (right_index, right_value) = other.entries[right];
            match left_index.cmp(&right_index) {
                Ordering::Less => left += 1,
                Ordering::Greater => right += 1,
                Ordering::Equal => {
                    total += left_value * right_value;
                    left += 1;
                    right += 1;
                }
            }
        }
        total
    }

    fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for (_, value) in &mut self.entries {
                *value /= norm;
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TfidfVectorizer {
    /// Keep only the most frequent terms corpus-wide.
    pub max_features: Option<usize>,
    pub stop_words: bool,
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self {
            max_features: None,
            stop_words: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TfidfMatrix {
    /// Alphabetically ordered; column `i` of every row is `vocabulary[i]`.
    pub vocabulary: Vec<String>,
    pub rows: Vec<SparseVector>,
}

impl TfidfVectorizer {
    pub fn with_max_features(max_features: Option<usize>) -> Self {
        Self {
            max_features,
            ..Self::default()
        }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let folded = fold_accents(text).to_lowercase();
        TOKEN_PATTERN
            .find_iter(&folded)
            .map(|token| token.as_str())
            .filter(|token| !(self.stop_words && is_stop_word(token)))
            .map(str::to_string)
            .collect()
    }

    pub fn fit_transform(&self, documents: &[&str]) -> TfidfMatrix {
        let counts: Vec<HashMap<String, usize>> = documents
            .iter()
            .map(|document| {
                let mut counts = HashMap::new();
                for token in self.tokenize(document) {
                    *counts.entry(token).or_insert(0) += 1;
                }
                counts
            })
            .collect();

        // term -> (corpus frequency, document frequency)
        let mut stats: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for document in &counts {
            for (term, count) in document {
                let entry = stats.entry(term.as_str()).or_insert((0, 0));
                entry.0 += count;
                entry.1 += 1;
            }
        }

        let mut vocabulary: Vec<&str> = stats.keys().copied().collect();
        if let Some(limit) = self.max_features {
            if vocabulary.len() > limit {
                vocabulary.sort_by(|left, right| {
                    stats[right].0.cmp(&stats[left].0).then_with(|| left.cmp(right))
                });
                vocabulary.truncate(limit);
                vocabulary.sort_unstable();
            }
        }

        let columns: HashMap<&str, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(index, term)| (*term, index))
            .collect();
        let total = documents.len() as f64;
        let idf: Vec<f64> = vocabulary
            .iter()
            .map(|term| ((1.0 + total) / (1.0 + stats[term].1 as f64)).ln() + 1.0)
            .collect();

        let rows = counts
            .iter()
            .map(|document| {
                let entries = document
                    .iter()
                    .filter_map(|(term, count)| {
                        columns
                            .get(term.as_str())
                            .map(|column| (*column, *count as f64 * idf[*column]))
                    })
                    .collect();
                let mut row = SparseVector::new(entries);
                row.normalize();
                row
            })
            .collect();

        TfidfMatrix {
            vocabulary: vocabulary.into_iter().map(str::to_string).collect(),
            rows,
        }
    }
}

/// Compatibility decomposition with combining marks removed, so `café` reads as `cafe`.
pub fn fold_accents(text: &str) -> String {
    text.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

impl TfidfMatrix {
    /// Highest-weighted terms of `row`; equal weights fall back to term order.
    pub fn top_terms(&self, row: usize, k: usize) -> Vec<String> {
        let Some(vector) = self.rows.get(row) else {
            return Vec::new();
        };
        let mut weighted = vector.entries().to_vec();
        weighted.sort_by(|(left_index, left), (right_index, right)| {
            right
                .total_cmp(left)
                .then_with(|| self.vocabulary[*left_index].cmp(&self.vocabulary[*right_index]))
        });
        weighted
            .into_iter()
            .take(k)
            .map(|(index, _)| self.vocabulary[index].clone())
            .collect()
    }
}
