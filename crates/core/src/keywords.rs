use crate::models::{Chunk, KeywordEntry};
use crate::tfidf::TfidfVectorizer;

/// One entry per chunk, in chunk order; chunks without usable terms get an empty list.
pub fn build_keywords(
    chunks: &[Chunk],
    topk: usize,
    max_features: Option<usize>,
) -> Vec<KeywordEntry> {
    if chunks.is_empty() {
        return Vec::new();
    }

    let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
    let matrix = TfidfVectorizer::with_max_features(max_features).fit_transform(&texts);

    chunks
        .iter()
        .enumerate()
        .map(|(row, chunk)| KeywordEntry {
            id: chunk.id.clone(),
            keywords: matrix.top_terms(row, topk),
        })
        .collect()
}
