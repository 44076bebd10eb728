use rag_index_core::writer::{CHUNKS_FILE, KEYWORDS_FILE, MANIFEST_FILE, NEIGHBORS_FILE, TOC_FILE};
use rag_index_core::{
    build_index, build_index_with, Chunk, EmbeddingBackend, IndexManifest, IndexOptions,
    KeywordEntry, NeighborEntry, SimilarityStrategy, SparseLexicalProvider, TocEntry,
};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    let mut rows = Vec::new();
    for line in text.lines() {
        rows.push(serde_json::from_str(line)?);
    }
    Ok(rows)
}

fn options(input: &Path, out: &Path) -> IndexOptions {
    IndexOptions {
        input_dir: input.to_path_buf(),
        out_dir: out.to_path_buf(),
        ..IndexOptions::default()
    }
}

fn write_book(root: &Path) -> std::io::Result<()> {
    let chapters = root.join("chapters");
    fs::create_dir_all(&chapters)?;
    for (name, topic) in [
        ("ownership", "ownership borrowing moves"),
        ("async", "futures executors wakers"),
        ("cargo", "crates workspaces features"),
    ] {
        let body = (0..8)
            .map(|index| {
                format!("Paragraph {index} discusses {topic} in some depth for the reader.")
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        fs::write(
            chapters.join(format!("{name}.md")),
            format!(
                "---\ntitle: {name}\n---\n# {name}\n\n{body}\n\n## Summary\n\nWrap up of {topic}.\n"
            ),
        )?;
    }
    Ok(())
}

#[test]
fn single_short_document_becomes_one_chunk() -> TestResult {
    let input = tempdir()?;
    let out = tempdir()?;
    let intro = (0..5)
        .map(|index| format!("Intro paragraph {index}."))
        .collect::<Vec<_>>()
        .join("\n\n");
    let details = (0..5)
        .map(|index| format!("Details paragraph {index}."))
        .collect::<Vec<_>>()
        .join("\n\n");
    fs::write(
        input.path().join("guide.md"),
        format!("# Intro\n\n{intro}\n\n## Details\n\n{details}\n"),
    )?;

    let out_dir = out.path().join(".rag");
    let mut options = options(input.path(), &out_dir);
    options.chunk_overlap = 0;
    let summary = build_index(&options)?;
    assert_eq!(summary.chunks, 1);
    assert_eq!(summary.similarity, SimilarityStrategy::Sparse);

    let chunks: Vec<Chunk> = read_rows(&out_dir.join(CHUNKS_FILE))?;
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].heading, "Intro");
    assert_eq!(chunks[0].title, "guide");
    assert!(chunks[0].id.ends_with("guide.md:chunk-0000"));

    let toc: Vec<TocEntry> = serde_json::from_str(&fs::read_to_string(out_dir.join(TOC_FILE))?)?;
    assert_eq!(toc.len(), 2);
    assert_eq!((toc[0].level, toc[0].anchor.as_str()), (1, "intro"));
    assert_eq!((toc[1].level, toc[1].anchor.as_str()), (2, "details"));

    let keywords: Vec<KeywordEntry> = read_rows(&out_dir.join(KEYWORDS_FILE))?;
    assert_eq!(keywords.len(), 1);

    let neighbors: Vec<NeighborEntry> = read_rows(&out_dir.join(NEIGHBORS_FILE))?;
    assert_eq!(neighbors.len(), 1);
    assert!(neighbors[0].neighbors.is_empty());
    Ok(())
}

#[test]
fn empty_input_writes_empty_artifacts() -> TestResult {
    let input = tempdir()?;
    let out = tempdir()?;
    let out_dir = out.path().join(".rag");

    let summary = build_index(&options(input.path(), &out_dir))?;
    assert!(summary.is_empty());

    for artifact in [CHUNKS_FILE, KEYWORDS_FILE, NEIGHBORS_FILE] {
        assert_eq!(fs::read_to_string(out_dir.join(artifact))?, "");
    }
    let toc: Vec<TocEntry> = serde_json::from_str(&fs::read_to_string(out_dir.join(TOC_FILE))?)?;
    assert!(toc.is_empty());

    let manifest: IndexManifest =
        serde_json::from_str(&fs::read_to_string(out_dir.join(MANIFEST_FILE))?)?;
    assert_eq!(manifest.chunks, 0);
    Ok(())
}

#[cfg(unix)]
#[test]
fn unreadable_only_input_is_not_reported_as_empty() -> TestResult {
    let input = tempdir()?;
    let out = tempdir()?;
    let out_dir = out.path().join(".rag");
    std::os::unix::fs::symlink(input.path().join("missing.md"), input.path().join("chapter.md"))?;

    let summary = build_index(&options(input.path(), &out_dir))?;
    assert!(!summary.is_empty());
    assert_eq!(summary.discovered, 1);
    assert_eq!(summary.documents, 0);
    assert_eq!(summary.skipped_files.len(), 1);

    let manifest: IndexManifest =
        serde_json::from_str(&fs::read_to_string(out_dir.join(MANIFEST_FILE))?)?;
    assert_eq!(manifest.skipped_files.len(), 1);
    assert!(manifest.skipped_files[0].ends_with("chapter.md"));
    Ok(())
}

#[test]
fn rows_line_up_with_chunks() -> TestResult {
    let input = tempdir()?;
    let out = tempdir()?;
    write_book(input.path())?;
    let out_dir = out.path().join("index");

    let mut options = options(input.path(), &out_dir);
    options.chunk_size = 200;
    options.chunk_overlap = 30;
    options.knn = 3;
    build_index(&options)?;

    let chunks: Vec<Chunk> = read_rows(&out_dir.join(CHUNKS_FILE))?;
    let keywords: Vec<KeywordEntry> = read_rows(&out_dir.join(KEYWORDS_FILE))?;
    let neighbors: Vec<NeighborEntry> = read_rows(&out_dir.join(NEIGHBORS_FILE))?;

    assert!(chunks.len() > 4);
    assert_eq!(keywords.len(), chunks.len());
    assert_eq!(neighbors.len(), chunks.len());
    for ((chunk, keyword), neighbor) in chunks.iter().zip(&keywords).zip(&neighbors) {
        assert_eq!(chunk.id, keyword.id);
        assert_eq!(chunk.id, neighbor.id);
        assert_eq!(neighbor.neighbors.len(), 3);
        assert!(neighbor.neighbors.iter().all(|(id, _)| id != &chunk.id));
        assert!(!chunk.text.contains("title:"));
    }

    let paths = chunks.iter().map(|chunk| chunk.path.clone()).collect::<Vec<_>>();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);
    Ok(())
}

#[test]
fn sparse_runs_are_byte_identical() -> TestResult {
    let input = tempdir()?;
    let out = tempdir()?;
    write_book(input.path())?;

    let first = out.path().join("first");
    let second = out.path().join("second");
    let mut first_options = options(input.path(), &first);
    first_options.chunk_size = 150;
    let mut second_options = first_options.clone();
    second_options.out_dir = second.clone();

    build_index_with(&first_options, &SparseLexicalProvider)?;
    build_index_with(&second_options, &SparseLexicalProvider)?;

    for artifact in [CHUNKS_FILE, TOC_FILE, KEYWORDS_FILE, NEIGHBORS_FILE] {
        assert_eq!(
            fs::read(first.join(artifact))?,
            fs::read(second.join(artifact))?,
            "{artifact} differs between runs"
        );
    }
    Ok(())
}

#[test]
fn dense_backend_is_reported_in_manifest() -> TestResult {
    let input = tempdir()?;
    let out = tempdir()?;
    write_book(input.path())?;
    let out_dir = out.path().join("dense");

    let mut options = options(input.path(), &out_dir);
    options.embedding = EmbeddingBackend::Ngram { dimensions: 64 };
    let summary = build_index(&options)?;
    assert_eq!(summary.similarity, SimilarityStrategy::Dense);

    let manifest: IndexManifest =
        serde_json::from_str(&fs::read_to_string(out_dir.join(MANIFEST_FILE))?)?;
    assert_eq!(manifest.similarity, SimilarityStrategy::Dense);
    assert_eq!(manifest.documents, 3);
    Ok(())
}
