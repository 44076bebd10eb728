use crate::chunking::{chunk_document, ChunkingConfig};
use crate::error::IndexError;
use crate::models::{Chunk, Document, TocEntry};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

/// Markdown files under `folder`, recursively, in lexicographic path order.
/// Symlinks count unless they point at a directory; dangling ones surface
/// later as unreadable documents.
pub fn discover_markdown_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        let is_file_like = entry.file_type().is_file()
            || (entry.path_is_symlink() && !entry.path().is_dir());
        if !is_file_like {
            continue;
        }

        let is_markdown = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                MARKDOWN_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });

        if is_markdown {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Reads a file as UTF-8, dropping undecodable bytes and folding `\r\n` / `\r` to `\n`.
pub fn read_document(path: &Path) -> Result<Document, IndexError> {
    let bytes = fs::read(path)?;
    Ok(Document {
        path: path.to_path_buf(),
        text: decode_text(&bytes),
    })
}

pub fn decode_text(bytes: &[u8]) -> String {
    let mut decoded = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        decoded.push_str(chunk.valid());
    }
    decoded.replace("\r\n", "\n").replace('\r', "\n")
}

pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Default)]
pub struct IngestionReport {
    /// Markdown files found, whether or not they could be read.
    pub discovered: usize,
    pub documents: usize,
    pub chunks: Vec<Chunk>,
    pub toc: Vec<TocEntry>,
    pub skipped_files: Vec<SkippedDocument>,
    /// SHA-256 over every ingested path and its decoded text.
    pub corpus_digest: String,
}

/// Chunks every Markdown file under `folder`. Unreadable files are skipped
/// and reported; an empty folder is a valid, empty corpus.
pub fn ingest_folder(folder: &Path, config: ChunkingConfig) -> IngestionReport {
    let files = discover_markdown_files(folder);
    let mut report = IngestionReport {
        discovered: files.len(),
        ..IngestionReport::default()
    };
    let mut hasher = Sha256::new();

    for path in files {
        let document = match read_document(&path) {
            Ok(document) => document,
            Err(error) => {
                warn!(path = %path.display(), %error, "skipped unreadable document");
                report.skipped_files.push(SkippedDocument {
                    path,
                    reason: error.to_string(),
                });
                continue;
            }
        };

        hasher.update(document.display_path().as_bytes());
        hasher.update([0u8]);
        hasher.update(document.text.as_bytes());
        hasher.update([0u8]);

        let chunked = chunk_document(&document, config);
        debug!(
            path = %path.display(),
            chunks = chunked.chunks.len(),
            headings = chunked.toc.len(),
            "document chunked"
        );
        report.documents += 1;
        report.chunks.extend(chunked.chunks);
        report.toc.extend(chunked.toc);
    }

    report.corpus_digest = format!("{:x}", hasher.finalize());
    report
}
