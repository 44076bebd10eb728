//! Serializes the index artifacts and swaps them into the output directory.
//!
//! Artifacts are written into a staging directory beside `out_dir` and the
//! whole directory is replaced at the end, so a reader never sees a mix of
//! old and new files.

use crate::error::{IndexError, Result};
use crate::models::{Chunk, IndexManifest, KeywordEntry, NeighborEntry, TocEntry};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CHUNKS_FILE: &str = "chunks.jsonl";
pub const TOC_FILE: &str = "toc.json";
pub const KEYWORDS_FILE: &str = "keywords.jsonl";
pub const NEIGHBORS_FILE: &str = "neighbors.jsonl";
pub const MANIFEST_FILE: &str = "manifest.json";

pub struct IndexArtifacts<'a> {
    pub chunks: &'a [Chunk],
    pub toc: &'a [TocEntry],
    pub keywords: &'a [KeywordEntry],
    pub neighbors: &'a [NeighborEntry],
    pub manifest: &'a IndexManifest,
}

pub fn write_index(out_dir: &Path, artifacts: &IndexArtifacts<'_>) -> Result<()> {
    let parent = match out_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = out_dir
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| {
            IndexError::InvalidArgument(format!("output path has no name: {}", out_dir.display()))
        })?;

    fs::create_dir_all(&parent)
        .map_err(|error| IndexError::artifact(parent.display().to_string(), error))?;
    let staging = tempfile::Builder::new()
        .prefix(&format!(".{name}.staging-"))
        .tempdir_in(&parent)
        .map_err(|error| IndexError::artifact("staging directory", error))?;

    write_jsonl(&staging.path().join(CHUNKS_FILE), CHUNKS_FILE, artifacts.chunks)?;
    write_json(&staging.path().join(TOC_FILE), TOC_FILE, artifacts.toc)?;
    write_jsonl(&staging.path().join(KEYWORDS_FILE), KEYWORDS_FILE, artifacts.keywords)?;
    write_jsonl(&staging.path().join(NEIGHBORS_FILE), NEIGHBORS_FILE, artifacts.neighbors)?;
    write_json(&staging.path().join(MANIFEST_FILE), MANIFEST_FILE, artifacts.manifest)?;

    replace_dir(staging.path(), out_dir, &parent.join(format!(".{name}.previous")))?;
    debug!(out_dir = %out_dir.display(), "index artifacts replaced");
    // `staging` no longer exists on disk; dropping it is a no-op.
    Ok(())
}

fn replace_dir(staging: &Path, out_dir: &Path, backup: &Path) -> Result<()> {
    let artifact = out_dir.display().to_string();
    if backup.exists() {
        fs::remove_dir_all(backup).map_err(|error| IndexError::artifact(&artifact, error))?;
    }
    let had_previous = out_dir.exists();
    if had_previous {
        fs::rename(out_dir, backup).map_err(|error| IndexError::artifact(&artifact, error))?;
    }
    if let Err(error) = fs::rename(staging, out_dir) {
        if had_previous {
            if let Err(restore_error) = fs::rename(backup, out_dir) {
                warn!(
                    error = %restore_error,
                    backup = %backup.display(),
                    "previous index left in backup directory"
                );
            }
        }
        return Err(IndexError::artifact(artifact, error));
    }
    if had_previous {
        fs::remove_dir_all(backup).map_err(|error| IndexError::artifact(&artifact, error))?;
    }
    Ok(())
}

fn write_jsonl<T: Serialize>(path: &Path, artifact: &str, rows: &[T]) -> Result<()> {
    let file = File::create(path).map_err(|error| IndexError::artifact(artifact, error))?;
    write_rows(BufWriter::new(file), artifact, rows)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, artifact: &str, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|error| IndexError::artifact(artifact, error))?;
    write_value(BufWriter::new(file), artifact, value)
}

fn write_rows<W: Write, T: Serialize>(mut writer: W, artifact: &str, rows: &[T]) -> Result<()> {
    for row in rows {
        serde_json::to_writer(&mut writer, row).map_err(|error| artifact_error(artifact, error))?;
        writer
            .write_all(b"\n")
            .map_err(|error| IndexError::artifact(artifact, error))?;
    }
    writer.flush().map_err(|error| IndexError::artifact(artifact, error))
}

fn write_value<W: Write, T: Serialize + ?Sized>(
    mut writer: W,
    artifact: &str,
    value: &T,
) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|error| artifact_error(artifact, error))?;
    writer
        .write_all(b"\n")
        .map_err(|error| IndexError::artifact(artifact, error))?;
    writer.flush().map_err(|error| IndexError::artifact(artifact, error))
}

/// I/O failures raised while serializing still carry the artifact name.
fn artifact_error(artifact: &str, error: serde_json::Error) -> IndexError {
    IndexError::artifact(artifact, std::io::Error::from(error))
}
