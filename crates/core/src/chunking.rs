use crate::markdown::{parse_headings, split_paragraphs, strip_front_matter, toc_entries};
use crate::models::{Chunk, Document, Heading, IndexOptions, TocEntry};

const PARAGRAPH_SEPARATOR: &str = "\n\n";
const SEPARATOR_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Soft upper bound on accumulated characters.
    pub chunk_size: usize,
    /// Trailing characters of a flushed chunk carried into the next one.
    pub overlap: usize,
}

impl From<&IndexOptions> for ChunkingConfig {
    fn from(value: &IndexOptions) -> Self {
        Self {
            chunk_size: value.chunk_size,
            overlap: value.chunk_overlap,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self::from(&IndexOptions::default())
    }
}

/// A paragraph placed in its document: where it starts and which heading it sits under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub text: String,
    pub position: usize,
    pub heading: String,
}

/// Rolling accumulator threaded through [`step`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkState {
    pub text: String,
    pub heading: String,
    pub start: usize,
    /// Length of `text` in characters.
    pub len: usize,
}

/// A finished accumulation, not yet bound to a document id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftChunk {
    pub heading: String,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl ChunkState {
    fn open(frame: &Frame, floor: usize) -> Self {
        Self {
            text: frame.text.clone(),
            heading: frame.heading.clone(),
            start: frame.position.max(floor),
            len: frame.text.chars().count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Emits the accumulation; whitespace-only text yields nothing.
    pub fn flush(&self) -> Option<DraftChunk> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(DraftChunk {
            heading: self.heading.clone(),
            start: self.start,
            end: self.start + self.len,
            text: trimmed.to_string(),
        })
    }

    fn tail(&self, overlap: usize) -> &str {
        let skip = self.len.saturating_sub(overlap);
        let byte_index = self
            .text
            .char_indices()
            .nth(skip)
            .map_or(self.text.len(), |(index, _)| index);
        &self.text[byte_index..]
    }
}

/// Feeds one paragraph into the accumulator, returning the next state and
/// the chunk flushed by this paragraph, if any.
pub fn step(
    state: ChunkState,
    frame: &Frame,
    config: ChunkingConfig,
) -> (ChunkState, Option<DraftChunk>) {
    if frame.text.is_empty() {
        return (state, None);
    }
    if state.is_empty() {
        return (ChunkState::open(frame, 0), None);
    }

    let frame_len = frame.text.chars().count();
    if state.len + SEPARATOR_CHARS + frame_len <= config.chunk_size {
        let mut state = state;
        state.text.push_str(PARAGRAPH_SEPARATOR);
        state.text.push_str(&frame.text);
        state.len += SEPARATOR_CHARS + frame_len;
        return (state, None);
    }

    let flushed = state.flush();
    let next = if config.overlap > 0 && state.len > config.overlap {
        let tail = state.tail(config.overlap);
        let tail_len = tail.chars().count();
        let start = frame
            .position
            .saturating_sub(tail_len + SEPARATOR_CHARS)
            .max(state.start);
        ChunkState {
            text: format!("{tail}{PARAGRAPH_SEPARATOR}{}", frame.text),
            heading: frame.heading.clone(),
            start,
            len: tail_len + SEPARATOR_CHARS + frame_len,
        }
    } else {
        ChunkState::open(frame, state.start)
    };

    (next, flushed)
}

/// Rolls every frame through [`step`] and flushes the remainder.
pub fn roll_chunks(frames: &[Frame], config: ChunkingConfig) -> Vec<DraftChunk> {
    let mut drafts = Vec::new();
    let mut state = ChunkState::default();

    for frame in frames {
        let (next, flushed) = step(state, frame, config);
        drafts.extend(flushed);
        state = next;
    }
    drafts.extend(state.flush());

    drafts
}

/// Character offset of each paragraph, searched forward from the previous one.
/// A paragraph that is not found verbatim reuses the search cursor.
pub fn locate_paragraphs(text: &str, paragraphs: &[String]) -> Vec<usize> {
    let mut positions = Vec::with_capacity(paragraphs.len());
    let mut byte_cursor = 0usize;
    let mut char_cursor = 0usize;

    for paragraph in paragraphs {
        match text[byte_cursor..].find(paragraph.as_str()) {
            Some(relative) => {
                let found = byte_cursor + relative;
                let position = char_cursor + text[byte_cursor..found].chars().count();
                positions.push(position);
                byte_cursor = found + paragraph.len();
                char_cursor = position + paragraph.chars().count();
            }
            None => {
                positions.push(char_cursor);
                // offsets after this point may drift from the true text
                let advance = text[byte_cursor..]
                    .char_indices()
                    .nth(paragraph.chars().count())
                    .map_or(text.len() - byte_cursor, |(index, _)| index);
                char_cursor += text[byte_cursor..byte_cursor + advance].chars().count();
                byte_cursor += advance;
            }
        }
    }

    positions
}

/// Title of the last heading at or before `position`, or empty.
pub fn context_heading(headings: &[Heading], position: usize) -> &str {
    headings
        .iter()
        .take_while(|heading| heading.position <= position)
        .last()
        .map_or("", |heading| heading.title.as_str())
}

pub fn frame_paragraphs(text: &str, paragraphs: Vec<String>, headings: &[Heading]) -> Vec<Frame> {
    let positions = locate_paragraphs(text, &paragraphs);
    paragraphs
        .into_iter()
        .zip(positions)
        .map(|(paragraph, position)| Frame {
            heading: context_heading(headings, position).to_string(),
            text: paragraph,
            position,
        })
        .collect()
}

pub fn make_chunk_id(path: &str, index: usize) -> String {
    format!("{path}:chunk-{index:04}")
}

#[derive(Debug, Clone, Default)]
pub struct DocumentChunks {
    pub chunks: Vec<Chunk>,
    pub toc: Vec<TocEntry>,
}

/// Chunks one document and collects its table of contents.
pub fn chunk_document(document: &Document, config: ChunkingConfig) -> DocumentChunks {
    let normalized = strip_front_matter(&document.text);
    let path = document.display_path();
    let title = document.title();

    let headings = parse_headings(normalized);
    let toc = toc_entries(&path, &headings);
    let frames = frame_paragraphs(normalized, split_paragraphs(normalized), &headings);

    let chunks = roll_chunks(&frames, config)
        .into_iter()
        .enumerate()
        .map(|(index, draft)| Chunk {
            id: make_chunk_id(&path, index),
            path: path.clone(),
            title: title.clone(),
            heading: draft.heading,
            start: draft.start,
            end: draft.end,
            text: draft.text,
        })
        .collect();

    DocumentChunks { chunks, toc }
}
