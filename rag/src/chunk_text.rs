use std::collections::VecDeque;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// Separators tried in order; the empty one is a hard per-character cut.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SplitMode {
    /// Size-bounded chunks with overlap, broken at the most natural boundary.
    #[default]
    Length,
    /// One chunk per delimiter-separated block.
    Delimiter,
}

impl FromStr for SplitMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "length" | "recursive" => Ok(Self::Length),
            "delimiter" | "paragraph" => Ok(Self::Delimiter),
            other => Err(Error::Config(format!("unknown split mode '{}'", other))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChunkingConfig {
    pub mode: SplitMode,
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Characters carried over from the end of one chunk into the next
    pub chunk_overlap: usize,
    pub delimiter: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            mode: SplitMode::Length,
            chunk_size: 1000,
            chunk_overlap: 200,
            delimiter: "\n\n".to_string(),
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        match self.mode {
            SplitMode::Length => {
                if self.chunk_size == 0 {
                    return Err(Error::InvalidInput("chunk size must be at least 1".to_string()));
                }
                if self.chunk_overlap >= self.chunk_size {
                    return Err(Error::InvalidInput(format!(
                        "chunk overlap ({}) must be smaller than chunk size ({})",
                        self.chunk_overlap, self.chunk_size
                    )));
                }
            }
            SplitMode::Delimiter => {
                if self.delimiter.is_empty() {
                    return Err(Error::InvalidInput("split delimiter must not be empty".to_string()));
                }
            }
        }
        Ok(())
    }
}

/// Provenance stored next to every chunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Logical document name, the game the rules belong to
    pub name: String,
    pub chunk_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Splits `text` into ordered chunks tagged with `name`.
pub fn chunk_text(text: &str, name: &str, cfg: &ChunkingConfig) -> Result<Vec<Chunk>> {
    cfg.validate()?;
    let pieces = match cfg.mode {
        SplitMode::Length => split_by_length(text, cfg.chunk_size, cfg.chunk_overlap),
        SplitMode::Delimiter => split_by_delimiter(text, &cfg.delimiter),
    };

    let chunks = pieces
        .into_iter()
        .enumerate()
        .map(|(chunk_index, text)| Chunk {
            text,
            metadata: ChunkMetadata {
                name: name.to_string(),
                chunk_index,
                id: match cfg.mode {
                    SplitMode::Delimiter => Some(format!("{}-{}", name, chunk_index)),
                    SplitMode::Length => None,
                },
            },
        })
        .collect();
    Ok(chunks)
}

pub fn split_by_delimiter(text: &str, delimiter: &str) -> Vec<String> {
    let normalized = if delimiter.contains('\r') {
        text.to_string()
    } else {
        text.replace("\r\n", "\n")
    };
    normalized
        .split(delimiter)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn split_by_length(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    split_recursive(text, &SEPARATORS, chunk_size, chunk_overlap)
}

fn split_recursive(text: &str, separators: &[&str], size: usize, overlap: usize) -> Vec<String> {
    let (separator, finer) = pick_separator(text, separators);
    let splits: Vec<&str> = if separator.is_empty() {
        text.char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect()
    } else {
        text.split(separator).collect()
    };

    let mut chunks = Vec::new();
    let mut small: Vec<&str> = Vec::new();
    for piece in splits {
        if char_len(piece) < size {
            small.push(piece);
            continue;
        }
        if !small.is_empty() {
            chunks.extend(merge_splits(&small, separator, size, overlap));
            small.clear();
        }
        if finer.is_empty() {
            // size is 1 and we are already cutting per character
            chunks.push(piece.to_string());
        } else {
            chunks.extend(split_recursive(piece, finer, size, overlap));
        }
    }
    if !small.is_empty() {
        chunks.extend(merge_splits(&small, separator, size, overlap));
    }
    chunks
}

fn pick_separator<'a, 's>(text: &str, separators: &'a [&'s str]) -> (&'s str, &'a [&'s str]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(sep) {
            return (*sep, &separators[i + 1..]);
        }
    }
    ("", &[])
}

fn merge_splits(splits: &[&str], separator: &str, size: usize, overlap: usize) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut docs = Vec::new();
    let mut current: VecDeque<&str> = VecDeque::new();
    let mut total = 0usize;

    for &piece in splits {
        let len = char_len(piece);
        let joiner = if current.is_empty() { 0 } else { sep_len };
        if total + len + joiner > size {
            if total > size {
                warn!("Created a chunk of {} characters, longer than the limit of {}", total, size);
            }
            if !current.is_empty() {
                if let Some(doc) = join_docs(&current, separator) {
                    docs.push(doc);
                }
                // shed from the front until only the overlap is left
                loop {
                    let joiner = if current.is_empty() { 0 } else { sep_len };
                    if total <= overlap && (total == 0 || total + len + joiner <= size) {
                        break;
                    }
                    let Some(first) = current.pop_front() else { break };
                    let joined = if current.is_empty() { 0 } else { sep_len };
                    total = total.saturating_sub(char_len(first) + joined);
                }
            }
        }
        current.push_back(piece);
        let joiner = if current.len() > 1 { sep_len } else { 0 };
        total += len + joiner;
    }

    if let Some(doc) = join_docs(&current, separator) {
        docs.push(doc);
    }
    docs
}

fn join_docs(parts: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = parts.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
