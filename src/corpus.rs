//! Plain-text corpus reading: one whitespace-tokenized sentence per line.

use std::fs;
use std::path::Path;

use crate::error::{NmtError, Result};
use crate::vocab::{END, START};

/// Which side of the translation pair a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    /// Target sentences are wrapped in `<start>` … `<end>`.
    Target,
}

/// Read a corpus file, skipping blank lines.
pub fn read_corpus(path: &Path, side: Side) -> Result<Vec<Vec<String>>> {
    let text = fs::read_to_string(path).map_err(|e| NmtError::io(path, e))?;
    Ok(parse_corpus(&text, side))
}

pub fn parse_corpus(text: &str, side: Side) -> Vec<Vec<String>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let words = line.split_whitespace().map(str::to_string);
            match side {
                Side::Source => words.collect(),
                Side::Target => std::iter::once(START.to_string())
                    .chain(words)
                    .chain(std::iter::once(END.to_string()))
                    .collect(),
            }
        })
        .collect()
}

/// Drop `<start>`/`<end>` markers added by [`Side::Target`].
pub fn strip_markers(sentence: &[String]) -> Vec<String> {
    sentence
        .iter()
        .filter(|w| w.as_str() != START && w.as_str() != END)
        .cloned()
        .collect()
}
