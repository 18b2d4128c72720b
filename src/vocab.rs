//! Word-level vocabularies for the source and target languages.
//!
//! Ids 0..4 are reserved: `<pad>`, `<start>`, `<end>`, `<unk>`. The rest
//! are assigned by descending corpus frequency.

use std::collections::HashMap;

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{NmtError, Result};

pub const PAD: &str = "<pad>";
pub const START: &str = "<start>";
pub const END: &str = "<end>";
pub const UNK: &str = "<unk>";

const RESERVED: [&str; 4] = [PAD, START, END, UNK];

/// Bidirectional word ↔ id mapping for one language.
///
/// Serialized as the plain id-ordered word list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocab {
    word2id: HashMap<String, usize>,
    id2word: Vec<String>,
}

impl Vocab {
    /// A vocabulary holding only the reserved tokens.
    pub fn new() -> Self {
        Self::from(Vec::new())
    }

    /// Build from tokenized sentences, keeping at most `size` regular words
    /// that occur at least `freq_cutoff` times.
    pub fn from_corpus<S: AsRef<str>>(
        corpus: &[Vec<S>],
        size: usize,
        freq_cutoff: usize,
    ) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for sentence in corpus {
            for word in sentence {
                *counts.entry(word.as_ref()).or_insert(0) += 1;
            }
        }

        let mut words: Vec<(&str, usize)> = counts
            .into_iter()
            .filter(|(w, c)| *c >= freq_cutoff && !RESERVED.contains(w))
            .collect();
        // Frequency first, then alphabetical so rebuilds are reproducible.
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        words.truncate(size);

        let mut vocab = Self::new();
        for (word, _) in words {
            vocab.add(word);
        }
        vocab
    }

    /// Insert a word if absent and return its id.
    pub fn add(&mut self, word: &str) -> usize {
        if let Some(&id) = self.word2id.get(word) {
            return id;
        }
        let id = self.id2word.len();
        self.word2id.insert(word.to_string(), id);
        self.id2word.push(word.to_string());
        id
    }

    pub fn len(&self) -> usize {
        self.id2word.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id2word.is_empty()
    }

    pub fn pad_id(&self) -> usize {
        0
    }

    pub fn start_id(&self) -> usize {
        1
    }

    pub fn end_id(&self) -> usize {
        2
    }

    pub fn unk_id(&self) -> usize {
        3
    }

    /// Id of `word`, falling back to `<unk>`.
    pub fn id(&self, word: &str) -> usize {
        self.word2id.get(word).copied().unwrap_or(self.unk_id())
    }

    pub fn contains(&self, word: &str) -> bool {
        self.word2id.contains_key(word)
    }

    pub fn word(&self, id: usize) -> Option<&str> {
        self.id2word.get(id).map(String::as_str)
    }

    pub fn encode<S: AsRef<str>>(&self, words: &[S]) -> Vec<usize> {
        words.iter().map(|w| self.id(w.as_ref())).collect()
    }

    /// Map ids back to words, dropping pad/start/end.
    pub fn decode(&self, ids: &[usize]) -> Vec<String> {
        ids.iter()
            .filter(|&&id| id != self.pad_id() && id != self.start_id() && id != self.end_id())
            .filter_map(|&id| self.word(id).map(str::to_string))
            .collect()
    }

    /// Right-pad a batch of sentences with `<pad>`.
    ///
    /// Rejects an empty batch and empty sentences: a zero-length source
    /// leaves nothing to attend to.
    pub fn pad_batch<S: AsRef<str>>(&self, sentences: &[Vec<S>]) -> Result<PaddedBatch> {
        let encoded: Vec<Vec<usize>> = sentences.iter().map(|s| self.encode(s)).collect();
        PaddedBatch::from_ids(&encoded, self.pad_id())
    }

    /// Like [`Vocab::pad_batch`], wrapping every sentence in `<start>` … `<end>`.
    pub fn pad_targets<S: AsRef<str>>(&self, sentences: &[Vec<S>]) -> Result<PaddedBatch> {
        let encoded: Vec<Vec<usize>> = sentences
            .iter()
            .map(|s| {
                let mut ids = Vec::with_capacity(s.len() + 2);
                ids.push(self.start_id());
                ids.extend(self.encode(s));
                ids.push(self.end_id());
                ids
            })
            .collect();
        PaddedBatch::from_ids(&encoded, self.pad_id())
    }
}

impl Default for Vocab {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<String>> for Vocab {
    fn from(words: Vec<String>) -> Self {
        let mut vocab = Self {
            word2id: HashMap::new(),
            id2word: Vec::new(),
        };
        for reserved in RESERVED {
            vocab.add(reserved);
        }
        for word in &words {
            vocab.add(word);
        }
        vocab
    }
}

impl From<Vocab> for Vec<String> {
    fn from(vocab: Vocab) -> Self {
        vocab.id2word
    }
}

/// Source and target vocabularies of one translation direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabPair {
    pub src: Vocab,
    pub tar: Vocab,
}

impl VocabPair {
    pub fn new(src: Vocab, tar: Vocab) -> Self {
        Self { src, tar }
    }

    /// Build both sides from a parallel corpus.
    pub fn from_corpus<S: AsRef<str>>(
        src: &[Vec<S>],
        tar: &[Vec<S>],
        size: usize,
        freq_cutoff: usize,
    ) -> Self {
        Self {
            src: Vocab::from_corpus(src, size, freq_cutoff),
            tar: Vocab::from_corpus(tar, size, freq_cutoff),
        }
    }
}

/// Right-padded id matrix with the true length of every row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddedBatch {
    /// Row-major `[batch, max_len]` ids.
    pub ids: Vec<i64>,
    pub lengths: Vec<usize>,
    pub max_len: usize,
}

impl PaddedBatch {
    pub fn from_ids(sequences: &[Vec<usize>], pad_id: usize) -> Result<Self> {
        if sequences.is_empty() {
            return Err(NmtError::EmptyBatch);
        }
        if let Some(index) = sequences.iter().position(Vec::is_empty) {
            return Err(NmtError::EmptySequence { index });
        }

        let max_len = sequences.iter().map(Vec::len).max().unwrap_or(0);
        let mut ids = vec![pad_id as i64; sequences.len() * max_len];
        for (row, seq) in sequences.iter().enumerate() {
            for (col, &id) in seq.iter().enumerate() {
                ids[row * max_len + col] = id as i64;
            }
        }

        Ok(Self {
            ids,
            lengths: sequences.iter().map(Vec::len).collect(),
            max_len,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.lengths.len()
    }

    /// Reject any id, padding included, that an embedding of `vocab` rows
    /// cannot look up.
    pub fn check_ids(&self, vocab: usize) -> Result<()> {
        match self
            .ids
            .iter()
            .position(|&id| id < 0 || id as usize >= vocab)
        {
            Some(pos) => Err(NmtError::TokenOutOfRange {
                index: pos / self.max_len.max(1),
                id: self.ids[pos],
                vocab,
            }),
            None => Ok(()),
        }
    }

    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2, Int> {
        Tensor::from_data(
            TensorData::new(self.ids.clone(), [self.batch_size(), self.max_len]),
            device,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn reserved_ids_are_fixed() {
        let vocab = Vocab::new();
        assert_eq!(vocab.len(), 4);
        assert_eq!(vocab.id(PAD), vocab.pad_id());
        assert_eq!(vocab.id(START), vocab.start_id());
        assert_eq!(vocab.id(END), vocab.end_id());
        assert_eq!(vocab.id(UNK), vocab.unk_id());
    }

    #[test]
    fn corpus_sorted_by_frequency_then_word() {
        let corpus = vec![words("b a a c"), words("c a b")];
        let vocab = Vocab::from_corpus(&corpus, 10, 1);
        assert_eq!(vocab.word(4), Some("a"));
        assert_eq!(vocab.word(5), Some("b"));
        assert_eq!(vocab.word(6), Some("c"));
    }

    #[test]
    fn size_and_cutoff_respected() {
        let corpus = vec![words("a a a b b c")];
        let vocab = Vocab::from_corpus(&corpus, 1, 2);
        assert_eq!(vocab.len(), 5);
        assert!(vocab.contains("a"));
        assert!(!vocab.contains("b"));
        assert_eq!(vocab.id("c"), vocab.unk_id());
    }

    #[test]
    fn decode_drops_markers() {
        let vocab = Vocab::from(vec!["hello".to_string()]);
        let ids = vec![vocab.start_id(), 4, vocab.end_id(), vocab.pad_id()];
        assert_eq!(vocab.decode(&ids), vec!["hello".to_string()]);
    }

    #[test]
    fn pad_batch_tracks_lengths() {
        let vocab = Vocab::from(vec!["a".to_string(), "b".to_string()]);
        let batch = vocab
            .pad_batch(&[words("a"), words("a b b")])
            .unwrap();
        assert_eq!(batch.lengths, vec![1, 3]);
        assert_eq!(batch.max_len, 3);
        assert_eq!(batch.ids, vec![4, 0, 0, 4, 5, 5]);
    }

    #[test]
    fn pad_targets_adds_markers() {
        let vocab = Vocab::from(vec!["x".to_string()]);
        let batch = vocab.pad_targets(&[words("x")]).unwrap();
        assert_eq!(batch.ids, vec![1, 4, 2]);
        assert_eq!(batch.lengths, vec![3]);
    }

    #[test]
    fn empty_inputs_rejected() {
        let vocab = Vocab::new();
        let empty: Vec<Vec<String>> = Vec::new();
        assert!(matches!(vocab.pad_batch(&empty), Err(NmtError::EmptyBatch)));
        assert!(matches!(
            vocab.pad_batch(&[words("a"), Vec::new()]),
            Err(NmtError::EmptySequence { index: 1 })
        ));
    }

    #[test]
    fn serde_keeps_id_order() {
        let vocab = Vocab::from_corpus(&[words("z y y")], 10, 1);
        let list: Vec<String> = vocab.clone().into();
        let rebuilt = Vocab::from(list);
        assert_eq!(rebuilt.id("y"), vocab.id("y"));
        assert_eq!(rebuilt.id("z"), vocab.id("z"));
        assert_eq!(rebuilt.len(), vocab.len());
    }
}
