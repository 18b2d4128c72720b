//! Word-level front end: owns a model with its vocabularies and config.

use std::path::Path;

use burn::prelude::*;

use crate::checkpoint::{load_checkpoint, save_checkpoint};
use crate::config::NmtConfig;
use crate::error::Result;
use crate::inference::beam::to_host;
use crate::inference::{beam_search, greedy_decode, BeamConfig};
use crate::model::NmtModel;
use crate::vocab::VocabPair;

/// A translated sentence with its total log-probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub words: Vec<String>,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct Translator<B: Backend> {
    model: NmtModel<B>,
    vocab: VocabPair,
    config: NmtConfig,
}

impl<B: Backend> Translator<B> {
    /// Build a freshly initialized translator.
    pub fn new(config: NmtConfig, vocab: VocabPair, device: &B::Device) -> Result<Self> {
        let model = config.init(&vocab, device)?;
        Ok(Self {
            model,
            vocab,
            config,
        })
    }

    pub fn from_parts(model: NmtModel<B>, vocab: VocabPair, config: NmtConfig) -> Self {
        Self {
            model,
            vocab,
            config,
        }
    }

    pub fn model(&self) -> &NmtModel<B> {
        &self.model
    }

    pub fn vocab(&self) -> &VocabPair {
        &self.vocab
    }

    pub fn config(&self) -> &NmtConfig {
        &self.config
    }

    pub fn into_parts(self) -> (NmtModel<B>, VocabPair, NmtConfig) {
        (self.model, self.vocab, self.config)
    }

    /// Log-likelihood of each target sentence given its source, `[batch]`.
    ///
    /// Sentences are plain tokens; targets are wrapped in `<start>`/`<end>`.
    pub fn forward<S: AsRef<str>>(&self, source: &[Vec<S>], target: &[Vec<S>]) -> Result<Tensor<B, 1>> {
        let src = self.vocab.src.pad_batch(source)?;
        let tgt = self.vocab.tar.pad_targets(target)?;
        self.model.forward(&src, &tgt)
    }

    /// Like [`Translator::forward`], read back to the host.
    pub fn score<S: AsRef<str>>(&self, source: &[Vec<S>], target: &[Vec<S>]) -> Result<Vec<f32>> {
        to_host(self.forward(source, target)?)
    }

    /// Up to `config.search_size` translations, best first.
    pub fn beam_search<S: AsRef<str>>(&self, source: &[S], config: &BeamConfig) -> Result<Vec<Translation>> {
        let ids = self.vocab.src.encode(source);
        let result = beam_search(&self.model, &ids, config)?;
        Ok(result
            .hypotheses
            .into_iter()
            .map(|hyp| Translation {
                words: self.vocab.tar.decode(&hyp.tokens),
                score: hyp.score,
            })
            .collect())
    }

    pub fn greedy<S: AsRef<str>>(&self, source: &[S], max_target_length: usize) -> Result<Vec<String>> {
        let ids = self.vocab.src.encode(source);
        let out = greedy_decode(&self.model, &ids, max_target_length)?;
        Ok(self.vocab.tar.decode(&out))
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        save_checkpoint(&self.model, &self.config, &self.vocab, dir)?;
        Ok(())
    }

    pub fn load(dir: &Path, device: &B::Device) -> Result<Self> {
        let (model, meta) = load_checkpoint(dir, device)?;
        Ok(Self {
            model,
            vocab: meta.vocab,
            config: meta.config,
        })
    }
}
