//! The full encoder-decoder: embeddings, encoder, attentive decoder and
//! the bias-free vocabulary projection.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::log_softmax;
use tracing::info;

use super::attention::SourceMemory;
use super::decoder::{Decoder, DecoderConfig, DecoderStep};
use super::embedding::{ModelEmbeddings, ModelEmbeddingsConfig};
use super::encoder::{Encoder, EncoderConfig};
use super::state::RecurrentState;
use crate::config::NmtConfig;
use crate::error::{NmtError, Result};
use crate::vocab::{PaddedBatch, VocabPair};

#[derive(Module, Debug)]
pub struct NmtModel<B: Backend> {
    embeddings: ModelEmbeddings<B>,
    encoder: Encoder<B>,
    decoder: Decoder<B>,
    /// hidden → target vocabulary, no bias.
    projection: Linear<B>,
    pad_id: usize,
    start_id: usize,
    end_id: usize,
    src_vocab_size: usize,
    tar_vocab_size: usize,
}

/// Encoded source batch: attention memory plus the decoder's initial state.
#[derive(Debug, Clone)]
pub struct Encoded<B: Backend> {
    pub memory: SourceMemory<B>,
    pub state: RecurrentState<B>,
}

impl NmtConfig {
    /// Validate, then build a freshly initialized model sized for `vocab`.
    pub fn init<B: Backend>(&self, vocab: &VocabPair, device: &B::Device) -> Result<NmtModel<B>> {
        self.validate()?;
        info!(
            src_vocab = vocab.src.len(),
            tar_vocab = vocab.tar.len(),
            hidden = self.hidden_size,
            window = self.window_size_d,
            "initializing model"
        );

        Ok(NmtModel {
            embeddings: ModelEmbeddingsConfig::new(vocab.src.len(), vocab.tar.len(), self.embed_size)
                .init(device),
            encoder: EncoderConfig::new(self.embed_size, self.hidden_size)
                .with_num_layers(self.encoder_layers)
                .with_dropout(self.dropout_rate)
                .init(device),
            decoder: DecoderConfig::new(self.embed_size, self.hidden_size, self.window_size_d)
                .with_num_layers(self.decoder_layers)
                .with_dropout(self.dropout_rate)
                .init(device),
            projection: LinearConfig::new(self.hidden_size, vocab.tar.len())
                .with_bias(false)
                .init(device),
            pad_id: vocab.tar.pad_id(),
            start_id: vocab.tar.start_id(),
            end_id: vocab.tar.end_id(),
            src_vocab_size: vocab.src.len(),
            tar_vocab_size: vocab.tar.len(),
        })
    }
}

impl<B: Backend> NmtModel<B> {
    pub fn pad_id(&self) -> usize {
        self.pad_id
    }

    pub fn start_id(&self) -> usize {
        self.start_id
    }

    pub fn end_id(&self) -> usize {
        self.end_id
    }

    pub fn src_vocab_size(&self) -> usize {
        self.src_vocab_size
    }

    pub fn tar_vocab_size(&self) -> usize {
        self.tar_vocab_size
    }

    pub fn hidden_size(&self) -> usize {
        self.decoder.hidden_size()
    }

    pub fn device(&self) -> B::Device {
        self.projection.weight.val().device()
    }

    /// Embed and encode a padded source batch.
    pub fn encode(&self, source: &PaddedBatch) -> Result<Encoded<B>> {
        source.check_ids(self.src_vocab_size)?;
        let src_ids = source.to_tensor(&self.device());
        let out = self.encoder.forward(self.embeddings.source(src_ids), &source.lengths)?;
        Ok(Encoded {
            memory: SourceMemory::new(out.states, out.lengths),
            state: out.final_state,
        })
    }

    /// One inference step: embed `tokens` ([batch]) and run the decoder.
    pub fn decode_step(
        &self,
        tokens: Tensor<B, 1, Int>,
        h_prev: Tensor<B, 2>,
        state: &RecurrentState<B>,
        memory: &SourceMemory<B>,
    ) -> DecoderStep<B> {
        self.decoder
            .step(self.embeddings.target_tokens(tokens), h_prev, state, memory)
    }

    /// Vocabulary log-probabilities for fused hiddens, [batch, vocab].
    pub fn log_probs(&self, fused: Tensor<B, 2>) -> Tensor<B, 2> {
        log_softmax(self.projection.forward(fused), 1)
    }

    /// Log-likelihood of each gold target given its source.
    ///
    /// Targets must already carry `<start>` and `<end>`; positions `1..T`
    /// are scored and padding contributes zero. Returns `[batch]`.
    pub fn forward(&self, source: &PaddedBatch, target: &PaddedBatch) -> Result<Tensor<B, 1>> {
        let batch = source.batch_size();
        if target.batch_size() != batch {
            return Err(NmtError::LengthMismatch {
                lengths: target.batch_size(),
                batch,
            });
        }
        if let Some(index) = target.lengths.iter().position(|&len| len < 2) {
            return Err(NmtError::TargetTooShort { index });
        }
        target.check_ids(self.tar_vocab_size)?;

        let device = self.device();
        let encoded = self.encode(source)?;

        let tgt_ids = target.to_tensor::<B>(&device);
        let fused = self.decoder.forward(
            self.embeddings.target(tgt_ids.clone()),
            encoded.state,
            &encoded.memory,
        )?;
        let log_probs = log_softmax(self.projection.forward(fused), 2);

        let steps = target.max_len - 1;
        let gold = tgt_ids.slice([0..batch, 1..target.max_len]);
        let mask = gold.clone().not_equal_elem(self.pad_id as i64).float();
        let gold_log_probs = log_probs
            .gather(2, gold.unsqueeze_dim::<3>(2))
            .reshape([batch, steps]);

        Ok((gold_log_probs * mask).sum_dim(1).reshape([batch]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::Vocab;
    use burn::backend::NdArray;

    type B = NdArray;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn setup() -> (NmtModel<B>, VocabPair) {
        let vocab = VocabPair::new(
            Vocab::from(words("a b c d e")),
            Vocab::from(words("x y z")),
        );
        let config = NmtConfig::new()
            .with_embed_size(6)
            .with_hidden_size(8)
            .with_window_size_d(2)
            .with_dropout_rate(0.0);
        let model = config.init::<B>(&vocab, &Default::default()).unwrap();
        (model, vocab)
    }

    #[test]
    fn scores_are_finite_and_non_positive() {
        let (model, vocab) = setup();
        let src = vocab.src.pad_batch(&[words("a b"), words("c d e")]).unwrap();
        let tgt = vocab.tar.pad_targets(&[words("x y"), words("x y z")]).unwrap();

        let scores = model
            .forward(&src, &tgt)
            .unwrap()
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        assert_eq!(scores.len(), 2);
        for s in scores {
            assert!(s.is_finite());
            assert!(s <= 0.0);
        }
    }

    #[test]
    fn padding_does_not_change_scores() {
        let (model, vocab) = setup();
        let src_alone = vocab.src.pad_batch(&[words("a b")]).unwrap();
        let tgt_alone = vocab.tar.pad_targets(&[words("x y")]).unwrap();
        let alone: f32 = model.forward(&src_alone, &tgt_alone).unwrap().into_scalar();

        let src = vocab.src.pad_batch(&[words("a b"), words("c d e")]).unwrap();
        let tgt = vocab.tar.pad_targets(&[words("x y"), words("x y z")]).unwrap();
        let batched = model.forward(&src, &tgt).unwrap().into_data().to_vec::<f32>().unwrap();

        assert!((alone - batched[0]).abs() < 1e-4, "{} vs {}", alone, batched[0]);
    }

    #[test]
    fn zero_window_is_rejected() {
        let vocab = VocabPair::new(Vocab::new(), Vocab::new());
        let err = NmtConfig::new()
            .with_window_size_d(0)
            .init::<B>(&vocab, &Default::default())
            .unwrap_err();
        assert!(matches!(err, NmtError::InvalidConfig(_)));
    }

    #[test]
    fn mismatched_batches_rejected() {
        let (model, vocab) = setup();
        let src = vocab.src.pad_batch(&[words("a b")]).unwrap();
        let tgt = vocab.tar.pad_targets(&[words("x"), words("y")]).unwrap();
        assert!(matches!(
            model.forward(&src, &tgt),
            Err(NmtError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn out_of_vocabulary_ids_rejected() {
        let (model, vocab) = setup();
        let tgt = vocab.tar.pad_targets(&[words("x y")]).unwrap();
        let src = PaddedBatch::from_ids(&[vec![4, 999]], model.pad_id()).unwrap();
        assert!(matches!(
            model.forward(&src, &tgt),
            Err(NmtError::TokenOutOfRange { index: 0, id: 999, vocab: 9 })
        ));

        let src = vocab.src.pad_batch(&[words("a"), words("b c")]).unwrap();
        let start = model.start_id();
        let end = model.end_id();
        let tgt = PaddedBatch::from_ids(&[vec![start, 4, end], vec![start, 7, end]], model.pad_id())
            .unwrap();
        assert!(matches!(
            model.forward(&src, &tgt),
            Err(NmtError::TokenOutOfRange { index: 1, id: 7, vocab: 7 })
        ));
    }

    #[test]
    fn log_probs_normalize() {
        let (model, _) = setup();
        let fused = Tensor::<B, 2>::zeros([3, 8], &Default::default());
        let probs = model.log_probs(fused).exp().sum_dim(1).into_data().to_vec::<f32>().unwrap();
        for p in probs {
            assert!((p - 1.0).abs() < 1e-5);
        }
    }
}
