//! Source and target embedding tables.

use burn::config::Config;
use burn::module::Module;
use burn::nn::{Embedding, EmbeddingConfig};
use burn::prelude::*;

#[derive(Config, Debug)]
pub struct ModelEmbeddingsConfig {
    pub src_vocab_size: usize,
    pub tar_vocab_size: usize,
    pub embed_size: usize,
}

#[derive(Module, Debug)]
pub struct ModelEmbeddings<B: Backend> {
    source: Embedding<B>,
    target: Embedding<B>,
}

impl ModelEmbeddingsConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ModelEmbeddings<B> {
        ModelEmbeddings {
            source: EmbeddingConfig::new(self.src_vocab_size, self.embed_size).init(device),
            target: EmbeddingConfig::new(self.tar_vocab_size, self.embed_size).init(device),
        }
    }
}

impl<B: Backend> ModelEmbeddings<B> {
    /// [batch, len] source ids → [batch, len, embed].
    pub fn source(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        self.source.forward(ids)
    }

    /// [batch, len] target ids → [batch, len, embed].
    pub fn target(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        self.target.forward(ids)
    }

    /// Embed one target token per row: [batch] → [batch, embed].
    pub fn target_tokens(&self, ids: Tensor<B, 1, Int>) -> Tensor<B, 2> {
        let [batch] = ids.dims();
        let embedded = self.target.forward(ids.reshape([batch, 1]));
        let [_, _, embed] = embedded.dims();
        embedded.reshape([batch, embed])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn tables_have_separate_vocabularies() {
        let device = Default::default();
        let emb = ModelEmbeddingsConfig::new(7, 11, 3).init::<B>(&device);
        let src = emb.source(Tensor::from_ints([[0, 6]], &device));
        let tgt = emb.target(Tensor::from_ints([[10, 1, 2]], &device));
        assert_eq!(src.dims(), [1, 2, 3]);
        assert_eq!(tgt.dims(), [1, 3, 3]);
    }

    #[test]
    fn target_tokens_match_sequence_lookup() {
        let device = Default::default();
        let emb = ModelEmbeddingsConfig::new(4, 5, 2).init::<B>(&device);
        let one = emb.target_tokens(Tensor::from_ints([3, 1], &device));
        let seq = emb.target(Tensor::from_ints([[3], [1]], &device)).reshape([2, 2]);
        let diff: f32 = (one - seq).abs().sum().into_scalar();
        assert_eq!(diff, 0.0);
    }
}
