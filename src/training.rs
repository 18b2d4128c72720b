//! Maximum-likelihood training with teacher forcing.
//!
//! Loss is the negative mean per-sentence log-likelihood returned by
//! [`NmtModel::forward`]. Optimizer is AdamW with gradient-norm clipping.

use burn::grad_clipping::GradientClippingConfig;
use burn::optim::{AdamWConfig, GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use tracing::debug;

use crate::error::{NmtError, Result};
use crate::model::NmtModel;
use crate::vocab::{PaddedBatch, VocabPair};

/// Training configuration.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Learning rate.
    pub lr: f64,
    /// Weight decay.
    pub weight_decay: f64,
    /// Gradient clipping norm.
    pub grad_clip: f32,
    /// Sentence pairs per batch.
    pub batch_size: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            lr: 1e-3,
            weight_decay: 0.01,
            grad_clip: 5.0,
            batch_size: 32,
        }
    }
}

/// Result of one pass over a corpus.
#[derive(Debug, Clone, Copy)]
pub struct EpochResult {
    /// Mean per-batch loss.
    pub avg_loss: f32,
    pub num_batches: usize,
}

/// AdamW with gradient-norm clipping.
pub fn create_optimizer<B: AutodiffBackend>(
    config: &TrainConfig,
) -> impl Optimizer<NmtModel<B>, B> {
    AdamWConfig::new()
        .with_weight_decay(config.weight_decay as f32)
        .with_grad_clipping(Some(GradientClippingConfig::Norm(config.grad_clip)))
        .init()
}

/// One optimizer step on a padded batch. Targets carry `<start>`/`<end>`.
///
/// Returns the updated model and the loss before the update.
pub fn train_step<B: AutodiffBackend, O: Optimizer<NmtModel<B>, B>>(
    model: NmtModel<B>,
    source: &PaddedBatch,
    target: &PaddedBatch,
    optimizer: &mut O,
    lr: f64,
) -> Result<(NmtModel<B>, f32)> {
    let scores = model.forward(source, target)?;
    let loss = scores.mean().neg();
    let loss_val = loss
        .clone()
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| NmtError::TensorData(format!("{:?}", e)))?
        .first()
        .copied()
        .unwrap_or(f32::NAN);

    let grads = loss.backward();
    let grads = GradientsParams::from_grads(grads, &model);
    Ok((optimizer.step(lr, model, grads), loss_val))
}

/// Train over sentence pairs in corpus order, `config.batch_size` at a time.
///
/// Source sentences are plain tokens; targets are wrapped in markers here.
pub fn train_epoch<B: AutodiffBackend, O: Optimizer<NmtModel<B>, B>>(
    mut model: NmtModel<B>,
    vocab: &VocabPair,
    src: &[Vec<String>],
    tgt: &[Vec<String>],
    optimizer: &mut O,
    config: &TrainConfig,
) -> Result<(NmtModel<B>, EpochResult)> {
    if src.len() != tgt.len() {
        return Err(NmtError::LengthMismatch {
            lengths: tgt.len(),
            batch: src.len(),
        });
    }
    if config.batch_size == 0 {
        return Err(NmtError::InvalidConfig("batch_size must be at least 1".into()));
    }

    let mut total_loss = 0.0;
    let mut num_batches = 0;
    for (src_chunk, tgt_chunk) in src
        .chunks(config.batch_size)
        .zip(tgt.chunks(config.batch_size))
    {
        let source = vocab.src.pad_batch(src_chunk)?;
        let target = vocab.tar.pad_targets(tgt_chunk)?;
        let (next, loss) = train_step(model, &source, &target, optimizer, config.lr)?;
        model = next;
        total_loss += loss;
        num_batches += 1;
        debug!(batch = num_batches, loss, "train step");
    }

    let avg_loss = if num_batches == 0 {
        0.0
    } else {
        total_loss / num_batches as f32
    };
    Ok((
        model,
        EpochResult {
            avg_loss,
            num_batches,
        },
    ))
}
