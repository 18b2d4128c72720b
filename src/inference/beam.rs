//! Beam search over the attentive decoder.
//!
//! All active hypotheses advance in one batched decoder step, with the
//! encoded source replicated per hypothesis. Candidate selection runs on
//! the host over the flattened (hypothesis × vocabulary) score matrix.
//! Results come back sorted by total log-probability, best first.
//!
//! `<pad>` and `<start>` are never proposed as next tokens, so the
//! candidate pool per hypothesis is the target vocabulary minus those two.

use burn::prelude::*;
use tracing::debug;

use crate::error::{NmtError, Result};
use crate::model::{NmtModel, RecurrentState};
use crate::vocab::PaddedBatch;

/// Beam search configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeamConfig {
    /// Number of hypotheses kept per step and completions to collect.
    pub search_size: usize,
    /// Maximum number of decode steps.
    pub max_target_length: usize,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            search_size: 5,
            max_target_length: 50,
        }
    }
}

/// Target tokens the decoder may never emit.
const RESERVED: usize = 2;

impl BeamConfig {
    /// Check the configuration against a pool of `pool` candidate tokens.
    pub fn validate(&self, pool: usize) -> Result<()> {
        if self.search_size == 0 {
            return Err(NmtError::InvalidBeam("search_size must be at least 1".into()));
        }
        if self.max_target_length == 0 {
            return Err(NmtError::InvalidBeam(
                "max_target_length must be at least 1".into(),
            ));
        }
        if self.search_size > pool {
            return Err(NmtError::SearchSize {
                search_size: self.search_size,
                pool,
            });
        }
        Ok(())
    }
}

/// A partial translation still being extended.
#[derive(Debug, Clone)]
pub struct Hypothesis<B: Backend> {
    /// Token ids, starting with `<start>`.
    pub tokens: Vec<usize>,
    /// Sum of token log-probabilities so far.
    pub score: f32,
    /// Decoder state after the last token, batch of one.
    pub state: RecurrentState<B>,
    /// Fused hidden after the last token, [1, hidden].
    pub fused: Tensor<B, 2>,
}

/// A finished translation, without `<start>` or `<end>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Completed {
    pub tokens: Vec<usize>,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct BeamResult {
    /// At most `search_size` completions, sorted by score descending.
    pub hypotheses: Vec<Completed>,
    /// Decode steps actually run.
    pub steps: usize,
}

impl BeamResult {
    pub fn best(&self) -> Option<&Completed> {
        self.hypotheses.first()
    }
}

/// The `k` best `(flat index, score)` pairs, best first.
///
/// Ties go to the lower flat index, i.e. the earlier hypothesis and then
/// the lower token id.
pub fn top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    let order = |a: &(usize, f32), b: &(usize, f32)| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0));

    let k = k.min(ranked.len());
    if k == 0 {
        return Vec::new();
    }
    if k < ranked.len() {
        ranked.select_nth_unstable_by(k - 1, order);
        ranked.truncate(k);
    }
    ranked.sort_by(order);
    ranked
}

pub(crate) fn to_host<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| NmtError::TensorData(format!("{:?}", e)))
}

/// Read back step log-probabilities, [rows, vocab] row-major, with
/// `<pad>` and `<start>` set to -inf in every row.
pub(crate) fn step_log_probs<B: Backend>(
    model: &NmtModel<B>,
    fused: Tensor<B, 2>,
) -> Result<Vec<f32>> {
    let mut log_probs = to_host(model.log_probs(fused))?;
    assert!(
        log_probs.iter().all(|p| !p.is_nan()),
        "decoder produced NaN log-probabilities"
    );

    let vocab_size = model.tar_vocab_size();
    for row in log_probs.chunks_mut(vocab_size) {
        row[model.pad_id()] = f32::NEG_INFINITY;
        row[model.start_id()] = f32::NEG_INFINITY;
    }
    Ok(log_probs)
}

/// Translate one source sentence (vocabulary ids, no markers).
///
/// Stops once `search_size` completions exist or after
/// `max_target_length` steps; at the cap, still-active hypotheses are
/// completed as they stand.
pub fn beam_search<B: Backend>(
    model: &NmtModel<B>,
    src_ids: &[usize],
    config: &BeamConfig,
) -> Result<BeamResult> {
    let vocab_size = model.tar_vocab_size();
    config.validate(vocab_size.saturating_sub(RESERVED))?;

    let device = model.device();
    let source = PaddedBatch::from_ids(&[src_ids.to_vec()], model.pad_id())?;
    let encoded = model.encode(&source)?;
    let end_id = model.end_id();
    let k = config.search_size;

    let mut active = vec![Hypothesis {
        tokens: vec![model.start_id()],
        score: 0.0,
        state: encoded.state,
        fused: Tensor::zeros([1, model.hidden_size()], &device),
    }];
    let mut completed: Vec<Completed> = Vec::with_capacity(k);
    let mut steps = 0;

    while steps < config.max_target_length && completed.len() < k && !active.is_empty() {
        steps += 1;
        let n = active.len();

        let last: Vec<i64> = active
            .iter()
            .map(|h| h.tokens.last().copied().unwrap_or(end_id) as i64)
            .collect();
        let tokens = Tensor::<B, 1, Int>::from_data(TensorData::new(last, [n]), &device);
        let h_prev = Tensor::cat(active.iter().map(|h| h.fused.clone()).collect(), 0);
        let state = RecurrentState::cat(active.iter().map(|h| h.state.clone()).collect());
        let memory = encoded.memory.replicate(n);

        let out = model.decode_step(tokens, h_prev, &state, &memory);
        let log_probs = step_log_probs(model, out.fused.clone())?;

        let totals: Vec<f32> = log_probs
            .iter()
            .enumerate()
            .map(|(i, lp)| active[i / vocab_size].score + lp)
            .collect();

        let [_, hidden] = out.fused.dims();
        let mut next = Vec::with_capacity(k);
        for (flat, score) in top_k(&totals, k) {
            let parent = flat / vocab_size;
            let token = flat % vocab_size;

            if token == end_id {
                completed.push(Completed {
                    tokens: active[parent].tokens[1..].to_vec(),
                    score,
                });
                if completed.len() == k {
                    break;
                }
                continue;
            }

            let mut tokens = active[parent].tokens.clone();
            tokens.push(token);
            next.push(Hypothesis {
                tokens,
                score,
                state: out.state.row(parent),
                fused: out.fused.clone().slice([parent..parent + 1, 0..hidden]),
            });
        }

        debug!(
            step = steps,
            active = next.len(),
            completed = completed.len(),
            "beam step"
        );
        active = next;
    }

    // Step cap reached: finish what is left, best first.
    if completed.len() < k {
        for hyp in active.into_iter().take(k - completed.len()) {
            completed.push(Completed {
                tokens: hyp.tokens[1..].to_vec(),
                score: hyp.score,
            });
        }
    }

    completed.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(BeamResult {
        hypotheses: completed,
        steps,
    })
}
