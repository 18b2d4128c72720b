//! Source encoder: stacked LSTM over a right-padded batch.
//!
//! Each example stops updating its state after its own last token, so the
//! final (hidden, cell) pair is the one at the true length, and rows stay in
//! caller order throughout. Padded timesteps produce zero states.

use burn::config::Config;
use burn::module::Module;
use burn::prelude::*;
use tracing::debug;

use super::lstm::{StackedLstm, StackedLstmConfig};
use super::state::RecurrentState;
use crate::error::{self, NmtError};

#[derive(Config, Debug)]
pub struct EncoderConfig {
    pub embed_size: usize,
    pub hidden_size: usize,
    #[config(default = 1)]
    pub num_layers: usize,
    #[config(default = 0.0)]
    pub dropout: f64,
}

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    lstm: StackedLstm<B>,
}

/// Encoder result, in the caller's batch order.
#[derive(Debug, Clone)]
pub struct EncoderOutput<B: Backend> {
    /// [batch, max_len, hidden]; zero past each true length.
    pub states: Tensor<B, 3>,
    /// True length of every row.
    pub lengths: Vec<usize>,
    /// State after each row's last true token.
    pub final_state: RecurrentState<B>,
}

impl EncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Encoder<B> {
        Encoder {
            lstm: StackedLstmConfig::new(self.embed_size, self.hidden_size)
                .with_num_layers(self.num_layers)
                .with_dropout(self.dropout)
                .init(device),
        }
    }
}

/// Check a length vector against a padded batch.
pub fn check_lengths(lengths: &[usize], batch: usize, padded: usize) -> error::Result<()> {
    if batch == 0 {
        return Err(NmtError::EmptyBatch);
    }
    if lengths.len() != batch {
        return Err(NmtError::LengthMismatch {
            lengths: lengths.len(),
            batch,
        });
    }
    for (index, &length) in lengths.iter().enumerate() {
        if length == 0 {
            return Err(NmtError::EmptySequence { index });
        }
        if length > padded {
            return Err(NmtError::LengthOverflow {
                index,
                length,
                padded,
            });
        }
    }
    Ok(())
}

impl<B: Backend> Encoder<B> {
    pub fn num_layers(&self) -> usize {
        self.lstm.num_layers()
    }

    /// Encode a padded batch.
    ///
    /// - `embedded`: [batch, max_len, embed]
    /// - `lengths`: true length of each row, each in `1..=max_len`
    pub fn forward(&self, embedded: Tensor<B, 3>, lengths: &[usize]) -> error::Result<EncoderOutput<B>> {
        let [batch, max_len, embed] = embedded.dims();
        check_lengths(lengths, batch, max_len)?;

        let device = embedded.device();
        let hidden = self.lstm.hidden_size();
        debug!(batch, max_len, "encoding source batch");

        let mut states = Tensor::<B, 3>::zeros([batch, max_len, hidden], &device);
        let mut state = self.lstm.zero_state(batch, &device);

        for t in 0..max_len {
            let alive: Vec<bool> = lengths.iter().map(|&len| t < len).collect();
            let alive = Tensor::<B, 1, Bool>::from_data(TensorData::new(alive, [batch]), &device);

            let x_t = embedded
                .clone()
                .slice([0..batch, t..t + 1, 0..embed])
                .reshape([batch, embed]);
            let (out, next) = self.lstm.step(x_t, &state);

            let dead = alive.clone().bool_not().reshape([batch, 1]).expand([batch, hidden]);
            let out = out.mask_fill(dead, 0.0);
            states = states.slice_assign([0..batch, t..t + 1, 0..hidden], out.unsqueeze_dim::<3>(1));
            state = state.advance_where(next, alive);
        }

        Ok(EncoderOutput {
            states,
            lengths: lengths.to_vec(),
            final_state: state,
        })
    }
}
