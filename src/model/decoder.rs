//! Recurrent decoder with local attention.
//!
//! [`Decoder::step`] is the single decode transition shared by training
//! and inference: LSTM update on `[y_t; h_prev]`, then local attention.
//! It takes the previous state by reference and returns a new one.

use burn::config::Config;
use burn::module::Module;
use burn::prelude::*;

use super::attention::{Attention, LocalAttention, LocalAttentionConfig, SourceMemory};
use super::lstm::{StackedLstm, StackedLstmConfig};
use super::state::RecurrentState;
use crate::error::{self, NmtError};

#[derive(Config, Debug)]
pub struct DecoderConfig {
    pub embed_size: usize,
    pub hidden_size: usize,
    pub window_size_d: usize,
    #[config(default = 1)]
    pub num_layers: usize,
    #[config(default = 0.0)]
    pub dropout: f64,
}

#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    /// Input is `[y_t; h_prev]`, embed + hidden wide.
    lstm: StackedLstm<B>,
    attention: LocalAttention<B>,
}

/// Result of one decode transition.
#[derive(Debug, Clone)]
pub struct DecoderStep<B: Backend> {
    /// Fused hidden `h_t`, [batch, hidden]; feeds the projection and the next step.
    pub fused: Tensor<B, 2>,
    pub state: RecurrentState<B>,
    pub attention: Attention<B>,
}

impl DecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Decoder<B> {
        Decoder {
            lstm: StackedLstmConfig::new(self.embed_size + self.hidden_size, self.hidden_size)
                .with_num_layers(self.num_layers)
                .with_dropout(self.dropout)
                .init(device),
            attention: LocalAttentionConfig::new(self.hidden_size, self.window_size_d).init(device),
        }
    }
}

impl<B: Backend> Decoder<B> {
    pub fn hidden_size(&self) -> usize {
        self.lstm.hidden_size()
    }

    pub fn num_layers(&self) -> usize {
        self.lstm.num_layers()
    }

    /// One decode step.
    ///
    /// - `y_t`: embedded input token, [batch, embed]
    /// - `h_prev`: previous fused hidden, [batch, hidden] (zeros at t = 0)
    /// - `state`: previous recurrent state
    /// - `memory`: encoder states for the same batch rows
    pub fn step(
        &self,
        y_t: Tensor<B, 2>,
        h_prev: Tensor<B, 2>,
        state: &RecurrentState<B>,
        memory: &SourceMemory<B>,
    ) -> DecoderStep<B> {
        let (d_t, state) = self.lstm.step(Tensor::cat(vec![y_t, h_prev], 1), state);
        let attention = self.attention.forward(d_t, memory);

        DecoderStep {
            fused: attention.fused.clone(),
            state,
            attention,
        }
    }

    /// Teacher-forced decoding over a gold target batch.
    ///
    /// - `targets`: embedded target ids, [batch, T, embed], starting with `<start>`
    /// - `initial`: encoder final state
    ///
    /// Token `t` is fed to predict token `t + 1`, so the last token is never
    /// an input. Returns fused hiddens aligned with target positions `1..T`,
    /// [batch, T - 1, hidden].
    pub fn forward(
        &self,
        targets: Tensor<B, 3>,
        initial: RecurrentState<B>,
        memory: &SourceMemory<B>,
    ) -> error::Result<Tensor<B, 3>> {
        let [batch, tgt_len, embed] = targets.dims();
        if tgt_len < 2 {
            return Err(NmtError::TargetTooShort { index: 0 });
        }
        let device = targets.device();
        let hidden = self.hidden_size();
        let steps = tgt_len - 1;

        let mut outputs = Tensor::<B, 3>::zeros([batch, steps, hidden], &device);
        let mut h_prev = Tensor::<B, 2>::zeros([batch, hidden], &device);
        let mut state = initial;

        for t in 0..steps {
            let y_t = targets
                .clone()
                .slice([0..batch, t..t + 1, 0..embed])
                .reshape([batch, embed]);
            let step = self.step(y_t, h_prev, &state, memory);
            outputs = outputs.slice_assign(
                [0..batch, t..t + 1, 0..hidden],
                step.fused.clone().unsqueeze_dim::<3>(1),
            );
            h_prev = step.fused;
            state = step.state;
        }

        Ok(outputs)
    }
}
