//! Multi-layer unidirectional LSTM driven one timestep at a time.
//!
//! burn's `Lstm` is single-layer; layers are stacked here with dropout
//! between them. Driving it step by step lets the encoder freeze finished
//! sequences and lets the decoder interleave attention with recurrence.

use burn::config::Config;
use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Lstm, LstmConfig};
use burn::prelude::*;

use super::state::RecurrentState;

#[derive(Config, Debug)]
pub struct StackedLstmConfig {
    pub d_input: usize,
    pub d_hidden: usize,
    #[config(default = 1)]
    pub num_layers: usize,
    #[config(default = 0.0)]
    pub dropout: f64,
}

#[derive(Module, Debug)]
pub struct StackedLstm<B: Backend> {
    layers: Vec<Lstm<B>>,
    dropout: Dropout,
    d_hidden: usize,
}

impl StackedLstmConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> StackedLstm<B> {
        let layers = (0..self.num_layers)
            .map(|i| {
                let d_in = if i == 0 { self.d_input } else { self.d_hidden };
                LstmConfig::new(d_in, self.d_hidden, true).init(device)
            })
            .collect();

        StackedLstm {
            layers,
            dropout: DropoutConfig::new(self.dropout).init(),
            d_hidden: self.d_hidden,
        }
    }
}

impl<B: Backend> StackedLstm<B> {
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn hidden_size(&self) -> usize {
        self.d_hidden
    }

    pub fn zero_state(&self, batch: usize, device: &B::Device) -> RecurrentState<B> {
        RecurrentState::zeros(self.num_layers(), batch, self.d_hidden, device)
    }

    /// Advance all layers by one timestep.
    ///
    /// - `input`: [batch, d_input]
    /// - `state`: previous state, `[layers, batch, d_hidden]`
    ///
    /// Returns the top layer output [batch, d_hidden] and the new state.
    pub fn step(
        &self,
        input: Tensor<B, 2>,
        state: &RecurrentState<B>,
    ) -> (Tensor<B, 2>, RecurrentState<B>) {
        debug_assert_eq!(state.num_layers(), self.num_layers());
        let [batch, _] = input.dims();
        let last = self.layers.len() - 1;

        let mut x = input;
        let mut next = Vec::with_capacity(self.layers.len());
        for (i, layer) in self.layers.iter().enumerate() {
            let (out, layer_state) = layer.forward(x.unsqueeze_dim::<3>(1), Some(state.layer(i)));
            let out = out.reshape([batch, self.d_hidden]);
            x = if i < last { self.dropout.forward(out) } else { out };
            next.push(layer_state);
        }

        (x, RecurrentState::from_layers(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn step_shapes() {
        let device = Default::default();
        let lstm = StackedLstmConfig::new(6, 4)
            .with_num_layers(3)
            .init::<B>(&device);
        let state = lstm.zero_state(2, &device);
        let (out, next) = lstm.step(Tensor::zeros([2, 6], &device), &state);
        assert_eq!(out.dims(), [2, 4]);
        assert_eq!(next.hidden.dims(), [3, 2, 4]);
        assert_eq!(next.cell.dims(), [3, 2, 4]);
    }

    #[test]
    fn top_output_matches_top_hidden() {
        let device = Default::default();
        let lstm = StackedLstmConfig::new(3, 5)
            .with_num_layers(2)
            .init::<B>(&device);
        let input = Tensor::<B, 2>::ones([1, 3], &device);
        let (out, next) = lstm.step(input, &lstm.zero_state(1, &device));
        let top = next.layer(1).hidden;
        let diff: f32 = (out - top).abs().sum().into_scalar();
        assert!(diff < 1e-6);
    }
}
