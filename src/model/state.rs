//! Recurrent (hidden, cell) state of a stacked LSTM.
//!
//! Every transition produces a fresh `RecurrentState`; nothing here mutates
//! a state in place.

use burn::nn::LstmState;
use burn::prelude::*;

/// Hidden and cell tensors, each `[layers, batch, hidden]`.
#[derive(Debug, Clone)]
pub struct RecurrentState<B: Backend> {
    pub hidden: Tensor<B, 3>,
    pub cell: Tensor<B, 3>,
}

impl<B: Backend> RecurrentState<B> {
    pub fn zeros(layers: usize, batch: usize, hidden: usize, device: &B::Device) -> Self {
        Self {
            hidden: Tensor::zeros([layers, batch, hidden], device),
            cell: Tensor::zeros([layers, batch, hidden], device),
        }
    }

    /// Assemble from per-layer burn states (each `[batch, hidden]`).
    pub fn from_layers(layers: Vec<LstmState<B, 2>>) -> Self {
        let (hidden, cell): (Vec<_>, Vec<_>) =
            layers.into_iter().map(|s| (s.hidden, s.cell)).unzip();
        Self {
            hidden: Tensor::stack(hidden, 0),
            cell: Tensor::stack(cell, 0),
        }
    }

    pub fn num_layers(&self) -> usize {
        self.hidden.dims()[0]
    }

    pub fn batch_size(&self) -> usize {
        self.hidden.dims()[1]
    }

    /// The burn state of one layer, `[batch, hidden]` each.
    pub fn layer(&self, index: usize) -> LstmState<B, 2> {
        let [_, batch, hidden] = self.hidden.dims();
        let range = [index..index + 1, 0..batch, 0..hidden];
        LstmState {
            cell: self.cell.clone().slice(range.clone()).reshape([batch, hidden]),
            hidden: self.hidden.clone().slice(range).reshape([batch, hidden]),
        }
    }

    /// The state of a single batch row, kept as a batch of one.
    pub fn row(&self, index: usize) -> Self {
        let [layers, _, hidden] = self.hidden.dims();
        let range = [0..layers, index..index + 1, 0..hidden];
        Self {
            hidden: self.hidden.clone().slice(range.clone()),
            cell: self.cell.clone().slice(range),
        }
    }

    /// Concatenate states along the batch axis.
    pub fn cat(states: Vec<Self>) -> Self {
        let (hidden, cell): (Vec<_>, Vec<_>) =
            states.into_iter().map(|s| (s.hidden, s.cell)).unzip();
        Self {
            hidden: Tensor::cat(hidden, 1),
            cell: Tensor::cat(cell, 1),
        }
    }

    /// Take `next` for rows where `advance` is true, keep `self` elsewhere.
    ///
    /// `advance` is `[batch]`; used to freeze finished sequences while the
    /// rest of a padded batch keeps stepping.
    pub fn advance_where(self, next: Self, advance: Tensor<B, 1, Bool>) -> Self {
        let [layers, batch, hidden] = self.hidden.dims();
        let mask = advance
            .reshape([1, batch, 1])
            .expand([layers, batch, hidden]);
        Self {
            hidden: self.hidden.mask_where(mask.clone(), next.hidden),
            cell: self.cell.mask_where(mask, next.cell),
        }
    }
}
