//! Local attention with a predicted alignment position.
//!
//! For a decoder output `d_t` the layer predicts a continuous source
//! position `p_t = sigmoid(W2 · tanh(W1 · d_t)) * L`, scores every source
//! state by dot product, and multiplies the masked softmax by a Gaussian
//! kernel `exp(-(s - p_t)^2 / (D^2 / 2))` centred on `p_t`. The weighted
//! sum of encoder states is fused with `d_t` as `tanh(W3 · [c_t; d_t])`.
//!
//! The kernel is applied over the whole source row instead of slicing a
//! hard `[p_t - D, p_t + D]` window: positions far from `p_t` get weights
//! that underflow to zero, and no boundary case needs special handling.
//! Weights are not renormalized after the kernel, so they sum to at most 1.

use burn::config::Config;
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::{sigmoid, softmax};

#[derive(Config, Debug)]
pub struct LocalAttentionConfig {
    pub hidden_size: usize,
    /// Window half-width `D`; must be non-zero.
    pub window_size_d: usize,
}

#[derive(Module, Debug)]
pub struct LocalAttention<B: Backend> {
    /// W1: hidden → hidden, feeds the position predictor.
    position_proj: Linear<B>,
    /// W2: hidden → 1, the unscaled position logit.
    position_out: Linear<B>,
    /// W3: [context; d_t] → fused hidden.
    fuse: Linear<B>,
    /// `D^2 / 2`.
    kernel_width: f64,
}

/// Encoder states prepared for repeated attention queries.
///
/// Masks, lengths and position grids are built once per batch and reused
/// by every decode step.
#[derive(Debug, Clone)]
pub struct SourceMemory<B: Backend> {
    /// [batch, src_len, hidden]
    pub states: Tensor<B, 3>,
    pub lengths: Vec<usize>,
    /// True lengths as floats, [batch, 1].
    lengths_f: Tensor<B, 2>,
    /// True at padding, [batch, src_len].
    padding: Tensor<B, 2, Bool>,
    /// Source position indices 0..src_len, [batch, src_len].
    positions: Tensor<B, 2>,
}

/// Everything one attention query produces.
#[derive(Debug, Clone)]
pub struct Attention<B: Backend> {
    /// `h_t`, [batch, hidden].
    pub fused: Tensor<B, 2>,
    /// Predicted centre `p_t` in source positions, [batch, 1].
    pub position: Tensor<B, 2>,
    /// Masked softmax of dot-product scores, [batch, src_len].
    pub align: Tensor<B, 2>,
    /// `align * kernel`, [batch, src_len].
    pub weights: Tensor<B, 2>,
}

impl LocalAttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LocalAttention<B> {
        assert!(self.window_size_d > 0, "window_size_d must be validated before init");
        let d = self.window_size_d as f64;
        let h = self.hidden_size;

        LocalAttention {
            position_proj: LinearConfig::new(h, h).with_bias(false).init(device),
            position_out: LinearConfig::new(h, 1).with_bias(false).init(device),
            fuse: LinearConfig::new(2 * h, h).with_bias(false).init(device),
            kernel_width: d * d / 2.0,
        }
    }
}

impl<B: Backend> SourceMemory<B> {
    /// Wrap encoder states. Lengths must already be validated (non-zero,
    /// within `src_len`); an all-padding row would softmax to NaN.
    pub fn new(states: Tensor<B, 3>, lengths: Vec<usize>) -> Self {
        let [batch, src_len, _] = states.dims();
        debug_assert_eq!(lengths.len(), batch);
        debug_assert!(lengths.iter().all(|&l| l > 0 && l <= src_len));
        let device = states.device();

        let lengths_f = Tensor::from_data(
            TensorData::new(
                lengths.iter().map(|&l| l as f32).collect::<Vec<_>>(),
                [batch, 1],
            ),
            &device,
        );

        let mut padding = Vec::with_capacity(batch * src_len);
        for &len in &lengths {
            padding.extend((0..src_len).map(|s| s >= len));
        }
        let padding = Tensor::from_data(TensorData::new(padding, [batch, src_len]), &device);

        let positions = Tensor::<B, 1, Int>::arange(0..src_len as i64, &device)
            .float()
            .unsqueeze::<2>()
            .expand([batch, src_len]);

        Self {
            states,
            lengths,
            lengths_f,
            padding,
            positions,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.lengths.len()
    }

    pub fn src_len(&self) -> usize {
        self.states.dims()[1]
    }

    /// Repeat a single-example memory `k` times (one row per hypothesis).
    pub fn replicate(&self, k: usize) -> Self {
        debug_assert_eq!(self.batch_size(), 1);
        let [_, src_len, hidden] = self.states.dims();
        Self {
            states: self.states.clone().expand([k, src_len, hidden]),
            lengths: vec![self.lengths[0]; k],
            lengths_f: self.lengths_f.clone().expand([k, 1]),
            padding: self.padding.clone().expand([k, src_len]),
            positions: self.positions.clone().expand([k, src_len]),
        }
    }
}

/// Gaussian distance kernel `exp(-(s - p)^2 / width)`.
///
/// - `positions`: [batch, src_len] source indices `s`
/// - `centers`: [batch, 1] predicted positions `p`
/// - `width`: `D^2 / 2`, strictly positive
pub fn distance_kernel<B: Backend>(
    positions: Tensor<B, 2>,
    centers: Tensor<B, 2>,
    width: f64,
) -> Tensor<B, 2> {
    debug_assert!(width > 0.0);
    let [batch, src_len] = positions.dims();
    let diff = positions - centers.expand([batch, src_len]);
    (diff.clone() * diff).div_scalar(width).neg().exp()
}

impl<B: Backend> LocalAttention<B> {
    /// Predicted alignment position `p_t`, [batch, 1], within `[0, L]`.
    pub fn predict_position(&self, d_t: Tensor<B, 2>, lengths: Tensor<B, 2>) -> Tensor<B, 2> {
        let logit = self.position_out.forward(self.position_proj.forward(d_t).tanh());
        sigmoid(logit) * lengths
    }

    /// Attend from decoder output `d_t` ([batch, hidden]) over `memory`.
    pub fn forward(&self, d_t: Tensor<B, 2>, memory: &SourceMemory<B>) -> Attention<B> {
        let [batch, hidden] = d_t.dims();
        let src_len = memory.src_len();

        let position = self.predict_position(d_t.clone(), memory.lengths_f.clone());

        let scores = d_t
            .clone()
            .unsqueeze_dim::<3>(1)
            .matmul(memory.states.clone().swap_dims(1, 2))
            .reshape([batch, src_len])
            .mask_fill(memory.padding.clone(), f32::NEG_INFINITY);
        let align = softmax(scores, 1);

        let kernel = distance_kernel(memory.positions.clone(), position.clone(), self.kernel_width);
        let weights = align.clone() * kernel;

        let context = weights
            .clone()
            .unsqueeze_dim::<3>(1)
            .matmul(memory.states.clone())
            .reshape([batch, hidden]);
        let fused = self.fuse.forward(Tensor::cat(vec![context, d_t], 1)).tanh();

        Attention {
            fused,
            position,
            align,
            weights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type B = NdArray;

    fn attention(device: &<B as Backend>::Device) -> LocalAttention<B> {
        LocalAttentionConfig::new(8, 2).init(device)
    }

    fn to_vec(t: Tensor<B, 2>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn align_sums_to_one_over_unmasked() {
        let device = Default::default();
        let layer = attention(&device);
        let states = Tensor::<B, 3>::random([3, 5, 8], Distribution::Default, &device);
        let memory = SourceMemory::new(states, vec![5, 2, 3]);
        let d_t = Tensor::<B, 2>::random([3, 8], Distribution::Default, &device);

        let out = layer.forward(d_t, &memory);
        let align = to_vec(out.align);
        for (row, &len) in [5usize, 2, 3].iter().enumerate() {
            let vals = &align[row * 5..(row + 1) * 5];
            let sum: f32 = vals[..len].iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "row {} sums to {}", row, sum);
            assert!(vals[len..].iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn weights_never_exceed_align() {
        let device = Default::default();
        let layer = attention(&device);
        let states = Tensor::<B, 3>::random([2, 6, 8], Distribution::Default, &device);
        let memory = SourceMemory::new(states, vec![6, 4]);
        let out = layer.forward(Tensor::random([2, 8], Distribution::Default, &device), &memory);
        for (w, a) in to_vec(out.weights).iter().zip(to_vec(out.align)) {
            assert!(w.is_finite());
            assert!(*w <= a + 1e-7);
        }
    }

    #[test]
    fn position_stays_within_length() {
        let device = Default::default();
        let layer = attention(&device);
        let states = Tensor::<B, 3>::random([2, 7, 8], Distribution::Default, &device);
        let memory = SourceMemory::new(states, vec![7, 3]);
        let d_t = Tensor::<B, 2>::random([2, 8], Distribution::Normal(0.0, 10.0), &device);
        let pos = to_vec(layer.forward(d_t, &memory).position);
        assert!((0.0..=7.0).contains(&pos[0]));
        assert!((0.0..=3.0).contains(&pos[1]));
    }

    #[test]
    fn padding_content_does_not_matter() {
        let device = Default::default();
        let layer = attention(&device);
        let clean = Tensor::<B, 3>::random([1, 6, 8], Distribution::Default, &device);
        let noise = Tensor::<B, 3>::random([1, 3, 8], Distribution::Normal(0.0, 100.0), &device);
        let dirty = clean.clone().slice_assign([0..1, 3..6, 0..8], noise);
        let d_t = Tensor::<B, 2>::random([1, 8], Distribution::Default, &device);

        let a = layer.forward(d_t.clone(), &SourceMemory::new(clean, vec![3]));
        let b = layer.forward(d_t, &SourceMemory::new(dirty, vec![3]));
        for (x, y) in to_vec(a.fused).iter().zip(to_vec(b.fused)) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn kernel_peaks_at_center_and_decays() {
        let device = Default::default();
        let positions = Tensor::<B, 1, Int>::arange(0..9, &device)
            .float()
            .unsqueeze::<2>();
        let centers = Tensor::<B, 2>::from_floats([[4.0]], &device);
        let kernel = to_vec(distance_kernel(positions, centers, 2.0));

        assert!((kernel[4] - 1.0).abs() < 1e-7);
        for d in 1..=4 {
            assert!(kernel[4 + d] < kernel[4 + d - 1]);
            assert!(kernel[4 - d] < kernel[4 - d + 1]);
            assert!((kernel[4 + d] - kernel[4 - d]).abs() < 1e-7);
        }
    }

    #[test]
    fn kernel_underflows_to_zero_not_nan() {
        let device = Default::default();
        let positions = Tensor::<B, 2>::from_floats([[0.0, 1000.0]], &device);
        let centers = Tensor::<B, 2>::from_floats([[0.0]], &device);
        let kernel = to_vec(distance_kernel(positions, centers, 0.5));
        assert_eq!(kernel[1], 0.0);
        assert!(!kernel[1].is_nan());
    }

    #[test]
    fn replicate_matches_single_row() {
        let device = Default::default();
        let layer = attention(&device);
        let states = Tensor::<B, 3>::random([1, 4, 8], Distribution::Default, &device);
        let memory = SourceMemory::new(states, vec![4]);
        let d_t = Tensor::<B, 2>::random([1, 8], Distribution::Default, &device);

        let single = to_vec(layer.forward(d_t.clone(), &memory).fused);
        let triple = to_vec(layer.forward(d_t.expand([3, 8]), &memory.replicate(3)).fused);
        for row in 0..3 {
            for (x, y) in triple[row * 8..(row + 1) * 8].iter().zip(&single) {
                assert!((x - y).abs() < 1e-6);
            }
        }
    }
}
