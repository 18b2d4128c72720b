//! Model hyperparameters.
//!
//! `NmtConfig` is a burn `Config`, so it serializes to JSON and is stored
//! inside every checkpoint. Call [`NmtConfig::validate`] before building a
//! model; `NmtConfig::init` does it for you.

use burn::config::Config;

use crate::error::{self, NmtError};

/// Hyperparameters of the encoder-decoder model.
#[derive(Config, Debug)]
pub struct NmtConfig {
    /// Embedding dimension, shared by source and target tables.
    #[config(default = 256)]
    pub embed_size: usize,
    /// LSTM hidden size; also the size of attention and fused vectors.
    #[config(default = 256)]
    pub hidden_size: usize,
    /// Half-width `D` of the Gaussian window around the predicted position.
    #[config(default = 10)]
    pub window_size_d: usize,
    /// Number of stacked encoder LSTM layers.
    #[config(default = 1)]
    pub encoder_layers: usize,
    /// Number of stacked decoder LSTM layers.
    #[config(default = 1)]
    pub decoder_layers: usize,
    /// Dropout between stacked LSTM layers (only active under autodiff).
    #[config(default = 0.2)]
    pub dropout_rate: f64,
}

impl NmtConfig {
    /// Reject configurations that would make attention or state hand-off
    /// ill-defined.
    pub fn validate(&self) -> error::Result<()> {
        if self.window_size_d == 0 {
            return Err(NmtError::InvalidConfig(
                "window_size_d must be greater than zero".into(),
            ));
        }
        if self.embed_size == 0 || self.hidden_size == 0 {
            return Err(NmtError::InvalidConfig(format!(
                "embed_size ({}) and hidden_size ({}) must be non-zero",
                self.embed_size, self.hidden_size
            )));
        }
        if self.encoder_layers == 0 || self.decoder_layers == 0 {
            return Err(NmtError::InvalidConfig(
                "encoder and decoder need at least one layer".into(),
            ));
        }
        // The encoder's final (hidden, cell) pairs seed the decoder layer by layer.
        if self.encoder_layers != self.decoder_layers {
            return Err(NmtError::InvalidConfig(format!(
                "encoder_layers ({}) must equal decoder_layers ({})",
                self.encoder_layers, self.decoder_layers
            )));
        }
        if !(0.0..1.0).contains(&self.dropout_rate) {
            return Err(NmtError::InvalidConfig(format!(
                "dropout_rate {} is outside [0, 1)",
                self.dropout_rate
            )));
        }
        Ok(())
    }
}
