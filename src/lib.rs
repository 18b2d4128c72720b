//! Recurrent encoder-decoder translation with Gaussian local attention.
//!
//! A stacked LSTM encodes the source; an LSTM decoder predicts an
//! alignment position per step and attends to source states weighted by
//! a Gaussian kernel around it. Training scores gold targets by teacher
//! forcing; inference runs beam search or greedy decoding.

pub mod checkpoint;
pub mod config;
pub mod corpus;
pub mod error;
pub mod inference;
pub mod model;
pub mod training;
pub mod translator;
pub mod vocab;

pub use config::NmtConfig;
pub use error::{NmtError, Result};
pub use inference::{beam_search, greedy_decode, BeamConfig, BeamResult, Completed};
pub use model::NmtModel;
pub use translator::{Translation, Translator};
pub use vocab::{PaddedBatch, Vocab, VocabPair};
