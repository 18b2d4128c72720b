pub mod beam;
pub mod greedy;

pub use beam::{beam_search, top_k, BeamConfig, BeamResult, Completed, Hypothesis};
pub use greedy::greedy_decode;
