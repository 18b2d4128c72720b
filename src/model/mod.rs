pub mod attention;
pub mod decoder;
pub mod embedding;
pub mod encoder;
pub mod lstm;
pub mod nmt;
pub mod state;

pub use attention::{distance_kernel, Attention, LocalAttention, LocalAttentionConfig, SourceMemory};
pub use decoder::{Decoder, DecoderConfig, DecoderStep};
pub use embedding::{ModelEmbeddings, ModelEmbeddingsConfig};
pub use encoder::{Encoder, EncoderConfig, EncoderOutput};
pub use lstm::{StackedLstm, StackedLstmConfig};
pub use nmt::{Encoded, NmtModel};
pub use state::RecurrentState;
