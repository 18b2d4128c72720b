use std::path::PathBuf;

use burn::backend::NdArray;
use clap::Args;
use nmt::{NmtConfig, Translator, VocabPair};

#[derive(Args)]
pub struct InitArgs {
    /// Source-side training corpus, one sentence per line
    #[arg(long)]
    pub src: PathBuf,
    /// Target-side training corpus, aligned with --src
    #[arg(long)]
    pub tgt: PathBuf,
    /// Checkpoint directory to create
    #[arg(short, long)]
    pub out: PathBuf,
    /// Maximum regular words per vocabulary
    #[arg(long, default_value = "50000")]
    pub vocab_size: usize,
    /// Minimum word frequency
    #[arg(long, default_value = "2")]
    pub freq_cutoff: usize,
    #[arg(long, default_value = "256")]
    pub embed_size: usize,
    #[arg(long, default_value = "256")]
    pub hidden_size: usize,
    /// Gaussian window half-width D
    #[arg(long, default_value = "10")]
    pub window: usize,
    /// LSTM layers for both encoder and decoder
    #[arg(long, default_value = "1")]
    pub layers: usize,
    #[arg(long, default_value = "0.2")]
    pub dropout: f64,
}

pub fn cmd_init(args: InitArgs) {
    let src = super::read_source(Some(&args.src));
    let tgt = super::read_target(&args.tgt);
    super::check_parallel(&src, &tgt);

    let vocab = VocabPair::from_corpus(&src, &tgt, args.vocab_size, args.freq_cutoff);
    let config = NmtConfig::new()
        .with_embed_size(args.embed_size)
        .with_hidden_size(args.hidden_size)
        .with_window_size_d(args.window)
        .with_encoder_layers(args.layers)
        .with_decoder_layers(args.layers)
        .with_dropout_rate(args.dropout);

    let translator = Translator::<NdArray>::new(config, vocab, &Default::default())
        .unwrap_or_else(|e| super::fail("cannot build model", e));
    if let Err(e) = translator.save(&args.out) {
        super::fail("cannot save checkpoint", e);
    }

    let vocab = translator.vocab();
    eprintln!("Created checkpoint in {}", args.out.display());
    eprintln!(
        "  {} sentence pairs, vocab {} src / {} tgt",
        src.len(),
        vocab.src.len(),
        vocab.tar.len()
    );
}
