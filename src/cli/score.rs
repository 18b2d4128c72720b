use std::path::PathBuf;

use burn::backend::NdArray;
use clap::Args;
use nmt::Translator;

#[derive(Args)]
pub struct ScoreArgs {
    /// Checkpoint directory
    #[arg(short, long)]
    pub checkpoint: PathBuf,
    /// Source sentences
    #[arg(long)]
    pub src: PathBuf,
    /// Reference translations, aligned with --src
    #[arg(long)]
    pub tgt: PathBuf,
    /// Sentence pairs per forward pass
    #[arg(long, default_value = "32")]
    pub batch_size: usize,
}

pub fn cmd_score(args: ScoreArgs) {
    let translator = Translator::<NdArray>::load(&args.checkpoint, &Default::default())
        .unwrap_or_else(|e| super::fail("cannot load checkpoint", e));
    let src = super::read_source(Some(&args.src));
    let tgt = super::read_target(&args.tgt);
    super::check_parallel(&src, &tgt);

    let mut total = 0.0f64;
    let mut words = 0usize;
    for (src, tgt) in src
        .chunks(args.batch_size.max(1))
        .zip(tgt.chunks(args.batch_size.max(1)))
    {
        let scores = translator
            .score(src, tgt)
            .unwrap_or_else(|e| super::fail("scoring failed", e));
        for (score, sentence) in scores.iter().zip(tgt) {
            println!("{:.4}", score);
            total += *score as f64;
            // +1 for <end>
            words += sentence.len() + 1;
        }
    }

    if words > 0 {
        eprintln!("perplexity: {:.2}", (-total / words as f64).exp());
    }
}
