use std::path::PathBuf;

use clap::Args;
use nmt::checkpoint::{available, load_meta};

#[derive(Args)]
pub struct InspectArgs {
    /// Checkpoint directory
    #[arg(short, long)]
    pub checkpoint: PathBuf,
}

pub fn cmd_inspect(args: InspectArgs) {
    if !available(&args.checkpoint) {
        super::fail(
            "no checkpoint",
            format!("{} lacks model.mpk or meta.json", args.checkpoint.display()),
        );
    }
    let meta = load_meta(&args.checkpoint).unwrap_or_else(|e| super::fail("cannot read checkpoint", e));

    println!("checkpoint: {}", args.checkpoint.display());
    println!("saved on:   {}", meta.device);
    println!("weights:    {}", meta.weights_digest);
    println!("vocab:      {} src / {} tgt", meta.vocab.src.len(), meta.vocab.tar.len());
    println!("config:     {}", meta.config);
}
