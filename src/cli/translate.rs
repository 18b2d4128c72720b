use std::path::PathBuf;

use burn::backend::wgpu::WgpuDevice;
use burn::backend::{NdArray, Wgpu};
use burn::prelude::Backend;
use clap::Args;
use nmt::{BeamConfig, Translator};

#[derive(Args)]
pub struct TranslateArgs {
    /// Checkpoint directory
    #[arg(short, long)]
    pub checkpoint: PathBuf,
    /// Source sentences, one per line (default: stdin)
    #[arg(short, long)]
    pub input: Option<PathBuf>,
    /// Beam size
    #[arg(long, default_value = "5")]
    pub beam: usize,
    /// Maximum output length in tokens
    #[arg(long, default_value = "50")]
    pub max_len: usize,
    /// Argmax decoding instead of beam search
    #[arg(long)]
    pub greedy: bool,
    /// Run on the GPU (wgpu)
    #[arg(long)]
    pub gpu: bool,
}

pub fn cmd_translate(args: TranslateArgs) {
    if args.gpu {
        run::<Wgpu>(&args, &WgpuDevice::default());
    } else {
        run::<NdArray>(&args, &Default::default());
    }
}

fn run<B: Backend>(args: &TranslateArgs, device: &B::Device) {
    let translator = Translator::<B>::load(&args.checkpoint, device)
        .unwrap_or_else(|e| super::fail("cannot load checkpoint", e));
    let beam = BeamConfig {
        search_size: args.beam,
        max_target_length: args.max_len,
    };

    for (i, sentence) in super::read_source(args.input.as_deref()).iter().enumerate() {
        let words = if args.greedy {
            translator.greedy(sentence, args.max_len)
        } else {
            translator
                .beam_search(sentence, &beam)
                .map(|hyps| hyps.into_iter().next().map(|t| t.words).unwrap_or_default())
        };
        match words {
            Ok(words) => println!("{}", words.join(" ")),
            Err(e) => super::fail(&format!("sentence {}", i + 1), e),
        }
    }
}
