use std::path::PathBuf;

use burn::backend::wgpu::WgpuDevice;
use burn::backend::{Autodiff, NdArray, Wgpu};
use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;
use clap::Args;
use nmt::training::{create_optimizer, train_epoch, TrainConfig};
use nmt::Translator;

#[derive(Args)]
pub struct TrainArgs {
    /// Checkpoint directory; updated in place after every epoch
    #[arg(short, long)]
    pub checkpoint: PathBuf,
    /// Source-side training corpus
    #[arg(long)]
    pub src: PathBuf,
    /// Target-side training corpus, aligned with --src
    #[arg(long)]
    pub tgt: PathBuf,
    #[arg(short, long, default_value = "1")]
    pub epochs: usize,
    #[arg(long, default_value = "0.001")]
    pub lr: f64,
    #[arg(long, default_value = "32")]
    pub batch_size: usize,
    /// Gradient clipping norm
    #[arg(long, default_value = "5.0")]
    pub grad_clip: f32,
    /// Train on the GPU (wgpu)
    #[arg(long)]
    pub gpu: bool,
}

pub fn cmd_train(args: TrainArgs) {
    if args.gpu {
        run::<Autodiff<Wgpu>>(&args, &WgpuDevice::default());
    } else {
        run::<Autodiff<NdArray>>(&args, &Default::default());
    }
}

fn run<B: AutodiffBackend>(args: &TrainArgs, device: &B::Device) {
    let translator = Translator::<B>::load(&args.checkpoint, device)
        .unwrap_or_else(|e| super::fail("cannot load checkpoint", e));
    let src = super::read_source(Some(&args.src));
    let tgt = super::read_target(&args.tgt);
    super::check_parallel(&src, &tgt);

    let config = TrainConfig {
        lr: args.lr,
        grad_clip: args.grad_clip,
        batch_size: args.batch_size,
        ..TrainConfig::default()
    };
    let mut optimizer = create_optimizer::<B>(&config);
    let (mut model, vocab, nmt_config) = translator.into_parts();

    eprintln!(
        "Training on {} sentence pairs, {} epoch(s)",
        src.len(),
        args.epochs
    );
    let start = std::time::Instant::now();

    for epoch in 1..=args.epochs {
        let (next, result) = train_epoch(model, &vocab, &src, &tgt, &mut optimizer, &config)
            .unwrap_or_else(|e| super::fail(&format!("epoch {}", epoch), e));
        model = next;
        eprintln!(
            "  epoch {}: loss {:.4} over {} batches",
            epoch, result.avg_loss, result.num_batches
        );

        let inference = Translator::<B::InnerBackend>::from_parts(
            model.valid(),
            vocab.clone(),
            nmt_config.clone(),
        );
        if let Err(e) = inference.save(&args.checkpoint) {
            super::fail("cannot save checkpoint", e);
        }
    }

    eprintln!("Done in {:.1}s", start.elapsed().as_secs_f64());
}
