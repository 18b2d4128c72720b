mod cli;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cli::init::{cmd_init, InitArgs};
use cli::inspect::{cmd_inspect, InspectArgs};
use cli::score::{cmd_score, ScoreArgs};
use cli::train::{cmd_train, TrainArgs};
use cli::translate::{cmd_translate, TranslateArgs};

#[derive(Parser)]
#[command(
    name = "nmt",
    version,
    about = "Recurrent neural machine translation with local attention"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build vocabularies from a parallel corpus and save a fresh model
    Init(InitArgs),
    /// Train a checkpoint on a parallel corpus
    Train(TrainArgs),
    /// Translate source sentences with beam search or greedy decoding
    Translate(TranslateArgs),
    /// Print the log-likelihood of each reference translation
    Score(ScoreArgs),
    /// Show the configuration stored in a checkpoint
    Inspect(InspectArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Init(args) => cmd_init(args),
        Command::Train(args) => cmd_train(args),
        Command::Translate(args) => cmd_translate(args),
        Command::Score(args) => cmd_score(args),
        Command::Inspect(args) => cmd_inspect(args),
    }
}
