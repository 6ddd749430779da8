mod infer;
mod train;

use clap::{Parser, Subcommand};
use infer::*;
use train::*;

/// Topic modeling by collapsed Gibbs sampling
///
/// Corpus files are whitespace-delimited bag-of-words lines,
/// optionally gzipped:
///
/// `docId wordId:count wordId:count ...`
///
/// with dense zero-based u32 identifiers.
#[derive(Parser, Debug)]
#[command(version, about, long_about, term_width = 80)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// estimate a topic model on a training corpus
    Train(TrainArgs),

    /// infer document-topic mixtures against a saved model
    Infer(InferArgs),
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match &cli.commands {
        Commands::Train(args) => {
            run_train(args)?;
        }
        Commands::Infer(args) => {
            run_infer(args)?;
        }
    }

    Ok(())
}
