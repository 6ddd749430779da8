use crate::train::ModelType;
use clap::{Args, ValueEnum};
use lda_gibbs::{build_model, Corpus, InferMode, LdaOptions, TopicModel};
use log::info;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
#[clap(rename_all = "lowercase")]
pub(crate) enum InferModeArg {
    /// Keep the loaded word-topic model fixed (held-out inference)
    Frozen,
    /// Keep mutating the loaded model while sampling
    Refit,
}

impl InferModeArg {
    fn mode(&self) -> InferMode {
        match self {
            InferModeArg::Frozen => InferMode::Frozen,
            InferModeArg::Refit => InferMode::Refit,
        }
    }
}

#[derive(Args, Debug)]
pub struct InferArgs {
    #[arg(
        long,
        short,
        required = true,
        help = "Inference corpus file",
        long_help = "Corpus file to infer topic mixtures for.\n\
		     One document per line: `docId wordId:count ...`\n\
		     Gzipped input is detected by the .gz extension."
    )]
    input_file: Box<str>,

    #[arg(
        long,
        value_enum,
        default_value = "lda",
        help = "Sampler type",
        long_help = "Sampler type; must match the saved model:\n\
		     lda models store a dense word-topic table,\n\
		     sparselda models store a sorted sparse map."
    )]
    model_type: ModelType,

    #[arg(
        long,
        default_value_t = 0.01,
        help = "Document-topic Dirichlet concentration"
    )]
    alpha: f32,

    #[arg(
        long,
        default_value_t = 0.01,
        help = "Topic-word Dirichlet concentration"
    )]
    beta: f32,

    #[arg(
        short = 'k',
        long,
        default_value_t = 20,
        help = "Number of topics",
        long_help = "Number of topics; must match the saved model."
    )]
    topic_num: u32,

    #[arg(long, default_value_t = 10, help = "Number of Gibbs sweeps")]
    iter: usize,

    #[arg(
        long,
        short,
        required = true,
        help = "Model prefix",
        long_help = "Prefix of the saved model.\n\
		     Reads {model}.wt and writes {model}.theta."
    )]
    model_file: Box<str>,

    #[arg(
        long,
        value_enum,
        default_value = "frozen",
        help = "Inference mode",
        long_help = "Inference mode.\n\
		     frozen: word-topic counts stay fixed (held-out inference)\n\
		     refit: keep mutating all tables, continuing training"
    )]
    infer_mode: InferModeArg,

    #[arg(
        long,
        help = "Random seed",
        long_help = "Random seed for reproducible runs.\n\
		     Omit for a nondeterministic seed."
    )]
    seed: Option<u64>,
}

pub fn run_infer(args: &InferArgs) -> anyhow::Result<()> {
    let corpus = Corpus::load(&args.input_file)?;

    let options = LdaOptions {
        topic_num: args.topic_num,
        alpha: args.alpha,
        beta: args.beta,
        seed: args.seed,
        infer_mode: args.infer_mode.mode(),
    };

    let mut model = build_model(args.model_type.kind(), corpus, options);
    model.load_word_topic(&args.model_file)?;
    model.infer(args.iter)?;

    model.save_theta(&args.model_file)?;

    info!("Done");
    Ok(())
}
