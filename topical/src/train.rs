use clap::{Args, ValueEnum};
use lda_gibbs::{build_model, Corpus, LdaOptions, ModelKind, TopicModel};
use log::info;
use table_util::common_io::write_lines;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
#[clap(rename_all = "lowercase")]
pub(crate) enum ModelType {
    /// Dense collapsed Gibbs sampler
    Lda,
    /// Sparse three-bucket sampler
    Sparselda,
}

impl ModelType {
    pub(crate) fn kind(&self) -> ModelKind {
        match self {
            ModelType::Lda => ModelKind::Dense,
            ModelType::Sparselda => ModelKind::Sparse,
        }
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[arg(
        long,
        short,
        required = true,
        help = "Training corpus file",
        long_help = "Training corpus file.\n\
		     One document per line: `docId wordId:count ...`\n\
		     Gzipped input is detected by the .gz extension."
    )]
    input_file: Box<str>,

    #[arg(
        long,
        value_enum,
        default_value = "lda",
        help = "Sampler type",
        long_help = "Sampler type.\n\
		     lda: dense collapsed Gibbs with a full K-way draw\n\
		     sparselda: three-bucket sampler over a sorted sparse map"
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
        help = "Number of topics"
    )]
    topic_num: u32,

    #[arg(long, default_value_t = 10, help = "Number of Gibbs sweeps")]
    iter: usize,

    #[arg(
        long,
        short,
        required = true,
        help = "Output prefix",
        long_help = "Output prefix for model artifacts:\n\
		     - {model}.wt    word-topic counts\n\
		     - {model}.phi   topic-word distribution\n\
		     - {model}.theta document-topic distribution\n\
		     - {model}.likelihood training likelihood probes"
    )]
    model_file: Box<str>,

    #[arg(
        long,
        help = "Random seed",
        long_help = "Random seed for reproducible runs.\n\
		     Omit for a nondeterministic seed."
    )]
    seed: Option<u64>,
}

pub fn run_train(args: &TrainArgs) -> anyhow::Result<()> {
    let corpus = Corpus::load(&args.input_file)?;

    let options = LdaOptions {
        topic_num: args.topic_num,
        alpha: args.alpha,
        beta: args.beta,
        seed: args.seed,
        ..LdaOptions::default()
    };

    let mut model = build_model(args.model_type.kind(), corpus, options);
    let trace = model.train(args.iter)?;

    model.save_word_topic(&args.model_file)?;
    model.save_phi(&args.model_file)?;
    model.save_theta(&args.model_file)?;
    write_lines(&trace.lines(), &format!("{}.likelihood", args.model_file))?;

    info!("Done");
    Ok(())
}
