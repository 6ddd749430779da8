//! Common model surface: the [`TopicModel`] trait, run options, the
//! sampler factory, and estimation routines shared by both samplers.

use crate::corpus::Corpus;
use crate::dense::Lda;
use crate::sparse::SparseLda;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rayon::prelude::*;
use table_util::f32_matrix::F32Matrix;
use table_util::triplet_io::write_f32_triplets;
use table_util::u32_matrix::U32Matrix;

/// Sweeps between two likelihood probes.
pub const LIKELIHOOD_INTERVAL: usize = 10;

/// Which sampler backs a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Dense collapsed Gibbs with a full K-way cumulative draw.
    Dense,
    /// Sparse three-bucket sampler over the sorted topic map.
    Sparse,
}

/// How inference treats the loaded word-topic model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InferMode {
    /// Held-out inference: word-topic counts stay fixed; only the
    /// document-side tables are sampled.
    #[default]
    Frozen,
    /// Continue training: the loaded word-topic counts are mutated
    /// along with everything else.
    Refit,
}

/// Options shared by both samplers.
#[derive(Debug, Clone)]
pub struct LdaOptions {
    /// Number of topics K. Default: 20
    pub topic_num: u32,
    /// Document-topic Dirichlet concentration α. Default: 0.01
    pub alpha: f32,
    /// Topic-word Dirichlet concentration β. Default: 0.01
    pub beta: f32,
    /// Random seed; `None` draws one from the OS, making the run
    /// nondeterministic.
    pub seed: Option<u64>,
    /// Inference behavior for a loaded model. Default: frozen
    pub infer_mode: InferMode,
}

impl Default for LdaOptions {
    fn default() -> Self {
        LdaOptions {
            topic_num: 20,
            alpha: 0.01,
            beta: 0.01,
            seed: None,
            infer_mode: InferMode::Frozen,
        }
    }
}

/// Training-likelihood probes of one run, oldest first.
#[derive(Debug, Clone, Default)]
pub struct TrainTrace {
    /// Joint log-likelihood of the corpus at each probe.
    pub log_likelihood: Vec<f64>,
}

impl TrainTrace {
    /// Render the probes one value per line for persistence.
    pub fn lines(&self) -> Vec<String> {
        self.log_likelihood.iter().map(|x| x.to_string()).collect()
    }
}

/// The common surface of the LDA samplers.
pub trait TopicModel {
    /// Randomly initialize and run `num_iter` Gibbs sweeps over the
    /// corpus, returning the likelihood trace.
    fn train(&mut self, num_iter: usize) -> anyhow::Result<TrainTrace>;

    /// Sample document-topic assignments for the corpus against the
    /// loaded word-topic model for `num_iter` sweeps.
    fn infer(&mut self, num_iter: usize) -> anyhow::Result<TrainTrace>;

    /// Point estimate of the topic-word distribution Φ (V×K).
    fn phi(&self) -> F32Matrix;

    /// Point estimate of the document-topic distribution Θ (D×K).
    fn theta(&self) -> F32Matrix;

    /// Persist the word-topic counts to `<prefix>.wt`.
    fn save_word_topic(&self, prefix: &str) -> anyhow::Result<()>;

    /// Load word-topic counts from `<prefix>.wt`.
    fn load_word_topic(&mut self, prefix: &str) -> anyhow::Result<()>;

    /// Persist Φ to `<prefix>.phi`.
    fn save_phi(&self, prefix: &str) -> anyhow::Result<()> {
        write_f32_triplets(&self.phi(), &format!("{}.phi", prefix))
    }

    /// Persist Θ to `<prefix>.theta`.
    fn save_theta(&self, prefix: &str) -> anyhow::Result<()> {
        write_f32_triplets(&self.theta(), &format!("{}.theta", prefix))
    }
}

/// Construct a sampler of the requested kind over `corpus`.
pub fn build_model(kind: ModelKind, corpus: Corpus, options: LdaOptions) -> Box<dyn TopicModel> {
    match kind {
        ModelKind::Dense => Box::new(Lda::new(corpus, options)),
        ModelKind::Sparse => Box::new(SparseLda::new(corpus, options)),
    }
}

/// Sampler-owned RNG from an explicit seed, falling back to OS
/// entropy when none is configured.
pub(crate) fn make_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(s) => SmallRng::seed_from_u64(s),
        None => SmallRng::from_os_rng(),
    }
}

/// Progress bar over sweeps with a shared template.
pub(crate) fn new_progress_bar(len: u64, template: &str) -> ProgressBar {
    let style =
        ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar());
    ProgressBar::new(len).with_style(style)
}

/// Θ point estimate from document-topic counts:
/// `(Dt[d,k] + α) / (Σ_k Dt[d,k] + K·α)`.
pub(crate) fn estimate_theta(doc_topic: &U32Matrix, alpha: f32) -> F32Matrix {
    let (doc_num, topic_num) = doc_topic.shape();
    let mut theta = F32Matrix::new(doc_num, topic_num);

    for d in 0..doc_num {
        let sum: u32 = doc_topic.row(d).iter().sum();
        let denom = sum as f32 + topic_num as f32 * alpha;
        for k in 0..topic_num {
            theta.set(d, k, (doc_topic.get(d, k) as f32 + alpha) / denom);
        }
    }

    theta
}

/// Joint log-likelihood of the corpus under current Φ and Θ:
/// `Σ_{d,occurrence w} log Σ_k Φ[w,k]·Θ[d,k]`.
///
/// Invoked between sweeps only; safe to fan out over documents.
pub(crate) fn corpus_log_likelihood(corpus: &Corpus, phi: &F32Matrix, theta: &F32Matrix) -> f64 {
    let (_, topic_num) = phi.shape();

    corpus
        .docs
        .par_iter()
        .map(|doc| {
            let mut sum = 0.0f64;
            for w in doc.expanded() {
                let mut topic_sum = 0.0f32;
                for k in 0..topic_num {
                    topic_sum += phi.get(w, k) * theta.get(doc.id, k);
                }
                sum += (topic_sum as f64).ln();
            }
            sum
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = LdaOptions::default();
        assert_eq!(opts.topic_num, 20);
        assert_eq!(opts.alpha, 0.01);
        assert_eq!(opts.beta, 0.01);
        assert_eq!(opts.infer_mode, InferMode::Frozen);
        assert!(opts.seed.is_none());
    }

    #[test]
    fn test_estimate_theta_rows_sum_to_one() {
        let mut dt = U32Matrix::new(2, 3);
        dt.set(0, 0, 4);
        dt.set(0, 2, 6);
        dt.set(1, 1, 1);

        let theta = estimate_theta(&dt, 0.5);
        for d in 0..2 {
            let row_sum: f32 = theta.row(d).iter().sum();
            assert!((row_sum - 1.0).abs() < 1e-5, "row {} sums to {}", d, row_sum);
        }
    }
}
