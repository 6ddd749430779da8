//! Dense collapsed Gibbs sampler.
//!
//! Per occurrence: decrement the sufficient statistics at the current
//! topic, rebuild the unnormalized cumulative distribution over all K
//! topics, draw, and increment at the drawn topic. The cumulative
//! accumulator is single precision, like the emitted tables; for very
//! large K the low-order mass of the cumsum can fall below f32
//! resolution.

use crate::corpus::Corpus;
use crate::model::{
    corpus_log_likelihood, estimate_theta, make_rng, new_progress_bar, InferMode, LdaOptions,
    TopicModel, TrainTrace, LIKELIHOOD_INTERVAL,
};
use crate::suff_stats::{random_init, random_init_doc_only, DocWord, SuffStats};
use log::info;
use rand::rngs::SmallRng;
use rand::Rng;
use table_util::f32_matrix::F32Matrix;
use table_util::triplet_io::{read_u32_triplets, write_u32_triplets};
use table_util::u32_matrix::U32Matrix;

/// Collapsed Gibbs sampler with a full K-way cumulative draw.
pub struct Lda {
    corpus: Corpus,
    options: LdaOptions,
    stats: SuffStats,
    rng: SmallRng,
    /// Scratch space for the unnormalized cumulative distribution
    cumsum: Vec<f32>,
}

impl Lda {
    /// Create a sampler over `corpus`; tables start zeroed.
    pub fn new(corpus: Corpus, options: LdaOptions) -> Self {
        let stats = SuffStats::new(&corpus, options.topic_num);
        let rng = make_rng(options.seed);
        let cumsum = vec![0.0; options.topic_num as usize];
        Lda {
            corpus,
            options,
            stats,
            rng,
            cumsum,
        }
    }

    /// One full sweep over every word occurrence.
    ///
    /// With `frozen` set, the word-topic tables are read as constants
    /// and only the document-side tables move.
    fn sweep(&mut self, frozen: bool) {
        let Lda {
            corpus,
            options,
            stats,
            rng,
            cumsum,
        } = self;

        let topic_num = options.topic_num;
        let alpha = options.alpha;
        let beta = options.beta;
        let vbeta = beta * stats.vocab_size as f32;

        for doc in corpus.docs.iter() {
            for (i, w) in doc.expanded().enumerate() {
                let key = DocWord {
                    doc_id: doc.id,
                    word_idx: i as u32,
                };
                let old_topic = stats.assignment[&key];

                if !frozen {
                    stats.wt_mut().decr(w, old_topic, 1);
                    stats.word_topic_sum.decr(old_topic, 0, 1);
                }
                stats.doc_topic.decr(doc.id, old_topic, 1);

                // unnormalized cumulative distribution over topics
                let mut acc = 0.0f32;
                {
                    let wt = stats.wt();
                    for k in 0..topic_num {
                        let doc_part = alpha + stats.doc_topic.get(doc.id, k) as f32;
                        let word_part = (beta + wt.get(w, k) as f32)
                            / (vbeta + stats.word_topic_sum.get(k, 0) as f32);
                        acc += doc_part * word_part;
                        cumsum[k as usize] = acc;
                    }
                }

                let u = rng.random::<f32>() * cumsum[topic_num as usize - 1];
                let mut new_topic = topic_num - 1;
                for k in 0..topic_num {
                    if u < cumsum[k as usize] {
                        new_topic = k;
                        break;
                    }
                }

                if !frozen {
                    stats.wt_mut().incr(w, new_topic, 1);
                    stats.word_topic_sum.incr(new_topic, 0, 1);
                }
                stats.doc_topic.incr(doc.id, new_topic, 1);
                stats.assignment.insert(key, new_topic);
            }
        }
    }

    fn log_likelihood(&self) -> f64 {
        corpus_log_likelihood(&self.corpus, &self.phi(), &self.theta())
    }

    fn run_sweeps(&mut self, num_iter: usize, frozen: bool) -> TrainTrace {
        let mut trace = TrainTrace::default();
        let pb = new_progress_bar(
            num_iter as u64,
            "Gibbs {bar:40} {pos}/{len} sweeps ({eta})",
        );

        for iter_idx in 0..num_iter {
            if iter_idx % LIKELIHOOD_INTERVAL == 0 {
                let ll = self.log_likelihood();
                info!("iter {:5}, log-likelihood {:.4}", iter_idx, ll);
                trace.log_likelihood.push(ll);
            }
            self.sweep(frozen);
            pb.inc(1);
        }
        pb.finish_and_clear();

        let ll = self.log_likelihood();
        info!("final log-likelihood {:.4}", ll);
        trace.log_likelihood.push(ll);
        trace
    }
}

impl TopicModel for Lda {
    fn train(&mut self, num_iter: usize) -> anyhow::Result<TrainTrace> {
        // fresh tables, one uniform topic per occurrence
        self.stats = SuffStats::new(&self.corpus, self.options.topic_num);
        random_init(&mut self.stats, &self.corpus, &mut self.rng);

        info!(
            "LDA: D={}, V={}, K={}, alpha={}, beta={}, sweeps={}",
            self.stats.doc_num,
            self.stats.vocab_size,
            self.options.topic_num,
            self.options.alpha,
            self.options.beta,
            num_iter,
        );

        Ok(self.run_sweeps(num_iter, false))
    }

    fn infer(&mut self, num_iter: usize) -> anyhow::Result<TrainTrace> {
        // fresh document-side tables; the loaded word-topic model stays
        self.stats.doc_topic = U32Matrix::new(self.stats.doc_num, self.options.topic_num);
        self.stats.assignment.clear();

        let frozen = self.options.infer_mode == InferMode::Frozen;
        if frozen {
            random_init_doc_only(&mut self.stats, &self.corpus, &mut self.rng);
        } else {
            random_init(&mut self.stats, &self.corpus, &mut self.rng);
        }

        info!(
            "LDA infer ({:?}): D={}, V={}, K={}, sweeps={}",
            self.options.infer_mode,
            self.stats.doc_num,
            self.stats.vocab_size,
            self.options.topic_num,
            num_iter,
        );

        Ok(self.run_sweeps(num_iter, frozen))
    }

    fn phi(&self) -> F32Matrix {
        let vocab_size = self.stats.vocab_size;
        let topic_num = self.options.topic_num;
        let beta = self.options.beta;
        let mut phi = F32Matrix::new(vocab_size, topic_num);

        let wt = self.stats.wt();
        for k in 0..topic_num {
            let sum: u32 = wt.col(k).iter().sum();
            let denom = sum as f32 + vocab_size as f32 * beta;
            for v in 0..vocab_size {
                phi.set(v, k, (wt.get(v, k) as f32 + beta) / denom);
            }
        }

        phi
    }

    fn theta(&self) -> F32Matrix {
        estimate_theta(&self.stats.doc_topic, self.options.alpha)
    }

    fn save_word_topic(&self, prefix: &str) -> anyhow::Result<()> {
        write_u32_triplets(self.stats.wt(), &format!("{}.wt", prefix))
    }

    fn load_word_topic(&mut self, prefix: &str) -> anyhow::Result<()> {
        let wt = read_u32_triplets(&format!("{}.wt", prefix))?;
        let (nrow, ncol) = wt.shape();
        anyhow::ensure!(
            ncol == self.options.topic_num,
            "model has {} topics but the run is configured for {}",
            ncol,
            self.options.topic_num
        );
        anyhow::ensure!(
            nrow >= self.corpus.vocab_size,
            "model vocabulary {} is smaller than corpus vocabulary {}",
            nrow,
            self.corpus.vocab_size
        );

        let mut wts = U32Matrix::new(self.options.topic_num, 1);
        for k in 0..ncol {
            let sum: u32 = wt.col(k).iter().sum();
            wts.set(k, 0, sum);
        }

        self.stats.vocab_size = nrow;
        self.stats.word_topic = Some(wt);
        self.stats.word_topic_sum = wts;
        Ok(())
    }
}
