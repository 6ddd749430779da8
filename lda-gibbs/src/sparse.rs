//! Sparse three-bucket Gibbs sampler.
//!
//! Splits the unnormalized collapsed conditional over topics into
//! three additive buckets, with `denom(k) = β·V + Wts[k]`:
//!
//! * smoothing (corpus-wide): `S = Σ_k α·β / denom(k)`
//! * document: `R(d) = Σ_k β·Dt[d,k] / denom(k)`
//! * topic-word (per occurrence): `Q(d,w) = Σ_{k: Wt[w,k]>0}
//!   Wt[w,k]·q(d,k)` with `q(d,k) = (α + Dt[d,k]) / denom(k)`
//!
//! After burn-in most of the mass sits in Q, whose support is the
//! word's distinct-topic set; scanning the sorted map's
//! highest-count entries first makes the common draw cheap. S, R and
//! the q cache are maintained incrementally around each decrement and
//! increment; R and q are rebuilt from scratch at every document
//! boundary, amortized over the document's occurrences.

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
use table_util::sorted_map::SortedTopicMap;
use table_util::triplet_io::{read_topic_map, write_topic_map};
use table_util::u32_matrix::U32Matrix;

/// Three-bucket collapsed Gibbs sampler over a sorted sparse
/// word-topic map.
pub struct SparseLda {
    corpus: Corpus,
    options: LdaOptions,
    /// Document-side tables plus topic totals; the dense word-topic
    /// table only exists transiently during the training bootstrap.
    stats: SuffStats,
    word_topic_map: SortedTopicMap,
    rng: SmallRng,
    /// Per-document cache of `q(d,k) = (α + Dt[d,k]) / denom(k)`
    q_cache: Vec<f32>,
}

impl SparseLda {
    /// Create a sampler over `corpus`; tables start zeroed.
    pub fn new(corpus: Corpus, options: LdaOptions) -> Self {
        let stats = SuffStats::without_word_topic(&corpus, options.topic_num);
        let word_topic_map = SortedTopicMap::new(options.topic_num);
        let rng = make_rng(options.seed);
        let q_cache = vec![0.0; options.topic_num as usize];
        SparseLda {
            corpus,
            options,
            stats,
            word_topic_map,
            rng,
            q_cache,
        }
    }

    /// `Σ_k α·β / denom(k)` over the current topic totals.
    fn smoothing_bucket(&self) -> f32 {
        let vbeta = self.options.beta * self.stats.vocab_size as f32;
        let ab = self.options.alpha * self.options.beta;
        (0..self.options.topic_num)
            .map(|k| ab / (vbeta + self.stats.word_topic_sum.get(k, 0) as f32))
            .sum()
    }

    /// One full sweep over every word occurrence.
    ///
    /// With `frozen` set, the sorted map and topic totals are read as
    /// constants: only the document-side tables move, and S needs no
    /// maintenance because every denominator is fixed.
    fn sweep(&mut self, s_bucket: &mut f32, frozen: bool) {
        let SparseLda {
            corpus,
            options,
            stats,
            word_topic_map,
            rng,
            q_cache,
        } = self;

        let topic_num = options.topic_num;
        let alpha = options.alpha;
        let beta = options.beta;
        let vbeta = beta * stats.vocab_size as f32;
        let ab = alpha * beta;

        for doc in corpus.docs.iter() {
            // document boundary: rebuild R(d) and the q cache
            let mut r_bucket = 0.0f32;
            for k in 0..topic_num {
                let denom = vbeta + stats.word_topic_sum.get(k, 0) as f32;
                r_bucket += beta * stats.doc_topic.get(doc.id, k) as f32 / denom;
                q_cache[k as usize] = (alpha + stats.doc_topic.get(doc.id, k) as f32) / denom;
            }

            for (i, w) in doc.expanded().enumerate() {
                let key = DocWord {
                    doc_id: doc.id,
                    word_idx: i as u32,
                };
                let old_topic = stats.assignment[&key];

                // pull the old topic's terms out of the buckets
                let denom = vbeta + stats.word_topic_sum.get(old_topic, 0) as f32;
                if !frozen {
                    *s_bucket -= ab / denom;
                }
                r_bucket -= beta * stats.doc_topic.get(doc.id, old_topic) as f32 / denom;

                if !frozen {
                    word_topic_map.decr(w, old_topic, 1);
                    stats.word_topic_sum.decr(old_topic, 0, 1);
                }
                stats.doc_topic.decr(doc.id, old_topic, 1);

                // put them back under the post-decrement counts
                let denom = vbeta + stats.word_topic_sum.get(old_topic, 0) as f32;
                if !frozen {
                    *s_bucket += ab / denom;
                }
                r_bucket += beta * stats.doc_topic.get(doc.id, old_topic) as f32 / denom;
                q_cache[old_topic as usize] =
                    (alpha + stats.doc_topic.get(doc.id, old_topic) as f32) / denom;

                // topic-word bucket of this word, hot topics first
                let mut q_sum = 0.0f32;
                for (t, count) in word_topic_map.iter_word(w) {
                    q_sum += q_cache[t as usize] * count as f32;
                }

                let total = q_sum + r_bucket + *s_bucket;
                assert!(
                    total > 0.0,
                    "no sampling mass for word {} in document {}",
                    w,
                    doc.id
                );
                let u = rng.random::<f32>() * total;

                let new_topic = if u < q_sum {
                    // hot path: the first few sorted entries usually
                    // carry enough mass
                    let mut cum = 0.0f32;
                    let mut chosen = old_topic;
                    for (t, count) in word_topic_map.iter_word(w) {
                        chosen = t;
                        cum += q_cache[t as usize] * count as f32;
                        if cum >= u {
                            break;
                        }
                    }
                    chosen
                } else if u < q_sum + r_bucket {
                    let u = u - q_sum;
                    let mut cum = 0.0f32;
                    let mut chosen = topic_num - 1;
                    for k in 0..topic_num {
                        cum += beta * stats.doc_topic.get(doc.id, k) as f32
                            / (vbeta + stats.word_topic_sum.get(k, 0) as f32);
                        if cum >= u {
                            chosen = k;
                            break;
                        }
                    }
                    chosen
                } else {
                    let u = u - q_sum - r_bucket;
                    let mut cum = 0.0f32;
                    let mut chosen = topic_num - 1;
                    for k in 0..topic_num {
                        cum += ab / (vbeta + stats.word_topic_sum.get(k, 0) as f32);
                        if cum >= u {
                            chosen = k;
                            break;
                        }
                    }
                    chosen
                };

                // same dance in reverse for the drawn topic
                let denom = vbeta + stats.word_topic_sum.get(new_topic, 0) as f32;
                if !frozen {
                    *s_bucket -= ab / denom;
                }
                r_bucket -= beta * stats.doc_topic.get(doc.id, new_topic) as f32 / denom;

                if !frozen {
                    word_topic_map.incr(w, new_topic, 1);
                    stats.word_topic_sum.incr(new_topic, 0, 1);
                }
                stats.doc_topic.incr(doc.id, new_topic, 1);

                let denom = vbeta + stats.word_topic_sum.get(new_topic, 0) as f32;
                if !frozen {
                    *s_bucket += ab / denom;
                }
                r_bucket += beta * stats.doc_topic.get(doc.id, new_topic) as f32 / denom;
                q_cache[new_topic as usize] =
                    (alpha + stats.doc_topic.get(doc.id, new_topic) as f32) / denom;

                stats.assignment.insert(key, new_topic);
            }
        }
    }

    fn log_likelihood(&self) -> f64 {
        corpus_log_likelihood(&self.corpus, &self.phi(), &self.theta())
    }

    fn run_sweeps(&mut self, num_iter: usize, frozen: bool) -> TrainTrace {
        let mut s_bucket = self.smoothing_bucket();
        let mut trace = TrainTrace::default();
        let pb = new_progress_bar(
            num_iter as u64,
            "SparseGibbs {bar:40} {pos}/{len} sweeps ({eta})",
        );

        for iter_idx in 0..num_iter {
            if iter_idx % LIKELIHOOD_INTERVAL == 0 {
                let ll = self.log_likelihood();
                info!("iter {:5}, log-likelihood {:.4}", iter_idx, ll);
                trace.log_likelihood.push(ll);
            }
            self.sweep(&mut s_bucket, frozen);
            pb.inc(1);
        }
        pb.finish_and_clear();

        let ll = self.log_likelihood();
        info!("final log-likelihood {:.4}", ll);
        trace.log_likelihood.push(ll);
        trace
    }
}

impl TopicModel for SparseLda {
    fn train(&mut self, num_iter: usize) -> anyhow::Result<TrainTrace> {
        // dense bootstrap: random init fills a transient word-topic
        // table, whose counts then move into the sorted map
        self.stats = SuffStats::new(&self.corpus, self.options.topic_num);
        self.word_topic_map = SortedTopicMap::new(self.options.topic_num);
        random_init(&mut self.stats, &self.corpus, &mut self.rng);

        let wt = self
            .stats
            .release_word_topic()
            .expect("bootstrap word-topic table missing");
        let (vocab_size, topic_num) = wt.shape();
        for w in 0..vocab_size {
            for k in 0..topic_num {
                let count = wt.get(w, k);
                if count > 0 {
                    self.word_topic_map.incr(w, k, count);
                }
            }
        }
        drop(wt);

        info!(
            "SparseLDA: D={}, V={}, K={}, alpha={}, beta={}, sweeps={}",
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
        // fresh document-side tables; the loaded map stays
        self.stats.doc_topic = U32Matrix::new(self.stats.doc_num, self.options.topic_num);
        self.stats.assignment.clear();

        let frozen = self.options.infer_mode == InferMode::Frozen;
        random_init_doc_only(&mut self.stats, &self.corpus, &mut self.rng);
        if !frozen {
            // refit: push the random assignments into the word-topic
            // side as well
            let SparseLda {
                corpus,
                stats,
                word_topic_map,
                ..
            } = self;
            for doc in corpus.docs.iter() {
                for (i, w) in doc.expanded().enumerate() {
                    let key = DocWord {
                        doc_id: doc.id,
                        word_idx: i as u32,
                    };
                    let topic = stats.assignment[&key];
                    word_topic_map.incr(w, topic, 1);
                    stats.word_topic_sum.incr(topic, 0, 1);
                }
            }
        }

        info!(
            "SparseLDA infer ({:?}): D={}, V={}, K={}, sweeps={}",
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

        let mut word_topic_count = vec![0u32; topic_num as usize];
        for w in 0..vocab_size {
            // densify this word's sparse counts
            word_topic_count.fill(0);
            for (t, count) in self.word_topic_map.iter_word(w) {
                word_topic_count[t as usize] = count;
            }
            for k in 0..topic_num {
                let denom =
                    self.stats.word_topic_sum.get(k, 0) as f32 + vocab_size as f32 * beta;
                phi.set(w, k, (word_topic_count[k as usize] as f32 + beta) / denom);
            }
        }

        phi
    }

    fn theta(&self) -> F32Matrix {
        estimate_theta(&self.stats.doc_topic, self.options.alpha)
    }

    fn save_word_topic(&self, prefix: &str) -> anyhow::Result<()> {
        write_topic_map(&self.word_topic_map, &format!("{}.wt", prefix))
    }

    fn load_word_topic(&mut self, prefix: &str) -> anyhow::Result<()> {
        let map = read_topic_map(&format!("{}.wt", prefix), self.options.topic_num)?;

        // rebuild topic totals from the loaded counts
        let mut wts = U32Matrix::new(self.options.topic_num, 1);
        for w in 0..=map.max_word_id() {
            for (t, count) in map.iter_word(w) {
                wts.incr(t, 0, count);
            }
        }

        self.stats.vocab_size = self.stats.vocab_size.max(map.max_word_id() + 1);
        self.stats.word_topic_sum = wts;
        self.word_topic_map = map;
        Ok(())
    }
}
