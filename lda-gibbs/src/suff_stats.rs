//! Sufficient statistics for collapsed Gibbs sampling.
//!
//! Four tables summarize the current per-occurrence topic assignments
//! and stay mutually consistent across every decrement → resample →
//! increment step:
//!
//! * `word_topic` (V×K): occurrences of word w assigned to topic k
//! * `doc_topic` (D×K): occurrences in document d assigned to topic k
//! * `word_topic_sum` (K×1): column sums of `word_topic`
//! * `assignment`: current topic of the i-th occurrence of document d
//!
//! The holder is owned by a sampler instance; several models can run
//! in one process without sharing state.

use crate::corpus::{Corpus, DocId};
use fnv::FnvHashMap;
use rand::rngs::SmallRng;
use rand::Rng;
use table_util::u32_matrix::U32Matrix;

/// Topic identifier in `0..K`.
pub type TopicId = u32;

/// Key of one word occurrence: document id plus the occurrence's
/// position in the document's expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocWord {
    /// Document identifier.
    pub doc_id: DocId,
    /// Zero-based occurrence position within the document.
    pub word_idx: u32,
}

/// The sufficient-statistics tables of one sampler instance.
#[derive(Debug, Clone)]
pub struct SuffStats {
    /// Number of topics K.
    pub topic_num: u32,
    /// Vocabulary size V; may grow when a saved model covers a larger
    /// vocabulary than the current corpus.
    pub vocab_size: u32,
    /// Number of documents D.
    pub doc_num: u32,
    /// Word-topic counts (V×K). `None` once the sparse sampler has
    /// transferred the counts into its sorted map.
    pub word_topic: Option<U32Matrix>,
    /// Document-topic counts (D×K).
    pub doc_topic: U32Matrix,
    /// Per-topic totals (K×1).
    pub word_topic_sum: U32Matrix,
    /// Per-occurrence topic assignments.
    pub assignment: FnvHashMap<DocWord, TopicId>,
}

impl SuffStats {
    /// Allocate zeroed tables sized for `corpus` and `topic_num`
    /// topics, dense word-topic table included.
    pub fn new(corpus: &Corpus, topic_num: u32) -> Self {
        let mut stats = Self::without_word_topic(corpus, topic_num);
        stats.word_topic = Some(U32Matrix::new(stats.vocab_size, topic_num));
        stats
    }

    /// Allocate zeroed tables without the dense word-topic table, for
    /// samplers that keep word-topic counts elsewhere.
    pub fn without_word_topic(corpus: &Corpus, topic_num: u32) -> Self {
        SuffStats {
            topic_num,
            vocab_size: corpus.vocab_size,
            doc_num: corpus.doc_num(),
            word_topic: None,
            doc_topic: U32Matrix::new(corpus.doc_num(), topic_num),
            word_topic_sum: U32Matrix::new(topic_num, 1),
            assignment: FnvHashMap::default(),
        }
    }

    /// The dense word-topic table.
    ///
    /// Panics if the table has been released to a sparse map.
    #[inline]
    pub fn wt(&self) -> &U32Matrix {
        self.word_topic
            .as_ref()
            .expect("dense word-topic table has been released")
    }

    /// Mutable access to the dense word-topic table.
    ///
    /// Panics if the table has been released to a sparse map.
    #[inline]
    pub fn wt_mut(&mut self) -> &mut U32Matrix {
        self.word_topic
            .as_mut()
            .expect("dense word-topic table has been released")
    }

    /// Hand over the dense word-topic table, leaving `None` behind.
    pub fn release_word_topic(&mut self) -> Option<U32Matrix> {
        self.word_topic.take()
    }
}

/// Assign one uniform random topic to every word occurrence, updating
/// all four tables. Shared bootstrap of both samplers' training.
pub fn random_init(stats: &mut SuffStats, corpus: &Corpus, rng: &mut SmallRng) {
    let k = stats.topic_num;
    for doc in &corpus.docs {
        for (i, w) in doc.expanded().enumerate() {
            let topic = rng.random_range(0..k);
            stats.wt_mut().incr(w, topic, 1);
            stats.doc_topic.incr(doc.id, topic, 1);
            stats.word_topic_sum.incr(topic, 0, 1);
            stats.assignment.insert(
                DocWord {
                    doc_id: doc.id,
                    word_idx: i as u32,
                },
                topic,
            );
        }
    }
}

/// Assign one uniform random topic to every word occurrence, touching
/// only the document-side tables. Bootstrap for frozen-model
/// inference, where word-topic counts must stay fixed.
pub fn random_init_doc_only(stats: &mut SuffStats, corpus: &Corpus, rng: &mut SmallRng) {
    let k = stats.topic_num;
    for doc in &corpus.docs {
        for i in 0..doc.num_occurrences() {
            let topic = rng.random_range(0..k);
            stats.doc_topic.incr(doc.id, topic, 1);
            stats.assignment.insert(
                DocWord {
                    doc_id: doc.id,
                    word_idx: i,
                },
                topic,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use rand::SeedableRng;

    fn tiny_corpus() -> Corpus {
        Corpus::from_documents(vec![
            vec![(0, 2), (1, 1), (3, 1)],
            vec![(2, 3), (0, 1)],
        ])
    }

    #[test]
    fn test_random_init_consistency() {
        let corpus = tiny_corpus();
        let k = 4;
        let mut stats = SuffStats::new(&corpus, k);
        let mut rng = SmallRng::seed_from_u64(7);

        random_init(&mut stats, &corpus, &mut rng);

        // per-topic totals match word-topic column sums
        for kidx in 0..k {
            let col_sum: u32 = stats.wt().col(kidx).iter().sum();
            assert_eq!(col_sum, stats.word_topic_sum.get(kidx, 0));
        }

        // per-word row sums match corpus occurrence counts
        let mut word_counts = vec![0u32; corpus.vocab_size as usize];
        for doc in &corpus.docs {
            for w in doc.expanded() {
                word_counts[w as usize] += 1;
            }
        }
        for w in 0..corpus.vocab_size {
            let row_sum: u32 = stats.wt().row(w).iter().sum();
            assert_eq!(row_sum, word_counts[w as usize]);
        }

        // per-document row sums match document lengths
        for doc in &corpus.docs {
            let row_sum: u32 = stats.doc_topic.row(doc.id).iter().sum();
            assert_eq!(row_sum, doc.num_occurrences());
        }

        // one assignment per occurrence, all topics in range
        assert_eq!(
            stats.assignment.len() as u64,
            corpus.total_occurrences()
        );
        assert!(stats.assignment.values().all(|&t| t < k));
    }

    #[test]
    fn test_doc_only_init_leaves_word_tables_untouched() {
        let corpus = tiny_corpus();
        let mut stats = SuffStats::new(&corpus, 3);
        let mut rng = SmallRng::seed_from_u64(11);

        random_init_doc_only(&mut stats, &corpus, &mut rng);

        for kidx in 0..3 {
            assert_eq!(stats.word_topic_sum.get(kidx, 0), 0);
            assert!(stats.wt().col(kidx).iter().all(|&v| v == 0));
        }
        for doc in &corpus.docs {
            let row_sum: u32 = stats.doc_topic.row(doc.id).iter().sum();
            assert_eq!(row_sum, doc.num_occurrences());
        }
    }
}
