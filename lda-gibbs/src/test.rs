//! End-to-end scenarios exercising both samplers through the public
//! model surface.

use crate::corpus::Corpus;
use crate::model::{build_model, InferMode, LdaOptions, ModelKind, TopicModel};
use table_util::common_io::create_temp_dir_file;
use table_util::f32_matrix::F32Matrix;

/// Two documents with disjoint vocabularies: V=4, trivially separable
/// with two topics.
fn two_doc_corpus() -> Corpus {
    Corpus::from_documents(vec![
        vec![(0, 10), (1, 10)],
        vec![(2, 10), (3, 10)],
    ])
}

/// Ten documents in three groups with disjoint word pairs.
fn clustered_corpus() -> Corpus {
    let mut docs = Vec::new();
    for _ in 0..4 {
        docs.push(vec![(0, 6), (1, 6)]);
    }
    for _ in 0..3 {
        docs.push(vec![(2, 6), (3, 6)]);
    }
    for _ in 0..3 {
        docs.push(vec![(4, 6), (5, 6)]);
    }
    Corpus::from_documents(docs)
}

fn argmax_rows(theta: &F32Matrix) -> Vec<usize> {
    let (nrow, ncol) = theta.shape();
    (0..nrow)
        .map(|r| {
            let row = theta.row(r);
            let mut best = 0usize;
            for c in 1..ncol as usize {
                if row[c] > row[best] {
                    best = c;
                }
            }
            best
        })
        .collect()
}

/// Train on the tiny corpus and check that the likelihood trace is
/// non-decreasing across at least 80% of consecutive probes and that
/// the emitted tables are proper distributions.
fn check_tiny_corpus_convergence(kind: ModelKind) -> anyhow::Result<()> {
    let options = LdaOptions {
        topic_num: 2,
        alpha: 0.01,
        beta: 0.01,
        seed: Some(42),
        ..LdaOptions::default()
    };
    let mut model = build_model(kind, two_doc_corpus(), options);
    let trace = model.train(50)?;

    let ll = &trace.log_likelihood;
    assert!(ll.len() >= 2, "expected several probes, got {:?}", ll);
    let pairs = ll.len() - 1;
    let good = ll.windows(2).filter(|p| p[1] >= p[0]).count();
    assert!(
        good * 5 >= pairs * 4,
        "only {}/{} probe steps non-decreasing: {:?}",
        good,
        pairs,
        ll
    );
    assert!(
        ll[ll.len() - 1] > ll[0],
        "likelihood did not improve: {:?}",
        ll
    );

    let phi = model.phi();
    let (vocab_size, topic_num) = phi.shape();
    for k in 0..topic_num {
        let col_sum: f32 = (0..vocab_size).map(|v| phi.get(v, k)).sum();
        assert!(
            (col_sum - 1.0).abs() < 1e-5,
            "phi column {} sums to {}",
            k,
            col_sum
        );
    }

    let theta = model.theta();
    let (doc_num, _) = theta.shape();
    for d in 0..doc_num {
        let row_sum: f32 = theta.row(d).iter().sum();
        assert!(
            (row_sum - 1.0).abs() < 1e-5,
            "theta row {} sums to {}",
            d,
            row_sum
        );
    }
    Ok(())
}

#[test]
fn test_dense_tiny_corpus_convergence() -> anyhow::Result<()> {
    check_tiny_corpus_convergence(ModelKind::Dense)
}

#[test]
fn test_sparse_tiny_corpus_convergence() -> anyhow::Result<()> {
    check_tiny_corpus_convergence(ModelKind::Sparse)
}

/// Train a 3-topic model, persist the word-topic counts, reload them
/// into a fresh sampler, run held-out inference on the same corpus,
/// and check that per-document argmax topics agree for at least 70%
/// of documents.
fn check_train_save_load_infer(kind: ModelKind) -> anyhow::Result<()> {
    let corpus = clustered_corpus();
    let options = LdaOptions {
        topic_num: 3,
        seed: Some(11),
        ..LdaOptions::default()
    };

    let mut trained = build_model(kind, corpus.clone(), options.clone());
    trained.train(60)?;
    let train_labels = argmax_rows(&trained.theta());

    let prefix = create_temp_dir_file("")?;
    let prefix = prefix.to_str().unwrap();
    trained.save_word_topic(prefix)?;

    let infer_options = LdaOptions {
        seed: Some(99),
        infer_mode: InferMode::Frozen,
        ..options
    };
    let mut fresh = build_model(kind, corpus, infer_options);
    fresh.load_word_topic(prefix)?;
    fresh.infer(20)?;
    let infer_labels = argmax_rows(&fresh.theta());

    let agree = train_labels
        .iter()
        .zip(infer_labels.iter())
        .filter(|(a, b)| a == b)
        .count();
    assert!(
        agree * 10 >= train_labels.len() * 7,
        "only {}/{} documents agree on argmax topic",
        agree,
        train_labels.len()
    );
    Ok(())
}

#[test]
fn test_dense_train_save_load_infer() -> anyhow::Result<()> {
    check_train_save_load_infer(ModelKind::Dense)
}

#[test]
fn test_sparse_train_save_load_infer() -> anyhow::Result<()> {
    check_train_save_load_infer(ModelKind::Sparse)
}

/// Refit inference keeps sampling all tables; the word-topic mass
/// must grow by exactly the new corpus size.
#[test]
fn test_refit_infer_adds_corpus_mass() -> anyhow::Result<()> {
    let corpus = clustered_corpus();
    let options = LdaOptions {
        topic_num: 3,
        seed: Some(5),
        ..LdaOptions::default()
    };

    let mut trained = build_model(ModelKind::Dense, corpus.clone(), options.clone());
    trained.train(30)?;

    let prefix = create_temp_dir_file("")?;
    let prefix = prefix.to_str().unwrap();
    trained.save_word_topic(prefix)?;

    let refit_options = LdaOptions {
        infer_mode: InferMode::Refit,
        ..options
    };
    let mut fresh = build_model(ModelKind::Dense, corpus.clone(), refit_options);
    fresh.load_word_topic(prefix)?;
    fresh.infer(5)?;

    fresh.save_word_topic(&format!("{}-refit", prefix))?;
    let before = table_util::triplet_io::read_u32_triplets(&format!("{}.wt", prefix))?;
    let after = table_util::triplet_io::read_u32_triplets(&format!("{}-refit.wt", prefix))?;

    let sum = |m: &table_util::u32_matrix::U32Matrix| -> u64 {
        let (nrow, _) = m.shape();
        (0..nrow)
            .map(|r| m.row(r).iter().map(|&v| v as u64).sum::<u64>())
            .sum()
    };
    assert_eq!(
        sum(&after),
        sum(&before) + corpus.total_occurrences(),
        "refit mass mismatch"
    );
    Ok(())
}
