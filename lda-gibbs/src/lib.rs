//! Latent Dirichlet Allocation by collapsed Gibbs sampling.
//!
//! Trains topic models over bag-of-words corpora and infers
//! document-topic mixtures for new documents against a saved model.
//! Two samplers share one set of sufficient statistics:
//!
//! * a dense sampler drawing from the full K-way collapsed
//!   conditional, and
//! * a sparse sampler using the smoothing / document-topic /
//!   topic-word bucket decomposition over a count-sorted sparse
//!   word-topic map, whose per-word cost tracks the word's distinct
//!   topic count.
//!
//! # References
//!
//! Griffiths & Steyvers (2004). "Finding scientific topics." PNAS 101.
//!
//! Yao, Mimno & McCallum (2009). "Efficient methods for topic model
//! inference on streaming document collections." KDD '09.

#![deny(missing_docs)]

/// Bag-of-words corpus model and loader
pub mod corpus;

/// Dense collapsed Gibbs sampler
pub mod dense;

/// Model trait, options, factory, and shared estimation routines
pub mod model;

/// Sparse three-bucket Gibbs sampler
pub mod sparse;

/// Sufficient-statistics holder and random initialization
pub mod suff_stats;

#[cfg(test)]
mod test;

pub use corpus::Corpus;
pub use model::{build_model, InferMode, LdaOptions, ModelKind, TopicModel, TrainTrace};
