//! Bag-of-words corpus: documents as ordered `(word, count)` pairs.
//!
//! Input format is one document per line, whitespace-delimited:
//!
//! ```text
//! docId wordId:count wordId:count ...
//! ```
//!
//! Lines with fewer than two tokens and tokens that are not a
//! `wordId:count` pair are skipped with a warning; ids or counts that
//! fail to parse as `u32` abort the load.

use anyhow::Context;
use fnv::FnvHashMap;
use std::io::BufRead;
use log::{info, warn};
use rayon::prelude::*;
use table_util::common_io::open_buf_reader;

/// Dense zero-based document identifier.
pub type DocId = u32;

/// Dense zero-based word identifier.
pub type WordId = u32;

/// One `(word, count)` pair of a document's bag of words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordCount {
    /// Word identifier.
    pub word_id: WordId,
    /// Occurrence count of the word in the document.
    pub count: u32,
}

/// A document: its id plus word counts in stored order.
///
/// Pair order is load order and must stay fixed: occurrence indices
/// used as assignment keys are positions in the expansion of these
/// pairs.
#[derive(Debug, Clone)]
pub struct Document {
    /// Document identifier.
    pub id: DocId,
    /// Word counts in stored order.
    pub words: Vec<WordCount>,
}

impl Document {
    /// Expand the `(word, count)` pairs into one `WordId` per
    /// occurrence, in pair order.
    pub fn expanded(&self) -> impl Iterator<Item = WordId> + '_ {
        self.words
            .iter()
            .flat_map(|wc| std::iter::repeat(wc.word_id).take(wc.count as usize))
    }

    /// Total number of word occurrences in the document.
    pub fn num_occurrences(&self) -> u32 {
        self.words.iter().map(|wc| wc.count).sum()
    }
}

/// A training or inference corpus.
#[derive(Debug, Clone)]
pub struct Corpus {
    /// `max(word id) + 1` over all documents.
    pub vocab_size: u32,
    /// Documents sorted by id, so sweeps visit them in a stable order.
    pub docs: Vec<Document>,
}

/// Outcome of parsing one corpus line.
enum ParsedLine {
    Skipped,
    Doc {
        id: DocId,
        words: Vec<WordCount>,
        bad_tokens: usize,
    },
}

impl Corpus {
    /// Number of documents.
    pub fn doc_num(&self) -> u32 {
        self.docs.len() as u32
    }

    /// Total word occurrences across all documents.
    pub fn total_occurrences(&self) -> u64 {
        self.docs
            .iter()
            .map(|d| d.num_occurrences() as u64)
            .sum()
    }

    /// Build a corpus directly from documents keyed by dense ids.
    ///
    /// `docs[d]` holds the `(word, count)` pairs of document `d`.
    pub fn from_documents(docs: Vec<Vec<(WordId, u32)>>) -> Self {
        let mut vocab_size = 0;
        let docs = docs
            .into_iter()
            .enumerate()
            .map(|(id, pairs)| {
                let words = pairs
                    .into_iter()
                    .map(|(word_id, count)| {
                        vocab_size = vocab_size.max(word_id + 1);
                        WordCount { word_id, count }
                    })
                    .collect();
                Document {
                    id: id as DocId,
                    words,
                }
            })
            .collect();
        Corpus { vocab_size, docs }
    }

    /// Load a corpus from a (possibly gzipped) text file.
    pub fn load(input_file: &str) -> anyhow::Result<Self> {
        let buf = open_buf_reader(input_file)
            .with_context(|| format!("failed to open corpus {}", input_file))?;
        let lines: Vec<String> = buf
            .lines()
            .collect::<Result<_, _>>()
            .with_context(|| format!("failed to read corpus {}", input_file))?;

        // parsing dominates load time; fan it out like the line
        // readers do, then fold sequentially to keep pair order
        let parsed: Vec<ParsedLine> = lines
            .par_iter()
            .map(|line| parse_line(line))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut docs_by_id: FnvHashMap<DocId, Vec<WordCount>> = FnvHashMap::default();
        let mut order: Vec<DocId> = Vec::new();
        let mut vocab_max = 0u32;
        let mut skipped_lines = 0usize;
        let mut skipped_tokens = 0usize;

        for entry in parsed {
            match entry {
                ParsedLine::Skipped => skipped_lines += 1,
                ParsedLine::Doc {
                    id,
                    words,
                    bad_tokens,
                } => {
                    skipped_tokens += bad_tokens;
                    for wc in &words {
                        vocab_max = vocab_max.max(wc.word_id);
                    }
                    let slot = docs_by_id.entry(id).or_default();
                    if slot.is_empty() {
                        order.push(id);
                    }
                    slot.extend(words);
                }
            }
        }

        if docs_by_id.is_empty() {
            anyhow::bail!("no documents found in {}", input_file);
        }

        order.sort_unstable();
        let max_id = *order.last().unwrap_or(&0);
        if max_id as usize + 1 != order.len() {
            anyhow::bail!(
                "document ids must be dense and zero-based: {} documents but max id {}",
                order.len(),
                max_id
            );
        }

        let docs: Vec<Document> = order
            .into_iter()
            .map(|id| Document {
                id,
                words: docs_by_id.remove(&id).unwrap_or_default(),
            })
            .collect();

        let corpus = Corpus {
            vocab_size: vocab_max + 1,
            docs,
        };

        info!("number of documents {}", corpus.doc_num());
        info!("vocabulary size {}", corpus.vocab_size);
        if skipped_lines + skipped_tokens > 0 {
            warn!(
                "skipped {} lines and {} tokens while loading {}",
                skipped_lines, skipped_tokens, input_file
            );
        }

        Ok(corpus)
    }
}

fn parse_line(line: &str) -> anyhow::Result<ParsedLine> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 2 {
        warn!("bad document: {}", line);
        return Ok(ParsedLine::Skipped);
    }

    let id: DocId = tokens[0]
        .parse()
        .with_context(|| format!("bad document id: {}", tokens[0]))?;

    let mut words = Vec::with_capacity(tokens.len() - 1);
    let mut bad_tokens = 0usize;
    for token in &tokens[1..] {
        let Some((word, count)) = token.split_once(':') else {
            warn!("bad word count: {}", token);
            bad_tokens += 1;
            continue;
        };
        if count.contains(':') {
            warn!("bad word count: {}", token);
            bad_tokens += 1;
            continue;
        }
        let word_id: WordId = word
            .parse()
            .with_context(|| format!("bad word id: {}", token))?;
        let count: u32 = count
            .parse()
            .with_context(|| format!("bad word count: {}", token))?;
        words.push(WordCount { word_id, count });
    }

    Ok(ParsedLine::Doc {
        id,
        words,
        bad_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_corpus(content: &str) -> anyhow::Result<std::path::PathBuf> {
        let path = table_util::common_io::create_temp_dir_file(".txt")?;
        let mut f = std::fs::File::create(&path)?;
        write!(f, "{}", content)?;
        Ok(path)
    }

    #[test]
    fn test_load_basic() -> anyhow::Result<()> {
        let path = write_corpus("0 0:2 3:1\n1 1:1 2:4\n")?;
        let corpus = Corpus::load(path.to_str().unwrap())?;

        assert_eq!(corpus.doc_num(), 2);
        assert_eq!(corpus.vocab_size, 4);
        assert_eq!(corpus.total_occurrences(), 8);

        let words: Vec<WordId> = corpus.docs[0].expanded().collect();
        assert_eq!(words, vec![0, 0, 3]);
        Ok(())
    }

    #[test]
    fn test_short_lines_and_bad_tokens_are_skipped() -> anyhow::Result<()> {
        let path = write_corpus("0 0:1 nonsense 2:2\njunk\n1 1:3\n")?;
        let corpus = Corpus::load(path.to_str().unwrap())?;

        assert_eq!(corpus.doc_num(), 2);
        let words: Vec<WordId> = corpus.docs[0].expanded().collect();
        assert_eq!(words, vec![0, 2, 2]);
        Ok(())
    }

    #[test]
    fn test_bad_doc_id_is_fatal() -> anyhow::Result<()> {
        let path = write_corpus("zero 0:1 1:1\n")?;
        assert!(Corpus::load(path.to_str().unwrap()).is_err());
        Ok(())
    }

    #[test]
    fn test_bad_count_is_fatal() -> anyhow::Result<()> {
        let path = write_corpus("0 0:x 1:1\n")?;
        assert!(Corpus::load(path.to_str().unwrap()).is_err());
        Ok(())
    }

    #[test]
    fn test_duplicate_doc_lines_merge() -> anyhow::Result<()> {
        let path = write_corpus("0 0:1 1:1\n1 2:1 0:1\n0 2:5\n")?;
        let corpus = Corpus::load(path.to_str().unwrap())?;

        assert_eq!(corpus.doc_num(), 2);
        let words: Vec<WordId> = corpus.docs[0].expanded().collect();
        assert_eq!(words, vec![0, 1, 2, 2, 2, 2, 2]);
        Ok(())
    }

    #[test]
    fn test_sparse_doc_ids_are_rejected() -> anyhow::Result<()> {
        let path = write_corpus("0 0:1 1:1\n5 2:1 0:1\n")?;
        assert!(Corpus::load(path.to_str().unwrap()).is_err());
        Ok(())
    }

    #[test]
    fn test_empty_corpus_is_fatal() -> anyhow::Result<()> {
        let path = write_corpus("junk\n")?;
        assert!(Corpus::load(path.to_str().unwrap()).is_err());
        Ok(())
    }
}
