//! # wordvec
//!
//! A parallel stochastic-gradient trainer that produces dense word
//! embeddings from a plain-text corpus, using either a continuous-bag-of-
//! words (CBOW) or skip-gram objective, with either hierarchical softmax
//! or negative sampling.
//!
//! The three load-bearing pieces are:
//! * `vocab` — an open-addressed vocabulary index with reduction-on-fill
//!   and frequency sort.
//! * `huffman` — the binary code/point assignment that makes
//!   hierarchical softmax tractable.
//! * `worker` together with `trainer` — the concurrent training loop:
//!   multiple threads mutate shared embedding matrices without locks, each
//!   scanning a disjoint byte range of the training file (see `params`).
//!
//! `tokenizer`, `unigram`, `sigmoid`, and `output` round out the data
//! model; `output` also includes the optional K-means clustering pass and
//! the read-back helpers used by companion tools (a phrase detector, an
//! analogy evaluator) that are out of scope for this crate.

pub mod huffman;
pub mod output;
pub mod params;
pub mod sigmoid;
pub mod tokenizer;
pub mod trainer;
pub mod unigram;
pub mod vocab;
pub mod worker;

pub(crate) type DYNERR = Box<dyn std::error::Error>;
pub(crate) type STDRESULT = Result<(), DYNERR>;

/// Longest token kept verbatim; longer tokens are truncated.
pub const MAX_STRING: usize = 100;
/// Longest Huffman code/point path assigned to any vocabulary entry.
pub const MAX_CODE_LENGTH: usize = 40;
/// Longest sentence buffer a worker will accumulate before forcing a break.
pub const MAX_SENTENCE_LENGTH: usize = 1000;
/// Number of buckets in the sigmoid lookup table.
pub const EXP_TABLE_SIZE: usize = 1000;
/// Domain bound of the sigmoid lookup table; `|x| >= MAX_EXP` is clamped.
pub const MAX_EXP: f64 = 6.0;
/// Size of the unigram sampling table.
pub const UNIGRAM_TABLE_SIZE: usize = 100_000_000;
/// Size of the vocabulary's open-addressed hash table.
pub const VOCAB_HASH_SIZE: usize = 30_000_000;

/// Library errors. CLI-level concerns (malformed flags) are handled in
/// `main.rs`; these are the failures that can occur while driving the
/// vocabulary/training pipeline itself.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("training data file not found: {0}")]
    MissingTrainingFile(String),
    #[error("vocabulary file not found: {0}")]
    MissingVocabFile(String),
    #[error("malformed vocabulary line: {0:?}")]
    MalformedVocabLine(String),
    #[error("word vector dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
