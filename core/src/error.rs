use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the indexing and ranking engine.
#[derive(Error, Debug)]
pub enum Error {
    /// A scoring primitive was given a term that does not normalize to exactly one token.
    #[error("term {term:?} must normalize to exactly one token, got {tokens}")]
    InvalidQueryTerm { term: String, tokens: usize },

    /// BM25 tunables outside their domain: `k1` finite and >= 0, `b` in `[0, 1]`.
    #[error("invalid BM25 parameters k1={k1}, b={b}: k1 must be finite and >= 0, b must be in [0, 1]")]
    InvalidBm25Params { k1: f64, b: f64 },

    #[error("corpus at {path:?} is unavailable: {source}")]
    CorpusUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A corpus record is missing a required field or has the wrong shape.
    #[error("corpus record {position} is malformed: {reason}")]
    MalformedDocument { position: usize, reason: String },

    #[error("index not built: run `moviesearch build` first")]
    IndexNotBuilt,

    #[error("no snapshot found")]
    SnapshotMissing,

    #[error("snapshot part {part:?} is corrupt: {reason}")]
    SnapshotCorrupt { part: &'static str, reason: String },

    #[error("snapshot version {found} is not supported (expected {expected})")]
    SnapshotVersion { found: u32, expected: u32 },

    /// The corpus has no tokens, so average document length is undefined.
    #[error("corpus is degenerate: average document length is zero")]
    DegenerateCorpus,

    #[error("snapshot storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn corrupt(part: &'static str, reason: impl ToString) -> Self {
        Error::SnapshotCorrupt { part, reason: reason.to_string() }
    }
}
