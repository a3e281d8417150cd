//! Keyword search over a movie corpus: tokenization, an inverted index with
//! term statistics, TF-IDF/BM25 scoring, and snapshot persistence.

pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod index;
pub mod persist;
pub mod scoring;
pub mod search;
pub mod tokenizer;

pub type DocId = u32;

pub use config::{Bm25Params, CandidateMode, Ranking, SearchOptions};
pub use corpus::{load_stopwords, CorpusSource, Document, JsonCorpus};
pub use engine::Engine;
pub use error::{Error, Result};
pub use index::SearchIndex;
pub use persist::SnapshotStore;
pub use search::SearchHit;
pub use tokenizer::Tokenizer;
