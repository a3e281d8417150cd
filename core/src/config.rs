//! Tunables for ranking and candidate gathering.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BM25_K1: f64 = 1.5;
pub const DEFAULT_BM25_B: f64 = 0.75;
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// BM25 term-frequency saturation (`k1`) and length normalization (`b`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: DEFAULT_BM25_K1, b: DEFAULT_BM25_B }
    }
}

impl Bm25Params {
    /// `k1` must be finite and non-negative, `b` must lie in `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        let k1_ok = self.k1.is_finite() && self.k1 >= 0.0;
        let b_ok = (0.0..=1.0).contains(&self.b);
        if k1_ok && b_ok {
            Ok(())
        } else {
            Err(Error::InvalidBm25Params { k1: self.k1, b: self.b })
        }
    }
}

/// How many candidates the query processor gathers before ranking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateMode {
    /// Stop the posting-list union once `limit` distinct documents are collected.
    /// Later postings are never scored, so a better match can be missed.
    #[default]
    Bounded,
    /// Union every posting list before ranking.
    Unbounded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ranking {
    /// Sum of `bm25Idf * bm25Tf` over the query terms.
    #[default]
    Bm25,
    /// Sum of `tf * idf` over the query terms.
    TfIdf,
    /// Ascending document identifier with no scoring, as the legacy keyword search did.
    DocumentId,
}

impl std::str::FromStr for Ranking {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bm25" => Ok(Ranking::Bm25),
            "tfidf" | "tf-idf" => Ok(Ranking::TfIdf),
            "id" | "docid" | "documentid" => Ok(Ranking::DocumentId),
            other => Err(format!("unknown ranking {other:?} (expected bm25, tfidf or id)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub limit: usize,
    pub candidates: CandidateMode,
    pub ranking: Ranking,
    pub bm25: Bm25Params,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_SEARCH_LIMIT,
            candidates: CandidateMode::default(),
            ranking: Ranking::default(),
            bm25: Bm25Params::default(),
        }
    }
}
