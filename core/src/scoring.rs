//! IDF, TF-IDF and BM25 scoring over a built [`SearchIndex`].
//!
//! Public methods take raw terms and normalize them with the engine's tokenizer;
//! a term that does not normalize to exactly one token is rejected. The
//! `*_normalized` helpers skip that step for terms that already came out of the
//! tokenizer (query processing), since stemming a stem is not guaranteed to be
//! a no-op.

use crate::config::Bm25Params;
use crate::error::Result;
use crate::index::SearchIndex;
use crate::tokenizer::Tokenizer;
use crate::DocId;

pub struct Scorer<'a> {
    index: &'a SearchIndex,
    tokenizer: &'a Tokenizer,
}

impl<'a> Scorer<'a> {
    pub fn new(index: &'a SearchIndex, tokenizer: &'a Tokenizer) -> Self {
        Self { index, tokenizer }
    }

    /// Raw occurrence count; 0 when the document or term is unknown.
    pub fn term_frequency(&self, doc_id: DocId, term: &str) -> Result<u32> {
        let term = self.tokenizer.normalize_term(term)?;
        Ok(self.index.stats().term_frequency(doc_id, &term))
    }

    /// `ln((N + 1) / (df + 1))`
    pub fn inverse_document_frequency(&self, term: &str) -> Result<f64> {
        let term = self.tokenizer.normalize_term(term)?;
        Ok(self.idf_normalized(&term))
    }

    pub fn tf_idf(&self, doc_id: DocId, term: &str) -> Result<f64> {
        let term = self.tokenizer.normalize_term(term)?;
        Ok(self.tf_idf_normalized(doc_id, &term))
    }

    /// `ln((N - df + 0.5) / (df + 0.5) + 1)`
    pub fn bm25_idf(&self, term: &str) -> Result<f64> {
        let term = self.tokenizer.normalize_term(term)?;
        Ok(self.bm25_idf_normalized(&term))
    }

    /// Length-normalized, saturating term frequency.
    pub fn bm25_tf(&self, doc_id: DocId, term: &str, params: Bm25Params) -> Result<f64> {
        params.validate()?;
        let term = self.tokenizer.normalize_term(term)?;
        let avg_doc_len = self.index.stats().average_doc_length()?;
        Ok(self.bm25_tf_normalized(doc_id, &term, params, avg_doc_len))
    }

    /// `bm25Idf(term) * bm25Tf(doc, term)`
    pub fn bm25(&self, doc_id: DocId, term: &str, params: Bm25Params) -> Result<f64> {
        params.validate()?;
        let term = self.tokenizer.normalize_term(term)?;
        let avg_doc_len = self.index.stats().average_doc_length()?;
        Ok(self.bm25_normalized(doc_id, &term, params, avg_doc_len))
    }

    fn counts(&self, term: &str) -> (f64, f64) {
        (self.index.num_docs() as f64, self.index.document_frequency(term) as f64)
    }

    pub(crate) fn idf_normalized(&self, term: &str) -> f64 {
        let (n, df) = self.counts(term);
        ((n + 1.0) / (df + 1.0)).ln()
    }

    pub(crate) fn tf_idf_normalized(&self, doc_id: DocId, term: &str) -> f64 {
        let tf = self.index.stats().term_frequency(doc_id, term) as f64;
        tf * self.idf_normalized(term)
    }

    pub(crate) fn bm25_idf_normalized(&self, term: &str) -> f64 {
        let (n, df) = self.counts(term);
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// `avg_doc_len` must be positive; callers obtain it from
    /// [`TermStats::average_doc_length`](crate::index::TermStats::average_doc_length)
    /// and check `params` with [`Bm25Params::validate`].
    pub(crate) fn bm25_tf_normalized(&self, doc_id: DocId, term: &str, params: Bm25Params, avg_doc_len: f64) -> f64 {
        let stats = self.index.stats();
        let tf = stats.term_frequency(doc_id, term) as f64;
        // The denominator is 0 for an absent term when k1 = 0, or when b = 1 and the document is empty.
        if tf == 0.0 {
            return 0.0;
        }
        let doc_len = stats.doc_length(doc_id) as f64;
        let Bm25Params { k1, b } = params;
        (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * (doc_len / avg_doc_len)))
    }

    pub(crate) fn bm25_normalized(&self, doc_id: DocId, term: &str, params: Bm25Params, avg_doc_len: f64) -> f64 {
        self.bm25_idf_normalized(term) * self.bm25_tf_normalized(doc_id, term, params, avg_doc_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Document;
    use crate::error::Error;

    fn brave_and_cars() -> SearchIndex {
        SearchIndex::build(
            vec![
                Document::new(1, "Brave", "A princess named Merida"),
                Document::new(2, "Cars", "Racing cars"),
            ],
            &Tokenizer::english(),
        )
    }

    /// Ten documents that all mention "movie"; only the first mentions "dragon".
    fn ten_movies() -> SearchIndex {
        let docs = (1..=10)
            .map(|i| {
                let extra = if i == 1 { " with a dragon" } else { "" };
                Document::new(i, format!("Movie {i}"), format!("a movie{extra}"))
            })
            .collect();
        SearchIndex::build(docs, &Tokenizer::english())
    }

    #[test]
    fn term_frequency_counts_and_defaults_to_zero() {
        let idx = brave_and_cars();
        let tok = Tokenizer::english();
        let s = Scorer::new(&idx, &tok);
        assert_eq!(s.term_frequency(2, "cars").unwrap(), 2);
        assert_eq!(s.term_frequency(1, "merida").unwrap(), 1);
        assert_eq!(s.term_frequency(404, "merida").unwrap(), 0);
        assert_eq!(s.term_frequency(1, "zebra").unwrap(), 0);
    }

    #[test]
    fn primitives_reject_multi_token_terms() {
        let idx = brave_and_cars();
        let tok = Tokenizer::english();
        let s = Scorer::new(&idx, &tok);
        assert!(matches!(s.term_frequency(1, "racing cars"), Err(Error::InvalidQueryTerm { .. })));
        assert!(matches!(s.inverse_document_frequency("the"), Err(Error::InvalidQueryTerm { .. })));
        assert!(matches!(s.bm25_idf(""), Err(Error::InvalidQueryTerm { .. })));
    }

    #[test]
    fn idf_matches_formula() {
        let idx = brave_and_cars();
        let tok = Tokenizer::english();
        let s = Scorer::new(&idx, &tok);
        let expected = (3.0f64 / 2.0).ln();
        assert!((s.inverse_document_frequency("merida").unwrap() - expected).abs() < 1e-12);
        assert!((s.inverse_document_frequency("unseen").unwrap() - 3.0f64.ln()).abs() < 1e-12);
        let tfidf = s.tf_idf(2, "cars").unwrap();
        assert!((tfidf - 2.0 * expected).abs() < 1e-12);
    }

    #[test]
    fn common_term_has_lower_idf() {
        let idx = ten_movies();
        let tok = Tokenizer::english();
        let s = Scorer::new(&idx, &tok);
        let common = s.inverse_document_frequency("movie").unwrap();
        let rare = s.inverse_document_frequency("dragon").unwrap();
        assert!(common < rare);
        assert!(common >= 0.0);
        assert!(s.bm25_idf("movie").unwrap() < s.bm25_idf("dragon").unwrap());
    }

    #[test]
    fn idf_non_increasing_in_document_frequency() {
        let tok = Tokenizer::english();
        let mut previous = f64::INFINITY;
        for df in 0..=6u32 {
            let docs = (1..=6)
                .map(|i| Document::new(i, "film", if i <= df { "shark" } else { "whale" }))
                .collect();
            let idx = SearchIndex::build(docs, &tok);
            let idf = Scorer::new(&idx, &tok).inverse_document_frequency("shark").unwrap();
            assert!(idf >= 0.0 && idf.is_finite());
            assert!(idf <= previous);
            previous = idf;
        }
    }

    #[test]
    fn bm25_components_finite_and_non_negative() {
        let idx = ten_movies();
        let tok = Tokenizer::english();
        let s = Scorer::new(&idx, &tok);
        let params = Bm25Params::default();
        for term in ["movie", "dragon", "unseen"] {
            let idf = s.bm25_idf(term).unwrap();
            assert!(idf.is_finite() && idf > 0.0, "{term}: {idf}");
            for doc in 0..=11 {
                let tf = s.bm25_tf(doc, term, params).unwrap();
                assert!(tf.is_finite() && tf >= 0.0, "{term}/{doc}: {tf}");
            }
        }
    }

    #[test]
    fn bm25_tf_matches_formula() {
        let idx = brave_and_cars();
        let tok = Tokenizer::english();
        let s = Scorer::new(&idx, &tok);
        let params = Bm25Params { k1: 1.2, b: 0.5 };
        // doc 2 has 3 tokens, average is 3.5, "car" occurs twice
        let expected = (2.0 * 2.2) / (2.0 + 1.2 * (1.0 - 0.5 + 0.5 * (3.0 / 3.5)));
        assert!((s.bm25_tf(2, "cars", params).unwrap() - expected).abs() < 1e-12);
        let full = s.bm25(2, "cars", params).unwrap();
        assert!((full - s.bm25_idf("cars").unwrap() * expected).abs() < 1e-12);
    }

    #[test]
    fn bm25_tf_is_zero_when_term_is_absent_at_parameter_extremes() {
        let idx = SearchIndex::build(
            vec![
                Document::new(1, "Brave", "A princess named Merida"),
                Document::new(2, "Cars", "Racing cars"),
                Document::new(3, "The", "a of the"),
            ],
            &Tokenizer::english(),
        );
        let tok = Tokenizer::english();
        let s = Scorer::new(&idx, &tok);
        assert_eq!(idx.stats().doc_length(3), 0);
        let full_length_norm = Bm25Params { k1: 1.5, b: 1.0 };
        let no_saturation = Bm25Params { k1: 0.0, b: 0.75 };
        for (doc, params) in [(99, full_length_norm), (3, full_length_norm), (2, no_saturation)] {
            let tf = s.bm25_tf(doc, "merida", params).unwrap();
            assert_eq!(tf, 0.0, "doc {doc} {params:?}");
            assert_eq!(s.bm25(doc, "merida", params).unwrap(), 0.0);
        }
        // k1 = 0 collapses to a presence indicator
        assert_eq!(s.bm25_tf(1, "merida", no_saturation).unwrap(), 1.0);
    }

    #[test]
    fn bm25_rejects_out_of_range_params() {
        let idx = brave_and_cars();
        let tok = Tokenizer::english();
        let s = Scorer::new(&idx, &tok);
        let negative_k1 = Bm25Params { k1: -1.0, b: 0.75 };
        assert!(matches!(s.bm25_tf(1, "merida", negative_k1), Err(Error::InvalidBm25Params { .. })));
        assert!(matches!(s.bm25(1, "merida", Bm25Params { k1: 1.5, b: 2.0 }), Err(Error::InvalidBm25Params { .. })));
        assert!(matches!(s.bm25_tf(1, "merida", Bm25Params { k1: f64::NAN, b: 0.75 }), Err(Error::InvalidBm25Params { .. })));
    }

    #[test]
    fn bm25_idf_defined_at_extremes() {
        let idx = ten_movies();
        let tok = Tokenizer::english();
        let s = Scorer::new(&idx, &tok);
        // df = N
        assert!(s.bm25_idf("movie").unwrap() > 0.0);
        // df = 0
        assert!(s.bm25_idf("unseen").unwrap().is_finite());
    }

    #[test]
    fn bm25_tf_on_empty_corpus_is_degenerate() {
        let idx = SearchIndex::build(Vec::new(), &Tokenizer::english());
        let tok = Tokenizer::english();
        let s = Scorer::new(&idx, &tok);
        assert!(matches!(s.bm25_tf(1, "merida", Bm25Params::default()), Err(Error::DegenerateCorpus)));
        assert_eq!(s.inverse_document_frequency("merida").unwrap(), 0.0);
    }
}
