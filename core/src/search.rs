use crate::config::{CandidateMode, Ranking, SearchOptions};
use crate::corpus::Document;
use crate::error::Result;
use crate::index::SearchIndex;
use crate::scoring::Scorer;
use crate::tokenizer::Tokenizer;
use crate::DocId;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub document: Document,
    /// Summed relevance over the query terms; 0 under [`Ranking::DocumentId`].
    pub score: f64,
}

/// Tokenize `query`, gather candidates from the posting lists and rank them.
///
/// Results are ordered by descending score with ascending document id as the
/// tie-break, then truncated to `opts.limit`.
pub fn search(index: &SearchIndex, tokenizer: &Tokenizer, query: &str, opts: &SearchOptions) -> Result<Vec<SearchHit>> {
    if opts.ranking == Ranking::Bm25 {
        opts.bm25.validate()?;
    }
    let terms = tokenizer.tokenize(query);
    if terms.is_empty() || opts.limit == 0 {
        return Ok(Vec::new());
    }

    let candidates = gather_candidates(index, &terms, opts);
    tracing::debug!(query, num_terms = terms.len(), num_candidates = candidates.len(), "gathered candidates");
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let scorer = Scorer::new(index, tokenizer);
    let mut scored: Vec<(DocId, f64)> = match opts.ranking {
        Ranking::DocumentId => candidates.into_iter().map(|id| (id, 0.0)).collect(),
        Ranking::TfIdf => candidates
            .into_iter()
            .map(|id| (id, terms.iter().map(|t| scorer.tf_idf_normalized(id, t)).sum()))
            .collect(),
        Ranking::Bm25 => {
            let avg_doc_len = index.stats().average_doc_length()?;
            candidates
                .into_iter()
                .map(|id| (id, terms.iter().map(|t| scorer.bm25_normalized(id, t, opts.bm25, avg_doc_len)).sum()))
                .collect()
        }
    };

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
    scored.truncate(opts.limit);

    Ok(scored
        .into_iter()
        .filter_map(|(id, score)| index.document(id).map(|doc| SearchHit { document: doc.clone(), score }))
        .collect())
}

/// Union of the posting lists of `terms`, in query-term order.
fn gather_candidates(index: &SearchIndex, terms: &[String], opts: &SearchOptions) -> BTreeSet<DocId> {
    let mut candidates = BTreeSet::new();
    for term in terms {
        for &doc_id in index.documents(term) {
            if opts.candidates == CandidateMode::Bounded && candidates.len() >= opts.limit {
                return candidates;
            }
            candidates.insert(doc_id);
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Bm25Params;

    fn ids(hits: &[SearchHit]) -> Vec<DocId> {
        hits.iter().map(|h| h.document.id).collect()
    }

    fn brave_and_cars() -> SearchIndex {
        SearchIndex::build(
            vec![
                Document::new(1, "Brave", "A princess named Merida"),
                Document::new(2, "Cars", "Racing cars"),
            ],
            &Tokenizer::english(),
        )
    }

    #[test]
    fn single_term_queries() {
        let idx = brave_and_cars();
        let tok = Tokenizer::english();
        let opts = SearchOptions::default();
        assert_eq!(ids(&search(&idx, &tok, "merida", &opts).unwrap()), vec![1]);
        assert_eq!(ids(&search(&idx, &tok, "cars", &opts).unwrap()), vec![2]);
    }

    #[test]
    fn multi_term_query_ranks_by_bm25() {
        let idx = brave_and_cars();
        let tok = Tokenizer::english();
        let hits = search(&idx, &tok, "princess racing", &SearchOptions::default()).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
        // doc 2 is shorter, so its single match scores higher
        assert_eq!(ids(&hits), vec![2, 1]);
    }

    #[test]
    fn stopword_only_query_is_empty() {
        let idx = brave_and_cars();
        let hits = search(&idx, &Tokenizer::english(), "the a of", &SearchOptions::default()).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn no_match_is_empty() {
        let idx = brave_and_cars();
        let hits = search(&idx, &Tokenizer::english(), "zeppelin", &SearchOptions::default()).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn relevance_beats_identifier_order() {
        let docs = vec![
            Document::new(1, "Jaws", "a shark story about a beach town"),
            Document::new(2, "Shark Tale", "shark shark shark"),
        ];
        let idx = SearchIndex::build(docs, &Tokenizer::english());
        let tok = Tokenizer::english();

        let by_score = search(&idx, &tok, "shark", &SearchOptions::default()).unwrap();
        assert_eq!(ids(&by_score), vec![2, 1]);

        let legacy = SearchOptions { ranking: Ranking::DocumentId, ..SearchOptions::default() };
        let by_id = search(&idx, &tok, "shark", &legacy).unwrap();
        assert_eq!(ids(&by_id), vec![1, 2]);
        assert!(by_id.iter().all(|h| h.score == 0.0));
    }

    #[test]
    fn tfidf_ranking() {
        let docs = vec![
            Document::new(1, "Jaws", "shark"),
            Document::new(2, "Shark Tale", "shark shark"),
            Document::new(3, "Nemo", "fish"),
        ];
        let idx = SearchIndex::build(docs, &Tokenizer::english());
        let opts = SearchOptions { ranking: Ranking::TfIdf, ..SearchOptions::default() };
        let hits = search(&idx, &Tokenizer::english(), "shark", &opts).unwrap();
        assert_eq!(ids(&hits), vec![2, 1]);
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn equal_scores_tie_break_on_id() {
        let docs = vec![
            Document::new(9, "Twin", "robot"),
            Document::new(4, "Twin", "robot"),
        ];
        let idx = SearchIndex::build(docs, &Tokenizer::english());
        let hits = search(&idx, &Tokenizer::english(), "robot", &SearchOptions::default()).unwrap();
        assert_eq!(ids(&hits), vec![4, 9]);
    }

    fn recall_corpus() -> SearchIndex {
        // "alpha" only reaches docs 1..=3; doc 4 is the strongest "omega" match
        let docs = vec![
            Document::new(1, "One", "alpha filler words here"),
            Document::new(2, "Two", "alpha filler words here"),
            Document::new(3, "Three", "alpha filler words here"),
            Document::new(4, "Four", "omega omega"),
        ];
        SearchIndex::build(docs, &Tokenizer::english())
    }

    #[test]
    fn bounded_candidates_can_miss_later_matches() {
        let idx = recall_corpus();
        let opts = SearchOptions { limit: 2, ..SearchOptions::default() };
        let hits = search(&idx, &Tokenizer::english(), "alpha omega", &opts).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(!ids(&hits).contains(&4));
    }

    #[test]
    fn unbounded_candidates_rank_everything() {
        let idx = recall_corpus();
        let opts = SearchOptions { limit: 2, candidates: CandidateMode::Unbounded, ..SearchOptions::default() };
        let hits = search(&idx, &Tokenizer::english(), "alpha omega", &opts).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document.id, 4);
    }

    #[test]
    fn limit_truncates() {
        let idx = recall_corpus();
        let opts = SearchOptions { limit: 1, candidates: CandidateMode::Unbounded, bm25: Bm25Params::default(), ..SearchOptions::default() };
        assert_eq!(search(&idx, &Tokenizer::english(), "alpha", &opts).unwrap().len(), 1);
        let zero = SearchOptions { limit: 0, ..SearchOptions::default() };
        assert!(search(&idx, &Tokenizer::english(), "alpha", &zero).unwrap().is_empty());
    }

    #[test]
    fn bm25_ranking_rejects_invalid_params() {
        let idx = brave_and_cars();
        let tok = Tokenizer::english();
        let bad = Bm25Params { k1: -1.0, b: 0.75 };
        let opts = SearchOptions { bm25: bad, ..SearchOptions::default() };
        let err = search(&idx, &tok, "merida", &opts).unwrap_err();
        assert!(matches!(err, crate::error::Error::InvalidBm25Params { .. }));
        let by_id = SearchOptions { bm25: bad, ranking: Ranking::DocumentId, ..SearchOptions::default() };
        assert_eq!(ids(&search(&idx, &tok, "merida", &by_id).unwrap()), vec![1]);
    }
}
