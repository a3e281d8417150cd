use crate::corpus::Document;
use crate::error::{Error, Result};
use crate::tokenizer::Tokenizer;
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type DocumentMap = BTreeMap<DocId, Document>;

/// term -> ascending, duplicate-free document ids. No term maps to an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertedIndex {
    postings: BTreeMap<String, Vec<DocId>>,
}

impl InvertedIndex {
    pub fn get_documents(&self, term: &str) -> &[DocId] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn terms(&self) -> impl Iterator<Item = (&str, &[DocId])> {
        self.postings.iter().map(|(t, p)| (t.as_str(), p.as_slice()))
    }

    fn add(&mut self, term: &str, doc_id: DocId) {
        let plist = self.postings.entry(term.to_string()).or_default();
        if plist.last() != Some(&doc_id) && !plist.contains(&doc_id) {
            plist.push(doc_id);
        }
    }

    fn sort_postings(&mut self) {
        for plist in self.postings.values_mut() {
            plist.sort_unstable();
        }
    }
}

/// Per-document term counts and token lengths, used by the scorers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermStats {
    term_frequencies: BTreeMap<DocId, BTreeMap<String, u32>>,
    doc_lengths: BTreeMap<DocId, u32>,
}

impl TermStats {
    pub(crate) fn from_tables(term_frequencies: BTreeMap<DocId, BTreeMap<String, u32>>, doc_lengths: BTreeMap<DocId, u32>) -> Self {
        Self { term_frequencies, doc_lengths }
    }

    /// Occurrences of a normalized term in a document; 0 when either is unknown.
    pub fn term_frequency(&self, doc_id: DocId, term: &str) -> u32 {
        self.term_frequencies
            .get(&doc_id)
            .and_then(|counts| counts.get(term))
            .copied()
            .unwrap_or(0)
    }

    /// Token count after normalization; absent documents have length 0.
    pub fn doc_length(&self, doc_id: DocId) -> u32 {
        self.doc_lengths.get(&doc_id).copied().unwrap_or(0)
    }

    /// Mean document length. Undefined for an empty corpus or one with no tokens at all.
    pub fn average_doc_length(&self) -> Result<f64> {
        let total: u64 = self.doc_lengths.values().map(|&l| l as u64).sum();
        if self.doc_lengths.is_empty() || total == 0 {
            return Err(Error::DegenerateCorpus);
        }
        Ok(total as f64 / self.doc_lengths.len() as f64)
    }

    pub fn term_frequencies(&self) -> &BTreeMap<DocId, BTreeMap<String, u32>> { &self.term_frequencies }

    pub fn doc_lengths(&self) -> &BTreeMap<DocId, u32> { &self.doc_lengths }
}

/// The fully built, read-only search state: inverted index, document map and
/// term statistics. Produced in one pass over the corpus and never mutated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchIndex {
    index: InvertedIndex,
    docs: DocumentMap,
    stats: TermStats,
}

impl SearchIndex {
    /// Build from the full corpus. When identifiers collide the last record wins.
    pub fn build(documents: Vec<Document>, tokenizer: &Tokenizer) -> Self {
        let mut docs = DocumentMap::new();
        for doc in documents {
            let id = doc.id;
            if docs.insert(id, doc).is_some() {
                tracing::warn!(doc_id = id, "duplicate document id, keeping the last record");
            }
        }

        let mut index = InvertedIndex::default();
        let mut stats = TermStats::default();
        for (&doc_id, doc) in &docs {
            let tokens = tokenizer.tokenize(&doc.text());
            let mut counts: BTreeMap<String, u32> = BTreeMap::new();
            for token in &tokens {
                *counts.entry(token.clone()).or_insert(0) += 1;
            }
            for term in counts.keys() {
                index.add(term, doc_id);
            }
            stats.doc_lengths.insert(doc_id, tokens.len() as u32);
            stats.term_frequencies.insert(doc_id, counts);
        }
        index.sort_postings();

        tracing::info!(num_docs = docs.len(), num_terms = index.num_terms(), "built index");
        Self { index, docs, stats }
    }

    /// Reassemble from persisted parts, rejecting any combination that breaks
    /// the index/statistics invariants.
    pub(crate) fn from_parts(index: InvertedIndex, docs: DocumentMap, stats: TermStats) -> Result<Self> {
        let mut pairs = 0usize;
        for (term, plist) in &index.postings {
            if plist.is_empty() {
                return Err(Error::corrupt("index", format!("term {term:?} has an empty posting list")));
            }
            if plist.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Error::corrupt("index", format!("posting list for {term:?} is not strictly ascending")));
            }
            if let Some(missing) = plist.iter().find(|id| !docs.contains_key(*id)) {
                return Err(Error::corrupt("docmap", format!("document {missing} referenced by {term:?} is missing")));
            }
            pairs += plist.len();
        }

        let mut counted = 0usize;
        for (doc_id, counts) in &stats.term_frequencies {
            let mut len = 0u64;
            for (term, &count) in counts {
                if count == 0 { continue; }
                if index.get_documents(term).binary_search(doc_id).is_err() {
                    return Err(Error::corrupt("term_frequencies", format!("document {doc_id} counts {term:?} but is not in its posting list")));
                }
                counted += 1;
                len += count as u64;
            }
            if len != stats.doc_length(*doc_id) as u64 {
                return Err(Error::corrupt("doc_lengths", format!("length of document {doc_id} disagrees with its term counts")));
            }
        }
        if counted != pairs {
            return Err(Error::corrupt("term_frequencies", "posting lists reference documents without term counts"));
        }
        if stats.doc_lengths.keys().ne(docs.keys()) {
            return Err(Error::corrupt("doc_lengths", "document length table does not cover the document map"));
        }
        if stats.term_frequencies.keys().ne(docs.keys()) {
            return Err(Error::corrupt("term_frequencies", "term frequency table does not cover the document map"));
        }

        Ok(Self { index, docs, stats })
    }

    pub(crate) fn into_parts(self) -> (InvertedIndex, DocumentMap, TermStats) {
        (self.index, self.docs, self.stats)
    }

    pub fn num_docs(&self) -> usize { self.docs.len() }

    pub fn num_terms(&self) -> usize { self.index.num_terms() }

    /// Posting list for an already-normalized term.
    pub fn documents(&self, term: &str) -> &[DocId] { self.index.get_documents(term) }

    pub fn document_frequency(&self, term: &str) -> usize { self.documents(term).len() }

    pub fn document(&self, doc_id: DocId) -> Option<&Document> { self.docs.get(&doc_id) }

    pub fn inverted_index(&self) -> &InvertedIndex { &self.index }

    pub fn document_map(&self) -> &DocumentMap { &self.docs }

    pub fn stats(&self) -> &TermStats { &self.stats }
}
