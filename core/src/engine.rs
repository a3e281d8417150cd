use crate::config::{Bm25Params, SearchOptions};
use crate::corpus::CorpusSource;
use crate::error::{Error, Result};
use crate::index::SearchIndex;
use crate::persist::{MetaFile, SnapshotStore};
use crate::scoring::Scorer;
use crate::search::{search, SearchHit};
use crate::tokenizer::Tokenizer;
use crate::DocId;
use parking_lot::RwLock;
use std::sync::Arc;

/// Owns the current [`SearchIndex`] and exposes the query surface over it.
///
/// A rebuild or load produces a fresh index and swaps it in under a short write
/// lock; readers keep using whichever `Arc` they already hold. Failed builds and
/// loads leave the current index untouched.
pub struct Engine {
    tokenizer: Tokenizer,
    current: RwLock<Option<Arc<SearchIndex>>>,
}

impl Engine {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self { tokenizer, current: RwLock::new(None) }
    }

    pub fn tokenizer(&self) -> &Tokenizer { &self.tokenizer }

    pub fn is_built(&self) -> bool { self.current.read().is_some() }

    /// The current index, or [`Error::IndexNotBuilt`].
    pub fn snapshot(&self) -> Result<Arc<SearchIndex>> {
        self.current.read().clone().ok_or(Error::IndexNotBuilt)
    }

    pub fn build<S: CorpusSource + ?Sized>(&self, source: &S) -> Result<Arc<SearchIndex>> {
        let documents = source.load()?;
        let index = Arc::new(SearchIndex::build(documents, &self.tokenizer));
        self.swap(index.clone());
        Ok(index)
    }

    fn swap(&self, index: Arc<SearchIndex>) {
        *self.current.write() = Some(index);
    }

    pub fn search(&self, query: &str, opts: &SearchOptions) -> Result<Vec<SearchHit>> {
        let index = self.snapshot()?;
        search(&index, &self.tokenizer, query, opts)
    }

    pub fn term_frequency(&self, doc_id: DocId, term: &str) -> Result<u32> {
        let index = self.snapshot()?;
        Scorer::new(&index, &self.tokenizer).term_frequency(doc_id, term)
    }

    pub fn inverse_document_frequency(&self, term: &str) -> Result<f64> {
        let index = self.snapshot()?;
        Scorer::new(&index, &self.tokenizer).inverse_document_frequency(term)
    }

    pub fn tf_idf(&self, doc_id: DocId, term: &str) -> Result<f64> {
        let index = self.snapshot()?;
        Scorer::new(&index, &self.tokenizer).tf_idf(doc_id, term)
    }

    pub fn bm25_idf(&self, term: &str) -> Result<f64> {
        let index = self.snapshot()?;
        Scorer::new(&index, &self.tokenizer).bm25_idf(term)
    }

    pub fn bm25_tf(&self, doc_id: DocId, term: &str, params: Bm25Params) -> Result<f64> {
        let index = self.snapshot()?;
        Scorer::new(&index, &self.tokenizer).bm25_tf(doc_id, term, params)
    }

    pub fn bm25(&self, doc_id: DocId, term: &str, params: Bm25Params) -> Result<f64> {
        let index = self.snapshot()?;
        Scorer::new(&index, &self.tokenizer).bm25(doc_id, term, params)
    }

    pub fn save(&self, store: &SnapshotStore) -> Result<MetaFile> {
        let index = self.snapshot()?;
        store.save(&index)
    }

    pub fn try_load(&self, store: &SnapshotStore) -> Result<()> {
        let index = store.load()?;
        self.swap(Arc::new(index));
        Ok(())
    }

    /// Load a snapshot, reporting only whether it worked. Callers that get
    /// `false` should rebuild from the corpus.
    pub fn load(&self, store: &SnapshotStore) -> bool {
        match self.try_load(store) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "snapshot not loaded");
                false
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self { Self::new(Tokenizer::english()) }
}
