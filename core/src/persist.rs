use crate::error::{Error, Result};
use crate::index::{DocumentMap, InvertedIndex, SearchIndex, TermStats};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sled::transaction::TransactionError;
use std::convert::Infallible;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

pub const SNAPSHOT_VERSION: u32 = 1;

const INDEX_KEY: &str = "index";
const DOCMAP_KEY: &str = "docmap";
const TERM_FREQUENCIES_KEY: &str = "term_frequencies";
const DOC_LENGTHS_KEY: &str = "doc_lengths";
const META_KEY: &str = "meta";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
}

/// Durable home of an index snapshot: one sled database holding four bincode
/// blobs and a JSON meta record, always written together.
pub struct SnapshotStore {
    db: sled::Db,
    root: Option<PathBuf>,
}

impl SnapshotStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        create_dir_all(&root)?;
        let db = sled::open(root.join("snapshot"))?;
        Ok(Self { db, root: Some(root) })
    }

    /// A store that lives only as long as this value.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db, root: None })
    }

    pub fn root(&self) -> Option<&Path> { self.root.as_deref() }

    pub fn save(&self, index: &SearchIndex) -> Result<MetaFile> {
        let created_at = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .map_err(|e| Error::corrupt(META_KEY, e))?;
        let meta = MetaFile { num_docs: index.num_docs() as u32, created_at, version: SNAPSHOT_VERSION };
        let blobs: [(&str, Vec<u8>); 5] = [
            (INDEX_KEY, encode(INDEX_KEY, index.inverted_index())?),
            (DOCMAP_KEY, encode(DOCMAP_KEY, index.document_map())?),
            (TERM_FREQUENCIES_KEY, encode(TERM_FREQUENCIES_KEY, index.stats().term_frequencies())?),
            (DOC_LENGTHS_KEY, encode(DOC_LENGTHS_KEY, index.stats().doc_lengths())?),
            (META_KEY, serde_json::to_vec_pretty(&meta).map_err(|e| Error::corrupt(META_KEY, e))?),
        ];

        self.db
            .transaction(|tx| {
                for (key, bytes) in &blobs {
                    tx.insert(*key, bytes.as_slice())?;
                }
                Ok(())
            })
            .map_err(|e: TransactionError<Infallible>| match e {
                TransactionError::Abort(never) => match never {},
                TransactionError::Storage(e) => Error::Storage(e),
            })?;
        self.db.flush()?;

        tracing::info!(num_docs = meta.num_docs, num_terms = index.num_terms(), "saved snapshot");
        Ok(meta)
    }

    /// Read the whole snapshot back. Any missing or undecodable part, or parts
    /// that disagree with each other, reject the snapshot as a whole.
    pub fn load(&self) -> Result<SearchIndex> {
        let meta = self.load_meta()?;
        if meta.version != SNAPSHOT_VERSION {
            return Err(Error::SnapshotVersion { found: meta.version, expected: SNAPSHOT_VERSION });
        }

        let index: InvertedIndex = self.read_blob(INDEX_KEY)?;
        let docs: DocumentMap = self.read_blob(DOCMAP_KEY)?;
        let term_frequencies = self.read_blob(TERM_FREQUENCIES_KEY)?;
        let doc_lengths = self.read_blob(DOC_LENGTHS_KEY)?;
        let stats = TermStats::from_tables(term_frequencies, doc_lengths);

        let loaded = SearchIndex::from_parts(index, docs, stats)?;
        if loaded.num_docs() != meta.num_docs as usize {
            return Err(Error::corrupt(META_KEY, format!("records {} documents, snapshot has {}", meta.num_docs, loaded.num_docs())));
        }
        tracing::info!(num_docs = loaded.num_docs(), num_terms = loaded.num_terms(), created_at = %meta.created_at, "loaded snapshot");
        Ok(loaded)
    }

    pub fn load_meta(&self) -> Result<MetaFile> {
        let bytes = self.db.get(META_KEY)?.ok_or(Error::SnapshotMissing)?;
        serde_json::from_slice(&bytes).map_err(|e| Error::corrupt(META_KEY, e))
    }

    fn read_blob<T: DeserializeOwned>(&self, part: &'static str) -> Result<T> {
        let bytes = self.db.get(part)?.ok_or_else(|| Error::corrupt(part, "missing"))?;
        bincode::deserialize(&bytes).map_err(|e| Error::corrupt(part, e))
    }
}

fn encode<T: Serialize + ?Sized>(part: &'static str, value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| Error::corrupt(part, e))
}
