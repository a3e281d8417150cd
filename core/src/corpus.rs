use crate::error::{Error, Result};
use crate::DocId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

/// A movie record. The engine only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    pub description: String,
}

impl Document {
    pub fn new(id: DocId, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { id, title: title.into(), description: description.into() }
    }

    /// The text that gets indexed: title and description joined by a space.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// Supplies the full document collection for a build.
pub trait CorpusSource {
    fn load(&self) -> Result<Vec<Document>>;
}

impl CorpusSource for Vec<Document> {
    fn load(&self) -> Result<Vec<Document>> { Ok(self.clone()) }
}

impl CorpusSource for [Document] {
    fn load(&self) -> Result<Vec<Document>> { Ok(self.to_vec()) }
}

/// A corpus file shaped like `{"movies": [{"id": 1, "title": "...", "description": "..."}]}`.
#[derive(Debug, Clone)]
pub struct JsonCorpus {
    pub path: PathBuf,
}

impl JsonCorpus {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl CorpusSource for JsonCorpus {
    fn load(&self) -> Result<Vec<Document>> {
        let unavailable = |source| Error::CorpusUnavailable { path: self.path.clone(), source };
        let f = File::open(&self.path).map_err(unavailable)?;
        let json: Value = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| unavailable(std::io::Error::new(ErrorKind::InvalidData, e)))?;
        let movies = json
            .get("movies")
            .and_then(Value::as_array)
            .ok_or_else(|| unavailable(std::io::Error::new(ErrorKind::InvalidData, "expected a top-level \"movies\" array")))?;
        let docs = movies
            .iter()
            .enumerate()
            .map(|(position, v)| parse_document(position, v))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(path = %self.path.display(), num_docs = docs.len(), "loaded corpus");
        Ok(docs)
    }
}

fn parse_document(position: usize, v: &Value) -> Result<Document> {
    let malformed = |reason: &str| Error::MalformedDocument { position, reason: reason.to_string() };
    let obj = v.as_object().ok_or_else(|| malformed("record is not an object"))?;
    let id = obj
        .get("id")
        .ok_or_else(|| malformed("missing field `id`"))?
        .as_u64()
        .ok_or_else(|| malformed("`id` is not a non-negative integer"))?;
    let id = DocId::try_from(id).map_err(|_| malformed("`id` is out of range"))?;
    let text_field = |name: &str| -> Result<String> {
        match obj.get(name) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(malformed(&format!("`{name}` is not a string"))),
            None => Err(malformed(&format!("missing field `{name}`"))),
        }
    };
    Ok(Document { id, title: text_field("title")?, description: text_field("description")? })
}

/// Read a stopword list, one word per line. A missing file disables filtering.
pub fn load_stopwords<P: AsRef<Path>>(path: P) -> Result<HashSet<String>> {
    let path = path.as_ref();
    let f = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "stopword file not found, filtering disabled");
            return Ok(HashSet::new());
        }
        Err(e) => return Err(e.into()),
    };
    let mut words = HashSet::new();
    for line in BufReader::new(f).lines() {
        let line = line?;
        let word = line.trim();
        if word.is_empty() { continue; }
        words.insert(word.to_lowercase());
    }
    Ok(words)
}
