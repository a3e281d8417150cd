use anyhow::Result;
use clap::{Parser, Subcommand};
use moviesearch_core::config::{DEFAULT_BM25_B, DEFAULT_BM25_K1, DEFAULT_SEARCH_LIMIT};
use moviesearch_core::{load_stopwords, Bm25Params, CandidateMode, DocId, Engine, Error, JsonCorpus, Ranking, SearchOptions, SnapshotStore, Tokenizer};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "moviesearch")]
#[command(about = "Keyword search over the movie corpus", long_about = None)]
struct Cli {
    /// Movie corpus (JSON with a top-level "movies" array)
    #[arg(long, global = true, env = "MOVIESEARCH_DATA", default_value = "data/movies.json")]
    data: PathBuf,
    /// Stopword list, one word per line; a missing file disables filtering
    #[arg(long, global = true, env = "MOVIESEARCH_STOPWORDS", default_value = "data/stopwords.txt")]
    stopwords: PathBuf,
    /// Directory holding the index snapshot
    #[arg(long, global = true, env = "MOVIESEARCH_CACHE", default_value = "cache")]
    cache: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// (Re)build the index from the corpus and save a snapshot
    Build,
    /// Search movies by keyword
    Search {
        query: String,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
        /// bm25, tfidf or id
        #[arg(long, default_value = "bm25")]
        ranking: Ranking,
        /// Rank every matching document instead of stopping at `limit` candidates
        #[arg(long, default_value_t = false)]
        unbounded: bool,
        #[arg(long, default_value_t = DEFAULT_BM25_K1)]
        k1: f64,
        #[arg(long, default_value_t = DEFAULT_BM25_B)]
        b: f64,
    },
    /// Term frequency of a term in a document
    Tf { doc_id: DocId, term: String },
    /// Inverse document frequency of a term
    Idf { term: String },
    /// TF-IDF of a term in a document
    Tfidf { doc_id: DocId, term: String },
    /// BM25 inverse document frequency of a term
    Bm25idf { term: String },
    /// BM25 term-frequency component of a term in a document
    Bm25tf {
        doc_id: DocId,
        term: String,
        #[arg(long, default_value_t = DEFAULT_BM25_K1)]
        k1: f64,
        #[arg(long, default_value_t = DEFAULT_BM25_B)]
        b: f64,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let engine = Engine::new(Tokenizer::new(load_stopwords(&cli.stopwords)?));
    let store = SnapshotStore::open(&cli.cache)?;

    if !matches!(cli.command, Commands::Build) && !engine.load(&store) {
        return Err(Error::IndexNotBuilt.into());
    }

    match cli.command {
        Commands::Build => build_index(&engine, &store, &cli.data)?,
        Commands::Search { query, limit, ranking, unbounded, k1, b } => {
            let opts = SearchOptions {
                limit,
                candidates: if unbounded { CandidateMode::Unbounded } else { CandidateMode::Bounded },
                ranking,
                bm25: Bm25Params { k1, b },
            };
            println!("Searching for: {query}");
            let hits = engine.search(&query, &opts)?;
            if hits.is_empty() {
                println!("No matches.");
            }
            for (i, hit) in hits.iter().enumerate() {
                println!("{}. ({}) {} - score {:.2}", i + 1, hit.document.id, hit.document.title, hit.score);
            }
        }
        Commands::Tf { doc_id, term } => {
            let tf = engine.term_frequency(doc_id, &term)?;
            println!("Term frequency of '{term}' in document '{doc_id}': {tf}");
        }
        Commands::Idf { term } => {
            let idf = engine.inverse_document_frequency(&term)?;
            println!("Inverse document frequency of '{term}': {idf:.2}");
        }
        Commands::Tfidf { doc_id, term } => {
            let tf_idf = engine.tf_idf(doc_id, &term)?;
            println!("TF-IDF score of '{term}' in document '{doc_id}': {tf_idf:.2}");
        }
        Commands::Bm25idf { term } => {
            let idf = engine.bm25_idf(&term)?;
            println!("BM25 IDF score of '{term}': {idf:.2}");
        }
        Commands::Bm25tf { doc_id, term, k1, b } => {
            let tf = engine.bm25_tf(doc_id, &term, Bm25Params { k1, b })?;
            println!("BM25 TF score of '{term}' in document '{doc_id}': {tf:.2}");
        }
    }
    Ok(())
}

fn build_index(engine: &Engine, store: &SnapshotStore, data: &Path) -> Result<()> {
    println!("Building index...");
    let index = engine.build(&JsonCorpus::new(data))?;
    let meta = engine.save(store)?;
    tracing::info!(cache = ?store.root(), created_at = %meta.created_at, "index build complete");
    println!("Indexed {} movies ({} terms).", index.num_docs(), index.num_terms());
    Ok(())
}
