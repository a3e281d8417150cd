use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use moviesearch_core::config::DEFAULT_SEARCH_LIMIT;
use moviesearch_core::{load_stopwords, CandidateMode, DocId, Engine, Error, Ranking, SearchOptions, SnapshotStore, Tokenizer};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_K: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub ranking: Ranking,
    #[serde(default)]
    pub unbounded: bool,
}
fn default_k() -> usize { DEFAULT_SEARCH_LIMIT }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    pub title: String,
    pub snippet: String,
}

pub struct ServerConfig {
    /// Directory the CLI writes its snapshot to
    pub cache_dir: PathBuf,
    /// Must match the list the index was built with
    pub stopwords: PathBuf,
    pub admin_token: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub cache_dir: PathBuf,
    pub admin_token: Option<String>,
}

type ApiError = (StatusCode, String);

pub fn build_app(config: ServerConfig) -> Result<Router> {
    let engine = Engine::new(Tokenizer::new(load_stopwords(&config.stopwords)?));
    let app_state = AppState { engine: Arc::new(engine), cache_dir: config.cache_dir, admin_token: config.admin_token };
    if let Err(e) = reload(&app_state) {
        tracing::warn!(error = %e, cache = %app_state.cache_dir.display(), "starting without an index");
    }

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

/// Open the snapshot store just long enough to load it, then swap the index in.
fn reload(state: &AppState) -> Result<(), Error> {
    let store = SnapshotStore::open(&state.cache_dir)?;
    state.engine.try_load(&store)
}

fn status_for(e: &Error) -> StatusCode {
    match e {
        Error::IndexNotBuilt => StatusCode::SERVICE_UNAVAILABLE,
        Error::InvalidQueryTerm { .. } | Error::InvalidBm25Params { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(e: Error) -> ApiError {
    (status_for(&e), e.to_string())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let opts = SearchOptions {
        limit: params.k.min(MAX_K),
        candidates: if params.unbounded { CandidateMode::Unbounded } else { CandidateMode::Bounded },
        ranking: params.ranking,
        ..SearchOptions::default()
    };
    let hits = state.engine.search(&params.q, &opts).map_err(api_error)?;

    // Capture raw query terms for highlighting
    let raw_terms: Vec<String> = params
        .q
        .split_whitespace()
        .map(|s| s.to_string())
        .collect();
    let results: Vec<SearchHit> = hits
        .into_iter()
        .map(|hit| SearchHit {
            doc_id: hit.document.id,
            score: hit.score,
            snippet: snippet(&hit.document.description, &raw_terms),
            title: hit.document.title,
        })
        .collect();

    let elapsed = start.elapsed();
    Ok(Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits: results.len(), results }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Result<Json<serde_json::Value>, ApiError> {
    let index = state.engine.snapshot().map_err(api_error)?;
    match index.document(doc_id) {
        Some(doc) => Ok(Json(serde_json::json!({
            "doc_id": doc.id,
            "title": doc.title,
            "description": doc.description,
        }))),
        None => Err((StatusCode::NOT_FOUND, format!("document {doc_id} not found"))),
    }
}

async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    reload(&state).map_err(|e| match e {
        Error::SnapshotMissing => api_error(Error::IndexNotBuilt),
        e => api_error(e),
    })?;
    let index = state.engine.snapshot().map_err(api_error)?;
    tracing::info!(num_docs = index.num_docs(), "index reloaded");
    Ok(Json(serde_json::json!({ "num_docs": index.num_docs(), "num_terms": index.num_terms() })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}

/// First 200 characters of the description with query words wrapped in `<em>`.
fn snippet(text: &str, raw_terms: &[String]) -> String {
    let cut: String = text.chars().take(200).collect();
    highlight_terms(&cut, raw_terms)
}

fn highlight_terms(snippet: &str, terms: &[String]) -> String {
    let mut s = snippet.to_string();
    for t in terms {
        if t.trim().is_empty() { continue; }
        let Ok(pat) = regex::RegexBuilder::new(&format!(r"\b{}\b", regex::escape(t)))
            .case_insensitive(true)
            .build()
        else {
            continue;
        };
        s = pat.replace_all(&s, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).to_string();
    }
    s
}
