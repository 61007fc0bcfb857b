//! HTTP surface: a thin JSON layer over the index repository.
//!
//! Routes, request/response DTOs and the error-to-status mapping live
//! here; all search semantics stay in the core modules.

use crate::analysis::{Analyzer, AnalyzerKind, Settings};
use crate::document::Document;
use crate::error::{AnalysisError, IndexError, RepoError};
use crate::index::Index;
use crate::repo::{IndexId, IndexRepository, NamedIndex};
use crate::search::{IdfWeight, MinMatchFilter, TfIdfRanker, TfWeight};
use crate::suggest::{FuzzyConfig, TermSuggestions};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Build the application router over a shared repository.
pub fn router(repo: Arc<IndexRepository>) -> Router {
    Router::new()
        .route("/indexes", get(list_indexes).post(create_index))
        .route("/indexes/{id}", get(get_index).delete(delete_index))
        .route("/indexes/{id}/_analyze", get(analyze_text))
        .route("/indexes/{id}/_suggest", get(suggest_terms))
        .route("/indexes/{id}/_search", get(search_query).post(search_body))
        .route("/indexes/{id}/docs", post(create_document))
        .route(
            "/indexes/{id}/docs/{doc_id}",
            get(get_document).put(put_document).delete(delete_document),
        )
        .route("/indexes/{id}/docs/{doc_id}/_terms", get(top_terms))
        .with_state(repo)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// API-level error carrying the HTTP status it maps to.
#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::BadRequest(m) | Self::NotFound(m) | Self::Conflict(m) => m.clone(),
        };
        (self.status(), Json(ErrorBody { error: message })).into_response()
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match &err {
            RepoError::InvalidIndex { .. } => Self::BadRequest(err.to_string()),
            RepoError::IndexAlreadyExists { .. } => Self::Conflict(err.to_string()),
            RepoError::IndexDoesNotExist { .. } => Self::NotFound(err.to_string()),
        }
    }
}

impl From<IndexError> for ApiError {
    fn from(err: IndexError) -> Self {
        match &err {
            IndexError::DuplicateDocument { .. } => Self::Conflict(err.to_string()),
            IndexError::NonExistentDocument { .. } => Self::NotFound(err.to_string()),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

fn index_not_found(id: &str) -> ApiError {
    ApiError::from(RepoError::IndexDoesNotExist { id: id.to_string() })
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct IndexInput {
    id: String,
    analyzer: String,
    #[serde(default)]
    stopwords: Vec<String>,
    #[serde(default)]
    synonyms: HashMap<String, String>,
    #[serde(default)]
    stemmer: String,
    #[serde(default)]
    fuzzy: Option<FuzzyConfig>,
}

#[derive(Debug, Serialize)]
struct IndexOutput {
    id: String,
    analyzer: &'static str,
    docs: usize,
    stopwords: Vec<String>,
    synonyms: BTreeMap<String, String>,
    stemmer: String,
}

impl IndexOutput {
    fn from_named(named: &NamedIndex) -> Self {
        let analyzer = named.index().analyzer();
        let mut stopwords = analyzer.stopwords();
        stopwords.sort();
        Self {
            id: named.id().to_string(),
            analyzer: analyzer.kind().as_str(),
            docs: named.index().length(),
            stopwords,
            synonyms: analyzer.synonyms().into_iter().collect(),
            stemmer: analyzer.stemmer_name().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct IndexListOutput {
    indexes: Vec<IndexOutput>,
}

#[derive(Debug, Deserialize)]
struct DocumentInput {
    id: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct DocumentUpdateInput {
    text: String,
}

#[derive(Debug, Serialize)]
struct DocumentOutput {
    id: String,
    text: String,
}

impl From<Document> for DocumentOutput {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id().to_string(),
            text: doc.text().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchInput {
    #[serde(default)]
    query: String,
    #[serde(default = "default_filter")]
    filter: String,
    #[serde(default)]
    min_match: Option<i64>,
    #[serde(default = "default_weight")]
    tf_weight: String,
    #[serde(default = "default_weight")]
    idf_weight: String,
    #[serde(default = "default_true")]
    include_text: bool,
}

fn default_filter() -> String {
    "or".to_string()
}

fn default_weight() -> String {
    "default".to_string()
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
struct DocumentScoreOutput {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    score: f64,
}

#[derive(Debug, Serialize)]
struct SearchOutput {
    docs: Vec<DocumentScoreOutput>,
    size: usize,
}

#[derive(Debug, Deserialize)]
struct AnalyzeParams {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct AnalyzeOutput {
    tokens: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SuggestParams {
    #[serde(default)]
    terms: String,
    #[serde(default = "default_suggest_limit")]
    limit: usize,
}

const fn default_suggest_limit() -> usize {
    3
}

#[derive(Debug, Serialize)]
struct SuggestOutput {
    suggestions: Vec<TermSuggestions>,
}

#[derive(Debug, Deserialize)]
struct TermsParams {
    #[serde(default = "default_top")]
    top: usize,
}

const fn default_top() -> usize {
    10
}

#[derive(Debug, Serialize)]
struct TermCountOutput {
    term: String,
    count: f64,
}

#[derive(Debug, Serialize)]
struct TermsOutput {
    terms: Vec<TermCountOutput>,
}

#[derive(Debug, Deserialize)]
struct UpsertParams {
    #[serde(default)]
    upsert: bool,
}

// ---------------------------------------------------------------------------
// Parameter resolution
// ---------------------------------------------------------------------------

/// `min_match`, when present, overrides the named filter. A non-positive
/// `min_match` disables candidate reduction entirely.
fn resolve_filter(input: &SearchInput) -> Result<Option<MinMatchFilter>, ApiError> {
    if let Some(min_match) = input.min_match {
        return Ok(MinMatchFilter::new(min_match));
    }
    match input.filter.as_str() {
        "or" => Ok(Some(MinMatchFilter::OR)),
        "and" => Ok(Some(MinMatchFilter::AND)),
        other => Err(ApiError::BadRequest(format!("invalid filter '{other}'"))),
    }
}

fn resolve_ranker(input: &SearchInput) -> Result<TfIdfRanker, ApiError> {
    let tf = match input.tf_weight.as_str() {
        "default" => TfWeight::Default,
        "log" => TfWeight::Log,
        other => {
            return Err(ApiError::BadRequest(format!("invalid tf weight '{other}'")));
        }
    };
    let idf = match input.idf_weight.as_str() {
        "default" => IdfWeight::Default,
        "smooth" => IdfWeight::Smooth,
        other => {
            return Err(ApiError::BadRequest(format!(
                "invalid idf weight '{other}'"
            )));
        }
    };
    Ok(TfIdfRanker::new(tf, idf))
}

// ---------------------------------------------------------------------------
// Index handlers
// ---------------------------------------------------------------------------

async fn list_indexes(State(repo): State<Arc<IndexRepository>>) -> Json<IndexListOutput> {
    let indexes = repo
        .list()
        .iter()
        .map(|named| IndexOutput::from_named(named))
        .collect();
    Json(IndexListOutput { indexes })
}

async fn create_index(
    State(repo): State<Arc<IndexRepository>>,
    Json(input): Json<IndexInput>,
) -> Result<(StatusCode, Json<IndexOutput>), ApiError> {
    let id = IndexId::new(input.id)?;
    let kind = AnalyzerKind::parse(&input.analyzer)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown analyzer '{}'", input.analyzer)))?;
    let settings = Settings::new(
        input.stopwords,
        input.synonyms.into_iter().collect(),
        &input.stemmer,
    )?;
    let analyzer = Analyzer::new(kind, settings);

    let index = match input.fuzzy {
        Some(fuzzy) => Index::with_fuzzy(analyzer, fuzzy),
        None => Index::new(analyzer),
    };

    let named = NamedIndex::new(id, index);
    let output = IndexOutput::from_named(&named);
    repo.create(named)?;
    Ok((StatusCode::CREATED, Json(output)))
}

async fn get_index(
    State(repo): State<Arc<IndexRepository>>,
    Path(id): Path<String>,
) -> Result<Json<IndexOutput>, ApiError> {
    let named = repo.get(&id).ok_or_else(|| index_not_found(&id))?;
    Ok(Json(IndexOutput::from_named(&named)))
}

async fn delete_index(
    State(repo): State<Arc<IndexRepository>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    repo.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn analyze_text(
    State(repo): State<Arc<IndexRepository>>,
    Path(id): Path<String>,
    Query(params): Query<AnalyzeParams>,
) -> Result<Json<AnalyzeOutput>, ApiError> {
    let named = repo.get(&id).ok_or_else(|| index_not_found(&id))?;
    let tokens = named.index().analyzer().analyze(&params.text);
    Ok(Json(AnalyzeOutput { tokens }))
}

async fn suggest_terms(
    State(repo): State<Arc<IndexRepository>>,
    Path(id): Path<String>,
    Query(params): Query<SuggestParams>,
) -> Result<Json<SuggestOutput>, ApiError> {
    let named = repo.get(&id).ok_or_else(|| index_not_found(&id))?;
    let terms: Vec<String> = params
        .terms
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect();
    let suggestions = named.index().suggest(&terms, params.limit);
    Ok(Json(SuggestOutput { suggestions }))
}

// ---------------------------------------------------------------------------
// Search handlers
// ---------------------------------------------------------------------------

async fn search_query(
    State(repo): State<Arc<IndexRepository>>,
    Path(id): Path<String>,
    Query(input): Query<SearchInput>,
) -> Result<Json<SearchOutput>, ApiError> {
    run_search(&repo, &id, &input)
}

async fn search_body(
    State(repo): State<Arc<IndexRepository>>,
    Path(id): Path<String>,
    Json(input): Json<SearchInput>,
) -> Result<Json<SearchOutput>, ApiError> {
    run_search(&repo, &id, &input)
}

fn run_search(
    repo: &IndexRepository,
    id: &str,
    input: &SearchInput,
) -> Result<Json<SearchOutput>, ApiError> {
    let named = repo.get(id).ok_or_else(|| index_not_found(id))?;
    let filter = resolve_filter(input)?;
    let ranker = resolve_ranker(input)?;

    let results = named.index().search(&input.query, filter, Some(ranker));
    let docs: Vec<DocumentScoreOutput> = results
        .into_iter()
        .map(|scored| DocumentScoreOutput {
            id: scored.document.id().to_string(),
            text: input
                .include_text
                .then(|| scored.document.text().to_string()),
            score: scored.score,
        })
        .collect();

    let size = docs.len();
    Ok(Json(SearchOutput { docs, size }))
}

// ---------------------------------------------------------------------------
// Document handlers
// ---------------------------------------------------------------------------

async fn create_document(
    State(repo): State<Arc<IndexRepository>>,
    Path(id): Path<String>,
    Json(input): Json<DocumentInput>,
) -> Result<(StatusCode, Json<DocumentOutput>), ApiError> {
    let named = repo.get(&id).ok_or_else(|| index_not_found(&id))?;
    let document = Document::new(input.id, input.text);
    named.index().add(document.clone())?;
    repo.mark_dirty(&id);
    Ok((StatusCode::CREATED, Json(document.into())))
}

async fn get_document(
    State(repo): State<Arc<IndexRepository>>,
    Path((id, doc_id)): Path<(String, String)>,
) -> Result<Json<DocumentOutput>, ApiError> {
    let named = repo.get(&id).ok_or_else(|| index_not_found(&id))?;
    let document = named
        .index()
        .get(&doc_id)
        .ok_or(IndexError::NonExistentDocument { id: doc_id })?;
    Ok(Json(document.into()))
}

async fn put_document(
    State(repo): State<Arc<IndexRepository>>,
    Path((id, doc_id)): Path<(String, String)>,
    Query(params): Query<UpsertParams>,
    Json(input): Json<DocumentUpdateInput>,
) -> Result<Json<DocumentOutput>, ApiError> {
    let named = repo.get(&id).ok_or_else(|| index_not_found(&id))?;
    let document = Document::new(doc_id, input.text);

    if params.upsert {
        named.index().upsert(document.clone())?;
    } else {
        named.index().update(document.clone())?;
    }
    repo.mark_dirty(&id);
    Ok(Json(document.into()))
}

async fn delete_document(
    State(repo): State<Arc<IndexRepository>>,
    Path((id, doc_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let named = repo.get(&id).ok_or_else(|| index_not_found(&id))?;
    named.index().delete(&doc_id)?;
    repo.mark_dirty(&id);
    Ok(StatusCode::NO_CONTENT)
}

async fn top_terms(
    State(repo): State<Arc<IndexRepository>>,
    Path((id, doc_id)): Path<(String, String)>,
    Query(params): Query<TermsParams>,
) -> Result<Json<TermsOutput>, ApiError> {
    let named = repo.get(&id).ok_or_else(|| index_not_found(&id))?;
    if named.index().get(&doc_id).is_none() {
        return Err(IndexError::NonExistentDocument { id: doc_id }.into());
    }

    let terms = named
        .index()
        .term_frequencies(&doc_id)
        .top(params.top)
        .into_iter()
        .map(|(term, count)| TermCountOutput { term, count })
        .collect();
    Ok(Json(TermsOutput { terms }))
}
