use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::allocator::SequenceAllocator;
use crate::catalog::{CollectionKind, IdentifierSource};
use crate::contracts::{AllocatorError, Document, DocumentStore, StoreError};

/// Server metrics for monitoring.
#[derive(Default)]
pub struct Metrics {
    pub creates_total: AtomicU64,
    pub reads_total: AtomicU64,
    pub updates_total: AtomicU64,
    pub deletes_total: AtomicU64,
    pub errors_total: AtomicU64,
    pub create_latency_sum_us: AtomicU64,
    pub read_latency_sum_us: AtomicU64,
    pub start_time: std::sync::OnceLock<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        let m = Self::default();
        let _ = m.start_time.set(Instant::now());
        m
    }

    pub fn record_create(&self, latency_us: u64) {
        self.creates_total.fetch_add(1, Ordering::Relaxed);
        self.create_latency_sum_us
            .fetch_add(latency_us, Ordering::Relaxed);
    }

    pub fn record_read(&self, latency_us: u64) {
        self.reads_total.fetch_add(1, Ordering::Relaxed);
        self.read_latency_sum_us
            .fetch_add(latency_us, Ordering::Relaxed);
    }

    pub fn record_update(&self) {
        self.updates_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.deletes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }
}

/// Application state shared across handlers.
pub struct AppState<S: DocumentStore> {
    pub store: Arc<S>,
    pub allocator: SequenceAllocator<S>,
    pub metrics: Arc<Metrics>,
}

impl<S: DocumentStore> AppState<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            allocator: SequenceAllocator::new(Arc::clone(&store)),
            store,
            metrics: Arc::new(Metrics::new()),
        }
    }
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// API error type.
pub enum ApiError {
    BadRequest(String),
    UnknownCollection(String),
    DocumentNotFound {
        collection: String,
        identifier: String,
    },
    DuplicateIdentifier(String),
    AllocationExhausted(String),
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_response) = match self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: msg,
                    code: "BAD_REQUEST".into(),
                },
            ),
            ApiError::UnknownCollection(name) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: format!("Unknown collection: {}", name),
                    code: "UNKNOWN_COLLECTION".into(),
                },
            ),
            ApiError::DocumentNotFound {
                collection,
                identifier,
            } => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: format!("No document '{}' in collection '{}'", identifier, collection),
                    code: "DOCUMENT_NOT_FOUND".into(),
                },
            ),
            ApiError::DuplicateIdentifier(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: msg,
                    code: "DUPLICATE_IDENTIFIER".into(),
                },
            ),
            ApiError::AllocationExhausted(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: msg,
                    code: "IDENTIFIER_EXHAUSTED".into(),
                },
            ),
            ApiError::Store(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: e.to_string(),
                    code: "STORE_ERROR".into(),
                },
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateIdentifier { .. } => ApiError::DuplicateIdentifier(e.to_string()),
            other => ApiError::Store(other),
        }
    }
}

impl From<AllocatorError> for ApiError {
    fn from(e: AllocatorError) -> Self {
        match e {
            AllocatorError::Exhausted { .. } => ApiError::AllocationExhausted(e.to_string()),
            AllocatorError::Store(inner) => ApiError::from(inner),
        }
    }
}

fn lookup(segment: &str) -> Result<CollectionKind, ApiError> {
    CollectionKind::from_path(segment).ok_or_else(|| ApiError::UnknownCollection(segment.into()))
}

/// POST /{collection}
/// Create a document. Job and prep-request identifiers are minted by the
/// sequence allocator; the other collections use natural keys from the
/// payload, with duplicates rejected by the store's unique index.
pub async fn create_document<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(collection): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let start = Instant::now();
    let kind = lookup(&collection)?;

    kind.validate(&body).map_err(|msg| {
        state.metrics.record_error();
        ApiError::BadRequest(msg)
    })?;

    let document = match kind.identifier_source() {
        IdentifierSource::Allocated(id_kind) => state
            .allocator
            .create_with_unique_identifier(id_kind, body)
            .await
            .map_err(|e| {
                state.metrics.record_error();
                ApiError::from(e)
            })?,
        IdentifierSource::Natural(field) => {
            let identifier = kind.natural_identifier(&body).ok_or_else(|| {
                state.metrics.record_error();
                ApiError::BadRequest(format!("field '{}' must be a string", field))
            })?;
            state
                .store
                .insert_unique(kind.storage_name(), Document::new(identifier, body))
                .await
                .map_err(|e| {
                    state.metrics.record_error();
                    ApiError::from(e)
                })?
        }
    };

    state
        .metrics
        .record_create(start.elapsed().as_micros() as u64);

    Ok((StatusCode::CREATED, Json(document)))
}

/// Query parameters for listing documents.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

/// Response for list operations.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub documents: Vec<Document>,
    pub count: usize,
    pub has_more: bool,
}

/// GET /{collection}
/// List documents in identifier order with offset/limit pagination.
pub async fn list_documents<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(collection): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let start = Instant::now();
    let kind = lookup(&collection)?;

    // Fetch one past the page to detect whether more documents remain.
    // Saturating: a maximal limit must not wrap the probe size to zero.
    let mut documents = state
        .store
        .list(
            kind.storage_name(),
            query.offset,
            query.limit.saturating_add(1),
        )
        .await
        .map_err(|e| {
            state.metrics.record_error();
            ApiError::from(e)
        })?;

    let has_more = documents.len() > query.limit;
    documents.truncate(query.limit);
    let count = documents.len();

    state.metrics.record_read(start.elapsed().as_micros() as u64);

    Ok(Json(ListResponse {
        documents,
        count,
        has_more,
    }))
}

/// GET /{collection}/{id}
pub async fn get_document<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((collection, identifier)): Path<(String, String)>,
) -> Result<Json<Document>, ApiError> {
    let start = Instant::now();
    let kind = lookup(&collection)?;

    let document = state
        .store
        .get(kind.storage_name(), &identifier)
        .await
        .map_err(|e| {
            state.metrics.record_error();
            ApiError::from(e)
        })?
        .ok_or(ApiError::DocumentNotFound {
            collection,
            identifier,
        })?;

    state.metrics.record_read(start.elapsed().as_micros() as u64);

    Ok(Json(document))
}

/// PUT /{collection}/{id}
/// Replace a document body. Identifiers are immutable: for natural-key
/// collections the payload's key field must match the path.
pub async fn update_document<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((collection, identifier)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Document>, ApiError> {
    let kind = lookup(&collection)?;

    kind.validate(&body).map_err(|msg| {
        state.metrics.record_error();
        ApiError::BadRequest(msg)
    })?;

    if let Some(natural) = kind.natural_identifier(&body) {
        if natural != identifier {
            state.metrics.record_error();
            return Err(ApiError::BadRequest(format!(
                "identifier is immutable: payload says '{}', path says '{}'",
                natural, identifier
            )));
        }
    }

    let document = state
        .store
        .update(kind.storage_name(), &identifier, body)
        .await
        .map_err(|e| {
            state.metrics.record_error();
            ApiError::from(e)
        })?
        .ok_or(ApiError::DocumentNotFound {
            collection,
            identifier,
        })?;

    state.metrics.record_update();

    Ok(Json(document))
}

/// DELETE /{collection}/{id}
pub async fn delete_document<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((collection, identifier)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let kind = lookup(&collection)?;

    let removed = state
        .store
        .delete(kind.storage_name(), &identifier)
        .await
        .map_err(|e| {
            state.metrics.record_error();
            ApiError::from(e)
        })?;

    if !removed {
        return Err(ApiError::DocumentNotFound {
            collection,
            identifier,
        });
    }

    state.metrics.record_delete();

    Ok(StatusCode::NO_CONTENT)
}

/// GET /health
/// Health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy"
    }))
}

/// Response for stats endpoint.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub uptime_secs: f64,
    pub creates: OpStats,
    pub reads: OpStats,
    pub updates_total: u64,
    pub deletes_total: u64,
    pub errors_total: u64,
}

#[derive(Debug, Serialize)]
pub struct OpStats {
    pub total: u64,
    pub rate_per_sec: f64,
    pub avg_latency_us: f64,
}

/// Calculates rate per second, returning 0.0 if duration is zero.
#[inline]
fn safe_rate(count: u64, duration_secs: f64) -> f64 {
    if duration_secs > 0.0 {
        count as f64 / duration_secs
    } else {
        0.0
    }
}

/// Calculates average, returning 0.0 if count is zero.
#[inline]
fn safe_avg(sum: u64, count: u64) -> f64 {
    if count > 0 {
        sum as f64 / count as f64
    } else {
        0.0
    }
}

/// GET /stats
/// Server statistics and metrics.
pub async fn get_stats<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    let metrics = &state.metrics;

    let uptime_secs = metrics
        .start_time
        .get()
        .map(|t| t.elapsed().as_secs_f64())
        .unwrap_or(0.0);

    let creates_total = metrics.creates_total.load(Ordering::Relaxed);
    let create_latency_sum = metrics.create_latency_sum_us.load(Ordering::Relaxed);
    let reads_total = metrics.reads_total.load(Ordering::Relaxed);
    let read_latency_sum = metrics.read_latency_sum_us.load(Ordering::Relaxed);

    Json(StatsResponse {
        uptime_secs,
        creates: OpStats {
            total: creates_total,
            rate_per_sec: safe_rate(creates_total, uptime_secs),
            avg_latency_us: safe_avg(create_latency_sum, creates_total),
        },
        reads: OpStats {
            total: reads_total,
            rate_per_sec: safe_rate(reads_total, uptime_secs),
            avg_latency_us: safe_avg(read_latency_sum, reads_total),
        },
        updates_total: metrics.updates_total.load(Ordering::Relaxed),
        deletes_total: metrics.deletes_total.load(Ordering::Relaxed),
        errors_total: metrics.errors_total.load(Ordering::Relaxed),
    })
}
