//! HTTP API for ingestion, forecasts, history, health checks and metrics

use crate::config::IgnitionConfig;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use ignition_lib::{
    health::{ComponentStatus, HealthRegistry},
    history::{self, DailyWeather, PileHistory},
    ingest::{self, coerce, FileKind},
    models::{ForecastSummary, PileKey, PredictionResult},
    observability::{IgnitionMetrics, StructuredLogger},
    predictor::{ForecastAggregator, ForecastWindow, ModelRegistry, PredictionInput},
    store::RecordStore,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Upload size limit for CSV files
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Shared application state
pub struct AppState {
    pub store: Mutex<Box<dyn RecordStore>>,
    pub registry: Arc<ModelRegistry>,
    pub health_registry: HealthRegistry,
    pub metrics: IgnitionMetrics,
    pub logger: StructuredLogger,
    pub aggregator: ForecastAggregator,
    pub config: IgnitionConfig,
}

impl AppState {
    pub fn new(
        store: Box<dyn RecordStore>,
        registry: Arc<ModelRegistry>,
        health_registry: HealthRegistry,
        config: IgnitionConfig,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            registry,
            health_registry,
            metrics: IgnitionMetrics::new(),
            logger: StructuredLogger::new(config.node_name.clone()),
            aggregator: ForecastAggregator::with_max_days(config.max_forecast_days),
            config,
        }
    }
}

fn parse_date(field: &str, raw: &str) -> ApiResult<NaiveDate> {
    coerce::boundary_date(raw).ok_or_else(|| ApiError::invalid_date(field, raw))
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub kind: FileKind,
    pub inserted_rows: usize,
}

async fn upload_csv(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {}", e)))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("multipart field `file` is required".into()))?;

    if !filename.to_lowercase().ends_with(".csv") {
        return Err(ApiError::BadRequest(format!(
            "only CSV files are accepted, got {:?}",
            filename
        )));
    }

    let kind = match query.kind.as_deref() {
        Some(kind) => kind.parse::<FileKind>()?,
        None => FileKind::classify(&filename)?,
    };

    let rows = ingest::read_rows(&bytes)?;
    let inserted_rows = {
        let mut store = state.store.lock().await;
        let result = ingest::ingest(&mut **store, kind, &rows);
        state.health_registry.observe_store(&store.counts()).await;
        result?
    };

    state.logger.log_ingest(&filename, kind.as_str(), inserted_rows);
    Ok(Json(UploadResponse {
        filename,
        kind,
        inserted_rows,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(flatten)]
    pub input: PredictionInput,
    pub current_date: Option<String>,
}

async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> ApiResult<Json<PredictionResult>> {
    let reference_date = match request.current_date.as_deref() {
        Some(raw) => parse_date("current_date", raw)?,
        None => state.config.default_reference_date,
    };

    let model = state.registry.current()?;
    let result = model
        .risk_predictor()
        .predict(&request.input, reference_date)?;

    state.logger.log_prediction(
        request.input.warehouse,
        &request.input.pile_id,
        result.predicted_days_to_fire,
        result.risk_level.as_str(),
        &model.version,
    );
    Ok(Json(result))
}

async fn run_forecast(state: &AppState, window: ForecastWindow) -> ApiResult<ForecastSummary> {
    let model = state.registry.current()?;
    let predictor = model.risk_predictor();

    let store = state.store.lock().await;
    let (summary, stats) = state
        .aggregator
        .aggregate(&**store, &predictor, window)?;

    state
        .logger
        .log_forecast(&summary.period, stats.piles_seen, stats.incidents, stats.failed);
    Ok(summary)
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub forecast_days: Option<u32>,
}

async fn dashboard_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<ForecastSummary>> {
    let days = query.forecast_days.unwrap_or(state.config.forecast_days);
    let summary = run_forecast(&state, ForecastWindow::LatestKnown { days }).await?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
pub struct ExplicitWindowQuery {
    pub start_date: String,
    pub end_date: String,
}

async fn dashboard_summary_explicit(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExplicitWindowQuery>,
) -> ApiResult<Json<ForecastSummary>> {
    let start = parse_date("start_date", &query.start_date)?;
    let end = parse_date("end_date", &query.end_date)?;
    let summary = run_forecast(&state, ForecastWindow::Explicit { start, end }).await?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: String,
    pub end: String,
}

async fn weather(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<Vec<DailyWeather>>> {
    let start = parse_date("start", &query.start)?;
    let end = parse_date("end", &query.end)?;

    let store = state.store.lock().await;
    Ok(Json(history::daily_weather(&**store, start, end)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PileRangeQuery {
    pub warehouse: i64,
    pub pile_id: String,
    pub start: String,
    pub end: String,
}

async fn pile_weather(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PileRangeQuery>,
) -> ApiResult<Json<PileHistory>> {
    let start = parse_date("start", &query.start)?;
    let end = parse_date("end", &query.end)?;
    let pile = PileKey::new(query.warehouse, query.pile_id);

    let store = state.store.lock().await;
    Ok(Json(history::pile_history(&**store, &pile, start, end)?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WarehousesResponse {
    pub warehouses: Vec<i64>,
}

async fn warehouses(State(state): State<Arc<AppState>>) -> ApiResult<Json<WarehousesResponse>> {
    let store = state.store.lock().await;
    Ok(Json(WarehousesResponse {
        warehouses: history::warehouses(&**store)?,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StacksResponse {
    pub stacks: Vec<String>,
}

async fn stacks(
    State(state): State<Arc<AppState>>,
    Path(warehouse): Path<i64>,
) -> ApiResult<Json<StacksResponse>> {
    let store = state.store.lock().await;
    Ok(Json(StacksResponse {
        stacks: history::piles(&**store, warehouse)?,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PileQuery {
    pub warehouse: i64,
    pub pile_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PileAgeResponse {
    pub pile_age_days: i64,
}

async fn pile_age(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PileQuery>,
) -> ApiResult<Json<PileAgeResponse>> {
    let pile = PileKey::new(query.warehouse, query.pile_id);
    let today = Local::now().date_naive();

    let store = state.store.lock().await;
    Ok(Json(PileAgeResponse {
        pile_age_days: history::pile_age(&**store, &pile, today)?,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub version: String,
    pub checksum: String,
}

async fn reload_model(State(state): State<Arc<AppState>>) -> ApiResult<Json<ReloadResponse>> {
    let old_version = state
        .registry
        .current_version()
        .unwrap_or_else(|| "none".to_string());

    let outcome = state.registry.reload();
    state.health_registry.observe_model(&state.registry).await;

    match outcome {
        Ok(model) => {
            state.logger.log_model_update(&old_version, &model.version, true);
            Ok(Json(ReloadResponse {
                version: model.version.clone(),
                checksum: model.checksum.clone(),
            }))
        }
        Err(e) => {
            state.logger.log_model_update(&old_version, "none", false);
            Err(e.into())
        }
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> ApiResult<impl IntoResponse> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(format!("failed to encode metrics: {}", e)))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/upload-csv", post(upload_csv))
        .route("/predict", post(predict))
        .route("/dashboard-summary", get(dashboard_summary))
        .route("/dashboard-summary-test", get(dashboard_summary_explicit))
        .route("/weather", get(weather))
        .route("/pile-weather", get(pile_weather))
        .route("/warehouses", get(warehouses))
        .route("/stacks/:warehouse", get(stacks))
        .route("/pile-age", get(pile_age))
        .route("/model/reload", post(reload_model))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    Router::new()
        .nest("/api", api)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
