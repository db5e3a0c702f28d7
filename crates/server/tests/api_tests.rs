//! Integration tests for the forecast API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use ignition_lib::{
    health::{components, HealthRegistry},
    models::FeatureVector,
    predictor::{ModelRegistry, Predictor, Vocabularies},
    store::MemoryStore,
};
use ignition_server::{api::AppState, create_router, IgnitionConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "ignition-test-boundary";

/// Stub regressor: every pile ignites one day after the reference date
struct OneDayPredictor;

impl Predictor for OneDayPredictor {
    fn predict(&self, _features: &FeatureVector) -> anyhow::Result<f64> {
        Ok(1.0)
    }

    fn model_version(&self) -> String {
        "one-day-stub".to_string()
    }
}

fn vocabularies() -> Vocabularies {
    Vocabularies::from_json(
        br#"{"pile_id": ["39", "46"], "coal_grade": ["A1"], "supply_grade": ["A1"]}"#,
    )
    .unwrap()
}

async fn setup_app(registry: ModelRegistry) -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::STORE).await;
    health_registry.observe_model(&registry).await;

    let state = Arc::new(AppState::new(
        Box::new(MemoryStore::new()),
        Arc::new(registry),
        health_registry,
        IgnitionConfig::default(),
    ));
    (create_router(state.clone()), state)
}

async fn setup_test_app() -> (Router, Arc<AppState>) {
    setup_app(ModelRegistry::from_parts(Arc::new(OneDayPredictor), vocabularies())).await
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn upload(uri: &str, filename: &str, content: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: text/csv\r\n\r\n{c}\r\n--{b}--\r\n",
        b = BOUNDARY,
        f = filename,
        c = content
    );
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn prediction_body() -> Value {
    json!({
        "warehouse": 4,
        "pile_id": "46",
        "coal_grade": "A1",
        "max_temp": 65.0,
        "shift": 2,
        "temp": 5.0,
        "pressure": 1013.25,
        "humidity": 70,
        "precipitation": 0.0,
        "wind_dir": 0,
        "v_avg": 5.0,
        "v_max": 7.5,
        "cloudcover": 50,
        "weather_code": 0,
        "supply_grade": "A1",
        "to_warehouse_tn": 0.0,
        "to_ship_tn": 0.0,
        "supply_warehouse": 4,
        "pile_age_days": 30
    })
}

async fn seed_temperature(app: &Router) {
    let response = app
        .clone()
        .oneshot(upload(
            "/api/upload-csv",
            "temperature.csv",
            "4,46,A1,65.0,P1,2025-11-20,2\n4,46,A1,,P1,2025-11-20,2\n",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app().await;

    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let health = json_body(response).await;
    assert_eq!(health["status"], "healthy");
    assert!(health["components"]["store"].is_object());
    assert!(health["components"]["model"].is_object());
}

#[tokio::test]
async fn test_healthz_returns_503_without_model() {
    let (app, _state) = setup_app(ModelRegistry::empty()).await;

    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let health = json_body(response).await;
    assert_eq!(health["components"]["model"]["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_reflects_readiness() {
    let (app, state) = setup_test_app().await;

    let response = app.clone().oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    state.health_registry.set_ready(true).await;
    let response = app.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["ready"], true);
}

#[tokio::test]
async fn test_upload_counts_only_valid_rows() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(upload(
            "/api/upload-csv",
            "temperature.csv",
            "4,46,A1,65.0,P1,2025-11-20,2\n4,46,A1,,P1,2025-11-21,2\n3,12,A1,50.0,P2,2025-11-20,1\n",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["filename"], "temperature.csv");
    assert_eq!(body["kind"], "temperature");
    assert_eq!(body["inserted_rows"], 2);
}

#[tokio::test]
async fn test_upload_survives_restart_with_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("store.json");

    let state = Arc::new(AppState::new(
        Box::new(MemoryStore::with_persistence(snapshot.clone()).unwrap()),
        Arc::new(ModelRegistry::empty()),
        HealthRegistry::new(),
        IgnitionConfig::default(),
    ));
    let app = create_router(state);
    seed_temperature(&app).await;
    assert!(snapshot.exists());

    let reopened = MemoryStore::with_persistence(snapshot).unwrap();
    let state = Arc::new(AppState::new(
        Box::new(reopened),
        Arc::new(ModelRegistry::empty()),
        HealthRegistry::new(),
        IgnitionConfig::default(),
    ));
    let response = create_router(state)
        .oneshot(get("/api/stacks/4"))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["stacks"], json!(["46"]));
}

#[tokio::test]
async fn test_upload_kind_override() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(upload(
            "/api/upload-csv?kind=weather",
            "station_export.csv",
            "2025-11-19 12:00:00,3.5,1012.0,81,0.4,,4.2,,,,\n",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["kind"], "weather");
}

#[tokio::test]
async fn test_upload_rejections() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .clone()
        .oneshot(upload("/api/upload-csv", "temperature.txt", "4,46\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(upload("/api/upload-csv", "inventory.csv", "4,46\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "BAD_REQUEST");

    let response = app
        .oneshot(upload("/api/upload-csv", "temperature.csv", "a,b,c,d,e,f,g\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_predict_uses_default_reference_date() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(post_json("/api/predict", prediction_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["predicted_ignition_date"], "2025-11-22");
    assert_eq!(body["predicted_days_to_fire"], 1.0);
    assert_eq!(body["risk_level"], "high");
    assert_eq!(
        body["message"],
        "Predicted time to spontaneous ignition: 1.00 days (~1 days)"
    );
}

#[tokio::test]
async fn test_predict_with_explicit_date_and_unseen_pile() {
    let (app, _state) = setup_test_app().await;

    let mut request = prediction_body();
    request["pile_id"] = json!(999);
    request["current_date"] = json!("2025-12-01");

    let response = app.oneshot(post_json("/api/predict", request)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["predicted_ignition_date"], "2025-12-02");
}

#[tokio::test]
async fn test_predict_errors() {
    let (app, _state) = setup_test_app().await;
    let mut request = prediction_body();
    request["current_date"] = json!("01/12/2025");

    let response = app.oneshot(post_json("/api/predict", request)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (app, _state) = setup_app(ModelRegistry::empty()).await;
    let response = app
        .oneshot(post_json("/api/predict", prediction_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_dashboard_summary_explicit_window() {
    let (app, _state) = setup_test_app().await;
    seed_temperature(&app).await;

    let response = app
        .oneshot(get(
            "/api/dashboard-summary-test?start_date=2025-11-21&end_date=2025-11-25",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["period"], "2025-11-21 — 2025-11-25");

    let days = body["summary_by_day"].as_array().unwrap();
    assert_eq!(days.len(), 5);
    assert_eq!(days[1]["date"], "2025-11-22");
    assert_eq!(days[1]["count"], 1);
    assert!(days.iter().enumerate().all(|(i, d)| i == 1 || d["count"] == 0));

    let incidents = body["high_risk_incidents"].as_array().unwrap();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0]["pile_id"], "46");
    assert_eq!(incidents[0]["predicted_ignition_date"], "2025-11-22");
}

#[tokio::test]
async fn test_dashboard_summary_latest_known() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .clone()
        .oneshot(get("/api/dashboard-summary"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    seed_temperature(&app).await;
    let response = app
        .oneshot(get("/api/dashboard-summary?forecast_days=3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["period"], "2025-11-21 — 2025-11-23");
    assert_eq!(body["summary_by_day"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_dashboard_summary_rejects_bad_windows() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .clone()
        .oneshot(get(
            "/api/dashboard-summary-test?start_date=2025-11-25&end_date=2025-11-21",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(get(
            "/api/dashboard-summary-test?start_date=yesterday&end_date=2025-11-21",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dashboard_summary_rejects_oversized_windows() {
    let (app, _state) = setup_test_app().await;
    seed_temperature(&app).await;

    let response = app
        .clone()
        .oneshot(get("/api/dashboard-summary?forecast_days=4000000000"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "BAD_REQUEST");

    let response = app
        .clone()
        .oneshot(get(
            "/api/dashboard-summary-test?start_date=0001-01-01&end_date=9999-12-31",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(get("/api/dashboard-summary?forecast_days=366"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["summary_by_day"].as_array().unwrap().len(), 366);
}

#[tokio::test]
async fn test_history_endpoints() {
    let (app, _state) = setup_test_app().await;
    seed_temperature(&app).await;

    let response = app
        .clone()
        .oneshot(upload(
            "/api/upload-csv",
            "weather_data_2025.csv",
            "2025-11-20 09:00:00,3.0,1012.0,80,0.5,180,4.0,6.0,75,10000,3\n2025-11-20 21:00:00,1.0,1012.0,90,0.5,180,2.0,3.0,75,10000,3\n",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get("/api/weather?start=2025-11-20&end=2025-11-20"))
        .await
        .unwrap();
    let days = json_body(response).await;
    assert_eq!(days[0]["date"], "2025-11-20");
    assert_eq!(days[0]["avg_temp"], 2.0);
    assert_eq!(days[0]["avg_humidity"], 85);
    assert_eq!(days[0]["total_precip"], 1.0);
    assert_eq!(days[0]["avg_wind_speed"], 3.0);

    let response = app
        .clone()
        .oneshot(get(
            "/api/pile-weather?warehouse=4&pileId=46&start=2025-11-19&end=2025-11-21",
        ))
        .await
        .unwrap();
    let history = json_body(response).await;
    assert_eq!(history["temperatures"][0]["temp"], 65.0);
    assert_eq!(history["weather"].as_array().unwrap().len(), 1);
    assert!(history["fires"].as_array().unwrap().is_empty());

    let response = app.clone().oneshot(get("/api/warehouses")).await.unwrap();
    assert_eq!(json_body(response).await["warehouses"], json!([4]));

    let response = app.clone().oneshot(get("/api/stacks/4")).await.unwrap();
    assert_eq!(json_body(response).await["stacks"], json!(["46"]));

    let response = app
        .oneshot(get("/api/pile-age?warehouse=4&pileId=46"))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["pile_age_days"], 30);
}

#[tokio::test]
async fn test_reload_without_source_is_unavailable() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/model/reload")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, state) = setup_test_app().await;

    state.metrics.observe_prediction_latency(0.002);
    state.metrics.observe_forecast_latency(0.01);
    state.metrics.inc_rows_ingested("temperature", 1);
    state.metrics.set_model_version("v1.0.0", "abc");

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("ignition_prediction_latency_seconds_bucket"));
    assert!(metrics_text.contains("ignition_forecast_latency_seconds_count"));
    assert!(metrics_text.contains("ignition_rows_ingested_total"));
    assert!(metrics_text.contains("ignition_model_version_info"));
}
