//! HTTP API surface: routing, handlers, and the error envelope.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use phonescout_batch::run_batch;
use phonescout_ingest::read_phone_csv;
use phonescout_lookup::PhoneLookup;
use phonescout_shared::{BatchId, BatchOptions, BatchRun, BatchStatus, PhoneLookupResult};

use crate::events::batch_events;
use crate::registry::{BatchRegistry, ServerProgress};

// ---------------------------------------------------------------------------
// State and error envelope
// ---------------------------------------------------------------------------

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub lookup: Arc<dyn PhoneLookup>,
    pub batch_options: Arc<BatchOptions>,
    pub registry: Arc<BatchRegistry>,
    /// Parent token; every run's token is a child, so shutdown cancels all.
    pub shutdown: CancellationToken,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        Self::new("conflict", message)
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.code {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/lookups", post(create_lookup))
        .route("/api/batches", post(create_batch))
        .route("/api/batches/{id}", get(get_batch))
        .route("/api/batches/{id}/events", get(batch_events))
        .route("/api/batches/{id}/cancel", post(cancel_batch))
        .route("/api/batches/{id}/report", get(get_batch_report))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors()),
        )
        .with_state(state)
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct LookupRequest {
    #[serde(default)]
    phone: String,
}

async fn create_lookup(
    State(state): State<AppState>,
    Json(request): Json<LookupRequest>,
) -> Result<Json<PhoneLookupResult>, ApiError> {
    if request.phone.trim().is_empty() {
        return Err(ApiError::bad_request("phone is required"));
    }
    let result = state.lookup.lookup(&request.phone, &state.shutdown).await;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct BatchQuery {
    column: Option<String>,
}

#[derive(Debug, Serialize)]
struct BatchAccepted {
    id: BatchId,
    total: usize,
    source_column: String,
}

async fn create_batch(
    State(state): State<AppState>,
    Query(query): Query<BatchQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<BatchAccepted>), ApiError> {
    let input = read_phone_csv(&body, query.column.as_deref()).map_err(|e| {
        warn!(error = %e, "batch upload rejected");
        ApiError::bad_request(e.to_string())
    })?;

    let total = input.phones.len();
    let mut run = BatchRun::new(total);
    run.source_column = Some(input.source_column.clone());

    let cancel = state.shutdown.child_token();
    let handle = state.registry.insert(run, cancel.clone());
    let accepted = BatchAccepted {
        id: handle.id,
        total,
        source_column: input.source_column,
    };

    let lookup = Arc::clone(&state.lookup);
    let options = Arc::clone(&state.batch_options);
    let progress = ServerProgress::new(Arc::clone(&handle));
    tokio::spawn(async move {
        run_batch(lookup, input.phones, &options, &progress, &cancel).await;
    });

    info!(id = %accepted.id, total, "batch accepted");
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

#[derive(Debug, Serialize)]
struct BatchSnapshot {
    #[serde(flatten)]
    run: BatchRun,
    percent: u8,
}

async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<BatchId>,
) -> Result<Json<BatchSnapshot>, ApiError> {
    let handle = state
        .registry
        .get(&id)
        .ok_or_else(|| ApiError::not_found(format!("no batch {id}")))?;
    let run = handle.snapshot();
    let percent = run.percent();
    Ok(Json(BatchSnapshot { run, percent }))
}

async fn cancel_batch(
    State(state): State<AppState>,
    Path(id): Path<BatchId>,
) -> Result<StatusCode, ApiError> {
    let handle = state
        .registry
        .get(&id)
        .ok_or_else(|| ApiError::not_found(format!("no batch {id}")))?;

    if handle.snapshot().status != BatchStatus::Running {
        return Err(ApiError::conflict("batch already finished"));
    }

    handle.cancel.cancel();
    info!(id = %id, "batch cancellation requested");
    Ok(StatusCode::NO_CONTENT)
}

async fn get_batch_report(
    State(state): State<AppState>,
    Path(id): Path<BatchId>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = state
        .registry
        .get(&id)
        .ok_or_else(|| ApiError::not_found(format!("no batch {id}")))?;

    let run = handle.snapshot();
    match run.status {
        BatchStatus::Running => Err(ApiError::conflict("batch still running")),
        BatchStatus::Failed => Err(ApiError::conflict("batch did not complete")),
        BatchStatus::Completed => {
            let csv = phonescout_report::render_csv(&run.results).map_err(|e| {
                error!(error = %e, "report rendering failed");
                ApiError::internal("report rendering failed")
            })?;
            Ok(([(header::CONTENT_TYPE, "text/csv")], csv))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;
    use uuid::Uuid;

    struct FakeLookup;

    #[async_trait]
    impl PhoneLookup for FakeLookup {
        async fn lookup(&self, phone: &str, _cancel: &CancellationToken) -> PhoneLookupResult {
            ok_result(phone)
        }
    }

    /// Parks until cancelled, so runs stay observable mid-flight.
    struct SlowLookup;

    #[async_trait]
    impl PhoneLookup for SlowLookup {
        async fn lookup(&self, phone: &str, cancel: &CancellationToken) -> PhoneLookupResult {
            tokio::select! {
                _ = cancel.cancelled() => PhoneLookupResult::failure(phone, "lookup cancelled"),
                _ = tokio::time::sleep(Duration::from_secs(30)) => ok_result(phone),
            }
        }
    }

    fn ok_result(phone: &str) -> PhoneLookupResult {
        PhoneLookupResult {
            phone: phone.to_string(),
            report_date: "August 25, 2026".to_string(),
            line_type: "CELL PHONE".to_string(),
            company: "Verizon Wireless".to_string(),
            location: "Dallas, Texas".to_string(),
            is_mobile: true,
            carrier: "Verizon Wireless".to_string(),
            sms_gateway: "5551234567@vtext.com".to_string(),
            error: String::new(),
        }
    }

    fn test_state(lookup: Arc<dyn PhoneLookup>) -> AppState {
        AppState {
            lookup,
            batch_options: Arc::new(BatchOptions {
                rate_limit: Duration::ZERO,
                output_dir: std::env::temp_dir().join(format!("ps-server-{}", Uuid::now_v7())),
            }),
            registry: Arc::new(BatchRegistry::default()),
            shutdown: CancellationToken::new(),
        }
    }

    async fn response_json(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json parse")
    }

    async fn get(app: &Router, uri: &str) -> axum::response::Response {
        app.clone()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response")
    }

    async fn post(app: &Router, uri: &str, content_type: &str, body: &str) -> axum::response::Response {
        app.clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", content_type)
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response")
    }

    async fn wait_for_terminal(app: &Router, id: &str) -> serde_json::Value {
        for _ in 0..500 {
            let json = response_json(get(app, &format!("/api/batches/{id}")).await).await;
            if json["status"] != "running" {
                return json;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("batch never reached a terminal status");
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let app = build_app(test_state(Arc::new(FakeLookup)));

        let response = get(&app, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn lookup_requires_a_phone() {
        let app = build_app(test_state(Arc::new(FakeLookup)));

        let response = post(&app, "/api/lookups", "application/json", r#"{"phone": "   "}"#).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response_json(response).await["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn lookup_returns_the_result_json() {
        let app = build_app(test_state(Arc::new(FakeLookup)));

        let response = post(
            &app,
            "/api/lookups",
            "application/json",
            r#"{"phone": "(555) 123-4567"}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["phone"], "(555) 123-4567");
        assert_eq!(json["type"], "CELL PHONE");
        assert_eq!(json["carrier"], "Verizon Wireless");
        assert_eq!(json["is_mobile"], true);
    }

    #[tokio::test]
    async fn batch_upload_rejects_an_empty_body() {
        let app = build_app(test_state(Arc::new(FakeLookup)));

        let response = post(&app, "/api/batches", "text/csv", "").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn batch_upload_runs_to_completion() {
        let state = test_state(Arc::new(FakeLookup));
        let app = build_app(state);

        let response = post(
            &app,
            "/api/batches",
            "text/csv",
            "Phone Number\n5551234567\n5559876543\n",
        )
        .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let accepted = response_json(response).await;
        assert_eq!(accepted["total"], 2);
        assert_eq!(accepted["source_column"], "Phone Number");

        let id = accepted["id"].as_str().expect("batch id").to_string();
        let terminal = wait_for_terminal(&app, &id).await;
        assert_eq!(terminal["status"], "completed");
        assert_eq!(terminal["percent"], 100);
        assert_eq!(terminal["completed_count"], 2);
        assert_eq!(terminal["results"].as_array().map(|r| r.len()), Some(2));
        assert_eq!(terminal["source_column"], "Phone Number");
        assert!(terminal["report_path"].as_str().is_some());
    }

    #[tokio::test]
    async fn unknown_batch_returns_404() {
        let app = build_app(test_state(Arc::new(FakeLookup)));
        let id = BatchId::new();

        for uri in [
            format!("/api/batches/{id}"),
            format!("/api/batches/{id}/events"),
            format!("/api/batches/{id}/report"),
        ] {
            let response = get(&app, &uri).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn cancel_stops_a_running_batch() {
        let app = build_app(test_state(Arc::new(SlowLookup)));

        let response = post(&app, "/api/batches", "text/csv", "phone\n5551234567\n5559876543\n").await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let id = response_json(response).await["id"]
            .as_str()
            .expect("batch id")
            .to_string();

        // Report is unavailable while the run is in flight.
        let report = get(&app, &format!("/api/batches/{id}/report")).await;
        assert_eq!(report.status(), StatusCode::CONFLICT);

        let cancel = post(&app, &format!("/api/batches/{id}/cancel"), "text/plain", "").await;
        assert_eq!(cancel.status(), StatusCode::NO_CONTENT);

        let terminal = wait_for_terminal(&app, &id).await;
        assert_eq!(terminal["status"], "failed");
        assert!(
            terminal["error"]
                .as_str()
                .is_some_and(|e| e.contains("cancelled")),
            "unexpected error: {}",
            terminal["error"]
        );

        // A second cancel hits a terminal run.
        let again = post(&app, &format!("/api/batches/{id}/cancel"), "text/plain", "").await;
        assert_eq!(again.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn report_returns_csv_for_a_completed_run() {
        let app = build_app(test_state(Arc::new(FakeLookup)));

        let response = post(&app, "/api/batches", "text/csv", "phone\n5551234567\n").await;
        let id = response_json(response).await["id"]
            .as_str()
            .expect("batch id")
            .to_string();
        wait_for_terminal(&app, &id).await;

        let report = get(&app, &format!("/api/batches/{id}/report")).await;
        assert_eq!(report.status(), StatusCode::OK);
        assert_eq!(
            report
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok()),
            Some("text/csv")
        );

        let body = to_bytes(report.into_body(), usize::MAX).await.expect("body");
        let text = String::from_utf8(body.to_vec()).expect("utf8");
        assert!(text.starts_with("phone,date,type,company,location"));
        assert!(text.contains("5551234567@vtext.com"));
    }
}
