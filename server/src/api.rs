// Dashboard HTTP API server
//
// REST endpoints plus SSE streaming for dashboard clients. Read paths
// never fail: the state source substitutes synthetic data for an empty
// or unreachable store. Write paths answer malformed bodies with a
// generic error envelope rather than structured validation.

use crate::config::ServerConfig;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Sse,
    },
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use pulseboard_core::hub::DASHBOARD_CHANNEL;
use pulseboard_core::model::{
    DashboardEvent, LogEntry, LogFilter, LogLevel, MetricSnapshot, SettingsPatch,
};
use pulseboard_core::synth::DEFAULT_USER;
use pulseboard_core::{DeployDriver, EventHub, StateSource};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

const LOGS_CAP: usize = 100;
const DEPLOYMENTS_CAP: usize = 20;
const UPTIME_CAP: usize = 24;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<EventHub>,
    pub source: Arc<StateSource>,
    pub deployer: Arc<DeployDriver>,
}

/// Dashboard HTTP server
pub struct ApiServer {
    config: ServerConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Bind and serve until the process exits
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        info!(target: "api", addr = %addr, "Starting API server");

        let app = router(self.state);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(
            target: "api",
            url = %format!("http://{addr}"),
            "API server ready"
        );

        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Build the router; exposed so tests can bind their own listener
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/metrics", get(metrics_handler))
        .route("/api/metrics/new", post(new_metrics_handler))
        .route("/api/logs", get(logs_handler))
        .route("/api/logs/new", post(new_logs_handler))
        .route("/api/deployments", get(deployments_handler))
        .route("/api/deploy", post(deploy_handler))
        .route("/api/insights", get(insights_handler))
        .route("/api/services", get(services_handler))
        .route("/api/services/:id/uptime", get(uptime_handler))
        .route("/api/settings", get(settings_handler))
        .route("/api/settings", patch(patch_settings_handler))
        .route("/api/events/stream", get(event_stream_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

// Generic envelope for a body that failed to parse. Deliberately a
// 500-class response with no field-level detail.
fn bad_body() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": "Invalid request body" })),
    )
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "service": "pulseboard-server",
    }))
}

/// Latest metric snapshot (single object, not a list)
async fn metrics_handler(State(state): State<AppState>) -> Json<MetricSnapshot> {
    Json(state.source.latest_metrics().await)
}

#[derive(Deserialize)]
struct NewMetricsRequest {
    cpu: i64,
    memory: i64,
    latency: i64,
    cost: f64,
}

/// Server-to-server injection: store the snapshot and fan it out without
/// a client round trip
async fn new_metrics_handler(
    State(state): State<AppState>,
    payload: Result<Json<NewMetricsRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Ok(Json(request)) = payload else {
        return bad_body();
    };

    let snapshot = MetricSnapshot {
        id: state.source.entropy().token(7),
        cpu: request.cpu,
        memory: request.memory,
        latency: request.latency,
        cost: request.cost,
        timestamp: Utc::now(),
    };
    state.source.record_metrics(&snapshot).await;
    state.hub.publish(
        DASHBOARD_CHANNEL,
        DashboardEvent::MetricsUpdate(snapshot.clone()),
    );

    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "metrics": snapshot,
            "message": "Metrics added successfully",
        })),
    )
}

#[derive(Deserialize)]
struct LogsQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    limit: Option<usize>,
}

/// Logs, newest first, capped at 100
async fn logs_handler(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Json<Vec<LogEntry>> {
    let filter = LogFilter::parse(query.kind.as_deref());
    let limit = query.limit.unwrap_or(LOGS_CAP).min(LOGS_CAP);
    Json(state.source.recent_logs(filter, limit).await)
}

#[derive(Deserialize)]
struct NewLogRequest {
    #[serde(rename = "type")]
    level: LogLevel,
    message: String,
    service: String,
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NewLogsBody {
    One(NewLogRequest),
    Many(Vec<NewLogRequest>),
}

/// Server-to-server injection: append entries and fan each out
async fn new_logs_handler(
    State(state): State<AppState>,
    payload: Result<Json<NewLogsBody>, JsonRejection>,
) -> impl IntoResponse {
    let Ok(Json(body)) = payload else {
        return bad_body();
    };
    let requests = match body {
        NewLogsBody::One(entry) => vec![entry],
        NewLogsBody::Many(entries) => entries,
    };

    let mut inserted = Vec::with_capacity(requests.len());
    for request in requests {
        let entry = LogEntry {
            id: state.source.entropy().token(7),
            level: request.level,
            message: request.message,
            service: request.service,
            timestamp: request.timestamp.unwrap_or_else(Utc::now),
        };
        state.source.record_log(&entry).await;
        state
            .hub
            .publish(DASHBOARD_CHANNEL, DashboardEvent::LogNew(entry.clone()));
        inserted.push(entry);
    }

    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "logs": inserted,
            "message": format!("{} log entries added", inserted.len()),
        })),
    )
}

/// Deployments, newest first, capped at 20
async fn deployments_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.source.recent_deployments(DEPLOYMENTS_CAP).await)
}

#[derive(Deserialize, Default)]
struct DeployRequest {
    branch: Option<String>,
}

/// Trigger a deployment. Returns immediately with the pending record;
/// progress and completion arrive on the event stream. A bare POST with
/// no body is accepted and deploys the default branch.
async fn deploy_handler(
    State(state): State<AppState>,
    payload: Option<Json<DeployRequest>>,
) -> impl IntoResponse {
    let Json(request) = payload.unwrap_or_else(|| Json(DeployRequest::default()));

    let deployment = state.deployer.trigger(request.branch).await;
    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "deployment": deployment,
            "message": format!("Deployment {} created successfully", deployment.id),
        })),
    )
}

async fn insights_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.source.daily_insight().await)
}

async fn services_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.source.services().await)
}

async fn uptime_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    Json(state.source.service_uptime(&id, UPTIME_CAP).await)
}

async fn settings_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.source.settings(DEFAULT_USER).await)
}

async fn patch_settings_handler(
    State(state): State<AppState>,
    payload: Result<Json<SettingsPatch>, JsonRejection>,
) -> impl IntoResponse {
    let Ok(Json(patch)) = payload else {
        return bad_body().into_response();
    };
    Json(state.source.store_settings(DEFAULT_USER, &patch).await).into_response()
}

/// SSE endpoint for real-time dashboard events. Every client joins the
/// one shared channel; there is no per-client filtering.
async fn event_stream_handler(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    info!(target: "api", "New SSE client connected");

    let rx = state.hub.subscribe(DASHBOARD_CHANNEL).into_receiver();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => match event.payload_json() {
            Ok(json) => Some(Ok(Event::default().event(event.wire_name()).data(json))),
            Err(e) => {
                warn!(target: "api", error = %e, "Failed to serialize event");
                None
            }
        },
        Err(e) => {
            // Lagged subscriber: the missed events are gone, keep going
            warn!(target: "api", error = %e, "Broadcast stream error");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
