use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use fundboard_proto::protocol::{Command, DashboardState};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::error::DashboardError;
use crate::handle::DashboardHandle;
use crate::index::GroupedView;

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct ApiError(DashboardError);

impl From<DashboardError> for ApiError {
    fn from(e: DashboardError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DashboardError::Busy(_) => StatusCode::CONFLICT,
            DashboardError::Validation(_) => StatusCode::BAD_REQUEST,
            DashboardError::NotFound(_) => StatusCode::NOT_FOUND,
            DashboardError::CoreStopped => StatusCode::SERVICE_UNAVAILABLE,
            DashboardError::Network(_) | DashboardError::Timeout(_) => StatusCode::BAD_GATEWAY,
        };
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult = Result<StatusCode, ApiError>;

/// Local API over a running core.
pub fn router(handle: DashboardHandle) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/reports", get(get_reports))
        .route("/api/refresh", post(refresh))
        .route("/api/select/:filename", post(select))
        .route("/api/generate/:asset", post(generate))
        .route("/api/query", post(set_query))
        .route("/api/dates/:date/toggle", post(toggle_date))
        .route("/api/polling/start", post(start_polling))
        .route("/api/polling/stop", post(stop_polling))
        .route("/api/overview/refresh", post(refresh_overview))
        .route("/api/notices/:id", delete(dismiss_notice))
        .route("/api/command", post(command))
        .layer(CorsLayer::permissive())
        .with_state(handle)
}

pub fn start_server(
    bind_address: String,
    port: u16,
    handle: DashboardHandle,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = router(handle);

        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}", addr, e);
                return;
            }
        };

        info!("HTTP API server listening on http://{}", addr);

        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    })
}

async fn get_state(State(handle): State<DashboardHandle>) -> Json<DashboardState> {
    Json(handle.state().await)
}

async fn get_reports(
    State(handle): State<DashboardHandle>,
    Query(params): Query<SearchParams>,
) -> Json<GroupedView> {
    let view = match params.q {
        Some(q) => handle.grouped(&q).await,
        None => handle.grouped_view().await,
    };
    Json(view)
}

async fn refresh(State(handle): State<DashboardHandle>) -> ApiResult {
    info!("HTTP API: refresh catalog");
    handle.refresh().await?;
    Ok(StatusCode::OK)
}

async fn select(State(handle): State<DashboardHandle>, Path(filename): Path<String>) -> ApiResult {
    info!("HTTP API: select {}", filename);
    handle.select_filename(&filename).await?;
    Ok(StatusCode::OK)
}

async fn generate(State(handle): State<DashboardHandle>, Path(asset): Path<String>) -> ApiResult {
    info!("HTTP API: generate {}", asset);
    handle.generate_named(&asset).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn set_query(
    State(handle): State<DashboardHandle>,
    Query(params): Query<SearchParams>,
) -> ApiResult {
    handle.set_query(params.q.as_deref().unwrap_or_default()).await?;
    Ok(StatusCode::OK)
}

async fn toggle_date(State(handle): State<DashboardHandle>, Path(date): Path<String>) -> ApiResult {
    handle.toggle_date(&date).await?;
    Ok(StatusCode::OK)
}

async fn start_polling(State(handle): State<DashboardHandle>) -> ApiResult {
    info!("HTTP API: start overview polling");
    handle.start_polling().await?;
    Ok(StatusCode::OK)
}

async fn stop_polling(State(handle): State<DashboardHandle>) -> ApiResult {
    info!("HTTP API: stop overview polling");
    handle.stop_polling().await?;
    Ok(StatusCode::OK)
}

async fn refresh_overview(State(handle): State<DashboardHandle>) -> ApiResult {
    handle.refresh_overview().await?;
    Ok(StatusCode::OK)
}

async fn dismiss_notice(State(handle): State<DashboardHandle>, Path(id): Path<u64>) -> ApiResult {
    handle.dismiss_notice(id).await?;
    Ok(StatusCode::OK)
}

async fn command(
    State(handle): State<DashboardHandle>,
    payload: Result<Json<Command>, JsonRejection>,
) -> ApiResult {
    let Json(cmd) = payload.map_err(|e| DashboardError::Validation(e.body_text()))?;
    info!("HTTP API: command {:?}", cmd);
    handle.dispatch(cmd).await?;
    Ok(StatusCode::OK)
}
