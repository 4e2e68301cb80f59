use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tokio::sync::RwLock;
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::{
    client::ApiClient,
    config::ClientConfig,
    error::PipelineError,
    export,
    pipeline,
    table::Session,
    types::DisplayMode,
};

#[derive(Clone)]
pub struct AppState {
    session: Arc<RwLock<Session>>, // current result set, last completed batch wins
    client: ApiClient,
    report_filename: Arc<str>,
}

impl AppState {
    pub fn new(client: ApiClient, report_filename: &str) -> Self {
        Self {
            session: Arc::new(RwLock::new(Session::new())),
            client,
            report_filename: Arc::from(report_filename),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryBody {
    pub input: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeBody {
    pub input: String,
    #[serde(default)]
    pub internal: bool,
}

#[derive(Debug, Deserialize)]
pub struct SortBody {
    pub column: String,
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = match &self {
            PipelineError::EmptyInput | PipelineError::UnknownColumn(_) => StatusCode::BAD_REQUEST,
            PipelineError::BatchFailed(_) => StatusCode::BAD_GATEWAY,
            PipelineError::NothingToExport => StatusCode::CONFLICT,
            PipelineError::Csv(_) | PipelineError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// API routes plus the static page from `ui/`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/results", get(get_results))
        .route("/query", post(post_query))
        .route("/analyze", post(post_analyze))
        .route("/sort", post(post_sort))
        .route("/export", get(get_export))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state);

    let static_svc = ServeDir::new("ui").append_index_html_on_directories(true);

    Router::new()
        .nest("/api", api)
        .fallback_service(static_svc)
        .layer(TraceLayer::new_for_http())
}

pub async fn spawn_server(config: &ClientConfig) -> Result<()> {
    let client = ApiClient::new(config)?;
    let app = router(AppState::new(client, &config.report_filename));

    info!("serving UI on http://{}", config.bind);
    axum::serve(tokio::net::TcpListener::bind(&config.bind).await?, app).await?;
    Ok(())
}

async fn get_results(State(app): State<AppState>) -> impl IntoResponse {
    let s = app.session.read().await;
    (StatusCode::OK, Json(s.render()))
}

async fn post_query(
    State(app): State<AppState>,
    Json(req): Json<QueryBody>,
) -> Result<Response, PipelineError> {
    let batch = pipeline::run_query(&app.client, &req.input).await?;
    let table = app.session.write().await.replace(batch);
    Ok((StatusCode::OK, Json(table)).into_response())
}

async fn post_analyze(
    State(app): State<AppState>,
    Json(req): Json<AnalyzeBody>,
) -> Result<Response, PipelineError> {
    let mode = if req.internal {
        DisplayMode::Internal
    } else {
        DisplayMode::External
    };
    let batch = pipeline::run_analyze(&app.client, &req.input, mode)
        .await
        .inspect_err(|e| error!("analyze failed: {e}"))?;
    let table = app.session.write().await.replace(batch);
    Ok((StatusCode::OK, Json(table)).into_response())
}

async fn post_sort(
    State(app): State<AppState>,
    Json(req): Json<SortBody>,
) -> Result<Response, PipelineError> {
    let table = app.session.write().await.sort_by(&req.column)?;
    Ok((StatusCode::OK, Json(table)).into_response())
}

async fn get_export(State(app): State<AppState>) -> Result<Response, PipelineError> {
    let doc = export::export_current(&*app.session.read().await)?;
    let disposition = format!("attachment; filename=\"{}\"", app.report_filename);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        doc,
    )
        .into_response())
}
