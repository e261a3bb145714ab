use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tastemap_session::{
    Collaborators, HttpBackend, MaterializeRequest, ServerConfig, SessionError, SessionTable, SessionView,
};

static PROM: OnceCell<PrometheusHandle> = OnceCell::new();

struct AppState { backend: Arc<HttpBackend>, sessions: SessionTable }
type Shared = Arc<AppState>;

struct ApiError(SessionError);

impl From<SessionError> for ApiError { fn from(e: SessionError) -> Self { ApiError(e) } }

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SessionError::NotLoaded => StatusCode::NOT_FOUND,
            SessionError::ClusterOutOfRange { .. } | SessionError::InvalidName => StatusCode::BAD_REQUEST,
            SessionError::Cancelled => StatusCode::CONFLICT,
            SessionError::Fetch { .. } | SessionError::Http(_) | SessionError::Status { .. } => StatusCode::BAD_GATEWAY,
        };
        counter!("api_errors_total", 1, "status" => status.as_u16().to_string());
        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

async fn metrics_handler() -> String { PROM.get().map(|h| h.render()).unwrap_or_default() }

async fn backend_health(State(app): State<Shared>) -> impl IntoResponse { Json(app.backend.health().await) }

async fn view_of(ctl: &tastemap_session::ClusterSessionController) -> Result<SessionView, ApiError> {
    let session = ctl.snapshot().await.ok_or(SessionError::NotLoaded)?;
    Ok(SessionView::new(session, &ctl.cluster_labels().await))
}

async fn load_session(State(app): State<Shared>, Path((group_id, user_id)): Path<(String, String)>) -> Result<Json<SessionView>, ApiError> {
    let (ctl, session) = app.sessions.load(&group_id, &user_id).await?;
    Ok(Json(SessionView::new(session, &ctl.cluster_labels().await)))
}

async fn get_session(State(app): State<Shared>, Path((group_id, user_id)): Path<(String, String)>) -> Result<Json<SessionView>, ApiError> {
    let ctl = app.sessions.get(&group_id, &user_id).await.ok_or(SessionError::NotLoaded)?;
    Ok(Json(view_of(&ctl).await?))
}

async fn set_count(State(app): State<Shared>, Path((group_id, user_id, k)): Path<(String, String, usize)>) -> Result<Json<SessionView>, ApiError> {
    let ctl = app.sessions.get(&group_id, &user_id).await.ok_or(SessionError::NotLoaded)?;
    ctl.set_cluster_count(k).await;
    Ok(Json(view_of(&ctl).await?))
}

#[derive(Deserialize)]
struct RenameBody { name: String }

async fn rename(State(app): State<Shared>, Path((group_id, user_id, index)): Path<(String, String, usize)>, Json(body): Json<RenameBody>) -> Result<Json<SessionView>, ApiError> {
    let ctl = app.sessions.get(&group_id, &user_id).await.ok_or(SessionError::NotLoaded)?;
    ctl.rename_cluster(index, &body.name).await?;
    Ok(Json(view_of(&ctl).await?))
}

async fn materialize(State(app): State<Shared>, Path((group_id, user_id, index)): Path<(String, String, usize)>, Json(body): Json<MaterializeRequest>) -> Result<impl IntoResponse, ApiError> {
    let ctl = app.sessions.get(&group_id, &user_id).await.ok_or(SessionError::NotLoaded)?;
    let created = ctl.materialize_cluster_as_group(index, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn close_session(State(app): State<Shared>, Path((group_id, user_id)): Path<(String, String)>) -> StatusCode {
    if app.sessions.close(&group_id, &user_id).await { StatusCode::NO_CONTENT } else { StatusCode::NOT_FOUND }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await { tracing::warn!(error = %e, "ctrl-c handler unavailable"); std::future::pending::<()>().await; }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tastemap_session=debug".into());
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(env_filter))
        .init();
    PROM.set(PrometheusBuilder::new().install_recorder()?).map_err(|_| anyhow::anyhow!("metrics recorder already installed"))?;

    let config = ServerConfig::from_env();
    let backend = Arc::new(HttpBackend::new(config.api_base.clone(), config.http_timeout)?);
    let state: Shared = Arc::new(AppState { backend: backend.clone(), sessions: SessionTable::new(config.session.clone(), Collaborators::shared(backend)) });

    let app = Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/metrics", get(metrics_handler))
        .route("/backend/health", get(backend_health))
        .route("/sessions/:group_id/:user_id", post(load_session).get(get_session).delete(close_session))
        .route("/sessions/:group_id/:user_id/count/:k", put(set_count))
        .route("/sessions/:group_id/:user_id/clusters/:index/name", put(rename))
        .route("/sessions/:group_id/:user_id/clusters/:index/materialize", post(materialize))
        .with_state(state);

    tracing::info!(addr = %config.listen, api = %config.api_base, "tastemap session service listening");
    axum::serve(tokio::net::TcpListener::bind(config.listen).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
