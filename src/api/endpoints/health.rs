//! Liveness, readiness, and per-dependency health probes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::config;
use crate::llm::LlmClient;

#[derive(Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /health/live` — process is up.
pub async fn live() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive",
        version: config::APP_VERSION,
    })
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
}

/// `GET /health/ready` — 200 when the database and the inference server
/// are both reachable, 503 otherwise.
pub async fn ready(
    State(ctx): State<ApiContext>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let db_ok = database_check(&ctx).is_ok();
    let llm_ok = ctx.state.llm.list_models().await.is_ok();

    if db_ok && llm_ok {
        Ok(Json(ReadinessResponse { status: "ready" }))
    } else {
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not ready",
            }),
        ))
    }
}

#[derive(Serialize)]
pub struct DependencyStatus {
    pub status: &'static str,
    pub message: String,
}

#[derive(Serialize)]
pub struct DetailedHealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub checks: Checks,
}

#[derive(Serialize)]
pub struct Checks {
    pub database: DependencyStatus,
    pub llm: DependencyStatus,
}

/// `GET /health/detailed` — per-dependency status. An unreachable LLM
/// degrades the service (fallbacks still answer); a broken database makes
/// it unhealthy.
pub async fn detailed(State(ctx): State<ApiContext>) -> Json<DetailedHealthResponse> {
    let database = match database_check(&ctx) {
        Ok(()) => DependencyStatus {
            status: "healthy",
            message: "Database connection successful".into(),
        },
        Err(e) => DependencyStatus {
            status: "unhealthy",
            message: format!("Database connection failed: {e}"),
        },
    };

    let model = ctx.state.llm.model_id().to_string();
    let llm = if ctx.state.llm.is_model_available().await {
        DependencyStatus {
            status: "healthy",
            message: format!("Model {model} is available"),
        }
    } else {
        DependencyStatus {
            status: "degraded",
            message: format!("Model {model} not reachable; fallback responses active"),
        }
    };

    let status = if database.status == "unhealthy" {
        "unhealthy"
    } else if llm.status != "healthy" {
        "degraded"
    } else {
        "healthy"
    };

    Json(DetailedHealthResponse {
        status,
        version: config::APP_VERSION,
        checks: Checks { database, llm },
    })
}

fn database_check(ctx: &ApiContext) -> Result<(), crate::db::DatabaseError> {
    let conn = ctx.state.open_db()?;
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
    Ok(())
}
