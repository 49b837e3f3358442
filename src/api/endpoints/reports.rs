//! Report listing, retrieval, review, and the all-conversations summary.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::db::repository::report as report_repo;
use crate::models::MedicalReport;
use crate::report;

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Serialize)]
pub struct ReportsResponse {
    pub reports: Vec<MedicalReport>,
}

/// `GET /api/reports` — list the user's reports, newest first.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ReportsResponse>, ApiError> {
    let conn = ctx.state.open_db()?;
    let reports = report_repo::list_reports(
        &conn,
        &user.0.id,
        query.limit.unwrap_or(20).min(100),
        query.offset.unwrap_or(0),
    )?;
    Ok(Json(ReportsResponse { reports }))
}

/// `GET /api/reports/:id` — fetch one report (also the polling endpoint
/// for background generation).
pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<MedicalReport>, ApiError> {
    let conn = ctx.state.open_db()?;
    let report = report_repo::get_report_owned(&conn, &report_id, &user.0.id)?
        .ok_or_else(|| ApiError::NotFound("Report not found".into()))?;
    Ok(Json(report))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub status: &'static str,
    pub report_id: Uuid,
}

/// `DELETE /api/reports/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let conn = ctx.state.open_db()?;
    report_repo::delete_report(&conn, &report_id, &user.0.id).map_err(ApiError::from)?;
    Ok(Json(DeleteResponse {
        status: "deleted",
        report_id,
    }))
}

/// `POST /api/reports/summary` — consolidated report over all conversations.
pub async fn summary(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<(StatusCode, Json<MedicalReport>), ApiError> {
    let report = report::generate_summary_report(&ctx.state, &user.0).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub notes: String,
}

/// `PUT /api/reports/:id/review` — attach human-review annotations to a
/// completed report. The generated content itself stays immutable.
pub async fn review(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(report_id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<MedicalReport>, ApiError> {
    let notes = req.notes.trim();
    if notes.is_empty() {
        return Err(ApiError::Validation("Review notes cannot be empty".into()));
    }

    let conn = ctx.state.open_db()?;
    report_repo::set_review(&conn, &report_id, &user.0.id, notes)?;
    let report = report_repo::get_report_owned(&conn, &report_id, &user.0.id)?
        .ok_or_else(|| ApiError::NotFound("Report not found".into()))?;
    Ok(Json(report))
}
