//! Symptom journal endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::journal::{self, PatternAnalysis, SymptomEntry, SymptomQuery, SymptomStats};
use crate::models::enums::SymptomCategory;
use crate::models::SymptomRecord;

/// `POST /api/symptoms` — record a symptom.
pub async fn record(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Json(entry): Json<SymptomEntry>,
) -> Result<(StatusCode, Json<SymptomRecord>), ApiError> {
    let symptom = journal::record_symptom(&ctx.state, user.0.id, entry).await?;
    Ok((StatusCode::CREATED, Json(symptom)))
}

#[derive(Deserialize)]
pub struct SymptomListQuery {
    pub days_back: Option<i64>,
    pub category: Option<String>,
    pub min_severity: Option<u8>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Serialize)]
pub struct SymptomsResponse {
    pub symptoms: Vec<SymptomRecord>,
}

/// `GET /api/symptoms` — filtered listing.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<SymptomListQuery>,
) -> Result<Json<SymptomsResponse>, ApiError> {
    let category = query
        .category
        .as_deref()
        .map(|raw| {
            SymptomCategory::from_str(raw)
                .map_err(|_| ApiError::Validation(format!("Invalid category: {raw}")))
        })
        .transpose()?;

    let symptoms = journal::list_symptoms(
        &ctx.state,
        user.0.id,
        &SymptomQuery {
            days_back: query.days_back.unwrap_or(30).max(0),
            category,
            min_severity: query.min_severity,
            limit: query.limit.unwrap_or(50).min(200),
            offset: query.offset.unwrap_or(0),
        },
    )?;

    Ok(Json(SymptomsResponse { symptoms }))
}

/// `GET /api/symptoms/categories` — the closed category set.
pub async fn categories() -> Json<Vec<&'static str>> {
    Json(
        SymptomCategory::all()
            .iter()
            .map(|category| category.as_str())
            .collect(),
    )
}

#[derive(Deserialize)]
pub struct StatsQuery {
    pub days_back: Option<i64>,
}

/// `GET /api/symptoms/stats` — aggregate statistics over a window.
pub async fn stats(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<SymptomStats>, ApiError> {
    let stats =
        journal::compute_statistics(&ctx.state, user.0.id, query.days_back.unwrap_or(30).max(0))?;
    Ok(Json(stats))
}

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub symptom_ids: Vec<Uuid>,
    pub additional_context: Option<String>,
}

/// `POST /api/symptoms/analyze` — LLM pattern analysis with fallback.
pub async fn analyze(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<PatternAnalysis>, ApiError> {
    let analysis = journal::analyze_pattern(
        &ctx.state,
        user.0.id,
        &req.symptom_ids,
        req.additional_context.as_deref(),
    )
    .await?;
    Ok(Json(analysis))
}

/// `PUT /api/symptoms/:id` — update an entry.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(symptom_id): Path<Uuid>,
    Json(entry): Json<SymptomEntry>,
) -> Result<Json<SymptomRecord>, ApiError> {
    let symptom = journal::update_symptom(&ctx.state, user.0.id, symptom_id, entry).await?;
    Ok(Json(symptom))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub status: &'static str,
    pub symptom_id: Uuid,
}

/// `DELETE /api/symptoms/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(symptom_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    journal::delete_symptom(&ctx.state, user.0.id, symptom_id)?;
    Ok(Json(DeleteResponse {
        status: "deleted",
        symptom_id,
    }))
}
