//! Conversation endpoints: lifecycle, messaging, follow-ups, reports.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::chat::{self, ChatStatus};
use crate::db::repository::conversation::{self as conv_repo, ConversationSummary};
use crate::db::repository::report as report_repo;
use crate::models::enums::ReportType;
use crate::models::{Conversation, MedicalReport, Message};
use crate::report;

#[derive(Deserialize)]
pub struct StartConversationRequest {
    pub initial_message: String,
    pub chief_complaint: Option<String>,
}

#[derive(Serialize)]
pub struct StartConversationResponse {
    pub conversation_id: Uuid,
    pub status: ChatStatus,
    pub initial_response: String,
    pub user_message: Message,
    pub ai_message: Message,
}

/// `POST /api/conversations` — start a consultation.
pub async fn start(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Json(req): Json<StartConversationRequest>,
) -> Result<(StatusCode, Json<StartConversationResponse>), ApiError> {
    let outcome = chat::start_conversation(
        &ctx.state,
        user.0.id,
        &req.initial_message,
        req.chief_complaint,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(StartConversationResponse {
            conversation_id: outcome.conversation.id,
            status: outcome.status,
            initial_response: outcome.assistant_message.content.clone(),
            user_message: outcome.user_message,
            ai_message: outcome.assistant_message,
        }),
    ))
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Serialize)]
pub struct SendMessageResponse {
    pub status: ChatStatus,
    pub user_message: Message,
    pub ai_message: Message,
    pub requires_followup: bool,
}

/// `POST /api/conversations/:id/messages` — send a message.
pub async fn send_message(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(conversation_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let outcome =
        chat::send_message(&ctx.state, user.0.id, conversation_id, &req.content).await?;

    Ok(Json(SendMessageResponse {
        status: outcome.status,
        requires_followup: outcome.assistant_message.requires_followup,
        user_message: outcome.user_message,
        ai_message: outcome.assistant_message,
    }))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Serialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<ConversationSummary>,
}

/// `GET /api/conversations` — list the user's conversations.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ConversationsResponse>, ApiError> {
    let conn = ctx.state.open_db()?;
    let conversations = conv_repo::list_conversation_summaries(
        &conn,
        &user.0.id,
        query.limit.unwrap_or(20).min(100),
        query.offset.unwrap_or(0),
    )?;

    Ok(Json(ConversationsResponse { conversations }))
}

#[derive(Serialize)]
pub struct ConversationDetailResponse {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
    pub message_count: usize,
}

/// `GET /api/conversations/:id` — full transcript.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<ConversationDetailResponse>, ApiError> {
    let conn = ctx.state.open_db()?;
    let conversation = conv_repo::get_conversation_owned(&conn, &conversation_id, &user.0.id)?
        .ok_or_else(|| ApiError::NotFound("Conversation not found".into()))?;
    let messages = conv_repo::get_messages(&conn, &conversation_id)?;
    let message_count = messages.len();

    Ok(Json(ConversationDetailResponse {
        conversation,
        messages,
        message_count,
    }))
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub conversation_id: Uuid,
}

/// `PUT /api/conversations/:id/complete` — mark completed.
pub async fn complete(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, ApiError> {
    chat::complete_conversation(&ctx.state, user.0.id, conversation_id)?;
    Ok(Json(StatusResponse {
        status: "completed",
        conversation_id,
    }))
}

/// `PUT /api/conversations/:id/archive` — move to the terminal archived state.
pub async fn archive(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, ApiError> {
    chat::archive_conversation(&ctx.state, user.0.id, conversation_id)?;
    Ok(Json(StatusResponse {
        status: "archived",
        conversation_id,
    }))
}

#[derive(Deserialize)]
pub struct UpdateTitleRequest {
    pub title: String,
}

/// `PUT /api/conversations/:id/title` — rename.
pub async fn update_title(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(conversation_id): Path<Uuid>,
    Json(req): Json<UpdateTitleRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    chat::update_title(&ctx.state, user.0.id, conversation_id, &req.title)?;
    Ok(Json(StatusResponse {
        status: "updated",
        conversation_id,
    }))
}

/// `DELETE /api/conversations/:id` — delete with cascade.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, ApiError> {
    let conn = ctx.state.open_db()?;
    conv_repo::get_conversation_owned(&conn, &conversation_id, &user.0.id)?
        .ok_or_else(|| ApiError::NotFound("Conversation not found".into()))?;
    conv_repo::delete_conversation(&conn, &conversation_id)?;

    Ok(Json(StatusResponse {
        status: "deleted",
        conversation_id,
    }))
}

#[derive(Serialize)]
pub struct FollowupResponse {
    pub conversation_id: Uuid,
    pub followup_questions: String,
}

/// `POST /api/conversations/:id/followup` — deterministic follow-up
/// questions for the information the transcript has not covered.
pub async fn followup(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<FollowupResponse>, ApiError> {
    let questions =
        chat::generate_followup_questions(&ctx.state, user.0.id, conversation_id)?;
    Ok(Json(FollowupResponse {
        conversation_id,
        followup_questions: questions,
    }))
}

#[derive(Deserialize)]
pub struct GenerateReportRequest {
    pub report_type: ReportType,
    /// Defer body generation to a background task; poll `GET /api/reports/:id`.
    #[serde(default)]
    pub background: bool,
}

/// `POST /api/conversations/:id/report` — generate a report.
pub async fn generate_report(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(conversation_id): Path<Uuid>,
    Json(req): Json<GenerateReportRequest>,
) -> Result<(StatusCode, Json<MedicalReport>), ApiError> {
    let report = if req.background {
        report::generate_report_background(&ctx.state, &user.0, conversation_id, req.report_type)
            .await?
    } else {
        report::generate_report(&ctx.state, &user.0, conversation_id, req.report_type).await?
    };

    Ok((StatusCode::CREATED, Json(report)))
}

/// `GET /api/conversations/:id/report/download` — latest completed report
/// as a PDF attachment.
///
/// The PDF is rendered on demand; a best-effort copy is written to the
/// reports directory and recorded on the report row, but a failure there
/// (or in rendering) never mutates the completed report content.
pub async fn download_report(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let report = {
        let conn = ctx.state.open_db()?;
        report_repo::latest_completed_for_conversation(&conn, &conversation_id, &user.0.id)?
            .ok_or_else(|| ApiError::NotFound("No completed report for conversation".into()))?
    };

    let bytes = report::render_report_pdf(&report, &user.0)?;
    persist_pdf_copy(&ctx, &report, &bytes);

    let filename = format!("report-{}.pdf", report.id);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(bytes.into())
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Write the rendered PDF next to the database and remember its path.
/// Failures are logged and ignored — the download still succeeds.
fn persist_pdf_copy(ctx: &ApiContext, report: &MedicalReport, bytes: &[u8]) {
    let dir = ctx.state.settings.reports_dir.clone();
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(error = %e, "Could not create reports directory");
        return;
    }
    let path = dir.join(format!("report-{}.pdf", report.id));
    if let Err(e) = std::fs::write(&path, bytes) {
        tracing::warn!(error = %e, "Could not write report PDF");
        return;
    }
    if let Ok(conn) = ctx.state.open_db() {
        if let Err(e) = report_repo::set_file_path(&conn, &report.id, &path.to_string_lossy()) {
            tracing::warn!(error = %e, "Could not record report file path");
        }
    }
}
