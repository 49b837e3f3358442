//! Report generation: transcript → LLM → structured report, with a full
//! deterministic fallback per report type.
//!
//! The LLM is asked for a JSON object; `parse_structured_report` is the
//! single place that interprets its free-text answer. Any parse or
//! transport failure produces a complete templated report instead — a
//! fallback report is still persisted as `completed`, distinguished only
//! by its content.

use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db::repository::{conversation as conv_repo, now, report as report_repo};
use crate::db::DatabaseError;
use crate::llm::prompt::{report_prompt, report_system_prompt, summary_prompt};
use crate::llm::{extract_json_object, GenerationOutcome, GenerationRequest, LlmClient};
use crate::models::enums::{MessageRole, ReportStatus, ReportType, UrgencyLevel};
use crate::models::{MedicalReport, Message, User};
use crate::state::AppState;

/// Messages included per conversation when building summary excerpts.
const SUMMARY_EXCERPT_MESSAGES: usize = 5;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report or conversation not found")]
    NotFound,

    #[error("Conversation has no messages to report on")]
    EmptyTranscript,

    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Error, PartialEq)]
pub enum ReportParseError {
    #[error("No JSON object found in response")]
    MissingJson,

    #[error("JSON decode failed: {0}")]
    Decode(String),

    #[error("Required field missing or empty: {0}")]
    MissingField(&'static str),
}

/// Content fields of a generated report, LLM-parsed or templated.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportFields {
    pub title: String,
    pub summary: String,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub urgency_level: UrgencyLevel,
}

// ─── Structured parsing ───────────────────────────────────────────────────────

/// Parse the LLM's free-text answer into report fields.
///
/// Finds the first balanced `{...}` substring and decodes it. Title and
/// summary must be present and non-empty; the list fields are lenient
/// (non-string members are skipped); urgency is coerced into the closed
/// set. Everything else is a parse error, which callers turn into the
/// fallback template.
pub fn parse_structured_report(text: &str) -> Result<ReportFields, ReportParseError> {
    #[derive(Deserialize)]
    struct RawReport {
        title: Option<String>,
        summary: Option<String>,
        key_findings: Option<Vec<serde_json::Value>>,
        recommendations: Option<Vec<serde_json::Value>>,
        urgency_level: Option<String>,
    }

    let json = extract_json_object(text).ok_or(ReportParseError::MissingJson)?;
    let raw: RawReport =
        serde_json::from_str(json).map_err(|e| ReportParseError::Decode(e.to_string()))?;

    let title = raw
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or(ReportParseError::MissingField("title"))?;
    let summary = raw
        .summary
        .filter(|s| !s.trim().is_empty())
        .ok_or(ReportParseError::MissingField("summary"))?;

    Ok(ReportFields {
        title,
        summary,
        key_findings: string_items(raw.key_findings),
        recommendations: string_items(raw.recommendations),
        urgency_level: UrgencyLevel::coerce(raw.urgency_level.as_deref().unwrap_or("")),
    })
}

fn string_items(items: Option<Vec<serde_json::Value>>) -> Vec<String> {
    items
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}

// ─── Single-conversation reports ──────────────────────────────────────────────

/// Generate a report for one conversation and persist it as completed.
pub async fn generate_report(
    state: &AppState,
    user: &User,
    conversation_id: Uuid,
    report_type: ReportType,
) -> Result<MedicalReport, ReportError> {
    let (draft, context) = prepare_report(state, user, conversation_id, report_type)?;
    finish_report(state, draft, context, report_type).await
}

/// Create the in-progress report row and return it immediately; the body
/// is generated by a spawned task the client observes through polling
/// `GET /api/reports/:id`.
pub async fn generate_report_background(
    state: &AppState,
    user: &User,
    conversation_id: Uuid,
    report_type: ReportType,
) -> Result<MedicalReport, ReportError> {
    let (draft, context) = prepare_report(state, user, conversation_id, report_type)?;

    let task_state = state.clone();
    let pending = draft.clone();
    tokio::spawn(async move {
        let report_id = pending.id;
        if let Err(e) = finish_report(&task_state, pending, context, report_type).await {
            tracing::error!(%report_id, error = %e, "Background report generation failed");
            if let Ok(conn) = task_state.open_db() {
                let _ = report_repo::mark_failed(&conn, &report_id);
            }
        }
    });

    Ok(draft)
}

/// Validate inputs, persist the in-progress row, and build the prompt.
/// All persistence happens before the LLM call.
fn prepare_report(
    state: &AppState,
    user: &User,
    conversation_id: Uuid,
    report_type: ReportType,
) -> Result<(MedicalReport, FallbackContext), ReportError> {
    let conn = state.open_db()?;
    let conversation = conv_repo::get_conversation_owned(&conn, &conversation_id, &user.id)?
        .ok_or(ReportError::NotFound)?;
    let messages = conv_repo::get_messages(&conn, &conversation_id)?;
    if messages.is_empty() {
        return Err(ReportError::EmptyTranscript);
    }

    let draft = MedicalReport {
        id: Uuid::new_v4(),
        user_id: user.id,
        conversation_id: Some(conversation_id),
        title: default_title(report_type),
        report_type,
        status: ReportStatus::InProgress,
        urgency_level: UrgencyLevel::Low,
        summary: None,
        key_findings: vec![],
        recommendations: vec![],
        model_used: None,
        latency_ms: None,
        file_path: None,
        review_notes: None,
        reviewed_at: None,
        created_at: now(),
        completed_at: None,
    };
    report_repo::insert_report(&conn, &draft)?;

    let transcript = format_transcript(&messages);
    let context = FallbackContext {
        prompt: report_prompt(
            report_type,
            user,
            conversation.chief_complaint.as_deref(),
            &conversation.started_at.to_string(),
            &transcript,
        ),
        chief_complaint: conversation.chief_complaint,
        total_messages: messages.len(),
        patient_messages: messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .count(),
        symptom_mentions: messages
            .iter()
            .filter(|m| m.role == MessageRole::User && m.contains_symptoms)
            .count(),
        fallback_urgency: None,
    };

    Ok((draft, context))
}

/// Prompt plus the transcript statistics the fallback template needs.
#[derive(Debug, Clone)]
struct FallbackContext {
    prompt: String,
    chief_complaint: Option<String>,
    total_messages: usize,
    patient_messages: usize,
    symptom_mentions: usize,
    /// Overrides the mention-derived urgency (summary reports).
    fallback_urgency: Option<UrgencyLevel>,
}

/// Run the LLM, parse or fall back, and complete the persisted row.
async fn finish_report(
    state: &AppState,
    mut draft: MedicalReport,
    context: FallbackContext,
    report_type: ReportType,
) -> Result<MedicalReport, ReportError> {
    let request = GenerationRequest::new(context.prompt.clone())
        .with_system(report_system_prompt(report_type))
        .with_temperature(0.2);
    let outcome = state.llm.generate(request).await;

    let (fields, model_used, latency_ms) = match outcome {
        GenerationOutcome::Success {
            ref text,
            ref model,
            latency_ms,
        } => match parse_structured_report(text) {
            Ok(fields) => (fields, Some(model.clone()), Some(latency_ms)),
            Err(e) => {
                tracing::warn!(error = %e, "Report response unparseable, using fallback template");
                (fallback_report(report_type, &context), None, Some(latency_ms))
            }
        },
        GenerationOutcome::Failure { reason, latency_ms } => {
            tracing::warn!(%reason, "Report generation failed, using fallback template");
            (fallback_report(report_type, &context), None, Some(latency_ms))
        }
    };

    draft.title = fields.title;
    draft.summary = Some(fields.summary);
    draft.key_findings = fields.key_findings;
    draft.recommendations = fields.recommendations;
    draft.urgency_level = fields.urgency_level;
    draft.model_used = model_used;
    draft.latency_ms = latency_ms;
    draft.status = ReportStatus::Completed;
    draft.completed_at = Some(now());

    let conn = state.open_db()?;
    report_repo::complete_report(&conn, &draft)?;
    Ok(draft)
}

// ─── Summary report over all conversations ────────────────────────────────────

/// Generate one consolidated report over all of the user's conversations.
pub async fn generate_summary_report(
    state: &AppState,
    user: &User,
) -> Result<MedicalReport, ReportError> {
    let (draft, context) = {
        let conn = state.open_db()?;
        let conversation_ids = conv_repo::list_conversation_ids(&conn, &user.id)?;
        if conversation_ids.is_empty() {
            return Err(ReportError::EmptyTranscript);
        }

        let mut excerpts = String::new();
        let mut total_messages = 0;
        let mut patient_messages = 0;
        let mut symptom_mentions = 0;

        for id in &conversation_ids {
            let messages = conv_repo::get_messages(&conn, id)?;
            total_messages += messages.len();
            patient_messages += messages
                .iter()
                .filter(|m| m.role == MessageRole::User)
                .count();
            symptom_mentions += messages
                .iter()
                .filter(|m| m.role == MessageRole::User && m.contains_symptoms)
                .count();

            excerpts.push_str(&format!("--- Conversation {id} ---\n"));
            excerpts.push_str(&format_transcript(
                &messages[..messages.len().min(SUMMARY_EXCERPT_MESSAGES)],
            ));
            excerpts.push('\n');
        }

        // Urgency from consultation frequency in the recent window
        let window_start =
            now() - chrono::Duration::days(state.settings.summary_window_days);
        let recent = conv_repo::count_started_since(&conn, &user.id, window_start)?;
        let urgency = if recent >= state.settings.summary_high_threshold {
            UrgencyLevel::High
        } else if recent >= state.settings.summary_medium_threshold {
            UrgencyLevel::Medium
        } else {
            UrgencyLevel::Low
        };

        let draft = MedicalReport {
            id: Uuid::new_v4(),
            user_id: user.id,
            conversation_id: None,
            title: default_title(ReportType::Summary),
            report_type: ReportType::Summary,
            status: ReportStatus::InProgress,
            urgency_level: UrgencyLevel::Low,
            summary: None,
            key_findings: vec![],
            recommendations: vec![],
            model_used: None,
            latency_ms: None,
            file_path: None,
            review_notes: None,
            reviewed_at: None,
            created_at: now(),
            completed_at: None,
        };
        report_repo::insert_report(&conn, &draft)?;

        let context = FallbackContext {
            prompt: summary_prompt(user, &excerpts),
            chief_complaint: None,
            total_messages,
            patient_messages,
            symptom_mentions,
            fallback_urgency: Some(urgency),
        };
        (draft, context)
    };

    finish_report(state, draft, context, ReportType::Summary).await
}

// ─── Fallback templates ───────────────────────────────────────────────────────

fn default_title(report_type: ReportType) -> String {
    match report_type {
        ReportType::InitialConsultation => "Initial Consultation Report",
        ReportType::FollowUp => "Follow-up Report",
        ReportType::SymptomTracking => "Symptom Tracking Report",
        ReportType::Summary => "Health Summary Report",
    }
    .to_string()
}

/// Deterministic report body built from transcript statistics. Always
/// complete: non-empty title, summary, findings, and recommendations.
fn fallback_report(report_type: ReportType, context: &FallbackContext) -> ReportFields {
    let mut key_findings = vec![
        format!(
            "Consultation contains {} message(s), {} from the patient",
            context.total_messages, context.patient_messages
        ),
        format!(
            "Symptom descriptions were detected in {} patient message(s)",
            context.symptom_mentions
        ),
    ];
    if let Some(ref complaint) = context.chief_complaint {
        key_findings.push(format!("Chief complaint: {complaint}"));
    }

    let summary = match report_type {
        ReportType::InitialConsultation => {
            "Automated summary of an initial consultation. The assistant collected the \
             patient's symptom descriptions; narrative analysis was unavailable, so this \
             report lists objective conversation statistics. Professional review of the \
             full transcript is recommended."
        }
        ReportType::FollowUp => {
            "Automated summary of a follow-up consultation. The conversation record is \
             preserved in full; narrative analysis was unavailable at generation time. \
             Compare with previous reports during professional review."
        }
        ReportType::SymptomTracking => {
            "Automated symptom tracking summary. Symptom mentions were identified by \
             keyword detection over the conversation transcript; narrative analysis was \
             unavailable at generation time."
        }
        ReportType::Summary => {
            "Automated consolidated summary across all recorded consultations. Narrative \
             analysis was unavailable at generation time; urgency reflects recent \
             consultation frequency."
        }
    }
    .to_string();

    let urgency_level = context.fallback_urgency.unwrap_or(if context.symptom_mentions > 0 {
        UrgencyLevel::Medium
    } else {
        UrgencyLevel::Low
    });

    let recommendations = vec![
        "Professional medical evaluation recommended".to_string(),
        "Review the full conversation transcript with a healthcare provider".to_string(),
    ];

    // Findings are never empty here, but keep the guarantee explicit
    if key_findings.is_empty() {
        key_findings.push("No conversation activity recorded".to_string());
    }

    ReportFields {
        title: default_title(report_type),
        summary,
        key_findings,
        recommendations,
        urgency_level,
    }
}

/// Transcript as role-prefixed lines.
fn format_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

// ─── PDF generation ───────────────────────────────────────────────────────────

use printpdf::*;
use std::io::BufWriter;

const PDF_DISCLAIMER: &str = "This report was generated by an automated health-intake \
    assistant from a patient conversation. It is not a medical diagnosis and must not be \
    used as a substitute for professional medical advice. Always consult a qualified \
    healthcare provider.";

/// Render a completed report to PDF bytes: title, patient block, findings,
/// recommendations, narrative, disclaimer. Pure function of its inputs; a
/// failure here never touches the persisted report row.
pub fn render_report_pdf(report: &MedicalReport, user: &User) -> Result<Vec<u8>, ReportError> {
    let (doc, page1, layer1) = PdfDocument::new(&report.title, Mm(210.0), Mm(297.0), "Layer 1");
    let layer = doc.get_page(page1).get_layer(layer1);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError::Pdf(format!("font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ReportError::Pdf(format!("font error: {e}")))?;

    let mut y = Mm(280.0);

    // Title and metadata
    layer.use_text(&report.title, 14.0, Mm(20.0), y, &bold);
    y -= Mm(6.0);
    layer.use_text(
        format!(
            "Type: {} — Urgency: {} — Generated: {}",
            report.report_type.as_str(),
            report.urgency_level.as_str(),
            report.created_at
        ),
        9.0,
        Mm(20.0),
        y,
        &font,
    );
    y -= Mm(10.0);

    // Patient info block
    layer.use_text("PATIENT:", 11.0, Mm(20.0), y, &bold);
    y -= Mm(6.0);
    let mut patient_lines = vec![user.full_name.clone().unwrap_or_else(|| user.username.clone())];
    if let Some(age) = user.age {
        patient_lines.push(format!("Age: {age}"));
    }
    if let Some(ref history) = user.medical_history {
        patient_lines.push(format!("History: {history}"));
    }
    if let Some(ref allergies) = user.allergies {
        patient_lines.push(format!("Allergies: {allergies}"));
    }
    for line in patient_lines {
        for wrapped in wrap_text(&line, 90) {
            layer.use_text(&wrapped, 9.0, Mm(25.0), y, &font);
            y -= Mm(4.5);
        }
    }
    y -= Mm(4.0);

    // Key findings
    layer.use_text("KEY FINDINGS:", 11.0, Mm(20.0), y, &bold);
    y -= Mm(6.0);
    for finding in &report.key_findings {
        for line in wrap_text(&format!("  · {finding}"), 90) {
            layer.use_text(&line, 9.0, Mm(25.0), y, &font);
            y -= Mm(4.5);
        }
    }
    y -= Mm(4.0);

    // Recommendations
    layer.use_text("RECOMMENDATIONS:", 11.0, Mm(20.0), y, &bold);
    y -= Mm(6.0);
    for (i, recommendation) in report.recommendations.iter().enumerate() {
        for line in wrap_text(&format!("  {}. {recommendation}", i + 1), 90) {
            layer.use_text(&line, 9.0, Mm(25.0), y, &font);
            y -= Mm(4.5);
        }
    }
    y -= Mm(4.0);

    // Narrative
    if let Some(ref summary) = report.summary {
        layer.use_text("NARRATIVE:", 11.0, Mm(20.0), y, &bold);
        y -= Mm(6.0);
        for line in wrap_text(summary, 95) {
            layer.use_text(&line, 9.0, Mm(25.0), y, &font);
            y -= Mm(4.5);
        }
        y -= Mm(4.0);
    }

    // Disclaimer
    y -= Mm(4.0);
    for line in wrap_text(PDF_DISCLAIMER, 100) {
        layer.use_text(&line, 7.0, Mm(20.0), y, &font);
        y -= Mm(3.5);
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| ReportError::Pdf(format!("save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| ReportError::Pdf(format!("buffer error: {e}")))
}

fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.len() + word.len() + 1 > max_chars && !current.is_empty() {
            lines.push(current.clone());
            current.clear();
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat;
    use crate::db::repository::user::insert_user;
    use crate::db::repository::user::tests::sample_user;
    use crate::llm::ollama::MockLlmClient;
    use crate::state::tests::test_state;

    const GOOD_REPORT_JSON: &str = r#"Sure, here is the report:
{
  "title": "Initial Consultation: Persistent Headache",
  "summary": "Patient reports a severe headache of one day's duration.",
  "key_findings": ["Headache, severity not yet quantified", "Onset yesterday"],
  "recommendations": ["Clinical evaluation within 48 hours"],
  "urgency_level": "medium"
}
Let me know if you need anything else."#;

    async fn seeded_conversation(
        llm: MockLlmClient,
    ) -> (AppState, User, Uuid, tempfile::TempDir) {
        let (state, tmp) = test_state(llm);
        let user = sample_user();
        {
            let conn = state.open_db().unwrap();
            insert_user(&conn, &user).unwrap();
        }
        let outcome = chat::start_conversation(
            &state,
            user.id,
            "I have a severe headache since yesterday",
            Some("headache".to_string()),
        )
        .await
        .unwrap();
        (state, user, outcome.conversation.id, tmp)
    }

    #[test]
    fn parse_accepts_json_with_prose() {
        let fields = parse_structured_report(GOOD_REPORT_JSON).unwrap();
        assert_eq!(fields.title, "Initial Consultation: Persistent Headache");
        assert_eq!(fields.key_findings.len(), 2);
        assert_eq!(fields.urgency_level, UrgencyLevel::Medium);
    }

    #[test]
    fn parse_rejects_missing_json() {
        assert_eq!(
            parse_structured_report("There is no JSON in this answer."),
            Err(ReportParseError::MissingJson)
        );
    }

    #[test]
    fn parse_rejects_empty_title() {
        let text = r#"{"title": "  ", "summary": "x", "urgency_level": "low"}"#;
        assert_eq!(
            parse_structured_report(text),
            Err(ReportParseError::MissingField("title"))
        );
    }

    #[test]
    fn parse_coerces_out_of_set_urgency() {
        let text = r#"{"title": "T", "summary": "S", "urgency_level": "catastrophic"}"#;
        let fields = parse_structured_report(text).unwrap();
        assert_eq!(fields.urgency_level, UrgencyLevel::Low);

        let text = r#"{"title": "T", "summary": "S", "urgency_level": "critical"}"#;
        let fields = parse_structured_report(text).unwrap();
        assert_eq!(fields.urgency_level, UrgencyLevel::Emergency);
    }

    #[test]
    fn parse_skips_non_string_list_items() {
        let text = r#"{"title": "T", "summary": "S",
            "key_findings": ["a", 42, {"x": 1}, "b"], "urgency_level": "low"}"#;
        let fields = parse_structured_report(text).unwrap();
        assert_eq!(fields.key_findings, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn generate_report_with_structured_response() {
        let (state, user, conversation_id, _tmp) = seeded_conversation(
            MockLlmClient::with_script(vec![
                Ok("Welcome!".into()),
                Ok(GOOD_REPORT_JSON.into()),
            ]),
        )
        .await;

        let report = generate_report(
            &state,
            &user,
            conversation_id,
            ReportType::InitialConsultation,
        )
        .await
        .unwrap();

        assert_eq!(report.status, ReportStatus::Completed);
        assert_eq!(report.title, "Initial Consultation: Persistent Headache");
        assert_eq!(report.urgency_level, UrgencyLevel::Medium);
        assert!(report.model_used.is_some());
        assert!(report.completed_at.is_some());
    }

    #[tokio::test]
    async fn fallback_guarantee_for_every_report_type() {
        for report_type in [
            ReportType::InitialConsultation,
            ReportType::FollowUp,
            ReportType::SymptomTracking,
            ReportType::Summary,
        ] {
            let (state, user, conversation_id, _tmp) = seeded_conversation(
                MockLlmClient::with_script(vec![Ok("Welcome!".into()), Err("down".into())]),
            )
            .await;

            let report = generate_report(&state, &user, conversation_id, report_type)
                .await
                .unwrap();

            assert_eq!(report.status, ReportStatus::Completed, "{report_type:?}");
            assert!(!report.title.is_empty(), "{report_type:?}");
            assert!(
                report.summary.as_deref().is_some_and(|s| !s.is_empty()),
                "{report_type:?}"
            );
            assert!(!report.key_findings.is_empty(), "{report_type:?}");
            assert!(!report.recommendations.is_empty(), "{report_type:?}");
            assert!(report.model_used.is_none(), "{report_type:?}");
        }
    }

    #[tokio::test]
    async fn unparseable_response_also_falls_back() {
        let (state, user, conversation_id, _tmp) = seeded_conversation(
            MockLlmClient::with_script(vec![
                Ok("Welcome!".into()),
                Ok("Here's my advice: rest and hydrate. No JSON today.".into()),
            ]),
        )
        .await;

        let report = generate_report(&state, &user, conversation_id, ReportType::FollowUp)
            .await
            .unwrap();

        assert_eq!(report.status, ReportStatus::Completed);
        assert_eq!(report.title, "Follow-up Report");
        // Symptom mentions were detected in the opening message
        assert_eq!(report.urgency_level, UrgencyLevel::Medium);
    }

    #[tokio::test]
    async fn missing_conversation_is_not_found() {
        let (state, _tmp) = test_state(MockLlmClient::succeeding("ok"));
        let user = sample_user();
        {
            let conn = state.open_db().unwrap();
            insert_user(&conn, &user).unwrap();
        }

        let result =
            generate_report(&state, &user, Uuid::new_v4(), ReportType::InitialConsultation).await;
        assert!(matches!(result, Err(ReportError::NotFound)));
    }

    #[tokio::test]
    async fn foreign_conversation_is_not_found() {
        let (state, _user, conversation_id, _tmp) =
            seeded_conversation(MockLlmClient::succeeding("Welcome!")).await;

        let mut stranger = sample_user();
        stranger.id = Uuid::new_v4();
        stranger.email = "other@example.com".into();
        stranger.username = "other".into();
        {
            let conn = state.open_db().unwrap();
            insert_user(&conn, &stranger).unwrap();
        }

        let result = generate_report(
            &state,
            &stranger,
            conversation_id,
            ReportType::InitialConsultation,
        )
        .await;
        assert!(matches!(result, Err(ReportError::NotFound)));
    }

    #[tokio::test]
    async fn summary_report_fallback_urgency_from_frequency() {
        let (state, _tmp) = test_state(MockLlmClient::failing("down"));
        let user = sample_user();
        {
            let conn = state.open_db().unwrap();
            insert_user(&conn, &user).unwrap();
        }

        // Three conversations in the window => high urgency fallback.
        // The welcome generation fails too, which is fine — fallback welcome.
        for i in 0..3 {
            chat::start_conversation(&state, user.id, &format!("concern {i}"), None)
                .await
                .unwrap();
        }

        let report = generate_summary_report(&state, &user).await.unwrap();
        assert_eq!(report.status, ReportStatus::Completed);
        assert_eq!(report.report_type, ReportType::Summary);
        assert!(report.conversation_id.is_none());
        assert_eq!(report.urgency_level, UrgencyLevel::High);
    }

    #[tokio::test]
    async fn summary_report_requires_conversations() {
        let (state, _tmp) = test_state(MockLlmClient::succeeding("ok"));
        let user = sample_user();
        {
            let conn = state.open_db().unwrap();
            insert_user(&conn, &user).unwrap();
        }

        let result = generate_summary_report(&state, &user).await;
        assert!(matches!(result, Err(ReportError::EmptyTranscript)));
    }

    #[tokio::test]
    async fn background_report_starts_in_progress_and_completes() {
        let (state, user, conversation_id, _tmp) = seeded_conversation(
            MockLlmClient::with_script(vec![
                Ok("Welcome!".into()),
                Ok(GOOD_REPORT_JSON.into()),
            ]),
        )
        .await;

        let pending = generate_report_background(
            &state,
            &user,
            conversation_id,
            ReportType::InitialConsultation,
        )
        .await
        .unwrap();
        assert_eq!(pending.status, ReportStatus::InProgress);

        // Poll until the spawned task completes the row
        let mut status = ReportStatus::InProgress;
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            let conn = state.open_db().unwrap();
            let current = report_repo::get_report_owned(&conn, &pending.id, &user.id)
                .unwrap()
                .unwrap();
            status = current.status;
            if status != ReportStatus::InProgress {
                break;
            }
        }
        assert_eq!(status, ReportStatus::Completed);
    }

    #[test]
    fn pdf_renders_for_fallback_content() {
        let user = sample_user();
        let report = MedicalReport {
            id: Uuid::new_v4(),
            user_id: user.id,
            conversation_id: None,
            title: "Health Summary Report".into(),
            report_type: ReportType::Summary,
            status: ReportStatus::Completed,
            urgency_level: UrgencyLevel::Low,
            summary: Some("A narrative paragraph describing the consultation.".into()),
            key_findings: vec!["Finding one".into(), "Finding two".into()],
            recommendations: vec!["See a physician".into()],
            model_used: None,
            latency_ms: None,
            file_path: None,
            review_notes: None,
            reviewed_at: None,
            created_at: now(),
            completed_at: Some(now()),
        };

        let bytes = render_report_pdf(&report, &user).unwrap();
        assert!(bytes.len() > 500, "PDF output suspiciously small");
        assert_eq!(&bytes[..5], b"%PDF-");
    }

    #[test]
    fn wrap_text_respects_width() {
        let text = "one two three four five six seven eight nine ten";
        let lines = wrap_text(text, 15);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.len() <= 15, "line too long: {line}");
        }
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }
}
