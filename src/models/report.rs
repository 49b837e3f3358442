use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ReportStatus, ReportType, UrgencyLevel};

/// A narrative medical report generated from conversation history.
///
/// Immutable after completion, except for the human-review annotation
/// fields (`review_notes`, `reviewed_at`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalReport {
    pub id: Uuid,
    pub user_id: Uuid,
    pub conversation_id: Option<Uuid>,
    pub title: String,
    pub report_type: ReportType,
    pub status: ReportStatus,
    pub urgency_level: UrgencyLevel,
    pub summary: Option<String>,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub model_used: Option<String>,
    pub latency_ms: Option<i64>,
    pub file_path: Option<String>,
    pub review_notes: Option<String>,
    pub reviewed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}
