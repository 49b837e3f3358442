use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference condition the pattern analyzer can link against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub icd10_code: Option<String>,
}

/// Advisory link between a pattern analysis and a reference condition.
/// Never authoritative; surfaced only as "possibly related" context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub id: Uuid,
    pub pattern_id: String,
    pub user_id: Uuid,
    pub diagnosis_id: Uuid,
    pub confidence: f64,
    pub created_at: NaiveDateTime,
}
