use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{SeverityLevel, SymptomCategory};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub conversation_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    /// Patient-rated severity, 1-10.
    pub severity: u8,
    pub severity_level: SeverityLevel,
    pub location: Option<String>,
    pub category: SymptomCategory,
    pub duration_hours: Option<i64>,
    /// Derived: recorded_at minus duration_hours when a duration was given.
    pub onset_date: NaiveDateTime,
    pub recorded_at: NaiveDateTime,
    pub triggers: Vec<String>,
    pub alleviating_factors: Vec<String>,
    pub associated_symptoms: Vec<String>,
}
