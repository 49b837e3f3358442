use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ConversationStatus, MessageRole};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: Option<String>,
    pub status: ConversationStatus,
    pub chief_complaint: Option<String>,
    pub started_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// A single turn in a conversation. Immutable after insert; the three
/// classification flags are computed once at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: NaiveDateTime,
    pub model_used: Option<String>,
    pub latency_ms: Option<i64>,
    pub contains_symptoms: bool,
    pub contains_medical_advice: bool,
    pub requires_followup: bool,
}
