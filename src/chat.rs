//! Conversation manager: lifecycle, message turns, follow-up questions.
//!
//! Every operation here runs once per inbound request. Persistence happens
//! strictly before or after the LLM call, never across it; on upstream
//! failure the deterministic fallback text is stored instead, and the
//! caller is told via `ChatStatus::PartialSuccess`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::classify;
use crate::db::repository::{conversation as conv_repo, now};
use crate::db::DatabaseError;
use crate::llm::prompt::{
    chat_prompt, welcome_prompt, CHAT_SYSTEM_PROMPT, WELCOME_SYSTEM_PROMPT,
};
use crate::llm::{GenerationOutcome, GenerationRequest, LlmClient};
use crate::models::enums::{ConversationStatus, MessageRole};
use crate::models::{Conversation, Message};
use crate::state::AppState;

/// Hard cap on a single message body.
const MAX_MESSAGE_CHARS: usize = 2000;
/// Maximum title length accepted by `update_title`.
const MAX_TITLE_CHARS: usize = 100;
/// Stored assistant reply when generation fails mid-conversation.
pub const REPLY_FALLBACK: &str = "I'm having trouble processing that right now. \
    Could you please rephrase your symptoms or try again?";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Conversation not found")]
    NotFound,

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Whether the assistant turn came from the model or from the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatStatus {
    Success,
    PartialSuccess,
}

#[derive(Debug, Serialize)]
pub struct StartOutcome {
    pub conversation: Conversation,
    pub user_message: Message,
    pub assistant_message: Message,
    pub status: ChatStatus,
}

#[derive(Debug, Serialize)]
pub struct SendOutcome {
    pub user_message: Message,
    pub assistant_message: Message,
    pub status: ChatStatus,
}

// ─── Lifecycle ────────────────────────────────────────────────────────────────

/// Start a consultation: create the conversation, store the opening patient
/// message, and produce the assistant welcome (LLM or fallback).
pub async fn start_conversation(
    state: &AppState,
    user_id: Uuid,
    initial_message: &str,
    chief_complaint: Option<String>,
) -> Result<StartOutcome, ChatError> {
    let initial_message = initial_message.trim();
    validate_message(initial_message)?;

    let conversation = Conversation {
        id: Uuid::new_v4(),
        user_id,
        title: Some(generate_title(initial_message)),
        status: ConversationStatus::Active,
        chief_complaint: chief_complaint.clone(),
        started_at: now(),
        completed_at: None,
        updated_at: None,
    };
    let user_message = build_user_message(conversation.id, initial_message);

    {
        let conn = state.open_db()?;
        conv_repo::insert_conversation(&conn, &conversation)?;
        conv_repo::insert_message(&conn, &user_message)?;
    }

    let request = GenerationRequest::new(welcome_prompt(initial_message))
        .with_system(WELCOME_SYSTEM_PROMPT)
        .with_temperature(0.7);
    let outcome = state.llm.generate(request).await;

    let (assistant_message, status) = match outcome {
        GenerationOutcome::Success {
            text,
            model,
            latency_ms,
        } => (
            build_assistant_message(conversation.id, &text, Some(model), Some(latency_ms)),
            ChatStatus::Success,
        ),
        GenerationOutcome::Failure { reason, .. } => {
            tracing::warn!(%reason, "Welcome generation failed, storing fallback");
            (
                build_assistant_message(
                    conversation.id,
                    &fallback_welcome(chief_complaint.as_deref(), initial_message),
                    None,
                    None,
                ),
                ChatStatus::PartialSuccess,
            )
        }
    };

    {
        let conn = state.open_db()?;
        conv_repo::insert_message(&conn, &assistant_message)?;
    }

    Ok(StartOutcome {
        conversation,
        user_message,
        assistant_message,
        status,
    })
}

/// Append a patient turn and generate the assistant reply.
pub async fn send_message(
    state: &AppState,
    user_id: Uuid,
    conversation_id: Uuid,
    content: &str,
) -> Result<SendOutcome, ChatError> {
    let content = content.trim();
    validate_message(content)?;

    let user_message = build_user_message(conversation_id, content);
    let history = {
        let conn = state.open_db()?;
        let conversation = conv_repo::get_conversation_owned(&conn, &conversation_id, &user_id)?
            .ok_or(ChatError::NotFound)?;
        if conversation.status != ConversationStatus::Active {
            return Err(ChatError::InvalidState(format!(
                "Cannot send message to {} conversation",
                conversation.status.as_str()
            )));
        }

        let prior = conv_repo::get_messages(&conn, &conversation_id)?;
        conv_repo::insert_message(&conn, &user_message)?;
        format_history(&prior, state.settings.history_window)
    };

    let request = GenerationRequest::new(chat_prompt(&history, content))
        .with_system(CHAT_SYSTEM_PROMPT)
        .with_temperature(0.7);
    let outcome = state.llm.generate(request).await;

    let (assistant_message, status) = match outcome {
        GenerationOutcome::Success {
            text,
            model,
            latency_ms,
        } => (
            build_assistant_message(conversation_id, &text, Some(model), Some(latency_ms)),
            ChatStatus::Success,
        ),
        GenerationOutcome::Failure { reason, .. } => {
            tracing::warn!(%reason, "Reply generation failed, storing fallback");
            (
                build_assistant_message(conversation_id, REPLY_FALLBACK, None, None),
                ChatStatus::PartialSuccess,
            )
        }
    };

    {
        let conn = state.open_db()?;
        conv_repo::insert_message(&conn, &assistant_message)?;
        conv_repo::touch(&conn, &conversation_id)?;
    }

    Ok(SendOutcome {
        user_message,
        assistant_message,
        status,
    })
}

/// Mark a conversation completed. Completing an already-completed
/// conversation is a tolerated no-op; archived is terminal.
pub fn complete_conversation(
    state: &AppState,
    user_id: Uuid,
    conversation_id: Uuid,
) -> Result<(), ChatError> {
    let conn = state.open_db()?;
    let conversation = conv_repo::get_conversation_owned(&conn, &conversation_id, &user_id)?
        .ok_or(ChatError::NotFound)?;

    match conversation.status {
        ConversationStatus::Active => {
            conv_repo::set_status(
                &conn,
                &conversation_id,
                ConversationStatus::Completed,
                Some(now()),
            )?;
            Ok(())
        }
        ConversationStatus::Completed => Ok(()),
        ConversationStatus::Archived => Err(ChatError::InvalidState(
            "Cannot complete an archived conversation".into(),
        )),
    }
}

/// Move a conversation into the terminal archived state.
pub fn archive_conversation(
    state: &AppState,
    user_id: Uuid,
    conversation_id: Uuid,
) -> Result<(), ChatError> {
    let conn = state.open_db()?;
    let conversation = conv_repo::get_conversation_owned(&conn, &conversation_id, &user_id)?
        .ok_or(ChatError::NotFound)?;

    if conversation.status != ConversationStatus::Archived {
        conv_repo::set_status(
            &conn,
            &conversation_id,
            ConversationStatus::Archived,
            conversation.completed_at,
        )?;
    }
    Ok(())
}

pub fn update_title(
    state: &AppState,
    user_id: Uuid,
    conversation_id: Uuid,
    new_title: &str,
) -> Result<(), ChatError> {
    let trimmed = new_title.trim();
    if trimmed.is_empty() {
        return Err(ChatError::Validation("Title cannot be empty".into()));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(ChatError::Validation(format!(
            "Title too long (max {MAX_TITLE_CHARS} characters)"
        )));
    }

    let conn = state.open_db()?;
    conv_repo::get_conversation_owned(&conn, &conversation_id, &user_id)?
        .ok_or(ChatError::NotFound)?;
    conv_repo::set_title(&conn, &conversation_id, trimmed)?;
    Ok(())
}

// ─── Follow-up questions ──────────────────────────────────────────────────────

/// Information categories the intake wants covered before a report.
const FOLLOWUP_SIGNALS: &[(&str, &[&str], &str)] = &[
    (
        "timeline",
        &["since", "yesterday", "ago", "started", "last week", "this morning", "began"],
        "When did your symptoms first start, and have they changed over time?",
    ),
    (
        "severity",
        &["out of 10", "/10", "scale", "severity", "mild", "moderate", "severe"],
        "On a scale of 1 to 10, how severe are your symptoms right now?",
    ),
    (
        "triggers",
        &["trigger", "worse when", "worse after", "aggravat", "better when", "relieve"],
        "Have you noticed anything that makes your symptoms better or worse?",
    ),
    (
        "medications",
        &["medication", "medicine", "taking", "prescri", "tablet", "pill", "dose"],
        "Are you currently taking any medications, including over-the-counter remedies?",
    ),
];

const GENERAL_QUESTIONS: &[&str] = &[
    "Have you experienced anything like this before?",
    "Is there anything else about your health you think is relevant?",
];

/// Deterministic follow-up question list: one question per information
/// category the transcript has not covered, plus two general questions.
pub fn generate_followup_questions(
    state: &AppState,
    user_id: Uuid,
    conversation_id: Uuid,
) -> Result<String, ChatError> {
    let messages = {
        let conn = state.open_db()?;
        conv_repo::get_conversation_owned(&conn, &conversation_id, &user_id)?
            .ok_or(ChatError::NotFound)?;
        conv_repo::get_messages(&conn, &conversation_id)?
    };

    let transcript = messages
        .iter()
        .filter(|m| m.role == MessageRole::User)
        .map(|m| m.content.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let mut questions: Vec<&str> = FOLLOWUP_SIGNALS
        .iter()
        .filter(|(_, keywords, _)| !keywords.iter().any(|k| transcript.contains(k)))
        .map(|(_, _, question)| *question)
        .collect();
    questions.extend(GENERAL_QUESTIONS);

    Ok(questions
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {q}", i + 1))
        .collect::<Vec<_>>()
        .join("\n"))
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn validate_message(content: &str) -> Result<(), ChatError> {
    if content.is_empty() {
        return Err(ChatError::Validation("Message cannot be empty".into()));
    }
    if content.len() > MAX_MESSAGE_CHARS {
        return Err(ChatError::Validation(format!(
            "Message too long (max {MAX_MESSAGE_CHARS} chars)"
        )));
    }
    Ok(())
}

fn build_user_message(conversation_id: Uuid, content: &str) -> Message {
    Message {
        id: Uuid::new_v4(),
        conversation_id,
        role: MessageRole::User,
        content: content.to_string(),
        created_at: now(),
        model_used: None,
        latency_ms: None,
        contains_symptoms: classify::contains_symptom_keywords(content),
        contains_medical_advice: false,
        requires_followup: false,
    }
}

fn build_assistant_message(
    conversation_id: Uuid,
    content: &str,
    model_used: Option<String>,
    latency_ms: Option<i64>,
) -> Message {
    Message {
        id: Uuid::new_v4(),
        conversation_id,
        role: MessageRole::Assistant,
        content: content.to_string(),
        created_at: now(),
        model_used,
        latency_ms,
        contains_symptoms: false,
        contains_medical_advice: classify::contains_advice_keywords(content),
        requires_followup: classify::requires_followup(content),
    }
}

/// Generate a conversation title from the first patient message.
/// Truncates at 50 characters with "..." if longer, handling UTF-8 correctly.
pub fn generate_title(first_message: &str) -> String {
    let trimmed = first_message.trim();
    if trimmed.is_empty() {
        return "New consultation".to_string();
    }

    let boundary = trimmed
        .char_indices()
        .take_while(|(i, _)| *i < 50)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(trimmed.len());

    if boundary >= trimmed.len() {
        trimmed.to_string()
    } else {
        format!("{}...", &trimmed[..boundary])
    }
}

/// The most recent `window` messages as role-prefixed lines.
fn format_history(messages: &[Message], window: usize) -> String {
    let start = messages.len().saturating_sub(window);
    messages[start..]
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Deterministic welcome used when the model is unreachable.
fn fallback_welcome(chief_complaint: Option<&str>, initial_message: &str) -> String {
    let concern = chief_complaint
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(initial_message);

    format!(
        "Hello! I'm your medical assistant. I understand you're here about: {concern}.\n\n\
         Please note that I'm not a doctor and cannot provide medical diagnoses. My role is \
         to help you organize your symptoms and create a comprehensive report for your \
         healthcare provider.\n\n\
         Can you tell me more about what you're experiencing? When did these symptoms start?"
    )
}
