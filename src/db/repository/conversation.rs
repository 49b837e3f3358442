use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::{ConversationStatus, MessageRole};
use crate::models::{Conversation, Message};

use super::{format_opt_ts, format_ts, parse_opt_ts, parse_ts};

pub fn insert_conversation(conn: &Connection, conv: &Conversation) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO conversations (id, user_id, title, status, chief_complaint,
         started_at, completed_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            conv.id.to_string(),
            conv.user_id.to_string(),
            conv.title,
            conv.status.as_str(),
            conv.chief_complaint,
            format_ts(conv.started_at),
            format_opt_ts(conv.completed_at),
            format_opt_ts(conv.updated_at),
        ],
    )?;
    Ok(())
}

/// Fetch a conversation only if it belongs to `user_id`. A missing row and
/// a row owned by someone else are indistinguishable to the caller.
pub fn get_conversation_owned(
    conn: &Connection,
    id: &Uuid,
    user_id: &Uuid,
) -> Result<Option<Conversation>, DatabaseError> {
    conn.query_row(
        "SELECT id, user_id, title, status, chief_complaint, started_at, completed_at, updated_at
         FROM conversations WHERE id = ?1 AND user_id = ?2",
        params![id.to_string(), user_id.to_string()],
        conversation_from_row,
    )
    .optional()?
    .transpose()
}

pub fn set_status(
    conn: &Connection,
    id: &Uuid,
    status: ConversationStatus,
    completed_at: Option<chrono::NaiveDateTime>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE conversations SET status = ?1, completed_at = ?2, updated_at = ?3 WHERE id = ?4",
        params![
            status.as_str(),
            format_opt_ts(completed_at),
            format_ts(super::now()),
            id.to_string(),
        ],
    )?;
    Ok(())
}

/// Bump updated_at after appending messages.
pub fn touch(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
        params![format_ts(super::now()), id.to_string()],
    )?;
    Ok(())
}

pub fn set_title(conn: &Connection, id: &Uuid, title: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE conversations SET title = ?1, updated_at = ?2 WHERE id = ?3",
        params![title, format_ts(super::now()), id.to_string()],
    )?;
    Ok(())
}

/// Delete a conversation. Messages and reports referencing it cascade.
pub fn delete_conversation(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM conversations WHERE id = ?1",
        params![id.to_string()],
    )?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Conversation".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Conversation list entry with its derived message count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub title: Option<String>,
    pub status: ConversationStatus,
    pub started_at: String,
    pub chief_complaint: Option<String>,
    pub message_count: u32,
}

pub fn list_conversation_summaries(
    conn: &Connection,
    user_id: &Uuid,
    limit: u32,
    offset: u32,
) -> Result<Vec<ConversationSummary>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.title, c.status, c.started_at, c.chief_complaint, COUNT(m.id)
         FROM conversations c
         LEFT JOIN messages m ON m.conversation_id = c.id
         WHERE c.user_id = ?1
         GROUP BY c.id
         ORDER BY COALESCE(c.updated_at, c.started_at) DESC
         LIMIT ?2 OFFSET ?3",
    )?;

    let rows = stmt.query_map(params![user_id.to_string(), limit, offset], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, i64>(5)?,
        ))
    })?;

    let mut summaries = Vec::new();
    for row in rows {
        let (id, title, status, started_at, chief_complaint, count) = row?;
        summaries.push(ConversationSummary {
            id: Uuid::parse_str(&id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            title,
            status: ConversationStatus::from_str(&status)?,
            started_at,
            chief_complaint,
            message_count: count as u32,
        });
    }
    Ok(summaries)
}

/// Conversation ids of a user, most recent first (summary-report input).
pub fn list_conversation_ids(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Vec<Uuid>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id FROM conversations WHERE user_id = ?1
         ORDER BY started_at DESC",
    )?;
    let rows = stmt.query_map(params![user_id.to_string()], |row| {
        row.get::<_, String>(0)
    })?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(
            Uuid::parse_str(&row?)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        );
    }
    Ok(ids)
}

/// How many conversations the user started since the given timestamp.
pub fn count_started_since(
    conn: &Connection,
    user_id: &Uuid,
    since: chrono::NaiveDateTime,
) -> Result<usize, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM conversations WHERE user_id = ?1 AND started_at >= ?2",
        params![user_id.to_string(), format_ts(since)],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

// ─── Messages ─────────────────────────────────────────────────────────────────

pub fn insert_message(conn: &Connection, msg: &Message) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO messages (id, conversation_id, role, content, created_at,
         model_used, latency_ms, contains_symptoms, contains_medical_advice, requires_followup)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            msg.id.to_string(),
            msg.conversation_id.to_string(),
            msg.role.as_str(),
            msg.content,
            format_ts(msg.created_at),
            msg.model_used,
            msg.latency_ms,
            msg.contains_symptoms as i32,
            msg.contains_medical_advice as i32,
            msg.requires_followup as i32,
        ],
    )?;
    Ok(())
}

/// All messages of a conversation in insertion order. The rowid tiebreak
/// keeps same-second inserts in conversational order.
pub fn get_messages(
    conn: &Connection,
    conversation_id: &Uuid,
) -> Result<Vec<Message>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, conversation_id, role, content, created_at, model_used, latency_ms,
                contains_symptoms, contains_medical_advice, requires_followup
         FROM messages WHERE conversation_id = ?1
         ORDER BY created_at ASC, rowid ASC",
    )?;

    let rows = stmt.query_map(params![conversation_id.to_string()], |row| {
        Ok(MessageRow {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            role: row.get(2)?,
            content: row.get(3)?,
            created_at: row.get(4)?,
            model_used: row.get(5)?,
            latency_ms: row.get(6)?,
            contains_symptoms: row.get(7)?,
            contains_medical_advice: row.get(8)?,
            requires_followup: row.get(9)?,
        })
    })?;

    let mut messages = Vec::new();
    for row in rows {
        messages.push(message_from_row(row?)?);
    }
    Ok(messages)
}

struct MessageRow {
    id: String,
    conversation_id: String,
    role: String,
    content: String,
    created_at: String,
    model_used: Option<String>,
    latency_ms: Option<i64>,
    contains_symptoms: i32,
    contains_medical_advice: i32,
    requires_followup: i32,
}

fn message_from_row(row: MessageRow) -> Result<Message, DatabaseError> {
    Ok(Message {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        conversation_id: Uuid::parse_str(&row.conversation_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        role: MessageRole::from_str(&row.role)?,
        content: row.content,
        created_at: parse_ts(&row.created_at),
        model_used: row.model_used,
        latency_ms: row.latency_ms,
        contains_symptoms: row.contains_symptoms != 0,
        contains_medical_advice: row.contains_medical_advice != 0,
        requires_followup: row.requires_followup != 0,
    })
}

fn conversation_from_row(
    row: &rusqlite::Row<'_>,
) -> rusqlite::Result<Result<Conversation, DatabaseError>> {
    let id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let title: Option<String> = row.get(2)?;
    let status: String = row.get(3)?;
    let chief_complaint: Option<String> = row.get(4)?;
    let started_at: String = row.get(5)?;
    let completed_at: Option<String> = row.get(6)?;
    let updated_at: Option<String> = row.get(7)?;

    Ok((|| {
        Ok(Conversation {
            id: Uuid::parse_str(&id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            user_id: Uuid::parse_str(&user_id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            title,
            status: ConversationStatus::from_str(&status)?,
            chief_complaint,
            started_at: parse_ts(&started_at),
            completed_at: parse_opt_ts(completed_at),
            updated_at: parse_opt_ts(updated_at),
        })
    })())
}
