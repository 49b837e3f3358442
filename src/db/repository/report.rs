use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::{ReportStatus, ReportType, UrgencyLevel};
use crate::models::MedicalReport;

use super::{decode_list, encode_list, format_opt_ts, format_ts, parse_opt_ts, parse_ts};

pub fn insert_report(conn: &Connection, report: &MedicalReport) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medical_reports (id, user_id, conversation_id, title, report_type,
         status, urgency_level, summary, key_findings, recommendations, model_used,
         latency_ms, file_path, review_notes, reviewed_at, created_at, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            report.id.to_string(),
            report.user_id.to_string(),
            report.conversation_id.map(|id| id.to_string()),
            report.title,
            report.report_type.as_str(),
            report.status.as_str(),
            report.urgency_level.as_str(),
            report.summary,
            encode_list(&report.key_findings),
            encode_list(&report.recommendations),
            report.model_used,
            report.latency_ms,
            report.file_path,
            report.review_notes,
            format_opt_ts(report.reviewed_at),
            format_ts(report.created_at),
            format_opt_ts(report.completed_at),
        ],
    )?;
    Ok(())
}

/// Finalize an in-progress report with its generated content.
/// The status transition happens exactly once.
pub fn complete_report(conn: &Connection, report: &MedicalReport) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE medical_reports SET status = ?1, title = ?2, urgency_level = ?3,
         summary = ?4, key_findings = ?5, recommendations = ?6, model_used = ?7,
         latency_ms = ?8, completed_at = ?9
         WHERE id = ?10 AND status = ?11",
        params![
            ReportStatus::Completed.as_str(),
            report.title,
            report.urgency_level.as_str(),
            report.summary,
            encode_list(&report.key_findings),
            encode_list(&report.recommendations),
            report.model_used,
            report.latency_ms,
            format_opt_ts(report.completed_at),
            report.id.to_string(),
            ReportStatus::InProgress.as_str(),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::ConstraintViolation(format!(
            "report {} is not in progress",
            report.id
        )));
    }
    Ok(())
}

pub fn mark_failed(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE medical_reports SET status = ?1 WHERE id = ?2 AND status = ?3",
        params![
            ReportStatus::Failed.as_str(),
            id.to_string(),
            ReportStatus::InProgress.as_str(),
        ],
    )?;
    Ok(())
}

pub fn set_file_path(conn: &Connection, id: &Uuid, path: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE medical_reports SET file_path = ?1 WHERE id = ?2",
        params![path, id.to_string()],
    )?;
    Ok(())
}

/// Attach human-review annotations to a completed report.
pub fn set_review(
    conn: &Connection,
    id: &Uuid,
    user_id: &Uuid,
    notes: &str,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE medical_reports SET review_notes = ?1, reviewed_at = ?2
         WHERE id = ?3 AND user_id = ?4 AND status = ?5",
        params![
            notes,
            format_ts(super::now()),
            id.to_string(),
            user_id.to_string(),
            ReportStatus::Completed.as_str(),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "MedicalReport".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn get_report_owned(
    conn: &Connection,
    id: &Uuid,
    user_id: &Uuid,
) -> Result<Option<MedicalReport>, DatabaseError> {
    conn.query_row(
        &format!("{SELECT_COLUMNS} FROM medical_reports WHERE id = ?1 AND user_id = ?2"),
        params![id.to_string(), user_id.to_string()],
        report_row,
    )
    .optional()?
    .map(report_from_row)
    .transpose()
}

/// The most recent completed report for a conversation (download target).
pub fn latest_completed_for_conversation(
    conn: &Connection,
    conversation_id: &Uuid,
    user_id: &Uuid,
) -> Result<Option<MedicalReport>, DatabaseError> {
    conn.query_row(
        &format!(
            "{SELECT_COLUMNS} FROM medical_reports
             WHERE conversation_id = ?1 AND user_id = ?2 AND status = ?3
             ORDER BY created_at DESC, rowid DESC LIMIT 1"
        ),
        params![
            conversation_id.to_string(),
            user_id.to_string(),
            ReportStatus::Completed.as_str(),
        ],
        report_row,
    )
    .optional()?
    .map(report_from_row)
    .transpose()
}

pub fn list_reports(
    conn: &Connection,
    user_id: &Uuid,
    limit: u32,
    offset: u32,
) -> Result<Vec<MedicalReport>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_COLUMNS} FROM medical_reports WHERE user_id = ?1
         ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3"
    ))?;

    let rows = stmt.query_map(params![user_id.to_string(), limit, offset], report_row)?;

    let mut reports = Vec::new();
    for row in rows {
        reports.push(report_from_row(row?)?);
    }
    Ok(reports)
}

pub fn delete_report(conn: &Connection, id: &Uuid, user_id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM medical_reports WHERE id = ?1 AND user_id = ?2",
        params![id.to_string(), user_id.to_string()],
    )?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "MedicalReport".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

const SELECT_COLUMNS: &str = "SELECT id, user_id, conversation_id, title, report_type, status, \
     urgency_level, summary, key_findings, recommendations, model_used, latency_ms, \
     file_path, review_notes, reviewed_at, created_at, completed_at";

type ReportRow = (
    String,
    String,
    Option<String>,
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    String,
    Option<String>,
    Option<i64>,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
);

fn report_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReportRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
        row.get(12)?,
        row.get(13)?,
        row.get(14)?,
        row.get(15)?,
        row.get(16)?,
    ))
}

fn report_from_row(row: ReportRow) -> Result<MedicalReport, DatabaseError> {
    let (
        id,
        user_id,
        conversation_id,
        title,
        report_type,
        status,
        urgency_level,
        summary,
        key_findings,
        recommendations,
        model_used,
        latency_ms,
        file_path,
        review_notes,
        reviewed_at,
        created_at,
        completed_at,
    ) = row;

    Ok(MedicalReport {
        id: Uuid::parse_str(&id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        user_id: Uuid::parse_str(&user_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        conversation_id: conversation_id.and_then(|s| Uuid::parse_str(&s).ok()),
        title,
        report_type: ReportType::from_str(&report_type)?,
        status: ReportStatus::from_str(&status)?,
        urgency_level: UrgencyLevel::from_str(&urgency_level)?,
        summary,
        key_findings: decode_list(&key_findings),
        recommendations: decode_list(&recommendations),
        model_used,
        latency_ms,
        file_path,
        review_notes,
        reviewed_at: parse_opt_ts(reviewed_at),
        created_at: parse_ts(&created_at),
        completed_at: parse_opt_ts(completed_at),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::repository::conversation::tests::sample_conversation;
    use crate::db::repository::conversation::insert_conversation;
    use crate::db::repository::user::{insert_user, tests::sample_user};
    use crate::db::sqlite::open_memory_database;

    pub(crate) fn draft_report(user_id: Uuid, conversation_id: Option<Uuid>) -> MedicalReport {
        MedicalReport {
            id: Uuid::new_v4(),
            user_id,
            conversation_id,
            title: "Medical Report".into(),
            report_type: ReportType::InitialConsultation,
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
            created_at: crate::db::repository::now(),
            completed_at: None,
        }
    }

    fn setup() -> (Connection, Uuid, Uuid) {
        let conn = open_memory_database().unwrap();
        let user = sample_user();
        insert_user(&conn, &user).unwrap();
        let conv = sample_conversation(user.id);
        insert_conversation(&conn, &conv).unwrap();
        (conn, user.id, conv.id)
    }

    #[test]
    fn complete_transitions_exactly_once() {
        let (conn, user_id, conv_id) = setup();
        let mut report = draft_report(user_id, Some(conv_id));
        insert_report(&conn, &report).unwrap();

        report.summary = Some("All findings documented.".into());
        report.key_findings = vec!["headache, severity 7/10".into()];
        report.recommendations = vec!["see a physician".into()];
        report.urgency_level = UrgencyLevel::Medium;
        report.completed_at = Some(crate::db::repository::now());
        complete_report(&conn, &report).unwrap();

        let fetched = get_report_owned(&conn, &report.id, &user_id)
            .unwrap()
            .unwrap();
        assert_eq!(fetched.status, ReportStatus::Completed);
        assert_eq!(fetched.urgency_level, UrgencyLevel::Medium);
        assert_eq!(fetched.key_findings.len(), 1);

        // Second completion attempt must not succeed
        let again = complete_report(&conn, &report);
        assert!(matches!(
            again,
            Err(DatabaseError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn review_only_on_completed_reports() {
        let (conn, user_id, conv_id) = setup();
        let mut report = draft_report(user_id, Some(conv_id));
        insert_report(&conn, &report).unwrap();

        // In progress — review rejected
        assert!(set_review(&conn, &report.id, &user_id, "looks fine").is_err());

        report.completed_at = Some(crate::db::repository::now());
        complete_report(&conn, &report).unwrap();
        set_review(&conn, &report.id, &user_id, "looks fine").unwrap();

        let fetched = get_report_owned(&conn, &report.id, &user_id)
            .unwrap()
            .unwrap();
        assert_eq!(fetched.review_notes.as_deref(), Some("looks fine"));
        assert!(fetched.reviewed_at.is_some());
    }

    #[test]
    fn deleting_conversation_cascades_reports() {
        let (conn, user_id, conv_id) = setup();
        let report = draft_report(user_id, Some(conv_id));
        insert_report(&conn, &report).unwrap();

        crate::db::repository::conversation::delete_conversation(&conn, &conv_id).unwrap();
        assert!(get_report_owned(&conn, &report.id, &user_id)
            .unwrap()
            .is_none());
    }

    #[test]
    fn list_is_ownership_scoped() {
        let (conn, user_id, conv_id) = setup();
        insert_report(&conn, &draft_report(user_id, Some(conv_id))).unwrap();

        assert_eq!(list_reports(&conn, &user_id, 20, 0).unwrap().len(), 1);
        assert!(list_reports(&conn, &Uuid::new_v4(), 20, 0).unwrap().is_empty());
    }

    #[test]
    fn latest_completed_picks_newest() {
        let (conn, user_id, conv_id) = setup();
        let mut first = draft_report(user_id, Some(conv_id));
        insert_report(&conn, &first).unwrap();
        first.completed_at = Some(crate::db::repository::now());
        complete_report(&conn, &first).unwrap();

        let mut second = draft_report(user_id, Some(conv_id));
        second.title = "Second Report".into();
        insert_report(&conn, &second).unwrap();
        second.completed_at = Some(crate::db::repository::now());
        complete_report(&conn, &second).unwrap();

        let latest = latest_completed_for_conversation(&conn, &conv_id, &user_id)
            .unwrap()
            .unwrap();
        assert_eq!(latest.title, "Second Report");
    }
}
