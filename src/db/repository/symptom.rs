use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::{SeverityLevel, SymptomCategory};
use crate::models::SymptomRecord;

use super::{decode_list, encode_list, format_ts, parse_ts};

pub fn insert_symptom(conn: &Connection, symptom: &SymptomRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO symptoms (id, user_id, conversation_id, name, description,
         severity, severity_level, location, category, duration_hours,
         onset_date, recorded_at, triggers, alleviating_factors, associated_symptoms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            symptom.id.to_string(),
            symptom.user_id.to_string(),
            symptom.conversation_id.map(|id| id.to_string()),
            symptom.name,
            symptom.description,
            symptom.severity as i32,
            symptom.severity_level.as_str(),
            symptom.location,
            symptom.category.as_str(),
            symptom.duration_hours,
            format_ts(symptom.onset_date),
            format_ts(symptom.recorded_at),
            encode_list(&symptom.triggers),
            encode_list(&symptom.alleviating_factors),
            encode_list(&symptom.associated_symptoms),
        ],
    )?;
    Ok(())
}

pub fn get_symptom_owned(
    conn: &Connection,
    id: &Uuid,
    user_id: &Uuid,
) -> Result<Option<SymptomRecord>, DatabaseError> {
    conn.query_row(
        &format!("{SELECT_COLUMNS} FROM symptoms WHERE id = ?1 AND user_id = ?2"),
        params![id.to_string(), user_id.to_string()],
        symptom_row,
    )
    .optional()?
    .map(symptom_from_row)
    .transpose()
}

/// Fetch several symptoms, all of which must exist and belong to the user.
/// A single missing or foreign id fails the whole lookup.
pub fn get_symptoms_owned(
    conn: &Connection,
    ids: &[Uuid],
    user_id: &Uuid,
) -> Result<Vec<SymptomRecord>, DatabaseError> {
    let mut symptoms = Vec::with_capacity(ids.len());
    for id in ids {
        match get_symptom_owned(conn, id, user_id)? {
            Some(symptom) => symptoms.push(symptom),
            None => {
                return Err(DatabaseError::NotFound {
                    entity_type: "Symptom".into(),
                    id: id.to_string(),
                })
            }
        }
    }
    Ok(symptoms)
}

/// Time-windowed, filtered, paginated listing. Most recent first.
pub fn list_symptoms(
    conn: &Connection,
    user_id: &Uuid,
    recorded_since: NaiveDateTime,
    category: Option<SymptomCategory>,
    min_severity: Option<u8>,
    limit: u32,
    offset: u32,
) -> Result<Vec<SymptomRecord>, DatabaseError> {
    let mut sql = format!(
        "{SELECT_COLUMNS} FROM symptoms WHERE user_id = ?1 AND recorded_at >= ?2"
    );
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = vec![
        Box::new(user_id.to_string()),
        Box::new(format_ts(recorded_since)),
    ];
    let mut param_idx = 3u32;

    if let Some(cat) = category {
        sql.push_str(&format!(" AND category = ?{param_idx}"));
        params_vec.push(Box::new(cat.as_str().to_string()));
        param_idx += 1;
    }
    if let Some(min) = min_severity {
        sql.push_str(&format!(" AND severity >= ?{param_idx}"));
        params_vec.push(Box::new(min as i32));
        param_idx += 1;
    }

    sql.push_str(&format!(
        " ORDER BY recorded_at DESC LIMIT ?{} OFFSET ?{}",
        param_idx,
        param_idx + 1
    ));
    params_vec.push(Box::new(limit));
    params_vec.push(Box::new(offset));

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), symptom_row)?;

    let mut symptoms = Vec::new();
    for row in rows {
        symptoms.push(symptom_from_row(row?)?);
    }
    Ok(symptoms)
}

pub fn update_symptom(conn: &Connection, symptom: &SymptomRecord) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE symptoms SET name = ?1, description = ?2, severity = ?3, severity_level = ?4,
         location = ?5, category = ?6, duration_hours = ?7, onset_date = ?8,
         triggers = ?9, alleviating_factors = ?10, associated_symptoms = ?11
         WHERE id = ?12 AND user_id = ?13",
        params![
            symptom.name,
            symptom.description,
            symptom.severity as i32,
            symptom.severity_level.as_str(),
            symptom.location,
            symptom.category.as_str(),
            symptom.duration_hours,
            format_ts(symptom.onset_date),
            encode_list(&symptom.triggers),
            encode_list(&symptom.alleviating_factors),
            encode_list(&symptom.associated_symptoms),
            symptom.id.to_string(),
            symptom.user_id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Symptom".into(),
            id: symptom.id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_symptom(conn: &Connection, id: &Uuid, user_id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM symptoms WHERE id = ?1 AND user_id = ?2",
        params![id.to_string(), user_id.to_string()],
    )?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Symptom".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

const SELECT_COLUMNS: &str = "SELECT id, user_id, conversation_id, name, description, severity, \
     severity_level, location, category, duration_hours, onset_date, recorded_at, \
     triggers, alleviating_factors, associated_symptoms";

type SymptomRow = (
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    i32,
    String,
    Option<String>,
    String,
    Option<i64>,
    String,
    String,
    String,
    String,
    String,
);

fn symptom_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SymptomRow> {
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
    ))
}

fn symptom_from_row(row: SymptomRow) -> Result<SymptomRecord, DatabaseError> {
    let (
        id,
        user_id,
        conversation_id,
        name,
        description,
        severity,
        severity_level,
        location,
        category,
        duration_hours,
        onset_date,
        recorded_at,
        triggers,
        alleviating,
        associated,
    ) = row;

    Ok(SymptomRecord {
        id: Uuid::parse_str(&id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        user_id: Uuid::parse_str(&user_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        conversation_id: conversation_id.and_then(|s| Uuid::parse_str(&s).ok()),
        name,
        description,
        severity: severity as u8,
        severity_level: SeverityLevel::from_str(&severity_level)?,
        location,
        category: SymptomCategory::from_str(&category)?,
        duration_hours,
        onset_date: parse_ts(&onset_date),
        recorded_at: parse_ts(&recorded_at),
        triggers: decode_list(&triggers),
        alleviating_factors: decode_list(&alleviating),
        associated_symptoms: decode_list(&associated),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::repository::user::{insert_user, tests::sample_user};
    use crate::db::sqlite::open_memory_database;

    pub(crate) fn sample_symptom(user_id: Uuid, name: &str, severity: u8) -> SymptomRecord {
        let now = crate::db::repository::now();
        SymptomRecord {
            id: Uuid::new_v4(),
            user_id,
            conversation_id: None,
            name: name.into(),
            description: None,
            severity,
            severity_level: SeverityLevel::from_severity(severity),
            location: None,
            category: SymptomCategory::Pain,
            duration_hours: Some(12),
            onset_date: now - chrono::Duration::hours(12),
            recorded_at: now,
            triggers: vec!["stress".into()],
            alleviating_factors: vec![],
            associated_symptoms: vec![],
        }
    }

    fn setup() -> (Connection, Uuid) {
        let conn = open_memory_database().unwrap();
        let user = sample_user();
        insert_user(&conn, &user).unwrap();
        (conn, user.id)
    }

    #[test]
    fn insert_and_fetch_round_trip() {
        let (conn, user_id) = setup();
        let symptom = sample_symptom(user_id, "headache", 6);
        insert_symptom(&conn, &symptom).unwrap();

        let fetched = get_symptom_owned(&conn, &symptom.id, &user_id)
            .unwrap()
            .unwrap();
        assert_eq!(fetched.name, "headache");
        assert_eq!(fetched.severity, 6);
        assert_eq!(fetched.severity_level, SeverityLevel::Moderate);
        assert_eq!(fetched.triggers, vec!["stress".to_string()]);
    }

    #[test]
    fn foreign_symptom_is_invisible() {
        let (conn, user_id) = setup();
        let symptom = sample_symptom(user_id, "headache", 6);
        insert_symptom(&conn, &symptom).unwrap();

        assert!(get_symptom_owned(&conn, &symptom.id, &Uuid::new_v4())
            .unwrap()
            .is_none());
    }

    #[test]
    fn get_many_fails_on_any_missing_id() {
        let (conn, user_id) = setup();
        let symptom = sample_symptom(user_id, "headache", 6);
        insert_symptom(&conn, &symptom).unwrap();

        let result = get_symptoms_owned(&conn, &[symptom.id, Uuid::new_v4()], &user_id);
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn list_filters_by_category_and_severity() {
        let (conn, user_id) = setup();
        let mut cough = sample_symptom(user_id, "cough", 3);
        cough.category = SymptomCategory::Respiratory;
        insert_symptom(&conn, &cough).unwrap();
        insert_symptom(&conn, &sample_symptom(user_id, "headache", 8)).unwrap();

        let since = crate::db::repository::now() - chrono::Duration::days(30);

        let all = list_symptoms(&conn, &user_id, since, None, None, 50, 0).unwrap();
        assert_eq!(all.len(), 2);

        let respiratory = list_symptoms(
            &conn,
            &user_id,
            since,
            Some(SymptomCategory::Respiratory),
            None,
            50,
            0,
        )
        .unwrap();
        assert_eq!(respiratory.len(), 1);
        assert_eq!(respiratory[0].name, "cough");

        let severe = list_symptoms(&conn, &user_id, since, None, Some(7), 50, 0).unwrap();
        assert_eq!(severe.len(), 1);
        assert_eq!(severe[0].name, "headache");
    }

    #[test]
    fn update_rewrites_fields() {
        let (conn, user_id) = setup();
        let mut symptom = sample_symptom(user_id, "headache", 4);
        insert_symptom(&conn, &symptom).unwrap();

        symptom.severity = 9;
        symptom.severity_level = SeverityLevel::from_severity(9);
        symptom.triggers = vec!["noise".into()];
        update_symptom(&conn, &symptom).unwrap();

        let fetched = get_symptom_owned(&conn, &symptom.id, &user_id)
            .unwrap()
            .unwrap();
        assert_eq!(fetched.severity, 9);
        assert_eq!(fetched.severity_level, SeverityLevel::Critical);
        assert_eq!(fetched.triggers, vec!["noise".to_string()]);
    }

    #[test]
    fn delete_requires_ownership() {
        let (conn, user_id) = setup();
        let symptom = sample_symptom(user_id, "headache", 4);
        insert_symptom(&conn, &symptom).unwrap();

        let foreign = delete_symptom(&conn, &symptom.id, &Uuid::new_v4());
        assert!(matches!(foreign, Err(DatabaseError::NotFound { .. })));

        delete_symptom(&conn, &symptom.id, &user_id).unwrap();
        assert!(get_symptom_owned(&conn, &symptom.id, &user_id)
            .unwrap()
            .is_none());
    }
}
