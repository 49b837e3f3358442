use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Diagnosis, DiagnosisResult};

use super::{format_ts, parse_ts};

/// Case-insensitive lookup of a reference condition by name.
pub fn find_diagnosis_by_name(
    conn: &Connection,
    name: &str,
) -> Result<Option<Diagnosis>, DatabaseError> {
    conn.query_row(
        "SELECT id, name, description, icd10_code FROM diagnoses
         WHERE LOWER(name) = LOWER(?1)",
        params![name.trim()],
        |row| {
            Ok(Diagnosis {
                id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
                name: row.get(1)?,
                description: row.get(2)?,
                icd10_code: row.get(3)?,
            })
        },
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn insert_diagnosis_result(
    conn: &Connection,
    result: &DiagnosisResult,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO diagnosis_results (id, pattern_id, user_id, diagnosis_id, confidence, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            result.id.to_string(),
            result.pattern_id,
            result.user_id.to_string(),
            result.diagnosis_id.to_string(),
            result.confidence,
            format_ts(result.created_at),
        ],
    )?;
    Ok(())
}

pub fn list_results_for_pattern(
    conn: &Connection,
    pattern_id: &str,
) -> Result<Vec<DiagnosisResult>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, pattern_id, user_id, diagnosis_id, confidence, created_at
         FROM diagnosis_results WHERE pattern_id = ?1 ORDER BY confidence DESC",
    )?;

    let rows = stmt.query_map(params![pattern_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, f64>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut results = Vec::new();
    for row in rows {
        let (id, pattern_id, user_id, diagnosis_id, confidence, created_at) = row?;
        results.push(DiagnosisResult {
            id: Uuid::parse_str(&id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            pattern_id,
            user_id: Uuid::parse_str(&user_id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            diagnosis_id: Uuid::parse_str(&diagnosis_id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            confidence,
            created_at: parse_ts(&created_at),
        });
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::user::{insert_user, tests::sample_user};
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn reference_lookup_is_case_insensitive() {
        let conn = open_memory_database().unwrap();
        let found = find_diagnosis_by_name(&conn, "  Migraine ").unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().icd10_code.as_deref(), Some("G43"));

        assert!(find_diagnosis_by_name(&conn, "no such condition")
            .unwrap()
            .is_none());
    }

    #[test]
    fn results_ordered_by_confidence() {
        let conn = open_memory_database().unwrap();
        let user = sample_user();
        insert_user(&conn, &user).unwrap();

        let migraine = find_diagnosis_by_name(&conn, "migraine").unwrap().unwrap();
        let tension = find_diagnosis_by_name(&conn, "tension headache")
            .unwrap()
            .unwrap();

        for (diagnosis, confidence) in [(&migraine, 0.4), (&tension, 0.8)] {
            insert_diagnosis_result(
                &conn,
                &DiagnosisResult {
                    id: Uuid::new_v4(),
                    pattern_id: "pattern_test_1".into(),
                    user_id: user.id,
                    diagnosis_id: diagnosis.id,
                    confidence,
                    created_at: crate::db::repository::now(),
                },
            )
            .unwrap();
        }

        let results = list_results_for_pattern(&conn, "pattern_test_1").unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].diagnosis_id, tension.id);
        assert!(results[0].confidence > results[1].confidence);
    }
}
