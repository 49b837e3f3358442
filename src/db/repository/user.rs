use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::User;

use super::{format_opt_ts, format_ts, parse_opt_ts, parse_ts};

pub fn insert_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, email, username, full_name, age, gender,
         medical_history, current_medications, allergies, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            user.id.to_string(),
            user.email,
            user.username,
            user.full_name,
            user.age,
            user.gender,
            user.medical_history,
            user.current_medications,
            user.allergies,
            format_ts(user.created_at),
            format_opt_ts(user.updated_at),
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DatabaseError::ConstraintViolation("email or username already registered".into())
        }
        other => other.into(),
    })?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &Uuid) -> Result<Option<User>, DatabaseError> {
    conn.query_row(
        "SELECT id, email, username, full_name, age, gender,
                medical_history, current_medications, allergies, created_at, updated_at
         FROM users WHERE id = ?1",
        params![id.to_string()],
        user_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn update_profile(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE users SET full_name = ?1, age = ?2, gender = ?3,
         medical_history = ?4, current_medications = ?5, allergies = ?6, updated_at = ?7
         WHERE id = ?8",
        params![
            user.full_name,
            user.age,
            user.gender,
            user.medical_history,
            user.current_medications,
            user.allergies,
            format_opt_ts(user.updated_at),
            user.id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "User".into(),
            id: user.id.to_string(),
        });
    }
    Ok(())
}

/// Delete an account. Foreign keys cascade conversations, messages,
/// symptoms, and reports.
pub fn delete_user(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "User".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
        email: row.get(1)?,
        username: row.get(2)?,
        full_name: row.get(3)?,
        age: row.get(4)?,
        gender: row.get(5)?,
        medical_history: row.get(6)?,
        current_medications: row.get(7)?,
        allergies: row.get(8)?,
        created_at: parse_ts(&row.get::<_, String>(9)?),
        updated_at: parse_opt_ts(row.get(10)?),
    })
}
