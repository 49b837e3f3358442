//! User registration and profile endpoints.
//!
//! Registration is the only unprotected route: it creates the identity the
//! `X-User-Id` header refers to. Password and token handling live in the
//! gateway, not here.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::db::repository::{now, user as user_repo};
use crate::models::User;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub medical_history: Option<String>,
    pub current_medications: Option<String>,
    pub allergies: Option<String>,
}

#[derive(Deserialize)]
pub struct ProfileUpdateRequest {
    pub full_name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub medical_history: Option<String>,
    pub current_medications: Option<String>,
    pub allergies: Option<String>,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub status: &'static str,
    pub user_id: Uuid,
}

/// `POST /api/users` — register a new user.
pub async fn register(
    State(ctx): State<ApiContext>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let email = req.email.trim().to_lowercase();
    let username = req.username.trim().to_string();

    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::Validation("A valid email is required".into()));
    }
    if username.is_empty() {
        return Err(ApiError::Validation("Username is required".into()));
    }
    if req.age.is_some_and(|age| !(0..=150).contains(&age)) {
        return Err(ApiError::Validation("Age must be between 0 and 150".into()));
    }

    let user = User {
        id: Uuid::new_v4(),
        email,
        username,
        full_name: req.full_name,
        age: req.age,
        gender: req.gender,
        medical_history: req.medical_history,
        current_medications: req.current_medications,
        allergies: req.allergies,
        created_at: now(),
        updated_at: None,
    };

    let conn = ctx.state.open_db()?;
    user_repo::insert_user(&conn, &user)?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /api/users/me` — current user's profile.
pub async fn me(Extension(user): Extension<UserContext>) -> Json<User> {
    Json(user.0)
}

/// `PUT /api/users/me` — update profile fields.
pub async fn update_me(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Json(req): Json<ProfileUpdateRequest>,
) -> Result<Json<User>, ApiError> {
    if req.age.is_some_and(|age| !(0..=150).contains(&age)) {
        return Err(ApiError::Validation("Age must be between 0 and 150".into()));
    }

    let mut updated = user.0;
    updated.full_name = req.full_name.or(updated.full_name);
    updated.age = req.age.or(updated.age);
    updated.gender = req.gender.or(updated.gender);
    updated.medical_history = req.medical_history.or(updated.medical_history);
    updated.current_medications = req.current_medications.or(updated.current_medications);
    updated.allergies = req.allergies.or(updated.allergies);
    updated.updated_at = Some(now());

    let conn = ctx.state.open_db()?;
    user_repo::update_profile(&conn, &updated)?;

    Ok(Json(updated))
}

/// `DELETE /api/users/me` — delete the account. Conversations, messages,
/// symptoms, and reports cascade.
pub async fn delete_me(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let conn = ctx.state.open_db()?;
    user_repo::delete_user(&conn, &user.0.id)?;

    Ok(Json(DeleteResponse {
        status: "deleted",
        user_id: user.0.id,
    }))
}
