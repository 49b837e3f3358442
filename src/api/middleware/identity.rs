//! Identity middleware: resolves `X-User-Id` into a `UserContext`.
//!
//! Token issuance is out of scope for this service; the gateway in front
//! of it authenticates and forwards the caller's id. Missing, malformed,
//! and unknown ids all answer 401 so route handlers only ever see a
//! resolved user.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::db::repository::user as user_repo;

pub const USER_ID_HEADER: &str = "X-User-Id";

pub async fn require_user(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let ctx = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or_else(|| ApiError::Internal("ApiContext extension missing".into()))?;

    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
        .ok_or(ApiError::Unauthorized)?;

    let user = {
        let conn = ctx.state.open_db()?;
        user_repo::get_user(&conn, &user_id)?
    }
    .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(UserContext(user));
    Ok(next.run(req).await)
}
