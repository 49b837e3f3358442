//! Shared types for the API layer.

use crate::models::User;
use crate::state::AppState;

/// Shared context for all routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub state: AppState,
}

impl ApiContext {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

/// Authenticated user, injected into request extensions by the identity
/// middleware after a successful lookup.
#[derive(Debug, Clone)]
pub struct UserContext(pub User);
