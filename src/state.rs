//! Shared application state: settings plus the injected LLM client.
//!
//! Handlers open a fresh SQLite connection per persistence step instead of
//! holding one across the request. `rusqlite::Connection` is `!Send`, so the
//! compiler rejects any attempt to keep a connection alive across an LLM
//! await — which is exactly the ordering the service requires (persist,
//! then call the model, then persist again).

use std::sync::Arc;

use rusqlite::Connection;

use crate::config::Settings;
use crate::db::{self, DatabaseError};
use crate::llm::LlmClient;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub llm: Arc<dyn LlmClient>,
}

impl AppState {
    pub fn new(settings: Settings, llm: Arc<dyn LlmClient>) -> Self {
        Self { settings, llm }
    }

    /// Open a connection for one unit of work. The schema was migrated at
    /// startup; this only sets pragmas.
    pub fn open_db(&self) -> Result<Connection, DatabaseError> {
        db::open_connection(&self.settings.database_path)
    }
}
