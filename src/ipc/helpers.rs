use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::session::RequestContext;
use rusqlite::Connection;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn query(e: impl std::fmt::Display) -> Self {
        Self::new("db_query_failed", e.to_string())
    }

    pub fn update(e: impl std::fmt::Display) -> Self {
        Self::new("db_update_failed", e.to_string())
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// Like [`get_required_str`] but trims and rejects blank values.
pub fn get_required_text(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    let raw = get_required_str(params, key)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(HandlerErr::bad_params(format!("{} must not be empty", key)));
    }
    Ok(trimmed.to_string())
}

pub fn db_conn(state: &AppState) -> Result<&Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn require_csrf(ctx: &RequestContext, req: &Request) -> Result<(), HandlerErr> {
    let presented = req.params.get("csrfToken").and_then(|v| v.as_str());
    if ctx.verify_csrf(presented) {
        return Ok(());
    }
    tracing::warn!(method = %req.method, "rejected request with invalid csrf token");
    Err(HandlerErr::new("csrf_failed", "invalid or missing csrf token"))
}
