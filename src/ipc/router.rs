use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    let ctx = state.session.snapshot();
    tracing::debug!(id = %req.id, method = %req.method, "dispatch");

    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::auth::try_handle(state, &ctx, &req) {
        return resp;
    }
    if let Some(resp) = handlers::setup::try_handle(state, &ctx, &req) {
        return resp;
    }
    if let Some(resp) = handlers::students::try_handle(state, &ctx, &req) {
        return resp;
    }
    if let Some(resp) = handlers::attendance::try_handle(state, &ctx, &req) {
        return resp;
    }
    if let Some(resp) = handlers::dashboard::try_handle(state, &ctx, &req) {
        return resp;
    }
    if let Some(resp) = handlers::reports::try_handle(state, &ctx, &req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
