use crate::ipc::error::{login_redirect, ok};
use crate::ipc::helpers::{db_conn, get_required_str, get_required_text, require_csrf, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::session::{self, AuthUser, RequestContext};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;

const MIN_PASSWORD_LEN: usize = 6;
const MAX_USERNAME_LEN: usize = 64;

fn user_count(conn: &Connection) -> Result<i64, HandlerErr> {
    conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
        .map_err(HandlerErr::query)
}

fn register(
    state: &mut AppState,
    ctx: &RequestContext,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    // The first account can be created anonymously; after that only a
    // logged-in user may add accounts.
    let bootstrap = user_count(conn)? == 0;
    if !bootstrap {
        if !ctx.is_authenticated() {
            return Ok(login_redirect(&req.id));
        }
        require_csrf(ctx, req)?;
    }

    let username = get_required_text(&req.params, "username")?;
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(HandlerErr::bad_params(format!(
            "username length must be <= {}",
            MAX_USERNAME_LEN
        )));
    }
    let password = get_required_str(&req.params, "password")?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(HandlerErr::bad_params(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let taken = conn
        .query_row("SELECT 1 FROM users WHERE username = ?", [&username], |r| {
            r.get::<_, i64>(0)
        })
        .optional()
        .map_err(HandlerErr::query)?
        .is_some();
    if taken {
        return Err(HandlerErr::bad_params("username already exists"));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let password_hash = session::hash_password(&password)
        .map_err(|e| HandlerErr::new("hash_failed", e.to_string()))?;
    let created_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    conn.execute(
        "INSERT INTO users(id, username, password_hash, created_at) VALUES(?, ?, ?, ?)",
        (&id, &username, &password_hash, &created_at),
    )
    .map_err(HandlerErr::update)?;
    tracing::info!(username = %username, bootstrap, "user registered");
    Ok(ok(&req.id, json!({ "userId": id, "username": username })))
}

fn login(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let username = get_required_text(&req.params, "username")?;
    let password = get_required_str(&req.params, "password")?;

    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT id, password_hash FROM users WHERE username = ?",
            [&username],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
        .map_err(HandlerErr::query)?;

    let Some((id, hash)) = row else {
        tracing::warn!(username = %username, "login rejected: unknown user");
        return Err(HandlerErr::new("invalid_credentials", "invalid username or password"));
    };
    if !session::verify_password(&password, &hash) {
        tracing::warn!(username = %username, "login rejected: bad password");
        return Err(HandlerErr::new("invalid_credentials", "invalid username or password"));
    }

    let user = AuthUser { id, username };
    let token = state.session.login(user.clone()).to_string();
    tracing::info!(username = %user.username, "logged in");
    Ok(ok(&req.id, json!({ "user": user, "csrfToken": token })))
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(user) = state.session.user() {
        tracing::info!(username = %user.username, "logged out");
    }
    state.session.logout();
    ok(&req.id, json!({ "redirectTo": "login" }))
}

fn handle_session(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "authenticated": state.session.user().is_some(),
            "user": state.session.user(),
            "csrfToken": state.session.csrf_token(),
        }),
    )
}

pub fn try_handle(
    state: &mut AppState,
    ctx: &RequestContext,
    req: &Request,
) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "auth.register" => register(state, ctx, req),
        "auth.login" => login(state, req),
        "auth.logout" => return Some(handle_logout(state, req)),
        "auth.session" => return Some(handle_session(state, req)),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}
