use crate::ipc::error::{login_redirect, ok};
use crate::ipc::helpers::{db_conn, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::session::RequestContext;
use rusqlite::Connection;
use serde_json::json;

fn count(conn: &Connection, sql: &str) -> Result<i64, HandlerErr> {
    conn.query_row(sql, [], |r| r.get(0))
        .map_err(HandlerErr::query)
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn dashboard_stats(
    state: &AppState,
    ctx: &RequestContext,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let students = count(conn, "SELECT COUNT(*) FROM students")?;
    let records = count(conn, "SELECT COUNT(*) FROM attendance")?;
    let present = count(conn, "SELECT COUNT(*) FROM attendance WHERE status = 'Present'")?;
    let absent = count(conn, "SELECT COUNT(*) FROM attendance WHERE status = 'Absent'")?;
    let greeting = ctx
        .user
        .as_ref()
        .map(|u| format!("Welcome, {}", capitalize_first(&u.username)));
    Ok(ok(
        &req.id,
        json!({
            "greeting": greeting,
            "students": students,
            "records": records,
            "present": present,
            "absent": absent,
        }),
    ))
}

pub fn try_handle(
    state: &mut AppState,
    ctx: &RequestContext,
    req: &Request,
) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.stats" if !ctx.is_authenticated() => Some(login_redirect(&req.id)),
        "dashboard.stats" => {
            Some(dashboard_stats(state, ctx, req).unwrap_or_else(|e| e.response(&req.id)))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::capitalize_first;

    #[test]
    fn greeting_capitalizes_only_the_first_letter() {
        assert_eq!(capitalize_first("alice"), "Alice");
        assert_eq!(capitalize_first("mcDonald"), "McDonald");
        assert_eq!(capitalize_first(""), "");
    }
}
