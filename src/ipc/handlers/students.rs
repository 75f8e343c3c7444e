use crate::ipc::error::{login_redirect, ok};
use crate::ipc::helpers::{db_conn, get_required_text, require_csrf, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::session::RequestContext;
use rusqlite::OptionalExtension;
use serde_json::json;

const MAX_NAME_LEN: usize = 100;
const MAX_CODE_LEN: usize = 20;

fn bounded(params: &serde_json::Value, key: &str, max: usize) -> Result<String, HandlerErr> {
    let value = get_required_text(params, key)?;
    if value.chars().count() > max {
        return Err(HandlerErr::bad_params(format!(
            "{} length must be <= {}",
            key, max
        )));
    }
    Ok(value)
}

fn students_list(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let class_filter = req
        .params
        .get("class")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let mut stmt = conn
        .prepare(
            "SELECT id, student_name, roll_no, class
             FROM students
             WHERE (?1 IS NULL OR class = ?1)
             ORDER BY class, roll_no, id",
        )
        .map_err(HandlerErr::query)?;
    let students = stmt
        .query_map([&class_filter], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "studentName": r.get::<_, String>(1)?,
                "rollNo": r.get::<_, String>(2)?,
                "class": r.get::<_, String>(3)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::query)?;
    Ok(ok(&req.id, json!({ "students": students })))
}

fn students_create(
    state: &AppState,
    ctx: &RequestContext,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    require_csrf(ctx, req)?;
    let conn = db_conn(state)?;
    let name = bounded(&req.params, "studentName", MAX_NAME_LEN)?;
    let roll_no = bounded(&req.params, "rollNo", MAX_CODE_LEN)?;
    let class = bounded(&req.params, "class", MAX_CODE_LEN)?;

    let clash: Option<String> = conn
        .query_row(
            "SELECT id FROM students WHERE class = ? AND roll_no = ?",
            (&class, &roll_no),
            |r| r.get(0),
        )
        .optional()
        .map_err(HandlerErr::query)?;
    if let Some(existing) = clash {
        let mut e = HandlerErr::bad_params("roll number already used in this class");
        e.details = Some(json!({ "studentId": existing }));
        return Err(e);
    }

    let id = uuid::Uuid::new_v4().to_string();
    let created_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    conn.execute(
        "INSERT INTO students(id, student_name, roll_no, class, created_at) VALUES(?, ?, ?, ?, ?)",
        (&id, &name, &roll_no, &class, &created_at),
    )
    .map_err(HandlerErr::update)?;
    tracing::info!(student_id = %id, class = %class, "student created");
    Ok(ok(&req.id, json!({ "studentId": id })))
}

pub fn try_handle(
    state: &mut AppState,
    ctx: &RequestContext,
    req: &Request,
) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.list" | "students.create" if !ctx.is_authenticated() => {
            return Some(login_redirect(&req.id))
        }
        "students.list" => students_list(state, req),
        "students.create" => students_create(state, ctx, req),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}
