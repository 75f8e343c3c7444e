use crate::ipc::error::{login_redirect, ok};
use crate::ipc::helpers::{db_conn, get_required_str, require_csrf, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::session::RequestContext;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Present,
    Absent,
}

impl Status {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" | "p" => Some(Self::Present),
            "absent" | "a" => Some(Self::Absent),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Present => "Present",
            Self::Absent => "Absent",
        }
    }
}

/// Accepts only canonical `YYYY-MM-DD`; `2024-9-1` or `2024-02-30` are rejected.
fn parse_date(raw: &str) -> Result<String, HandlerErr> {
    let t = raw.trim();
    let parsed = NaiveDate::parse_from_str(t, DATE_FORMAT)
        .map_err(|_| HandlerErr::bad_params("date must be YYYY-MM-DD"))?;
    let canonical = parsed.format(DATE_FORMAT).to_string();
    if canonical != t {
        return Err(HandlerErr::bad_params("date must be YYYY-MM-DD"));
    }
    Ok(canonical)
}

fn student_exists(conn: &Connection, student_id: &str) -> Result<bool, HandlerErr> {
    conn.query_row("SELECT 1 FROM students WHERE id = ?", [student_id], |r| {
        r.get::<_, i64>(0)
    })
    .optional()
    .map(|v| v.is_some())
    .map_err(HandlerErr::query)
}

fn attendance_mark(
    state: &mut AppState,
    ctx: &RequestContext,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    require_csrf(ctx, req)?;
    let date = parse_date(&get_required_str(&req.params, "date")?)?;
    let Some(entries) = req.params.get("entries").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::bad_params("entries must be an array"));
    };

    let mut marks: Vec<(String, Status)> = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let student_id = get_required_str(entry, "studentId")
            .map_err(|_| HandlerErr::bad_params(format!("entries[{}].studentId missing", i)))?;
        let status = entry
            .get("status")
            .and_then(|v| v.as_str())
            .and_then(Status::parse)
            .ok_or_else(|| {
                HandlerErr::bad_params(format!("entries[{}].status must be Present or Absent", i))
            })?;
        marks.push((student_id, status));
    }

    let Some(conn) = state.db.as_mut() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let tx = conn.transaction().map_err(HandlerErr::update)?;
    for (student_id, status) in &marks {
        if !student_exists(&tx, student_id)? {
            let mut e = HandlerErr::new("not_found", "student not found");
            e.details = Some(json!({ "studentId": student_id }));
            return Err(e);
        }
        tx.execute(
            "INSERT INTO attendance(id, student_id, date, status) VALUES(?, ?, ?, ?)
             ON CONFLICT(student_id, date) DO UPDATE SET status = excluded.status",
            (
                uuid::Uuid::new_v4().to_string(),
                student_id,
                &date,
                status.as_str(),
            ),
        )
        .map_err(HandlerErr::update)?;
    }
    tx.commit().map_err(HandlerErr::update)?;

    tracing::info!(date = %date, count = marks.len(), "attendance marked");
    Ok(ok(&req.id, json!({ "date": date, "updated": marks.len() })))
}

fn attendance_for_date(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let date = parse_date(&get_required_str(&req.params, "date")?)?;
    let mut stmt = conn
        .prepare(
            "SELECT s.id, s.student_name, s.roll_no, s.class, a.status
             FROM students s
             LEFT JOIN attendance a ON a.student_id = s.id AND a.date = ?
             ORDER BY s.class, s.roll_no, s.id",
        )
        .map_err(HandlerErr::query)?;
    let rows = stmt
        .query_map([&date], |r| {
            Ok(json!({
                "studentId": r.get::<_, String>(0)?,
                "studentName": r.get::<_, String>(1)?,
                "rollNo": r.get::<_, String>(2)?,
                "class": r.get::<_, String>(3)?,
                "status": r.get::<_, Option<String>>(4)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::query)?;
    Ok(ok(&req.id, json!({ "date": date, "rows": rows })))
}

pub fn try_handle(
    state: &mut AppState,
    ctx: &RequestContext,
    req: &Request,
) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "attendance.mark" | "attendance.forDate" if !ctx.is_authenticated() => {
            return Some(login_redirect(&req.id))
        }
        "attendance.mark" => attendance_mark(state, ctx, req),
        "attendance.forDate" => attendance_for_date(state, req),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_must_be_canonical() {
        assert_eq!(parse_date("2024-09-01").ok(), Some("2024-09-01".to_string()));
        assert!(parse_date("2024-9-1").is_err());
        assert!(parse_date("2024-02-30").is_err());
        assert!(parse_date("01/09/2024").is_err());
    }

    #[test]
    fn status_accepts_words_and_letters() {
        assert_eq!(Status::parse("present"), Some(Status::Present));
        assert_eq!(Status::parse(" A "), Some(Status::Absent));
        assert_eq!(Status::parse("late"), None);
    }
}
