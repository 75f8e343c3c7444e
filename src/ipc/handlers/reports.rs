use crate::db;
use crate::escape::html_safe;
use crate::ipc::error::{login_redirect, ok};
use crate::ipc::handlers::setup::{load_report_settings, ReportSettings};
use crate::ipc::helpers::{get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::report::{
    self, csv, export_file_name, format_percent, pdf, AttendanceReport, ExportInput,
    RateTier, ReportError,
};
use crate::session::RequestContext;
use chrono::NaiveDateTime;
use serde_json::json;
use std::path::{Path, PathBuf};

const CACHE_CONTROL: &str = "no-cache, must-revalidate";
const EXPIRES: &str = "Sat, 26 Jul 1997 05:00:00 GMT";

#[derive(Clone, Copy)]
enum ExportFormat {
    Csv,
    Pdf,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Pdf => "pdf",
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            Self::Csv => csv::CONTENT_TYPE,
            Self::Pdf => pdf::CONTENT_TYPE,
        }
    }
}

fn tier_label(tier: RateTier) -> &'static str {
    match tier {
        RateTier::High => "high",
        RateTier::Medium => "medium",
        RateTier::Low => "low",
    }
}

fn workspace(state: &AppState) -> Result<PathBuf, HandlerErr> {
    state
        .workspace
        .clone()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

fn report_settings(state: &AppState) -> ReportSettings {
    let Some(conn) = state.db.as_ref() else {
        return ReportSettings::default();
    };
    match load_report_settings(conn) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "report settings unreadable, using defaults");
            ReportSettings::default()
        }
    }
}

/// Aggregates over a connection opened for this request only. The
/// connection is dropped before the caller formats anything.
fn collect(workspace: &Path, settings: &ReportSettings) -> Result<AttendanceReport, ReportError> {
    let conn = db::open_report_connection(workspace)?;
    let result = report::aggregate(&conn, &settings.aggregate);
    if let Err(e) = &result {
        tracing::warn!(error = %e, "attendance aggregation failed");
    }
    result
}

fn attendance_model(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let workspace = workspace(state)?;
    let mut settings = report_settings(state);
    settings.aggregate.include_date_range = true;

    let report = match collect(&workspace, &settings) {
        Ok(r) => r,
        Err(e) => {
            return Ok(ok(
                &req.id,
                json!({
                    "status": "store_unavailable",
                    "message": report::STORE_ERROR_MESSAGE,
                    "detail": e.to_string(),
                }),
            ))
        }
    };
    if report.is_empty() {
        return Ok(ok(
            &req.id,
            json!({ "status": "empty", "message": report::NO_DATA_MESSAGE }),
        ));
    }

    let rows: Vec<serde_json::Value> = report
        .students
        .iter()
        .map(|s| {
            json!({
                "studentId": s.student_id,
                "studentName": html_safe(&s.student_name),
                "rollNo": html_safe(&s.roll_no),
                "class": html_safe(&s.class),
                "presents": s.presents,
                "absents": s.absents,
                "totalClasses": s.total_classes,
                "percentage": s.percentage,
                "percentLabel": format_percent(s.percentage),
                "tier": tier_label(RateTier::for_percentage(s.percentage)),
                "firstAttendance": s.first_attendance,
                "lastAttendance": s.last_attendance,
            })
        })
        .collect();
    let classes: Vec<serde_json::Value> = report
        .classes
        .iter()
        .map(|c| {
            json!({
                "class": html_safe(&c.class),
                "studentCount": c.student_count,
                "presentTotal": c.present_total,
                "absentTotal": c.absent_total,
                "totalDays": c.total_days,
                "classPercentage": c.class_percentage,
                "tier": tier_label(RateTier::for_percentage(c.class_percentage)),
            })
        })
        .collect();

    Ok(ok(
        &req.id,
        json!({
            "status": "ok",
            "rows": rows,
            "classes": classes,
            "totals": report.totals,
        }),
    ))
}

fn render(
    format: ExportFormat,
    input: &ExportInput<'_>,
    generated_at: NaiveDateTime,
    settings: &ReportSettings,
) -> Result<Vec<u8>, ReportError> {
    match format {
        ExportFormat::Csv => csv::render_csv(input, generated_at),
        ExportFormat::Pdf => pdf::render_pdf(input, generated_at, &settings.pdf),
    }
}

fn export(
    state: &AppState,
    req: &Request,
    format: ExportFormat,
) -> Result<serde_json::Value, HandlerErr> {
    let workspace = workspace(state)?;
    let out_dir = PathBuf::from(get_required_str(&req.params, "outDir")?);
    let settings = report_settings(state);
    let generated_at = chrono::Local::now().naive_local();

    let outcome = collect(&workspace, &settings);
    let input = ExportInput::from_result(&outcome);
    let bytes = render(format, &input, generated_at, &settings)
        .map_err(|e| HandlerErr::new("export_failed", e.to_string()))?;

    let file_name = export_file_name(format.extension(), generated_at);
    let path = out_dir.join(&file_name);
    std::fs::create_dir_all(&out_dir)
        .and_then(|_| std::fs::write(&path, &bytes))
        .map_err(|e| {
            let mut err = HandlerErr::new("export_failed", e.to_string());
            err.details = Some(json!({ "path": path.to_string_lossy() }));
            err
        })?;

    tracing::info!(
        format = format.extension(),
        status = ?input.status(),
        bytes = bytes.len(),
        path = %path.display(),
        "report exported"
    );
    Ok(ok(
        &req.id,
        json!({
            "fileName": file_name,
            "path": path.to_string_lossy(),
            "bytes": bytes.len(),
            "status": input.status(),
            "headers": {
                "Content-Type": format.content_type(),
                "Content-Disposition": format!("attachment; filename=\"{}\"", file_name),
                "Cache-Control": CACHE_CONTROL,
                "Expires": EXPIRES,
            },
        }),
    ))
}

pub fn try_handle(
    state: &mut AppState,
    ctx: &RequestContext,
    req: &Request,
) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "reports.attendanceModel" | "reports.exportCsv" | "reports.exportPdf"
            if !ctx.is_authenticated() =>
        {
            return Some(login_redirect(&req.id))
        }
        "reports.attendanceModel" => attendance_model(state, req),
        "reports.exportCsv" => export(state, req, ExportFormat::Csv),
        "reports.exportPdf" => export(state, req, ExportFormat::Pdf),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}
