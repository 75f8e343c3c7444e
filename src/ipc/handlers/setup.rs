use crate::db;
use crate::ipc::error::{err, login_redirect, ok};
use crate::ipc::helpers::require_csrf;
use crate::ipc::types::{AppState, Request};
use crate::report::layout::PageGeometry;
use crate::report::pdf::PdfOptions;
use crate::report::{AggregateOptions, RollNumberOrder};
use crate::session::RequestContext;
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    Reports,
    Printer,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "reports" => Some(Self::Reports),
            "printer" => Some(Self::Printer),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Reports => "setup.reports",
            Self::Printer => "setup.printer",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Reports => json!({
            "appName": "Attendance Management System",
            "author": "School Administration",
            "rollNumberOrder": "lexical",
            "showGeneratedAt": true
        }),
        SetupSection::Printer => json!({
            "marginMm": 15,
            "bottomMarginMm": 25,
            "fontScale": 100
        }),
    }
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_bool(v: &Value, key: &str) -> Result<bool, String> {
    v.as_bool().ok_or_else(|| format!("{} must be boolean", key))
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_label(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.is_empty() {
        return Err(format!("{} must not be empty", key));
    }
    if s.chars().count() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Reports => match k.as_str() {
                "appName" | "author" => {
                    obj.insert(k.clone(), Value::String(parse_label(v, k, 80)?));
                }
                "rollNumberOrder" => {
                    let s = v
                        .as_str()
                        .ok_or_else(|| format!("{} must be string", k))?
                        .trim()
                        .to_ascii_lowercase();
                    let order = RollNumberOrder::parse(&s)
                        .ok_or("rollNumberOrder must be one of: lexical, natural")?;
                    obj.insert(k.clone(), Value::String(order.as_str().to_string()));
                }
                "showGeneratedAt" => {
                    obj.insert(k.clone(), Value::Bool(parse_bool(v, k)?));
                }
                _ => return Err(format!("unknown reports field: {}", k)),
            },
            SetupSection::Printer => match k.as_str() {
                "marginMm" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 5, 30)?));
                }
                "bottomMarginMm" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 10, 40)?));
                }
                "fontScale" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 60, 160)?));
                }
                _ => return Err(format!("unknown printer field: {}", k)),
            },
        }
    }
    Ok(())
}

fn load_section(conn: &rusqlite::Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    // A stored value that fails to parse or validate leaves the defaults in
    // place; a failing store is an error.
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            let mut merged = current.clone();
            if merge_section_patch(section, &mut merged, saved_obj).is_ok() {
                current = merged;
            }
        }
    }
    Ok(current)
}

/// Typed view over the `reports` and `printer` sections used by exports.
#[derive(Debug, Clone, Default)]
pub struct ReportSettings {
    pub aggregate: AggregateOptions,
    pub pdf: PdfOptions,
}

pub fn load_report_settings(conn: &rusqlite::Connection) -> anyhow::Result<ReportSettings> {
    let reports = load_section(conn, SetupSection::Reports)?;
    let printer = load_section(conn, SetupSection::Printer)?;
    let mut settings = ReportSettings::default();

    if let Some(order) = reports
        .get("rollNumberOrder")
        .and_then(|v| v.as_str())
        .and_then(RollNumberOrder::parse)
    {
        settings.aggregate.roll_order = order;
    }
    if let Some(name) = reports.get("appName").and_then(|v| v.as_str()) {
        settings.pdf.creator = name.to_string();
    }
    if let Some(author) = reports.get("author").and_then(|v| v.as_str()) {
        settings.pdf.author = author.to_string();
    }
    if let Some(show) = reports.get("showGeneratedAt").and_then(|v| v.as_bool()) {
        settings.pdf.show_generated_at = show;
    }

    let mut geometry = PageGeometry::a4_portrait();
    if let Some(m) = printer.get("marginMm").and_then(|v| v.as_i64()) {
        geometry.margin_left = m as f32;
        geometry.margin_right = m as f32;
    }
    if let Some(m) = printer.get("bottomMarginMm").and_then(|v| v.as_i64()) {
        geometry.margin_bottom = m as f32;
    }
    settings.pdf.geometry = geometry;
    if let Some(scale) = printer.get("fontScale").and_then(|v| v.as_i64()) {
        settings.pdf.font_scale = scale as f32 / 100.0;
    }
    Ok(settings)
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let reports = match load_section(conn, SetupSection::Reports) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let printer = match load_section(conn, SetupSection::Printer) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    ok(&req.id, json!({ "reports": reports, "printer": printer }))
}

fn handle_setup_update(
    state: &mut AppState,
    ctx: &RequestContext,
    req: &Request,
) -> serde_json::Value {
    if let Err(e) = require_csrf(ctx, req) {
        return e.response(&req.id);
    }
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(conn, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    tracing::info!(section = section_raw, "setup updated");
    ok(&req.id, json!({ "ok": true, "section": section_raw, "values": current }))
}

pub fn try_handle(
    state: &mut AppState,
    ctx: &RequestContext,
    req: &Request,
) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" | "setup.update" if !ctx.is_authenticated() => Some(login_redirect(&req.id)),
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, ctx, req)),
        _ => None,
    }
}
