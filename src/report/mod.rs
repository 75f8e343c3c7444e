pub mod csv;
pub mod layout;
pub mod pdf;

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

pub const FILE_STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
pub const SHORT_STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const LONG_STAMP_FORMAT: &str = "%B %-d, %Y at %-I:%M %p";

pub const NO_DATA_MESSAGE: &str = "No student attendance data found";
pub const STORE_ERROR_MESSAGE: &str = "Error: Unable to fetch attendance data";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("attendance store unavailable: {0}")]
    StoreUnavailable(#[from] rusqlite::Error),

    #[error("failed to format report: {0}")]
    Formatting(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RollNumberOrder {
    /// Byte-wise text comparison, the way the roll numbers are stored.
    #[default]
    Lexical,
    /// Digit runs compare by numeric value ("9" before "10").
    Natural,
}

impl RollNumberOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexical" => Some(Self::Lexical),
            "natural" => Some(Self::Natural),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::Natural => "natural",
        }
    }

    fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            Self::Lexical => a.cmp(b),
            Self::Natural => natural_cmp(a, b),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateOptions {
    pub roll_order: RollNumberOrder,
    /// Also collect each student's first and last attendance date.
    pub include_date_range: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttendanceSummary {
    pub student_id: String,
    pub student_name: String,
    pub roll_no: String,
    pub class: String,
    pub presents: i64,
    pub absents: i64,
    pub total_classes: i64,
    pub percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_attendance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attendance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    pub class: String,
    pub student_count: i64,
    pub present_total: i64,
    pub absent_total: i64,
    pub total_days: i64,
    pub class_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTotals {
    pub total_students: i64,
    pub total_present: i64,
    pub total_absent: i64,
    pub total_classes: i64,
    pub overall_percentage: f64,
}

/// One export's worth of aggregated attendance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReport {
    pub students: Vec<StudentAttendanceSummary>,
    /// Class rollups in the order each class first appears in `students`.
    pub classes: Vec<ClassSummary>,
    pub totals: ReportTotals,
}

impl AttendanceReport {
    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    #[cfg(test)]
    pub fn class(&self, name: &str) -> Option<&ClassSummary> {
        self.classes.iter().find(|c| c.class == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Ok,
    Empty,
    StoreUnavailable,
}

/// What a formatter is asked to render.
#[derive(Debug, Clone, Copy)]
pub enum ExportInput<'a> {
    Report(&'a AttendanceReport),
    StoreUnavailable,
}

impl<'a> ExportInput<'a> {
    pub fn from_result(result: &'a Result<AttendanceReport, ReportError>) -> Self {
        match result {
            Ok(report) => Self::Report(report),
            Err(_) => Self::StoreUnavailable,
        }
    }

    pub fn status(&self) -> ExportStatus {
        match self {
            Self::Report(r) if r.is_empty() => ExportStatus::Empty,
            Self::Report(_) => ExportStatus::Ok,
            Self::StoreUnavailable => ExportStatus::StoreUnavailable,
        }
    }
}

/// Attendance tier used for colour coding. The lower bound of each tier is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateTier {
    High,
    Medium,
    Low,
}

impl RateTier {
    pub fn for_percentage(p: f64) -> Self {
        if p >= 90.0 {
            Self::High
        } else if p >= 75.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

const SUMMARY_SQL: &str = "SELECT
       s.id,
       s.student_name,
       s.roll_no,
       s.class,
       COALESCE(SUM(CASE WHEN a.status = 'Present' THEN 1 ELSE 0 END), 0) AS presents,
       COALESCE(SUM(CASE WHEN a.status = 'Absent' THEN 1 ELSE 0 END), 0) AS absents,
       COUNT(a.id) AS total_classes
     FROM students s
     LEFT JOIN attendance a ON a.student_id = s.id
     GROUP BY s.id, s.student_name, s.roll_no, s.class
     ORDER BY s.class ASC, s.roll_no ASC, s.id ASC";

const SUMMARY_WITH_DATES_SQL: &str = "SELECT
       s.id,
       s.student_name,
       s.roll_no,
       s.class,
       COALESCE(SUM(CASE WHEN a.status = 'Present' THEN 1 ELSE 0 END), 0) AS presents,
       COALESCE(SUM(CASE WHEN a.status = 'Absent' THEN 1 ELSE 0 END), 0) AS absents,
       COUNT(a.id) AS total_classes,
       MIN(a.date) AS first_attendance,
       MAX(a.date) AS last_attendance
     FROM students s
     LEFT JOIN attendance a ON a.student_id = s.id
     GROUP BY s.id, s.student_name, s.roll_no, s.class
     ORDER BY s.class ASC, s.roll_no ASC, s.id ASC";

/// `round(part / total * 100, 2)` with ties rounded away from zero, or 0
/// when there is nothing to divide by. Works in hundredths of a percent on
/// integers so that exact ties such as 23/160 = 14.375 round up.
pub fn round_percent(part: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let part = i128::from(part.clamp(0, total));
    let total = i128::from(total);
    let hundredths = (part * 20_000 + total) / (2 * total);
    hundredths as f64 / 100.0
}

/// Shortest decimal form with a trailing percent sign: `87.5%`, `100%`.
pub fn format_percent(p: f64) -> String {
    format!("{}%", p)
}

pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn export_file_name(extension: &str, generated_at: NaiveDateTime) -> String {
    format!(
        "attendance_report_{}.{}",
        generated_at.format(FILE_STAMP_FORMAT),
        extension
    )
}

/// Runs the per-student query once and derives class rollups and totals from
/// the materialized rows.
pub fn aggregate(
    conn: &Connection,
    options: &AggregateOptions,
) -> Result<AttendanceReport, ReportError> {
    let mut students = fetch_student_summaries(conn, options.include_date_range)?;
    // Stable sort keeps the query's id tiebreak for equal (class, roll) pairs.
    students.sort_by(|a, b| {
        a.class
            .cmp(&b.class)
            .then_with(|| options.roll_order.compare(&a.roll_no, &b.roll_no))
    });

    let classes = class_rollups(&students);
    let totals = report_totals(&students);
    tracing::debug!(
        students = totals.total_students,
        classes = classes.len(),
        "attendance aggregated"
    );
    Ok(AttendanceReport {
        students,
        classes,
        totals,
    })
}

fn fetch_student_summaries(
    conn: &Connection,
    include_date_range: bool,
) -> Result<Vec<StudentAttendanceSummary>, ReportError> {
    let sql = if include_date_range {
        SUMMARY_WITH_DATES_SQL
    } else {
        SUMMARY_SQL
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |r| {
            let presents: i64 = r.get(4)?;
            let absents: i64 = r.get(5)?;
            let total_classes: i64 = r.get(6)?;
            let (first_attendance, last_attendance) = if include_date_range {
                (r.get(7)?, r.get(8)?)
            } else {
                (None, None)
            };
            Ok(StudentAttendanceSummary {
                student_id: r.get(0)?,
                student_name: r.get(1)?,
                roll_no: r.get(2)?,
                class: r.get(3)?,
                presents,
                absents,
                total_classes,
                percentage: round_percent(presents, total_classes),
                first_attendance,
                last_attendance,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn class_rollups(students: &[StudentAttendanceSummary]) -> Vec<ClassSummary> {
    let mut classes: Vec<ClassSummary> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for s in students {
        let i = *index.entry(s.class.as_str()).or_insert_with(|| {
            classes.push(ClassSummary {
                class: s.class.clone(),
                student_count: 0,
                present_total: 0,
                absent_total: 0,
                total_days: 0,
                class_percentage: 0.0,
            });
            classes.len() - 1
        });
        let c = &mut classes[i];
        c.student_count += 1;
        c.present_total += s.presents;
        c.absent_total += s.absents;
        c.total_days += s.total_classes;
    }
    for c in &mut classes {
        c.class_percentage = round_percent(c.present_total, c.total_days);
    }
    classes
}

fn report_totals(students: &[StudentAttendanceSummary]) -> ReportTotals {
    let mut totals = ReportTotals {
        total_students: students.len() as i64,
        ..ReportTotals::default()
    };
    for s in students {
        totals.total_present += s.presents;
        totals.total_absent += s.absents;
        totals.total_classes += s.total_classes;
    }
    totals.overall_percentage = round_percent(totals.total_present, totals.total_classes);
    totals
}

/// Compares strings treating runs of ASCII digits as numbers.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ia = a.chars().peekable();
    let mut ib = b.chars().peekable();
    loop {
        match (ia.peek().copied(), ib.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) if ca.is_ascii_digit() && cb.is_ascii_digit() => {
                let na = take_digits(&mut ia);
                let nb = take_digits(&mut ib);
                let ta = na.trim_start_matches('0');
                let tb = nb.trim_start_matches('0');
                let ord = ta.len().cmp(&tb.len()).then_with(|| ta.cmp(tb));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(ca), Some(cb)) => {
                if ca != cb {
                    return ca.cmp(&cb);
                }
                ia.next();
                ib.next();
            }
        }
    }
}

fn take_digits<I: Iterator<Item = char>>(it: &mut std::iter::Peekable<I>) -> String {
    let mut out = String::new();
    while let Some(c) = it.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        out.push(c);
        it.next();
    }
    out
}
