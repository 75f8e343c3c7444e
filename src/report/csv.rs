use super::{
    format_percent, AttendanceReport, ExportInput, ReportError, NO_DATA_MESSAGE,
    SHORT_STAMP_FORMAT, STORE_ERROR_MESSAGE,
};
use crate::escape::html_safe;
use chrono::NaiveDateTime;
use std::io::Write;

pub const CONTENT_TYPE: &str = "text/csv; charset=utf-8";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const DELIMITER: char = ',';
const ENCLOSURE: char = '"';
const ESCAPE: char = '\\';

const HEADER: [&str; 7] = [
    "Student Name",
    "Roll Number",
    "Class",
    "Days Present",
    "Days Absent",
    "Total Days",
    "Attendance Percentage",
];

pub fn render_csv(
    input: &ExportInput<'_>,
    generated_at: NaiveDateTime,
) -> Result<Vec<u8>, ReportError> {
    let mut out: Vec<u8> = Vec::new();
    write_csv(&mut out, input, generated_at)
        .map_err(|e| ReportError::Formatting(e.to_string()))?;
    Ok(out)
}

fn write_csv<W: Write>(
    out: &mut W,
    input: &ExportInput<'_>,
    generated_at: NaiveDateTime,
) -> std::io::Result<()> {
    out.write_all(UTF8_BOM)?;
    let report = match input {
        ExportInput::StoreUnavailable => return write_record(out, &[STORE_ERROR_MESSAGE]),
        ExportInput::Report(r) if r.is_empty() => return write_record(out, &[NO_DATA_MESSAGE]),
        ExportInput::Report(r) => r,
    };

    write_record(out, &HEADER)?;
    write_student_rows(out, report)?;

    let totals = &report.totals;
    write_record::<_, &str>(out, &[])?;
    write_record(out, &["=== SUMMARY STATISTICS ==="])?;
    write_record(out, &["Total Students".to_string(), totals.total_students.to_string()])?;
    write_record(out, &["Total Present Days".to_string(), totals.total_present.to_string()])?;
    write_record(out, &["Total Absent Days".to_string(), totals.total_absent.to_string()])?;
    write_record(
        out,
        &[
            "Overall Attendance Rate".to_string(),
            format_percent(totals.overall_percentage),
        ],
    )?;
    write_record(
        out,
        &[
            "Report Generated".to_string(),
            generated_at.format(SHORT_STAMP_FORMAT).to_string(),
        ],
    )
}

fn write_student_rows<W: Write>(out: &mut W, report: &AttendanceReport) -> std::io::Result<()> {
    for s in &report.students {
        write_record(
            out,
            &[
                html_safe(&s.student_name).trim().to_string(),
                html_safe(&s.roll_no).trim().to_string(),
                html_safe(&s.class).trim().to_string(),
                s.presents.to_string(),
                s.absents.to_string(),
                s.total_classes.to_string(),
                format_percent(s.percentage),
            ],
        )?;
    }
    Ok(())
}

fn write_record<W: Write, S: AsRef<str>>(out: &mut W, fields: &[S]) -> std::io::Result<()> {
    let line = fields
        .iter()
        .map(|f| encode_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(&DELIMITER.to_string());
    out.write_all(line.as_bytes())?;
    out.write_all(b"\n")
}

/// Encloses a field when it holds the delimiter, a quote, the escape
/// character, whitespace control characters or a space. Inside the
/// enclosure a quote is doubled unless the escape character precedes it.
fn encode_field(field: &str) -> String {
    let needs_enclosure = field
        .chars()
        .any(|c| matches!(c, DELIMITER | ENCLOSURE | ESCAPE | '\n' | '\r' | '\t' | ' '));
    if !needs_enclosure {
        return field.to_string();
    }
    let mut out = String::with_capacity(field.len() + 2);
    out.push(ENCLOSURE);
    let mut escaped = false;
    for c in field.chars() {
        if c == ESCAPE {
            escaped = true;
        } else if !escaped && c == ENCLOSURE {
            out.push(ENCLOSURE);
        } else {
            escaped = false;
        }
        out.push(c);
    }
    out.push(ENCLOSURE);
    out
}
