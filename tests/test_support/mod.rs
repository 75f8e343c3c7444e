#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct-horse";

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}-{}",
        prefix,
        std::process::id(),
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_attendanced");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn attendanced");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn send_line(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    raw: &str,
) -> serde_json::Value {
    writeln!(stdin, "{}", raw).expect("write request");
    stdin.flush().expect("flush request");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", raw);
    serde_json::from_str(line.trim()).expect("parse response json")
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    let value = send_line(stdin, reader, &payload.to_string());
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or(serde_json::Value::Null)
}

pub fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

/// Opens `workspace`, creates the bootstrap account and logs in.
/// Returns the session's CSRF token.
pub fn open_and_login(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    workspace: &Path,
) -> String {
    let _ = request_ok(
        stdin,
        reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        stdin,
        reader,
        "reg",
        "auth.register",
        json!({ "username": ADMIN_USER, "password": ADMIN_PASSWORD }),
    );
    let login = request_ok(
        stdin,
        reader,
        "login",
        "auth.login",
        json!({ "username": ADMIN_USER, "password": ADMIN_PASSWORD }),
    );
    login["csrfToken"].as_str().expect("csrf token").to_string()
}

pub fn create_student(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    csrf: &str,
    name: &str,
    roll_no: &str,
    class: &str,
) -> String {
    let created = request_ok(
        stdin,
        reader,
        "student",
        "students.create",
        json!({
            "csrfToken": csrf,
            "studentName": name,
            "rollNo": roll_no,
            "class": class,
        }),
    );
    created["studentId"].as_str().expect("student id").to_string()
}

/// Marks `presents` then `absents` consecutive days from 2024-09-01.
pub fn mark_days(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    csrf: &str,
    student_id: &str,
    presents: u32,
    absents: u32,
) {
    for day in 0..(presents + absents) {
        let status = if day < presents { "Present" } else { "Absent" };
        let date = format!("2024-09-{:02}", day + 1);
        let _ = request_ok(
            stdin,
            reader,
            "mark",
            "attendance.mark",
            json!({
                "csrfToken": csrf,
                "date": date,
                "entries": [{ "studentId": student_id, "status": status }],
            }),
        );
    }
}

/// Minimal CSV reader for exported files: quoted fields with doubled quotes.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for line in text.lines() {
        if line.is_empty() {
            rows.push(Vec::new());
            continue;
        }
        let mut fields = Vec::new();
        let mut cur = String::new();
        let mut quoted = false;
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '"' if quoted && chars.peek() == Some(&'"') => {
                    cur.push('"');
                    chars.next();
                }
                '"' => quoted = !quoted,
                ',' if !quoted => fields.push(std::mem::take(&mut cur)),
                _ => cur.push(c),
            }
        }
        fields.push(cur);
        rows.push(fields);
    }
    rows
}
