mod test_support;

use serde_json::json;
use test_support::{
    create_student, error_code, open_and_login, request, request_ok, spawn_sidecar, temp_dir,
};

#[test]
fn setup_defaults_and_validated_updates() {
    let workspace = temp_dir("attendance-setup");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let csrf = open_and_login(&mut stdin, &mut reader, &workspace);

    let initial = request_ok(&mut stdin, &mut reader, "1", "setup.get", json!({}));
    assert_eq!(initial["reports"]["appName"], "Attendance Management System");
    assert_eq!(initial["reports"]["rollNumberOrder"], "lexical");
    assert_eq!(initial["printer"]["marginMm"], 15);
    assert_eq!(initial["printer"]["bottomMarginMm"], 25);

    let no_token = request(
        &mut stdin,
        &mut reader,
        "2",
        "setup.update",
        json!({ "section": "printer", "patch": { "marginMm": 20 } }),
    );
    assert_eq!(error_code(&no_token), Some("csrf_failed"));

    let out_of_range = request(
        &mut stdin,
        &mut reader,
        "3",
        "setup.update",
        json!({ "csrfToken": csrf, "section": "printer", "patch": { "marginMm": 99 } }),
    );
    assert_eq!(error_code(&out_of_range), Some("bad_params"));

    let unknown_field = request(
        &mut stdin,
        &mut reader,
        "4",
        "setup.update",
        json!({ "csrfToken": csrf, "section": "reports", "patch": { "theme": "dark" } }),
    );
    assert_eq!(error_code(&unknown_field), Some("bad_params"));

    let unknown_section = request(
        &mut stdin,
        &mut reader,
        "5",
        "setup.update",
        json!({ "csrfToken": csrf, "section": "email", "patch": {} }),
    );
    assert_eq!(error_code(&unknown_section), Some("bad_params"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "setup.update",
        json!({
            "csrfToken": csrf,
            "section": "printer",
            "patch": { "marginMm": 20, "fontScale": 90 }
        }),
    );
    let after = request_ok(&mut stdin, &mut reader, "7", "setup.get", json!({}));
    assert_eq!(after["printer"]["marginMm"], 20);
    assert_eq!(after["printer"]["fontScale"], 90);
    assert_eq!(after["printer"]["bottomMarginMm"], 25);
}

#[test]
fn natural_roll_order_changes_report_ordering() {
    let workspace = temp_dir("attendance-roll-order");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let csrf = open_and_login(&mut stdin, &mut reader, &workspace);
    for roll in ["10", "9", "2"] {
        let _ = create_student(&mut stdin, &mut reader, &csrf, &format!("R{}", roll), roll, "7A");
    }

    let rolls = |model: &serde_json::Value| -> Vec<String> {
        model["rows"]
            .as_array()
            .expect("rows")
            .iter()
            .map(|r| r["rollNo"].as_str().expect("roll").to_string())
            .collect()
    };

    let lexical = request_ok(&mut stdin, &mut reader, "1", "reports.attendanceModel", json!({}));
    assert_eq!(rolls(&lexical), vec!["10", "2", "9"]);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "setup.update",
        json!({ "csrfToken": csrf, "section": "reports", "patch": { "rollNumberOrder": "natural" } }),
    );
    let natural = request_ok(&mut stdin, &mut reader, "3", "reports.attendanceModel", json!({}));
    assert_eq!(rolls(&natural), vec!["2", "9", "10"]);
    assert_eq!(natural["totals"]["totalStudents"], 3);
    assert_eq!(natural["classes"][0]["class"], "7A");
    assert_eq!(natural["classes"][0]["studentCount"], 3);
}
