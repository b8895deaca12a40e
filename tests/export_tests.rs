use attendance_portal::{
    analytics::{AttendanceReportRow, ReportPeriod},
    export::{CSV_HEADER, ExportFormat, LINES_PER_PAGE, csv_quote, escape_text, render, render_csv},
    models::{AttendanceStatus, RecordVerificationStatus, SessionMode},
};
use chrono::{NaiveDate, TimeZone, Utc};
use uuid::Uuid;

fn period() -> ReportPeriod {
    ReportPeriod {
        from: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
        to: NaiveDate::from_ymd_opt(2025, 9, 30).unwrap(),
    }
}

fn sample_row(course_title: &str, lecturer_name: &str) -> AttendanceReportRow {
    AttendanceReportRow {
        attendance_id: Uuid::new_v4(),
        session_date: NaiveDate::from_ymd_opt(2025, 9, 15).unwrap(),
        course_id: Uuid::new_v4(),
        course_code: "CSC201".to_string(),
        course_title: course_title.to_string(),
        class_group_id: Uuid::new_v4(),
        class_group_name: "CS Year 2".to_string(),
        lecturer_id: Uuid::new_v4(),
        lecturer_name: lecturer_name.to_string(),
        session_mode: SessionMode::Physical,
        status: AttendanceStatus::Late,
        verification_status: RecordVerificationStatus::Verified,
        distance_meters: Some(123.456),
    }
}

// --- CSV ---

#[test]
fn test_csv_quote_rules() {
    assert_eq!(csv_quote("plain"), "plain");
    assert_eq!(csv_quote("a,b"), "\"a,b\"");
    assert_eq!(csv_quote("say \"hi\""), "\"say \"\"hi\"\"\"");
    assert_eq!(csv_quote("line\nbreak"), "\"line\nbreak\"");
    assert_eq!(csv_quote("carriage\rreturn"), "\"carriage\rreturn\"");
    assert_eq!(csv_quote(""), "");
}

#[test]
fn test_render_csv_header_only_for_no_rows() {
    let csv = render_csv(&[]);
    assert_eq!(csv, format!("{}\n", CSV_HEADER.join(",")));
}

#[test]
fn test_render_csv_row_layout() {
    let row = sample_row("Data Structures, Part 1", "Dr. \"Kofi\" Mensah");
    let csv = render_csv(std::slice::from_ref(&row));
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[1],
        format!(
            "{},2025-09-15,CSC201,\"Data Structures, Part 1\",CS Year 2,\"Dr. \"\"Kofi\"\" Mensah\",physical,late,verified,123.5",
            row.attendance_id
        )
    );
    assert!(csv.ends_with('\n'));
}

// --- PDF ---

#[test]
fn test_escape_text() {
    assert_eq!(escape_text("a (b) \\ c"), "a \\(b\\) \\\\ c");
    assert_eq!(escape_text("Kwamé"), "Kwam?");
}

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

/// Follows `startxref` and every xref entry, checking each lands on the object it names.
fn assert_valid_xref(pdf: &[u8]) {
    let marker = b"startxref\n";
    let start = pdf
        .windows(marker.len())
        .rposition(|w| w == marker)
        .unwrap();
    let tail = std::str::from_utf8(&pdf[start + marker.len()..]).unwrap();
    let xref_offset: usize = tail.lines().next().unwrap().trim().parse().unwrap();
    assert!(pdf[xref_offset..].starts_with(b"xref\n"), "startxref must point at the xref table");

    // Everything after the binary comment line is ASCII.
    let table = std::str::from_utf8(&pdf[xref_offset..]).unwrap();
    let mut lines = table.lines().skip(1);
    let header = lines.next().unwrap();
    let size: usize = header.split_whitespace().nth(1).unwrap().parse().unwrap();
    lines.next(); // free entry 0

    for object_number in 1..size {
        let entry = lines.next().unwrap();
        let offset: usize = entry[..10].parse().unwrap();
        let expected = format!("{object_number} 0 obj");
        assert!(
            pdf[offset..].starts_with(expected.as_bytes()),
            "xref entry {object_number} points at the wrong byte"
        );
    }
}

#[test]
fn test_render_pdf_structure() {
    let rows = vec![sample_row("Data Structures", "Dr. Mensah")];
    let generated = Utc.with_ymd_and_hms(2025, 10, 1, 8, 30, 0).unwrap();
    let file = render(ExportFormat::Pdf, &rows, period(), generated);

    assert_eq!(file.content_type, "application/pdf");
    assert_eq!(file.filename, "attendance-report_20250901_20250930.pdf");
    assert!(file.bytes.starts_with(b"%PDF-1.4"));
    assert!(file.bytes.ends_with(b"%%EOF\n"));
    assert_eq!(count(&file.bytes, b"/BaseFont /Helvetica"), 1);
    assert_eq!(count(&file.bytes, b"/Type /Page /Parent"), 1);
    assert_eq!(count(&file.bytes, b"(Lecture Attendance Report)"), 1);
    assert_eq!(count(&file.bytes, b"(Generated: 2025-10-01 08:30 UTC)"), 1);
    assert_eq!(count(&file.bytes, b"(Page 1 of 1)"), 1);
    assert_valid_xref(&file.bytes);
}

#[test]
fn test_render_pdf_paginates() {
    let rows: Vec<AttendanceReportRow> = (0..LINES_PER_PAGE * 2)
        .map(|i| sample_row(&format!("Course {i}"), "Dr. Mensah"))
        .collect();
    let file = render(ExportFormat::Pdf, &rows, period(), Utc::now());

    // Nine title-block lines plus one per row.
    let expected_pages = (rows.len() + 9).div_ceil(LINES_PER_PAGE);
    assert_eq!(count(&file.bytes, b"/Type /Page /Parent"), expected_pages);
    assert_eq!(
        count(&file.bytes, format!("/Count {expected_pages}").as_bytes()),
        1
    );
    assert_eq!(
        count(&file.bytes, format!("(Page {expected_pages} of {expected_pages})").as_bytes()),
        1
    );
    assert_valid_xref(&file.bytes);
}

#[test]
fn test_render_pdf_without_rows() {
    let file = render(ExportFormat::Pdf, &[], period(), Utc::now());
    assert_eq!(count(&file.bytes, b"(No attendance records in this period.)"), 1);
    assert_valid_xref(&file.bytes);
}

#[test]
fn test_render_csv_export_metadata() {
    let file = render(ExportFormat::Csv, &[], period(), Utc::now());
    assert_eq!(file.content_type, "text/csv; charset=utf-8");
    assert_eq!(file.filename, "attendance-report_20250901_20250930.csv");
    assert_eq!(ExportFormat::default(), ExportFormat::Csv);
}
