use crate::analytics::AttendanceReportRow;

use super::format_distance;

pub const CSV_HEADER: &[&str] = &[
    "attendance_id",
    "session_date",
    "course_code",
    "course_title",
    "class_group",
    "lecturer",
    "session_mode",
    "status",
    "verification_status",
    "distance_meters",
];

/// Quotes a field when it contains a delimiter, a quote or a line break.
pub fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// render_csv
///
/// Header line then one line per row, `\n` terminated.
pub fn render_csv(rows: &[AttendanceReportRow]) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');

    for row in rows {
        let fields = [
            row.attendance_id.to_string(),
            row.session_date.to_string(),
            row.course_code.clone(),
            row.course_title.clone(),
            row.class_group_name.clone(),
            row.lecturer_name.clone(),
            row.session_mode.as_str().to_string(),
            row.status.as_str().to_string(),
            row.verification_status.as_str().to_string(),
            format_distance(row.distance_meters),
        ];
        let line: Vec<String> = fields.iter().map(|f| csv_quote(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }

    out
}
