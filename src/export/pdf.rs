use chrono::{DateTime, Utc};

use crate::analytics::{AttendanceReportRow, AttendanceSummary, ReportPeriod};

use super::format_distance;

// A4 portrait in points.
const PAGE_WIDTH: u32 = 595;
const PAGE_HEIGHT: u32 = 842;
const MARGIN: u32 = 50;
const FONT_SIZE: u32 = 9;
const TITLE_SIZE: u32 = 14;
const LEADING: u32 = 14;
// Longest line that fits between the margins at FONT_SIZE in Helvetica.
const MAX_LINE_CHARS: usize = 105;

/// Text lines that fit on one page between the top and bottom margins.
pub const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;

/// render_pdf
///
/// A self-contained PDF 1.4 document: one Helvetica font, A4 pages, a title block
/// with the period and summary, then one line per attendance record.
pub fn render_pdf(
    rows: &[AttendanceReportRow],
    summary: &AttendanceSummary,
    period: ReportPeriod,
    generated_at: DateTime<Utc>,
) -> Vec<u8> {
    let lines = report_lines(rows, summary, period, generated_at);
    // The title block guarantees at least one line, so at least one page.
    let pages: Vec<&[String]> = lines.chunks(LINES_PER_PAGE).collect();

    // Object layout: 1 catalog, 2 page tree, 3 font, then (page, content) pairs.
    let page_ids: Vec<usize> = (0..pages.len()).map(|i| 4 + 2 * i).collect();
    let mut objects: Vec<Vec<u8>> = Vec::with_capacity(3 + 2 * pages.len());

    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());

    let kids = page_ids
        .iter()
        .map(|id| format!("{id} 0 R"))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push(format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", pages.len()).into_bytes());

    objects.push(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_vec(),
    );

    for (index, page_lines) in pages.iter().enumerate() {
        let content_id = page_ids[index] + 1;
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {content_id} 0 R >>"
            )
            .into_bytes(),
        );

        let stream = page_stream(page_lines, index == 0, index + 1, pages.len());
        let mut content = format!("<< /Length {} >>\nstream\n", stream.len()).into_bytes();
        content.extend_from_slice(stream.as_bytes());
        content.extend_from_slice(b"\nendstream");
        objects.push(content);
    }

    assemble(&objects)
}

/// Serializes numbered objects with a cross-reference table. Each xref entry is
/// exactly 20 bytes, as readers seek by fixed width.
fn assemble(objects: &[Vec<u8>]) -> Vec<u8> {
    let mut out: Vec<u8> = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());

    for (index, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_offset = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    out
}

fn page_stream(lines: &[String], first_page: bool, page_number: usize, page_count: usize) -> String {
    let top = PAGE_HEIGHT - MARGIN;
    let mut stream = format!("BT\n/F1 {FONT_SIZE} Tf\n{LEADING} TL\n{MARGIN} {top} Td\n");

    for (i, line) in lines.iter().enumerate() {
        if first_page && i == 0 {
            stream.push_str(&format!(
                "/F1 {TITLE_SIZE} Tf ({}) Tj T* /F1 {FONT_SIZE} Tf\n",
                escape_text(line)
            ));
        } else {
            stream.push_str(&format!("({}) Tj T*\n", escape_text(line)));
        }
    }
    stream.push_str("ET\n");

    // Footer
    stream.push_str(&format!(
        "BT\n/F1 {FONT_SIZE} Tf\n{} {} Td\n(Page {page_number} of {page_count}) Tj\nET",
        PAGE_WIDTH - MARGIN - 60,
        MARGIN / 2
    ));
    stream
}

fn report_lines(
    rows: &[AttendanceReportRow],
    summary: &AttendanceSummary,
    period: ReportPeriod,
    generated_at: DateTime<Utc>,
) -> Vec<String> {
    let mut lines = vec![
        "Lecture Attendance Report".to_string(),
        format!("Period: {} to {}", period.from, period.to),
        format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M UTC")),
        String::new(),
        format!(
            "Sessions: {}   Present: {}   Late: {}   Physical: {}   Virtual: {}",
            summary.total_sessions, summary.present, summary.late, summary.physical, summary.virtual_sessions
        ),
        format!(
            "Verified: {}   Pending: {}   Disputed: {}   Rejected: {}",
            summary.verified, summary.pending, summary.disputed, summary.rejected
        ),
        format!(
            "Verification rate: {:.1}%   Punctuality rate: {:.1}%",
            summary.verification_rate * 100.0,
            summary.punctuality_rate * 100.0
        ),
        String::new(),
        format!(
            "{:<10}  {:<10}  {:<16}  {:<22}  {:<8}  {:<7}  {:<9}  {}",
            "Date", "Course", "Class group", "Lecturer", "Mode", "Status", "Verified", "Dist (m)"
        ),
    ];

    if rows.is_empty() {
        lines.push("No attendance records in this period.".to_string());
    }

    for row in rows {
        lines.push(format!(
            "{:<10}  {:<10}  {:<16}  {:<22}  {:<8}  {:<7}  {:<9}  {}",
            row.session_date.to_string(),
            clip(&row.course_code, 10),
            clip(&row.class_group_name, 16),
            clip(&row.lecturer_name, 22),
            row.session_mode.as_str(),
            row.status.as_str(),
            row.verification_status.as_str(),
            format_distance(row.distance_meters)
        ));
    }

    lines.into_iter().map(|l| clip(&l, MAX_LINE_CHARS)).collect()
}

fn clip(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        value.chars().take(max.saturating_sub(1)).chain(['~']).collect()
    }
}

/// escape_text
///
/// Makes a string safe inside a PDF literal `( )`. Characters outside printable
/// ASCII are replaced with `?`, since the font uses a single-byte encoding.
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            ' '..='~' => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}
