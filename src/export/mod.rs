use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::analytics::{AttendanceReportRow, ReportPeriod, summarize};

mod csv;
mod pdf;

pub use csv::{CSV_HEADER, csv_quote, render_csv};
pub use pdf::{LINES_PER_PAGE, escape_text, render_pdf};

/// ExportFormat
///
/// `?format=` value of the export endpoints. Defaults to CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }
}

/// A rendered report ready to stream or upload.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

/// render
///
/// Renders the attendance report for `period` in the requested format. The filename
/// carries the period so archived copies do not collide across ranges.
pub fn render(
    format: ExportFormat,
    rows: &[AttendanceReportRow],
    period: ReportPeriod,
    generated_at: DateTime<Utc>,
) -> ExportedFile {
    let bytes = match format {
        ExportFormat::Csv => render_csv(rows).into_bytes(),
        ExportFormat::Pdf => render_pdf(rows, &summarize(rows), period, generated_at),
    };

    ExportedFile {
        bytes,
        content_type: format.content_type(),
        filename: format!(
            "attendance-report_{}_{}.{}",
            period.from.format("%Y%m%d"),
            period.to.format("%Y%m%d"),
            format.extension()
        ),
    }
}

/// Human-readable distance column shared by both formats.
fn format_distance(distance: Option<f64>) -> String {
    distance.map(|d| format!("{d:.1}")).unwrap_or_default()
}
