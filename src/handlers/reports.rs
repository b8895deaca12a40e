use std::collections::{HashMap, HashSet};

use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    analytics::{
        AttendanceReportRow, AttendanceSummary, CourseStat, LecturerStat, REPORT_YEARS, ReportPeriod, TrendPoint,
        by_course, by_lecturer, summarize, weekly_trend,
    },
    attendance::campus_today,
    audit::{self, AuditAction, AuditEntry, ClientIp},
    auth::AuthUser,
    error::{ApiError, ApiResult},
    export::{ExportFormat, ExportedFile, render},
    models::{ArchivedReportResponse, Role},
    permissions::Permission,
    repository::{AttendanceFilter, ScheduleFilter},
};

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct ReportQuery {
    /// First day of the period (default: 30 days before `to`).
    #[param(value_type = Option<String>, example = "2025-09-01")]
    pub from: Option<NaiveDate>,
    /// Last day of the period (default: today on campus).
    #[param(value_type = Option<String>, example = "2025-09-30")]
    pub to: Option<NaiveDate>,
    pub course_id: Option<Uuid>,
    pub class_group_id: Option<Uuid>,
    pub lecturer_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct ExportQuery {
    #[param(value_type = Option<String>, example = "2025-09-01")]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>, example = "2025-09-30")]
    pub to: Option<NaiveDate>,
    pub course_id: Option<Uuid>,
    pub class_group_id: Option<Uuid>,
    pub lecturer_id: Option<Uuid>,
    /// `csv` (default) or `pdf`.
    #[serde(default)]
    #[param(value_type = Option<String>, example = "csv")]
    pub format: ExportFormat,
}

impl ExportQuery {
    fn report(&self) -> ReportQuery {
        ReportQuery {
            from: self.from,
            to: self.to,
            course_id: self.course_id,
            class_group_id: self.class_group_id,
            lecturer_id: self.lecturer_id,
        }
    }
}

/// Coordinators only report on their own programme.
fn report_programme(user: &AuthUser) -> Option<Uuid> {
    if user.role == Role::Coordinator {
        user.programme_id
    } else {
        None
    }
}

/// Resolves the period and loads the rows a report is computed from.
async fn load_rows(
    state: &AppState,
    user: &AuthUser,
    query: &ReportQuery,
) -> ApiResult<(ReportPeriod, Vec<AttendanceReportRow>)> {
    let today = campus_today(Utc::now(), state.config.campus_utc_offset_minutes);
    let period = ReportPeriod::resolve(query.from, query.to, today);
    if !period.is_supported() {
        return Err(ApiError::Validation(format!(
            "report dates must fall between the years {} and {}",
            REPORT_YEARS.start(),
            REPORT_YEARS.end()
        )));
    }

    let rows = state
        .repo
        .attendance_report_rows(AttendanceFilter {
            schedule_id: None,
            lecturer_id: query.lecturer_id,
            course_id: query.course_id,
            class_group_id: query.class_group_id,
            programme_id: report_programme(user),
            verification_status: None,
            from: Some(period.from),
            to: Some(period.to),
        })
        .await?;
    Ok((period, rows))
}

#[utoipa::path(
    get,
    path = "/reports/summary",
    params(ReportQuery),
    responses(
        (status = 200, description = "Totals for the period", body = AttendanceSummary),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn summary(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<AttendanceSummary>> {
    user.require(Permission::ViewReports)?;
    let (_, rows) = load_rows(&state, &user, &query).await?;
    Ok(Json(summarize(&rows)))
}

/// lecturers
///
/// Compliance per lecturer: delivered sessions against the weekday occurrences of
/// their active schedules inside the period. The schedule side honours the same
/// course, class group, lecturer and programme filters as the rows.
#[utoipa::path(
    get,
    path = "/reports/lecturers",
    params(ReportQuery),
    responses(
        (status = 200, description = "Per-lecturer compliance", body = [LecturerStat]),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn lecturers(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<Vec<LecturerStat>>> {
    user.require(Permission::ViewReports)?;
    let (period, rows) = load_rows(&state, &user, &query).await?;

    let mut schedules = state
        .repo
        .list_schedules(ScheduleFilter {
            lecturer_id: query.lecturer_id,
            class_group_id: query.class_group_id,
            course_id: query.course_id,
            day_of_week: None,
            active_only: true,
        })
        .await?;

    if let Some(programme_id) = report_programme(&user) {
        let courses: HashSet<Uuid> = state
            .repo
            .list_courses(Some(programme_id))
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        schedules.retain(|s| courses.contains(&s.course_id));
    }

    let names: HashMap<Uuid, String> = state
        .repo
        .list_users(Some(Role::Lecturer))
        .await?
        .into_iter()
        .map(|u| (u.id, u.full_name))
        .collect();

    Ok(Json(by_lecturer(&rows, &schedules, &names, period)))
}

#[utoipa::path(
    get,
    path = "/reports/courses",
    params(ReportQuery),
    responses(
        (status = 200, description = "Per-course totals", body = [CourseStat]),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn courses(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<Vec<CourseStat>>> {
    user.require(Permission::ViewReports)?;
    let (_, rows) = load_rows(&state, &user, &query).await?;
    Ok(Json(by_course(&rows)))
}

#[utoipa::path(
    get,
    path = "/reports/trend",
    params(ReportQuery),
    responses(
        (status = 200, description = "Weekly buckets, oldest first", body = [TrendPoint]),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn trend(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<Vec<TrendPoint>>> {
    user.require(Permission::ViewReports)?;
    let (_, rows) = load_rows(&state, &user, &query).await?;
    Ok(Json(weekly_trend(&rows)))
}

/// A rendered export and what it covered.
struct RenderedReport {
    file: ExportedFile,
    period: ReportPeriod,
    rows: usize,
}

async fn build_export(state: &AppState, user: &AuthUser, query: &ExportQuery) -> ApiResult<RenderedReport> {
    user.require(Permission::ExportReports)?;
    let (period, rows) = load_rows(state, user, &query.report()).await?;
    let file = render(query.format, &rows, period, Utc::now());
    Ok(RenderedReport {
        file,
        period,
        rows: rows.len(),
    })
}

/// Audits an export once it has been delivered. `resource_key` is set for archives.
async fn record_export(
    state: &AppState,
    user: &AuthUser,
    ip: &ClientIp,
    format: ExportFormat,
    report: &RenderedReport,
    resource_key: Option<&str>,
) {
    tracing::info!(
        user_id = %user.id,
        format = format.extension(),
        rows = report.rows,
        bytes = report.file.bytes.len(),
        archived = resource_key.is_some(),
        "report exported"
    );
    audit::record(
        &state.repo,
        AuditEntry::new(user.id, AuditAction::ReportExported, "report", None)
            .details(json!({
                "format": format,
                "rows": report.rows,
                "from": report.period.from,
                "to": report.period.to,
                "archived": resource_key.is_some(),
                "resource_key": resource_key,
            }))
            .ip(ip),
    )
    .await;
}

/// export
///
/// Streams the attendance report as a CSV or PDF attachment.
#[utoipa::path(
    get,
    path = "/reports/export",
    params(ExportQuery),
    responses(
        (status = 200, description = "Report file, text/csv or application/pdf"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn export(
    user: AuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let report = build_export(&state, &user, &query).await?;
    record_export(&state, &user, &ip, query.format, &report, None).await;

    let file = report.file;
    let disposition = format!("attachment; filename=\"{}\"", file.filename);

    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

/// archive
///
/// Renders the export, stores it under `reports/{user_id}/` and returns a presigned
/// download link.
#[utoipa::path(
    post,
    path = "/reports/archive",
    params(ExportQuery),
    responses(
        (status = 201, description = "Report archived", body = ArchivedReportResponse),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn archive(
    user: AuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<(StatusCode, Json<ArchivedReportResponse>)> {
    let report = build_export(&state, &user, &query).await?;
    let resource_key = format!(
        "reports/{}/{}_{}",
        user.id,
        Utc::now().format("%Y%m%dT%H%M%S"),
        report.file.filename
    );

    state
        .storage
        .put_object(&resource_key, report.file.bytes.clone(), report.file.content_type)
        .await
        .map_err(ApiError::Storage)?;
    record_export(&state, &user, &ip, query.format, &report, Some(&resource_key)).await;

    let download_url = state
        .storage
        .get_presigned_download_url(&resource_key)
        .await
        .map_err(ApiError::Storage)?;

    Ok((
        StatusCode::CREATED,
        Json(ArchivedReportResponse {
            resource_key,
            download_url,
        }),
    ))
}
