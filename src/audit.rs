use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{DateTime, Timelike, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::repository::{NewAuditLog, RepositoryState};

/// AuditAction
///
/// Every action written to the audit trail. The stored name is SCREAMING_SNAKE so the
/// risk keywords below can be matched against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    UserCreated,
    UserUpdated,
    RoleChanged,
    UserDeactivated,
    LecturerProfileCreated,
    ProgrammeCreated,
    ProgrammeUpdated,
    ProgrammeDeleted,
    ClassGroupCreated,
    ClassGroupDeleted,
    CourseCreated,
    CourseUpdated,
    CourseDeleted,
    ScheduleCreated,
    ScheduleUpdated,
    ScheduleDeleted,
    AttendanceSubmitted,
    LocationCheckFailed,
    VirtualCheckFailed,
    AttendanceVerified,
    AttendanceDisputed,
    DisputeResolved,
    DisputeRejected,
    ReportExported,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserCreated => "USER_CREATED",
            AuditAction::UserUpdated => "USER_UPDATED",
            AuditAction::RoleChanged => "ROLE_CHANGED",
            AuditAction::UserDeactivated => "USER_DEACTIVATED",
            AuditAction::LecturerProfileCreated => "LECTURER_PROFILE_CREATED",
            AuditAction::ProgrammeCreated => "PROGRAMME_CREATED",
            AuditAction::ProgrammeUpdated => "PROGRAMME_UPDATED",
            AuditAction::ProgrammeDeleted => "PROGRAMME_DELETED",
            AuditAction::ClassGroupCreated => "CLASS_GROUP_CREATED",
            AuditAction::ClassGroupDeleted => "CLASS_GROUP_DELETED",
            AuditAction::CourseCreated => "COURSE_CREATED",
            AuditAction::CourseUpdated => "COURSE_UPDATED",
            AuditAction::CourseDeleted => "COURSE_DELETED",
            AuditAction::ScheduleCreated => "SCHEDULE_CREATED",
            AuditAction::ScheduleUpdated => "SCHEDULE_UPDATED",
            AuditAction::ScheduleDeleted => "SCHEDULE_DELETED",
            AuditAction::AttendanceSubmitted => "ATTENDANCE_SUBMITTED",
            AuditAction::LocationCheckFailed => "LOCATION_CHECK_FAILED",
            AuditAction::VirtualCheckFailed => "VIRTUAL_CHECK_FAILED",
            AuditAction::AttendanceVerified => "ATTENDANCE_VERIFIED",
            AuditAction::AttendanceDisputed => "ATTENDANCE_DISPUTED",
            AuditAction::DisputeResolved => "DISPUTE_RESOLVED",
            AuditAction::DisputeRejected => "DISPUTE_REJECTED",
            AuditAction::ReportExported => "REPORT_EXPORTED",
        }
    }
}

/// Points added to the base score when the action name contains the keyword.
pub const RISK_KEYWORDS: &[(&str, i16)] = &[
    ("DELETE", 4),
    ("ROLE", 3),
    ("DEACTIVATE", 3),
    ("FAILED", 3),
    ("EXPORT", 2),
    ("DISPUTE", 2),
    ("REJECT", 2),
    ("CREATE", 1),
    ("UPDATE", 1),
];

pub const MIN_RISK: i16 = 1;
pub const MAX_RISK: i16 = 10;

/// Circumstances of an action that raise its risk beyond the action itself.
#[derive(Debug, Clone, Copy)]
pub struct RiskContext {
    pub at: DateTime<Utc>,
    pub bulk: bool,
}

/// risk_score
///
/// Base 1, plus every matching keyword, plus 1 outside 06:00-22:00 UTC, plus 2 for
/// bulk operations. Clamped to [1, 10].
pub fn risk_score(action: &str, context: &RiskContext) -> i16 {
    let action = action.to_ascii_uppercase();

    let keyword_points: i16 = RISK_KEYWORDS
        .iter()
        .filter(|(keyword, _)| action.contains(keyword))
        .map(|(_, points)| *points)
        .sum();

    let hour = context.at.hour();
    let off_hours = if !(6..22).contains(&hour) { 1 } else { 0 };
    let bulk = if context.bulk { 2 } else { 0 };

    (MIN_RISK + keyword_points + off_hours + bulk).clamp(MIN_RISK, MAX_RISK)
}

/// AuditEntry
///
/// What a handler wants recorded; `record` fills in the score and timestamp.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub actor: Option<Uuid>,
    pub action: AuditAction,
    pub entity_type: &'static str,
    pub entity_id: Option<Uuid>,
    pub details: Value,
    pub ip_address: Option<String>,
    pub bulk: bool,
}

impl AuditEntry {
    pub fn new(actor: Uuid, action: AuditAction, entity_type: &'static str, entity_id: Option<Uuid>) -> Self {
        Self {
            actor: Some(actor),
            action,
            entity_type,
            entity_id,
            details: Value::Object(Default::default()),
            ip_address: None,
            bulk: false,
        }
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn ip(mut self, ClientIp(ip): &ClientIp) -> Self {
        self.ip_address = ip.clone();
        self
    }
}

/// record
///
/// Writes an audit entry. Audit failures are logged and never fail the request
/// that triggered them.
pub async fn record(repo: &RepositoryState, entry: AuditEntry) {
    let context = RiskContext {
        at: Utc::now(),
        bulk: entry.bulk,
    };
    let action = entry.action.as_str();
    let score = risk_score(action, &context);

    let log = NewAuditLog {
        user_id: entry.actor,
        action: action.to_string(),
        entity_type: entry.entity_type.to_string(),
        entity_id: entry.entity_id,
        details: entry.details,
        ip_address: entry.ip_address,
        risk_score: score,
    };

    if let Err(e) = repo.insert_audit_log(log).await {
        tracing::error!(action, error = ?e, "failed to write audit log");
    } else if score >= 7 {
        tracing::warn!(action, risk_score = score, "high-risk action recorded");
    }
}

/// ClientIp
///
/// The caller's address as reported by the reverse proxy (`x-forwarded-for`, first
/// hop, then `x-real-ip`). Never rejects.
#[derive(Debug, Clone, Default)]
pub struct ClientIp(pub Option<String>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let ip = forwarded.or_else(|| {
            parts
                .headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        });

        Ok(ClientIp(ip))
    }
}
