use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    audit::AuditAction,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{AttendanceRecord, RecordVerificationStatus, Role, VerificationRequestStatus},
    notifications::NotificationKind,
    permissions::Permission,
};

/// VerificationAction
///
/// The four moves of the class-rep / reviewer workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VerificationAction {
    /// Class rep confirms the lecture happened.
    Approve,
    /// Class rep contests the record.
    Dispute,
    /// Reviewer sides with the lecturer.
    Resolve,
    /// Reviewer upholds the dispute.
    Reject,
}

/// Target statuses for the request and its attendance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub request_status: VerificationRequestStatus,
    pub record_status: RecordVerificationStatus,
}

impl VerificationAction {
    /// The only request status this action may start from.
    pub fn required_status(&self) -> VerificationRequestStatus {
        match self {
            VerificationAction::Approve | VerificationAction::Dispute => VerificationRequestStatus::Pending,
            VerificationAction::Resolve | VerificationAction::Reject => VerificationRequestStatus::Disputed,
        }
    }

    pub fn audit_action(&self) -> AuditAction {
        match self {
            VerificationAction::Approve => AuditAction::AttendanceVerified,
            VerificationAction::Dispute => AuditAction::AttendanceDisputed,
            VerificationAction::Resolve => AuditAction::DisputeResolved,
            VerificationAction::Reject => AuditAction::DisputeRejected,
        }
    }

    pub fn notification_kind(&self) -> NotificationKind {
        match self {
            VerificationAction::Approve => NotificationKind::AttendanceVerified,
            VerificationAction::Dispute => NotificationKind::AttendanceDisputed,
            VerificationAction::Resolve => NotificationKind::DisputeResolved,
            VerificationAction::Reject => NotificationKind::DisputeRejected,
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            VerificationAction::Approve => "verified",
            VerificationAction::Dispute => "disputed",
            VerificationAction::Resolve => "resolved in your favour",
            VerificationAction::Reject => "rejected",
        }
    }
}

/// transition
///
/// Pending → approved | disputed (class rep); disputed → resolved | rejected
/// (reviewer). Every other combination is a conflict.
pub fn transition(current: VerificationRequestStatus, action: VerificationAction) -> ApiResult<Transition> {
    if current != action.required_status() {
        return Err(ApiError::Conflict(format!(
            "cannot {} a request that is {}",
            match action {
                VerificationAction::Approve => "approve",
                VerificationAction::Dispute => "dispute",
                VerificationAction::Resolve => "resolve",
                VerificationAction::Reject => "reject",
            },
            current.as_str()
        )));
    }

    let next = match action {
        VerificationAction::Approve => Transition {
            request_status: VerificationRequestStatus::Approved,
            record_status: RecordVerificationStatus::Verified,
        },
        VerificationAction::Dispute => Transition {
            request_status: VerificationRequestStatus::Disputed,
            record_status: RecordVerificationStatus::Disputed,
        },
        VerificationAction::Resolve => Transition {
            request_status: VerificationRequestStatus::Resolved,
            record_status: RecordVerificationStatus::Verified,
        },
        VerificationAction::Reject => Transition {
            request_status: VerificationRequestStatus::Rejected,
            record_status: RecordVerificationStatus::Rejected,
        },
    };
    Ok(next)
}

/// authorize
///
/// Approve/dispute belong to the class rep of the record's class group (admins may
/// stand in). Resolve/reject need `ResolveDisputes`; coordinators only inside their
/// own programme, which the caller passes as `record_programme_id`.
pub fn authorize(
    actor: &AuthUser,
    action: VerificationAction,
    record: &AttendanceRecord,
    record_programme_id: Option<uuid::Uuid>,
) -> ApiResult<()> {
    match action {
        VerificationAction::Approve | VerificationAction::Dispute => {
            actor.require(Permission::VerifyAttendance)?;
            if record.lecturer_id == actor.id {
                return Err(ApiError::Forbidden("you cannot verify your own record".to_string()));
            }
            if actor.role == Role::Admin {
                return Ok(());
            }
            if actor.class_group_id != Some(record.class_group_id) {
                return Err(ApiError::Forbidden(
                    "only the class representative of this class group can verify it".to_string(),
                ));
            }
            Ok(())
        }
        VerificationAction::Resolve | VerificationAction::Reject => {
            actor.require(Permission::ResolveDisputes)?;
            if actor.role == Role::Coordinator && actor.programme_id.is_some() && actor.programme_id != record_programme_id {
                return Err(ApiError::Forbidden(
                    "coordinators can only resolve disputes in their own programme".to_string(),
                ));
            }
            Ok(())
        }
    }
}
