use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::record_programme;
use crate::{
    AppState,
    audit::{self, AuditEntry, ClientIp},
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{
        AttendanceRecord, DisputeRequest, ReviewDecisionRequest, Role, VerificationRequest,
        VerificationRequestStatus,
    },
    notifications::{NotificationKind, notify, notify_many},
    permissions::Permission,
    repository::{VerificationDecision, VerificationFilter},
    verification::{VerificationAction, authorize, transition},
};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct VerificationListQuery {
    pub status: Option<VerificationRequestStatus>,
}

/// Reviewers see every request (coordinators their programme's), class reps their
/// group's and everyone else the requests about their own records.
fn verification_scope(user: &AuthUser, status: Option<VerificationRequestStatus>) -> ApiResult<VerificationFilter> {
    let mut filter = VerificationFilter {
        status,
        ..VerificationFilter::default()
    };

    if user.can(Permission::ResolveDisputes) {
        if user.role == Role::Coordinator {
            filter.programme_id = user.programme_id;
        }
        return Ok(filter);
    }

    match user.role {
        Role::ClassRep => {
            let group = user
                .class_group_id
                .ok_or_else(|| ApiError::Forbidden("class rep is not assigned to a class group".to_string()))?;
            filter.class_group_id = Some(group);
        }
        _ => filter.lecturer_id = Some(user.id),
    }
    Ok(filter)
}

fn can_view_request(user: &AuthUser, record: &AttendanceRecord, programme_id: Option<Uuid>) -> bool {
    if user.can(Permission::ResolveDisputes) {
        return !(user.role == Role::Coordinator
            && user.programme_id.is_some()
            && user.programme_id != programme_id);
    }
    match user.role {
        Role::ClassRep => user.class_group_id == Some(record.class_group_id),
        _ => record.lecturer_id == user.id,
    }
}

/// Loads a request together with the record it is about.
async fn load(state: &AppState, id: Uuid) -> ApiResult<(VerificationRequest, AttendanceRecord)> {
    let request = state
        .repo
        .get_verification_request(id)
        .await?
        .ok_or_else(|| ApiError::not_found("verification request"))?;
    let record = state
        .repo
        .get_attendance(request.attendance_id)
        .await?
        .ok_or_else(|| ApiError::not_found("attendance record"))?;
    Ok((request, record))
}

#[utoipa::path(
    get,
    path = "/verification-requests",
    params(VerificationListQuery),
    responses((status = 200, description = "Verification requests in scope", body = [VerificationRequest]))
)]
pub async fn list_verification_requests(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<VerificationListQuery>,
) -> ApiResult<Json<Vec<VerificationRequest>>> {
    let filter = verification_scope(&user, query.status)?;
    Ok(Json(state.repo.list_verification_requests(filter).await?))
}

#[utoipa::path(
    get,
    path = "/verification-requests/{id}",
    responses(
        (status = 200, description = "Verification request", body = VerificationRequest),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_verification_request(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<VerificationRequest>> {
    let (request, record) = load(&state, id).await?;
    let programme_id = record_programme(&state.repo, &record).await?;
    if !can_view_request(&user, &record, programme_id) {
        return Err(ApiError::not_found("verification request"));
    }
    Ok(Json(request))
}

/// decide
///
/// Shared body of the four workflow endpoints. The status update is conditional on
/// the request still being in the state we read, so two concurrent decisions cannot
/// both win; the loser gets a 409.
async fn decide(
    state: &AppState,
    user: &AuthUser,
    ip: &ClientIp,
    id: Uuid,
    action: VerificationAction,
    comment: Option<String>,
    dispute_reason: Option<String>,
) -> ApiResult<VerificationRequest> {
    let (request, record) = load(state, id).await?;
    let programme_id = record_programme(&state.repo, &record).await?;
    authorize(user, action, &record, programme_id)?;

    let dispute_reason = dispute_reason.map(|r| r.trim().to_string());
    if action == VerificationAction::Dispute && dispute_reason.as_deref().is_none_or(str::is_empty) {
        return Err(ApiError::Validation("a dispute needs a reason".to_string()));
    }
    let comment = comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());

    let next = transition(request.status, action)?;
    let updated = state
        .repo
        .apply_verification_decision(VerificationDecision {
            request_id: request.id,
            expected_status: request.status,
            request_status: next.request_status,
            record_status: next.record_status,
            reviewer_id: user.id,
            reviewer_comment: comment.clone(),
            dispute_reason: dispute_reason.clone(),
        })
        .await?
        .ok_or_else(|| ApiError::Conflict("the request was decided by someone else in the meantime".to_string()))?;

    tracing::info!(
        request_id = %updated.id,
        attendance_id = %record.id,
        actor_id = %user.id,
        status = updated.status.as_str(),
        "verification decision recorded"
    );

    let link = Some(format!("/verification-requests/{}", updated.id));
    notify(
        &state.repo,
        record.lecturer_id,
        action.notification_kind(),
        format!("Attendance {}", action.past_tense()),
        format!(
            "Your attendance for the session on {} was {}.",
            record.session_date,
            action.past_tense()
        ),
        link.clone(),
    )
    .await;

    if action == VerificationAction::Dispute {
        let reviewers = dispute_reviewers(state, programme_id).await?;
        let message = format!(
            "A class representative disputed the session on {}: {}",
            record.session_date,
            dispute_reason.as_deref().unwrap_or_default()
        );
        notify_many(
            &state.repo,
            reviewers,
            NotificationKind::DisputeRaised,
            "Attendance dispute raised",
            &message,
            link,
        )
        .await;
    }

    audit::record(
        &state.repo,
        AuditEntry::new(user.id, action.audit_action(), "verification_request", Some(updated.id))
            .details(json!({
                "attendance_id": record.id,
                "from": request.status,
                "to": updated.status,
                "reason": dispute_reason,
                "comment": comment,
            }))
            .ip(ip),
    )
    .await;

    Ok(updated)
}

/// Active coordinators of the record's programme and all active supervisors.
async fn dispute_reviewers(state: &AppState, programme_id: Option<Uuid>) -> ApiResult<Vec<Uuid>> {
    let coordinators = state.repo.list_users(Some(Role::Coordinator)).await?;
    let supervisors = state.repo.list_users(Some(Role::Supervisor)).await?;

    Ok(coordinators
        .into_iter()
        .filter(|u| u.is_active && programme_id.is_some() && u.programme_id == programme_id)
        .chain(supervisors.into_iter().filter(|u| u.is_active))
        .map(|u| u.id)
        .collect())
}

#[utoipa::path(
    post,
    path = "/verification-requests/{id}/approve",
    request_body = ReviewDecisionRequest,
    responses(
        (status = 200, description = "Attendance verified", body = VerificationRequest),
        (status = 403, description = "Not the class rep of this group"),
        (status = 409, description = "Request is not pending")
    )
)]
pub async fn approve(
    user: AuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewDecisionRequest>,
) -> ApiResult<Json<VerificationRequest>> {
    let updated = decide(&state, &user, &ip, id, VerificationAction::Approve, payload.comment, None).await?;
    Ok(Json(updated))
}

#[utoipa::path(
    post,
    path = "/verification-requests/{id}/dispute",
    request_body = DisputeRequest,
    responses(
        (status = 200, description = "Attendance disputed", body = VerificationRequest),
        (status = 403, description = "Not the class rep of this group"),
        (status = 409, description = "Request is not pending"),
        (status = 422, description = "Missing reason")
    )
)]
pub async fn dispute(
    user: AuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DisputeRequest>,
) -> ApiResult<Json<VerificationRequest>> {
    let updated = decide(&state, &user, &ip, id, VerificationAction::Dispute, None, Some(payload.reason)).await?;
    Ok(Json(updated))
}

#[utoipa::path(
    post,
    path = "/verification-requests/{id}/resolve",
    request_body = ReviewDecisionRequest,
    responses(
        (status = 200, description = "Dispute resolved for the lecturer", body = VerificationRequest),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Request is not disputed")
    )
)]
pub async fn resolve(
    user: AuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewDecisionRequest>,
) -> ApiResult<Json<VerificationRequest>> {
    let updated = decide(&state, &user, &ip, id, VerificationAction::Resolve, payload.comment, None).await?;
    Ok(Json(updated))
}

#[utoipa::path(
    post,
    path = "/verification-requests/{id}/reject",
    request_body = ReviewDecisionRequest,
    responses(
        (status = 200, description = "Dispute upheld, record rejected", body = VerificationRequest),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Request is not disputed")
    )
)]
pub async fn reject(
    user: AuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewDecisionRequest>,
) -> ApiResult<Json<VerificationRequest>> {
    let updated = decide(&state, &user, &ip, id, VerificationAction::Reject, payload.comment, None).await?;
    Ok(Json(updated))
}
