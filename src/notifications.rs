use uuid::Uuid;

use crate::repository::{NewNotification, RepositoryState};

/// NotificationKind
///
/// Category stored in `notifications.kind`; the frontend picks icons by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    AttendanceSubmitted,
    AttendanceVerified,
    AttendanceDisputed,
    DisputeRaised,
    DisputeResolved,
    DisputeRejected,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::AttendanceSubmitted => "attendance_submitted",
            NotificationKind::AttendanceVerified => "attendance_verified",
            NotificationKind::AttendanceDisputed => "attendance_disputed",
            NotificationKind::DisputeRaised => "dispute_raised",
            NotificationKind::DisputeResolved => "dispute_resolved",
            NotificationKind::DisputeRejected => "dispute_rejected",
        }
    }
}

/// notify
///
/// Sends one in-app notification. A failure is logged; the triggering request
/// still succeeds.
pub async fn notify(
    repo: &RepositoryState,
    user_id: Uuid,
    kind: NotificationKind,
    title: impl Into<String>,
    message: impl Into<String>,
    link: Option<String>,
) {
    let notification = NewNotification {
        user_id,
        kind: kind.as_str().to_string(),
        title: title.into(),
        message: message.into(),
        link,
    };

    if let Err(e) = repo.create_notification(notification).await {
        tracing::error!(%user_id, kind = kind.as_str(), error = ?e, "failed to create notification");
    }
}

/// Sends the same notification to several recipients, skipping duplicates.
pub async fn notify_many(
    repo: &RepositoryState,
    recipients: impl IntoIterator<Item = Uuid>,
    kind: NotificationKind,
    title: &str,
    message: &str,
    link: Option<String>,
) {
    let mut seen = std::collections::HashSet::new();
    for user_id in recipients {
        if seen.insert(user_id) {
            notify(repo, user_id, kind, title, message, link.clone()).await;
        }
    }
}
