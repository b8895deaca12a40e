use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Role;

/// Permission
///
/// Every capability guarded by a role check. Handlers ask for a permission rather
/// than comparing role names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageUsers,
    ManageProgrammes,
    ManageCourses,
    ManageSchedules,
    SubmitAttendance,
    VerifyAttendance,
    ResolveDisputes,
    ViewAllAttendance,
    ViewReports,
    ExportReports,
    ViewAuditLogs,
}

const ADMIN: &[Permission] = &[
    Permission::ManageUsers,
    Permission::ManageProgrammes,
    Permission::ManageCourses,
    Permission::ManageSchedules,
    Permission::SubmitAttendance,
    Permission::VerifyAttendance,
    Permission::ResolveDisputes,
    Permission::ViewAllAttendance,
    Permission::ViewReports,
    Permission::ExportReports,
    Permission::ViewAuditLogs,
];

const COORDINATOR: &[Permission] = &[
    Permission::ManageCourses,
    Permission::ManageSchedules,
    Permission::ResolveDisputes,
    Permission::ViewAllAttendance,
    Permission::ViewReports,
    Permission::ExportReports,
];

const LECTURER: &[Permission] = &[Permission::SubmitAttendance];

const CLASS_REP: &[Permission] = &[Permission::VerifyAttendance];

const SUPERVISOR: &[Permission] = &[
    Permission::ResolveDisputes,
    Permission::ViewAllAttendance,
    Permission::ViewReports,
    Permission::ExportReports,
];

/// Static role → permission table.
pub fn permissions_for(role: Role) -> &'static [Permission] {
    match role {
        Role::Admin => ADMIN,
        Role::Coordinator => COORDINATOR,
        Role::Lecturer => LECTURER,
        Role::ClassRep => CLASS_REP,
        Role::Supervisor => SUPERVISOR,
    }
}

pub fn has_permission(role: Role, permission: Permission) -> bool {
    permissions_for(role).contains(&permission)
}
