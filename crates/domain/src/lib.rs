//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod access;
mod assignment;
mod audit;
mod permission;
mod role;

pub use access::{AccessLevel, PermissionExpression, USER_ACCESS_PERMISSION_THRESHOLD};
pub use assignment::{
    AssignmentId, MAX_EXTENSION_DAYS, RoleAssignment, RoleAssignmentInput, RoleAssignmentRecord,
};
pub use audit::AuditAction;
pub use permission::{
    PERMISSION_CATALOG_VERSION, Permission, PermissionInfo, PermissionResource, PermissionSet,
};
pub use role::{
    AuditStamp, DefaultRoleTemplate, ROLE_NAME_MAX_LENGTH, Role, RoleId, RoleInput, RoleKind,
    RoleMetadata, RoleRecord, RoleUpdate, SUPER_ADMIN_ROLE_NAME, default_role_templates,
};
