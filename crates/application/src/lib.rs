//! Application services and ports.

#![forbid(unsafe_code)]

mod assignment_service;
mod authorization_service;
mod rbac_ports;
mod role_service;

#[cfg(test)]
mod test_support;

pub use assignment_service::{
    AssignRoleInput, AssignmentService, AssignmentView, BulkAssignRoleInput, EXPIRY_SWEEP_SUBJECT,
};
pub use authorization_service::{AuthorizationService, EffectiveGrant};
pub use rbac_ports::{
    AssignmentQuery, AssignmentRepository, AuditEvent, AuditRepository, RoleRepository,
    UserDirectory, UserProfile,
};
pub use role_service::{CreateRoleInput, RoleMetadataInput, RoleService, UpdateRoleInput};
