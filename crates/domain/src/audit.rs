use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by RBAC use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a role is created, including provisioned defaults.
    SecurityRoleCreated,
    /// Emitted when a role definition changes.
    SecurityRoleUpdated,
    /// Emitted when a role is deleted.
    SecurityRoleDeleted,
    /// Emitted when a role is assigned to a user.
    SecurityRoleAssigned,
    /// Emitted when an assignment is revoked.
    SecurityRoleRevoked,
    /// Emitted when an assignment expiry is extended.
    SecurityAssignmentExtended,
    /// Emitted when the sweep deactivates an expired assignment.
    SecurityAssignmentExpired,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SecurityRoleCreated => "security.role.created",
            Self::SecurityRoleUpdated => "security.role.updated",
            Self::SecurityRoleDeleted => "security.role.deleted",
            Self::SecurityRoleAssigned => "security.role.assigned",
            Self::SecurityRoleRevoked => "security.role.revoked",
            Self::SecurityAssignmentExtended => "security.assignment.extended",
            Self::SecurityAssignmentExpired => "security.assignment.expired",
        }
    }
}
