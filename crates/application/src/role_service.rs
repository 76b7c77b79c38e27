use std::sync::Arc;

use chrono::Utc;
use fleetdesk_core::{AppError, AppResult, IdentityContext, TenantId};
use fleetdesk_domain::{AuditAction, Permission, PermissionSet, Role, RoleId, RoleKind, RoleMetadata};
use tracing::{debug, info, warn};

use crate::{AssignmentRepository, AuditEvent, AuditRepository, AuthorizationService, RoleRepository};

mod lifecycle;
mod provisioning;

#[cfg(test)]
mod tests;

/// Display metadata supplied by callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleMetadataInput {
    /// Hex color such as `#1f6feb`.
    pub color: Option<String>,
    /// Icon identifier.
    pub icon: Option<String>,
}

/// Input payload for creating tenant roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Unique role name in tenant scope.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Archetype tag.
    pub kind: RoleKind,
    /// Permission codes validated against the catalog.
    pub permission_codes: Vec<String>,
    /// Display and precedence ordering, higher first.
    pub priority: i32,
    /// Display metadata.
    pub metadata: RoleMetadataInput,
}

/// Partial update payload. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRoleInput {
    /// New name.
    pub name: Option<String>,
    /// New description; `Some(None)` clears it.
    pub description: Option<Option<String>>,
    /// Replacement permission codes.
    pub permission_codes: Option<Vec<String>>,
    /// New priority.
    pub priority: Option<i32>,
    /// New display metadata.
    pub metadata: Option<RoleMetadataInput>,
    /// New default flag.
    pub is_default_role: Option<bool>,
    /// New activation flag.
    pub is_active: Option<bool>,
}

/// Application service for the role lifecycle.
#[derive(Clone)]
pub struct RoleService {
    authorization_service: AuthorizationService,
    role_repository: Arc<dyn RoleRepository>,
    assignment_repository: Arc<dyn AssignmentRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl RoleService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        role_repository: Arc<dyn RoleRepository>,
        assignment_repository: Arc<dyn AssignmentRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            authorization_service,
            role_repository,
            assignment_repository,
            audit_repository,
        }
    }

    async fn load_role(&self, role_id: RoleId) -> AppResult<Role> {
        self.role_repository
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))
    }

    /// Records an audit event once the role write is stored. Failures are only logged.
    async fn append_role_event(
        &self,
        subject: &str,
        action: AuditAction,
        role: &Role,
        detail: String,
    ) {
        let result = self
            .audit_repository
            .append_event(AuditEvent {
                tenant_id: role.tenant_id(),
                subject: subject.to_owned(),
                action,
                resource_type: "rbac_role".to_owned(),
                resource_id: role.role_id().to_string(),
                detail: Some(detail),
            })
            .await;

        if let Err(error) = result {
            warn!(
                role_id = %role.role_id(),
                action = action.as_str(),
                error = %error,
                "failed to append role audit event"
            );
        }
    }
}

impl RoleMetadataInput {
    fn into_metadata(self) -> AppResult<RoleMetadata> {
        RoleMetadata::new(self.color, self.icon)
    }
}
