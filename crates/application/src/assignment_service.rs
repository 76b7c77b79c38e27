use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleetdesk_core::{AgencyId, AppError, AppResult, IdentityContext, TenantId, UserId};
use fleetdesk_domain::{
    AssignmentId, AuditAction, Permission, RoleAssignment, RoleAssignmentInput, RoleId,
};
use tracing::{debug, info, warn};

use crate::{
    AssignmentRepository, AuditEvent, AuditRepository, AuthorizationService, RoleRepository,
    UserDirectory,
};

mod expiry;
mod grants;
mod revocation;
mod views;


pub use views::AssignmentView;

/// Audit subject recorded for assignments deactivated by the expiry sweep.
pub const EXPIRY_SWEEP_SUBJECT: &str = "system:expiry-sweep";

/// Input payload for granting one role to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignRoleInput {
    /// Grantee.
    pub user_id: UserId,
    /// Role to grant.
    pub role_id: RoleId,
    /// Tenant the role belongs to.
    pub tenant_id: TenantId,
    /// Optional agency narrowing.
    pub agency_id: Option<AgencyId>,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Free-text justification.
    pub reason: Option<String>,
}

/// Input payload for granting one role to many users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkAssignRoleInput {
    /// Grantees.
    pub user_ids: Vec<UserId>,
    /// Role to grant.
    pub role_id: RoleId,
    /// Tenant the role belongs to.
    pub tenant_id: TenantId,
    /// Optional agency narrowing.
    pub agency_id: Option<AgencyId>,
    /// Optional expiry shared by every created assignment.
    pub expires_at: Option<DateTime<Utc>>,
    /// Free-text justification.
    pub reason: Option<String>,
}

/// Application service for the assignment lifecycle.
#[derive(Clone)]
pub struct AssignmentService {
    authorization_service: AuthorizationService,
    role_repository: Arc<dyn RoleRepository>,
    assignment_repository: Arc<dyn AssignmentRepository>,
    user_directory: Arc<dyn UserDirectory>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl AssignmentService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        role_repository: Arc<dyn RoleRepository>,
        assignment_repository: Arc<dyn AssignmentRepository>,
        user_directory: Arc<dyn UserDirectory>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            authorization_service,
            role_repository,
            assignment_repository,
            user_directory,
            audit_repository,
        }
    }

    /// Validates and stores one assignment without any permission check.
    async fn create_assignment(
        &self,
        subject: &str,
        input: AssignRoleInput,
        now: DateTime<Utc>,
    ) -> AppResult<RoleAssignment> {
        let role = self
            .role_repository
            .find_role(input.role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{}' does not exist", input.role_id)))?;

        if role.tenant_id() != input.tenant_id {
            return Err(AppError::Validation(format!(
                "role '{}' belongs to tenant '{}', not '{}'",
                role.name(),
                role.tenant_id(),
                input.tenant_id
            )));
        }

        if !role.is_active() {
            return Err(AppError::Validation(format!(
                "role '{}' is inactive and cannot be assigned",
                role.name()
            )));
        }

        if self
            .user_directory
            .find_user(input.user_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(format!(
                "user '{}' does not exist",
                input.user_id
            )));
        }

        let assignment = RoleAssignment::new(
            RoleAssignmentInput {
                user_id: input.user_id,
                role_id: input.role_id,
                tenant_id: input.tenant_id,
                agency_id: input.agency_id,
                expires_at: input.expires_at,
                reason: input.reason,
            },
            subject,
            now,
        )?;

        self.assignment_repository
            .insert_assignment(assignment.clone())
            .await?;

        self.append_assignment_event(
            subject,
            AuditAction::SecurityRoleAssigned,
            &assignment,
            format!(
                "assigned role '{}' to user '{}'",
                role.name(),
                assignment.user_id()
            ),
        )
        .await;

        Ok(assignment)
    }

    async fn load_assignment(&self, assignment_id: AssignmentId) -> AppResult<RoleAssignment> {
        self.assignment_repository
            .find_assignment(assignment_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("assignment '{assignment_id}' does not exist"))
            })
    }

    async fn require_assign_permission(
        &self,
        actor: &IdentityContext,
        tenant_id: TenantId,
        agency_id: Option<AgencyId>,
    ) -> AppResult<()> {
        match agency_id {
            Some(_) => {
                self.authorization_service
                    .require_permission_in_context(
                        actor,
                        Permission::RoleAssign,
                        tenant_id,
                        agency_id,
                    )
                    .await
            }
            None => {
                self.authorization_service
                    .require_permission(actor, tenant_id, Permission::RoleAssign)
                    .await
            }
        }
    }

    /// Records an audit event for a write that has already been stored.
    ///
    /// Failures are logged and never reported to the caller.
    async fn append_assignment_event(
        &self,
        subject: &str,
        action: AuditAction,
        assignment: &RoleAssignment,
        detail: String,
    ) {
        let result = self
            .audit_repository
            .append_event(AuditEvent {
                tenant_id: assignment.tenant_id(),
                subject: subject.to_owned(),
                action,
                resource_type: "rbac_role_assignment".to_owned(),
                resource_id: assignment.assignment_id().to_string(),
                detail: Some(detail),
            })
            .await;

        if let Err(error) = result {
            warn!(
                assignment_id = %assignment.assignment_id(),
                action = action.as_str(),
                error = %error,
                "failed to append assignment audit event"
            );
        }
    }
}
