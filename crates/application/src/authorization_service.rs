use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleetdesk_core::{AppError, AppResult, IdentityContext, TenantId, UserId};
use fleetdesk_domain::{Permission, PermissionSet, Role, RoleAssignment, RoleId};
use tracing::debug;

use crate::{AssignmentRepository, RoleRepository};

mod context;
mod permissions;
mod roles;
mod views;


/// Currently valid assignment paired with its active role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveGrant {
    /// Active, unexpired assignment.
    pub assignment: RoleAssignment,
    /// Active role the assignment points to.
    pub role: Role,
}

/// Permission evaluation engine.
///
/// Every decision takes the caller's [`IdentityContext`] explicitly. Results are computed from
/// the stores on each call; there is no in-process cache.
#[derive(Clone)]
pub struct AuthorizationService {
    role_repository: Arc<dyn RoleRepository>,
    assignment_repository: Arc<dyn AssignmentRepository>,
}

impl AuthorizationService {
    /// Creates a new evaluation engine from repository implementations.
    #[must_use]
    pub fn new(
        role_repository: Arc<dyn RoleRepository>,
        assignment_repository: Arc<dyn AssignmentRepository>,
    ) -> Self {
        Self {
            role_repository,
            assignment_repository,
        }
    }

    /// Resolves the valid assignments of a user in a tenant together with their active roles.
    ///
    /// An assignment is valid when its flag is set and it has no expiry or one after `now`.
    /// Assignments pointing at inactive or missing roles are skipped.
    pub async fn effective_grants_at(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<EffectiveGrant>> {
        let assignments: Vec<RoleAssignment> = self
            .assignment_repository
            .list_active_assignments_for_user(tenant_id, user_id)
            .await?
            .into_iter()
            .filter(|assignment| assignment.tenant_id() == tenant_id && assignment.is_valid_at(now))
            .collect();

        if assignments.is_empty() {
            return Ok(Vec::new());
        }

        let role_ids: Vec<RoleId> = assignments.iter().map(RoleAssignment::role_id).collect();
        let roles: HashMap<RoleId, Role> = self
            .role_repository
            .find_roles(&role_ids)
            .await?
            .into_iter()
            .map(|role| (role.role_id(), role))
            .collect();

        let mut grants = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            match roles.get(&assignment.role_id()) {
                Some(role) if role.is_active() => grants.push(EffectiveGrant {
                    assignment,
                    role: role.clone(),
                }),
                Some(_) => {}
                None => debug!(
                    assignment_id = %assignment.assignment_id(),
                    role_id = %assignment.role_id(),
                    "skipping assignment whose role no longer exists"
                ),
            }
        }

        Ok(grants)
    }

    /// Returns whether the actor is a platform admin, by user kind or by a valid system-role
    /// grant.
    pub async fn is_platform_admin_at(
        &self,
        actor: &IdentityContext,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        if actor.is_platform_admin() {
            return Ok(true);
        }

        let system_grants = self
            .effective_grants_at(actor.user_id(), TenantId::system(), now)
            .await?;

        Ok(system_grants
            .iter()
            .any(|grant| grant.role.is_system_role() && grant.role.grants(Permission::PlatformAdmin)))
    }

    /// Resolves what the actor may do in a tenant.
    async fn resolve_actor_permissions(
        &self,
        actor: &IdentityContext,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> AppResult<ActorPermissions> {
        if self.is_platform_admin_at(actor, now).await? {
            return Ok(ActorPermissions::Unrestricted);
        }

        ensure_tenant_context(tenant_id)?;

        let grants = self
            .effective_grants_at(actor.user_id(), tenant_id, now)
            .await?;

        Ok(ActorPermissions::Granted(union_of(&grants)))
    }
}

/// Outcome of permission resolution for one actor in one tenant.
enum ActorPermissions {
    Unrestricted,
    Granted(PermissionSet),
}

impl ActorPermissions {
    fn allows(&self, permission: Permission) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Granted(permissions) => permissions.contains(permission),
        }
    }
}

fn union_of(grants: &[EffectiveGrant]) -> PermissionSet {
    grants
        .iter()
        .fold(PermissionSet::empty(), |permissions, grant| {
            permissions.union(grant.role.permissions())
        })
}

fn ensure_tenant_context(tenant_id: TenantId) -> AppResult<()> {
    if tenant_id.is_system() {
        return Err(AppError::Validation(
            "the system tenant is not a valid tenant context".to_owned(),
        ));
    }

    Ok(())
}

fn missing_permission(actor: &IdentityContext, permission: Permission, tenant_id: TenantId) -> AppError {
    AppError::Forbidden(format!(
        "subject '{}' is missing permission '{}' in tenant '{tenant_id}'",
        actor.subject(),
        permission.as_str()
    ))
}
