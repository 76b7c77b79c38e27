use fleetdesk_core::AgencyId;

use super::*;

impl AuthorizationService {
    /// Checks a permission for a concrete tenant and optional agency.
    ///
    /// Requires tenant access, then agency access when an agency is given, then the permission
    /// itself. Tenant access means the actor's identity context belongs to the tenant. Agency
    /// access comes from an assignment scoped to that agency, a tenant-wide
    /// assignment, or tenant ownership. Platform admins bypass every step.
    pub async fn has_permission_in_context(
        &self,
        actor: &IdentityContext,
        permission: Permission,
        tenant_id: TenantId,
        agency_id: Option<AgencyId>,
    ) -> AppResult<bool> {
        self.has_permission_in_context_at(actor, permission, tenant_id, agency_id, Utc::now())
            .await
    }

    /// Same as [`Self::has_permission_in_context`] evaluated at a fixed instant.
    pub async fn has_permission_in_context_at(
        &self,
        actor: &IdentityContext,
        permission: Permission,
        tenant_id: TenantId,
        agency_id: Option<AgencyId>,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        if self.is_platform_admin_at(actor, now).await? {
            return Ok(true);
        }

        ensure_tenant_context(tenant_id)?;

        if !actor.belongs_to(tenant_id) {
            debug!(
                user_id = %actor.user_id(),
                home_tenant_id = %actor.tenant_id(),
                %tenant_id,
                "tenant access denied"
            );
            return Ok(false);
        }

        let grants = self
            .effective_grants_at(actor.user_id(), tenant_id, now)
            .await?;

        if let Some(agency_id) = agency_id {
            let has_agency_access = actor.is_owner_of(tenant_id)
                || grants
                    .iter()
                    .any(|grant| grant.assignment.covers_agency(agency_id));

            if !has_agency_access {
                debug!(
                    user_id = %actor.user_id(),
                    %tenant_id,
                    %agency_id,
                    "agency access denied"
                );
                return Ok(false);
            }
        }

        Ok(union_of(&grants).contains(permission))
    }

    /// Ensures the actor has the permission in the tenant and agency context.
    pub async fn require_permission_in_context(
        &self,
        actor: &IdentityContext,
        permission: Permission,
        tenant_id: TenantId,
        agency_id: Option<AgencyId>,
    ) -> AppResult<()> {
        if self
            .has_permission_in_context(actor, permission, tenant_id, agency_id)
            .await?
        {
            return Ok(());
        }

        Err(match agency_id {
            Some(agency_id) => AppError::Forbidden(format!(
                "subject '{}' is missing permission '{}' in tenant '{tenant_id}' for agency '{agency_id}'",
                actor.subject(),
                permission.as_str()
            )),
            None => missing_permission(actor, permission, tenant_id),
        })
    }

    /// Returns the permissions granted by assignments that cover the given agency.
    pub async fn effective_permissions_for_agency(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        agency_id: AgencyId,
    ) -> AppResult<PermissionSet> {
        let grants: Vec<EffectiveGrant> = self
            .effective_grants_at(user_id, tenant_id, Utc::now())
            .await?
            .into_iter()
            .filter(|grant| grant.assignment.covers_agency(agency_id))
            .collect();

        Ok(union_of(&grants))
    }
}
