use super::*;

impl AuthorizationService {
    /// Returns the union of permissions granted by the user's valid assignments in a tenant.
    ///
    /// A user without assignments gets an empty set. The system tenant is not a valid context.
    pub async fn effective_permissions(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> AppResult<PermissionSet> {
        self.effective_permissions_at(user_id, tenant_id, Utc::now())
            .await
    }

    /// Same as [`Self::effective_permissions`] evaluated at a fixed instant.
    pub async fn effective_permissions_at(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> AppResult<PermissionSet> {
        ensure_tenant_context(tenant_id)?;

        let grants = self.effective_grants_at(user_id, tenant_id, now).await?;
        Ok(union_of(&grants))
    }

    /// Returns whether the actor currently holds the permission in the tenant.
    pub async fn has_permission(
        &self,
        actor: &IdentityContext,
        tenant_id: TenantId,
        permission: Permission,
    ) -> AppResult<bool> {
        self.has_permission_at(actor, tenant_id, permission, Utc::now())
            .await
    }

    /// Same as [`Self::has_permission`] evaluated at a fixed instant.
    pub async fn has_permission_at(
        &self,
        actor: &IdentityContext,
        tenant_id: TenantId,
        permission: Permission,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let resolved = self.resolve_actor_permissions(actor, tenant_id, now).await?;
        Ok(resolved.allows(permission))
    }

    /// Checks a raw permission code. Codes outside the catalog are denied.
    pub async fn has_permission_code(
        &self,
        actor: &IdentityContext,
        tenant_id: TenantId,
        code: &str,
    ) -> AppResult<bool> {
        match code.parse::<Permission>() {
            Ok(permission) => self.has_permission(actor, tenant_id, permission).await,
            Err(_) => {
                debug!(code, "unknown permission code evaluated as denied");
                Ok(false)
            }
        }
    }

    /// Returns whether the actor holds at least one of the permissions.
    pub async fn has_any_permission(
        &self,
        actor: &IdentityContext,
        tenant_id: TenantId,
        permissions: &[Permission],
    ) -> AppResult<bool> {
        if permissions.is_empty() {
            return Ok(false);
        }

        let resolved = self
            .resolve_actor_permissions(actor, tenant_id, Utc::now())
            .await?;

        Ok(permissions
            .iter()
            .any(|permission| resolved.allows(*permission)))
    }

    /// Returns whether the actor holds every permission. An empty list is vacuously true.
    pub async fn has_all_permissions(
        &self,
        actor: &IdentityContext,
        tenant_id: TenantId,
        permissions: &[Permission],
    ) -> AppResult<bool> {
        let resolved = self
            .resolve_actor_permissions(actor, tenant_id, Utc::now())
            .await?;

        Ok(permissions
            .iter()
            .all(|permission| resolved.allows(*permission)))
    }

    /// Ensures the actor has the required permission in the tenant scope.
    pub async fn require_permission(
        &self,
        actor: &IdentityContext,
        tenant_id: TenantId,
        permission: Permission,
    ) -> AppResult<()> {
        if self.has_permission(actor, tenant_id, permission).await? {
            return Ok(());
        }

        Err(missing_permission(actor, permission, tenant_id))
    }
}
