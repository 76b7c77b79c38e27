use std::collections::BTreeMap;

use fleetdesk_domain::{AccessLevel, PermissionExpression, PermissionResource};

use super::*;

impl AuthorizationService {
    /// Evaluates an `AND`-only or `OR`-only permission expression for the actor.
    ///
    /// Malformed expressions fail with a validation error before any lookup happens.
    pub async fn evaluate_expression(
        &self,
        actor: &IdentityContext,
        tenant_id: TenantId,
        expression: &str,
    ) -> AppResult<bool> {
        let expression = PermissionExpression::parse(expression)?;
        let resolved = self
            .resolve_actor_permissions(actor, tenant_id, Utc::now())
            .await?;

        Ok(expression.evaluate(|permission| resolved.allows(permission)))
    }

    /// Classifies a permission set for display.
    #[must_use]
    pub fn access_level(permissions: &PermissionSet) -> AccessLevel {
        AccessLevel::classify(permissions)
    }

    /// Classifies the user's effective permissions in a tenant.
    pub async fn access_level_for(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> AppResult<AccessLevel> {
        let permissions = self.effective_permissions(user_id, tenant_id).await?;
        Ok(Self::access_level(&permissions))
    }

    /// Returns the user's effective permissions grouped by resource category.
    pub async fn effective_permissions_by_resource(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> AppResult<BTreeMap<PermissionResource, Vec<Permission>>> {
        let permissions = self.effective_permissions(user_id, tenant_id).await?;
        Ok(permissions.group_by_resource())
    }
}
