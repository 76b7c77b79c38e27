use super::*;

impl AuthorizationService {
    /// Returns whether one of the user's valid assignments points at a role with this name.
    pub async fn has_role(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        role_name: &str,
    ) -> AppResult<bool> {
        let grants = self
            .effective_grants_at(user_id, tenant_id, Utc::now())
            .await?;

        Ok(grants.iter().any(|grant| grant.role.name() == role_name))
    }

    /// Lists the active roles the user currently holds, highest priority first.
    pub async fn user_roles(&self, user_id: UserId, tenant_id: TenantId) -> AppResult<Vec<Role>> {
        let mut roles: Vec<Role> = Vec::new();
        for grant in self
            .effective_grants_at(user_id, tenant_id, Utc::now())
            .await?
        {
            if roles
                .iter()
                .all(|role| role.role_id() != grant.role.role_id())
            {
                roles.push(grant.role);
            }
        }

        roles.sort_by(|left, right| {
            right
                .priority()
                .cmp(&left.priority())
                .then_with(|| left.name().cmp(right.name()))
        });

        Ok(roles)
    }
}
