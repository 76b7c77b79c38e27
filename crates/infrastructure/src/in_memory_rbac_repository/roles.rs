use super::*;

fn name_taken(roles: &HashMap<RoleId, Role>, candidate: &Role) -> bool {
    roles.values().any(|existing| {
        existing.role_id() != candidate.role_id()
            && existing.tenant_id() == candidate.tenant_id()
            && existing.name() == candidate.name()
    })
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn insert_role(&self, role: Role) -> AppResult<()> {
        let mut roles = self.roles.write().await;

        if roles.contains_key(&role.role_id()) || name_taken(&roles, &role) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists for tenant '{}'",
                role.name(),
                role.tenant_id()
            )));
        }

        roles.insert(role.role_id(), role);
        Ok(())
    }

    async fn update_role(&self, role: Role) -> AppResult<()> {
        let mut roles = self.roles.write().await;

        if !roles.contains_key(&role.role_id()) {
            return Err(AppError::NotFound(format!(
                "role '{}' does not exist",
                role.role_id()
            )));
        }

        if name_taken(&roles, &role) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists for tenant '{}'",
                role.name(),
                role.tenant_id()
            )));
        }

        roles.insert(role.role_id(), role);
        Ok(())
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        match self.roles.write().await.remove(&role_id) {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("role '{role_id}' does not exist"))),
        }
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self.roles.read().await.get(&role_id).cloned())
    }

    async fn find_role_by_name(&self, tenant_id: TenantId, name: &str) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .read()
            .await
            .values()
            .find(|role| role.tenant_id() == tenant_id && role.name() == name)
            .cloned())
    }

    async fn find_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<Role>> {
        let roles = self.roles.read().await;

        Ok(role_ids
            .iter()
            .filter_map(|role_id| roles.get(role_id).cloned())
            .collect())
    }

    async fn list_roles(&self, tenant_id: TenantId) -> AppResult<Vec<Role>> {
        let roles = self.roles.read().await;

        let mut values: Vec<Role> = roles
            .values()
            .filter(|role| role.tenant_id() == tenant_id)
            .cloned()
            .collect();
        values.sort_by(|left, right| left.name().cmp(right.name()));

        Ok(values)
    }
}
