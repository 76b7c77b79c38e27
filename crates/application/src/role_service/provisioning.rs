use fleetdesk_domain::{SUPER_ADMIN_ROLE_NAME, default_role_templates};

use super::*;

impl RoleService {
    /// Instantiates the default role templates for a tenant.
    ///
    /// Templates whose name already exists in the tenant are skipped, so repeated calls are
    /// harmless. Returns only the roles created by this call.
    pub async fn provision_default_roles(
        &self,
        tenant_id: TenantId,
        subject: &str,
    ) -> AppResult<Vec<Role>> {
        let now = Utc::now();
        let mut created = Vec::new();

        for template in default_role_templates() {
            if self
                .role_repository
                .find_role_by_name(tenant_id, template.name)
                .await?
                .is_some()
            {
                debug!(%tenant_id, role = template.name, "default role already provisioned");
                continue;
            }

            let role = Role::new(template.to_input(tenant_id), subject, now)?;
            match self.role_repository.insert_role(role.clone()).await {
                Ok(()) => {}
                Err(AppError::Conflict(message)) => {
                    warn!(%tenant_id, role = template.name, %message, "default role provisioned concurrently");
                    continue;
                }
                Err(error) => return Err(error),
            }

            self.append_role_event(
                subject,
                AuditAction::SecurityRoleCreated,
                &role,
                format!("provisioned default role '{}'", role.name()),
            )
            .await;
            created.push(role);
        }

        info!(%tenant_id, created = created.len(), "default roles provisioned");
        Ok(created)
    }

    /// Seeds the platform super-admin system role. Returns `None` when it already exists.
    pub async fn provision_system_roles(&self) -> AppResult<Option<Role>> {
        if self
            .role_repository
            .find_role_by_name(TenantId::system(), SUPER_ADMIN_ROLE_NAME)
            .await?
            .is_some()
        {
            return Ok(None);
        }

        let role = Role::super_admin(Utc::now())?;
        match self.role_repository.insert_role(role.clone()).await {
            Ok(()) => {}
            Err(AppError::Conflict(_)) => return Ok(None),
            Err(error) => return Err(error),
        }

        self.append_role_event(
            "system",
            AuditAction::SecurityRoleCreated,
            &role,
            format!("provisioned system role '{}'", role.name()),
        )
        .await;

        info!(role_id = %role.role_id(), "system roles provisioned");
        Ok(Some(role))
    }
}
