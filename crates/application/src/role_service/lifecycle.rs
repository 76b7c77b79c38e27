use fleetdesk_domain::{RoleInput, RoleUpdate};

use super::*;

impl RoleService {
    /// Creates a custom tenant role and emits an audit event.
    pub async fn create_role(
        &self,
        actor: &IdentityContext,
        tenant_id: TenantId,
        input: CreateRoleInput,
    ) -> AppResult<Role> {
        self.authorization_service
            .require_permission(actor, tenant_id, Permission::RoleManage)
            .await?;

        let role = Role::new(
            RoleInput {
                tenant_id,
                name: input.name,
                description: input.description,
                kind: input.kind,
                permissions: PermissionSet::from_codes(&input.permission_codes)?,
                priority: input.priority,
                metadata: input.metadata.into_metadata()?,
                is_default_role: false,
            },
            &actor.subject(),
            Utc::now(),
        )?;

        self.role_repository.insert_role(role.clone()).await?;

        info!(
            role_id = %role.role_id(),
            %tenant_id,
            permissions = role.permissions().len(),
            "role created"
        );

        self.append_role_event(
            &actor.subject(),
            AuditAction::SecurityRoleCreated,
            &role,
            format!(
                "created role '{}' with {} permissions",
                role.name(),
                role.permissions().len()
            ),
        )
        .await;

        Ok(role)
    }

    /// Applies a partial update to a tenant role.
    ///
    /// System roles are rejected before any permission check runs.
    pub async fn update_role(
        &self,
        actor: &IdentityContext,
        role_id: RoleId,
        input: UpdateRoleInput,
    ) -> AppResult<Role> {
        let current = self.load_role(role_id).await?;
        current.ensure_mutable()?;

        self.authorization_service
            .require_permission(actor, current.tenant_id(), Permission::RoleManage)
            .await?;

        let permissions = input
            .permission_codes
            .as_ref()
            .map(PermissionSet::from_codes)
            .transpose()?;
        let metadata = input
            .metadata
            .map(RoleMetadataInput::into_metadata)
            .transpose()?;

        let updated = current.updated(
            RoleUpdate {
                name: input.name,
                description: input.description,
                permissions,
                priority: input.priority,
                metadata,
                is_default_role: input.is_default_role,
                is_active: input.is_active,
            },
            &actor.subject(),
            Utc::now(),
        )?;

        self.role_repository.update_role(updated.clone()).await?;

        self.append_role_event(
            &actor.subject(),
            AuditAction::SecurityRoleUpdated,
            &updated,
            describe_update(&current, &updated),
        )
        .await;

        Ok(updated)
    }

    /// Deletes a tenant role that no active assignment references.
    pub async fn delete_role(&self, actor: &IdentityContext, role_id: RoleId) -> AppResult<()> {
        let role = self.load_role(role_id).await?;
        role.ensure_deletable()?;

        self.authorization_service
            .require_permission(actor, role.tenant_id(), Permission::RoleManage)
            .await?;

        let active_assignments = self
            .assignment_repository
            .count_active_assignments_for_role(role_id)
            .await?;
        if active_assignments > 0 {
            return Err(AppError::RoleInUse(format!(
                "role '{}' still has {active_assignments} active assignments",
                role.name()
            )));
        }

        self.role_repository.delete_role(role_id).await?;

        info!(%role_id, tenant_id = %role.tenant_id(), "role deleted");

        self.append_role_event(
            &actor.subject(),
            AuditAction::SecurityRoleDeleted,
            &role,
            format!("deleted role '{}'", role.name()),
        )
        .await;

        Ok(())
    }

    /// Copies a role under a new name, into its own tenant or `target_tenant_id`.
    ///
    /// The copy is never a default or system role.
    pub async fn clone_role(
        &self,
        actor: &IdentityContext,
        role_id: RoleId,
        new_name: String,
        target_tenant_id: Option<TenantId>,
    ) -> AppResult<Role> {
        let source = self.load_role(role_id).await?;
        let tenant_id = target_tenant_id.unwrap_or(source.tenant_id());

        if !source.is_system_role() && source.tenant_id() != tenant_id {
            self.authorization_service
                .require_permission(actor, source.tenant_id(), Permission::RoleRead)
                .await?;
        }
        self.authorization_service
            .require_permission(actor, tenant_id, Permission::RoleManage)
            .await?;

        let copy = source.cloned_as(new_name, tenant_id, &actor.subject(), Utc::now())?;
        self.role_repository.insert_role(copy.clone()).await?;

        self.append_role_event(
            &actor.subject(),
            AuditAction::SecurityRoleCreated,
            &copy,
            format!("cloned role '{}' from '{}'", copy.name(), source.name()),
        )
        .await;

        Ok(copy)
    }

    /// Returns one role. System roles are readable by any caller.
    pub async fn get_role(&self, actor: &IdentityContext, role_id: RoleId) -> AppResult<Role> {
        let role = self.load_role(role_id).await?;

        if !role.is_system_role() {
            self.authorization_service
                .require_permission(actor, role.tenant_id(), Permission::RoleRead)
                .await?;
        }

        Ok(role)
    }

    /// Lists tenant roles, highest priority first, then by name.
    pub async fn list_roles(
        &self,
        actor: &IdentityContext,
        tenant_id: TenantId,
    ) -> AppResult<Vec<Role>> {
        self.authorization_service
            .require_permission(actor, tenant_id, Permission::RoleRead)
            .await?;

        let mut roles = self.role_repository.list_roles(tenant_id).await?;
        roles.sort_by(|left, right| {
            right
                .priority()
                .cmp(&left.priority())
                .then_with(|| left.name().cmp(right.name()))
        });

        debug!(%tenant_id, count = roles.len(), "listed roles");
        Ok(roles)
    }
}

fn describe_update(before: &Role, after: &Role) -> String {
    let mut changes = Vec::new();
    if before.name() != after.name() {
        changes.push(format!("name '{}' -> '{}'", before.name(), after.name()));
    }
    if before.permissions() != after.permissions() {
        changes.push(format!(
            "permissions {} -> {}",
            before.permissions().len(),
            after.permissions().len()
        ));
    }
    if before.priority() != after.priority() {
        changes.push(format!("priority {} -> {}", before.priority(), after.priority()));
    }
    if before.is_active() != after.is_active() {
        changes.push(format!("active {} -> {}", before.is_active(), after.is_active()));
    }
    if before.is_default_role() != after.is_default_role() {
        changes.push(format!(
            "default {} -> {}",
            before.is_default_role(),
            after.is_default_role()
        ));
    }

    if changes.is_empty() {
        format!("updated role '{}'", after.name())
    } else {
        format!("updated role '{}': {}", after.name(), changes.join(", "))
    }
}
