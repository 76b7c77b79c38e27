use fleetdesk_core::UserKind;
use fleetdesk_domain::RoleKind;

use super::*;

impl AssignmentService {
    /// Grants a role to a user.
    pub async fn assign_role(
        &self,
        actor: &IdentityContext,
        input: AssignRoleInput,
    ) -> AppResult<RoleAssignment> {
        self.require_assign_permission(actor, input.tenant_id, input.agency_id)
            .await?;

        let assignment = self
            .create_assignment(&actor.subject(), input, Utc::now())
            .await?;

        info!(
            assignment_id = %assignment.assignment_id(),
            user_id = %assignment.user_id(),
            role_id = %assignment.role_id(),
            "role assigned"
        );
        Ok(assignment)
    }

    /// Grants a role to many users, skipping the ones that fail.
    ///
    /// Only the permission check can fail the call; per-user failures are logged and the
    /// created assignments are returned.
    pub async fn bulk_assign(
        &self,
        actor: &IdentityContext,
        input: BulkAssignRoleInput,
    ) -> AppResult<Vec<RoleAssignment>> {
        self.require_assign_permission(actor, input.tenant_id, input.agency_id)
            .await?;

        let subject = actor.subject();
        let now = Utc::now();
        let mut created = Vec::with_capacity(input.user_ids.len());

        for user_id in &input.user_ids {
            let result = self
                .create_assignment(
                    &subject,
                    AssignRoleInput {
                        user_id: *user_id,
                        role_id: input.role_id,
                        tenant_id: input.tenant_id,
                        agency_id: input.agency_id,
                        expires_at: input.expires_at,
                        reason: input.reason.clone(),
                    },
                    now,
                )
                .await;

            match result {
                Ok(assignment) => created.push(assignment),
                Err(error) => warn!(
                    %user_id,
                    role_id = %input.role_id,
                    error = %error,
                    "skipping user in bulk assignment"
                ),
            }
        }

        info!(
            role_id = %input.role_id,
            requested = input.user_ids.len(),
            created = created.len(),
            "bulk assignment finished"
        );
        Ok(created)
    }

    /// Assigns every active default role of the tenant that matches the member kind.
    ///
    /// Failures for individual roles are logged and skipped like in [`Self::bulk_assign`].
    pub async fn grant_default_roles(
        &self,
        actor: &IdentityContext,
        user_id: UserId,
        tenant_id: TenantId,
        user_kind: UserKind,
    ) -> AppResult<Vec<RoleAssignment>> {
        self.authorization_service
            .require_permission(actor, tenant_id, Permission::RoleAssign)
            .await?;

        let Some(kind) = RoleKind::default_for_user_kind(user_kind) else {
            debug!(%user_id, user_kind = user_kind.as_str(), "no default roles for user kind");
            return Ok(Vec::new());
        };

        let roles = self.role_repository.list_roles(tenant_id).await?;
        let subject = actor.subject();
        let now = Utc::now();
        let mut created = Vec::new();

        for role in roles
            .into_iter()
            .filter(|role| role.is_default_role() && role.is_active() && role.kind() == kind)
        {
            let result = self
                .create_assignment(
                    &subject,
                    AssignRoleInput {
                        user_id,
                        role_id: role.role_id(),
                        tenant_id,
                        agency_id: None,
                        expires_at: None,
                        reason: Some("default role for new member".to_owned()),
                    },
                    now,
                )
                .await;

            match result {
                Ok(assignment) => created.push(assignment),
                Err(error) => warn!(
                    %user_id,
                    role_id = %role.role_id(),
                    error = %error,
                    "skipping default role grant"
                ),
            }
        }

        Ok(created)
    }
}
