use super::*;

impl AssignmentService {
    /// Revokes the active assignment of a role to a user.
    pub async fn revoke_role(
        &self,
        actor: &IdentityContext,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<()> {
        let assignment = self
            .assignment_repository
            .find_active_assignment(user_id, role_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "no active assignment of role '{role_id}' for user '{user_id}'"
                ))
            })?;

        self.revoke_loaded(actor, assignment).await
    }

    /// Revokes an assignment by identifier. Revoking an inactive assignment is a no-op.
    pub async fn revoke_assignment(
        &self,
        actor: &IdentityContext,
        assignment_id: AssignmentId,
    ) -> AppResult<()> {
        let assignment = self.load_assignment(assignment_id).await?;
        self.revoke_loaded(actor, assignment).await
    }

    async fn revoke_loaded(
        &self,
        actor: &IdentityContext,
        assignment: RoleAssignment,
    ) -> AppResult<()> {
        self.require_assign_permission(actor, assignment.tenant_id(), assignment.agency_id())
            .await?;

        let subject = actor.subject();
        let revoked = self
            .assignment_repository
            .deactivate_assignment(assignment.assignment_id(), &subject, Utc::now())
            .await?;

        if !revoked {
            debug!(
                assignment_id = %assignment.assignment_id(),
                "assignment already inactive"
            );
            return Ok(());
        }

        info!(
            assignment_id = %assignment.assignment_id(),
            user_id = %assignment.user_id(),
            role_id = %assignment.role_id(),
            "assignment revoked"
        );

        self.append_assignment_event(
            &subject,
            AuditAction::SecurityRoleRevoked,
            &assignment,
            format!(
                "revoked role '{}' from user '{}'",
                assignment.role_id(),
                assignment.user_id()
            ),
        )
        .await;

        Ok(())
    }

    /// Pushes the expiry of an active assignment forward by `additional_days`.
    ///
    /// Assignments without an expiry get one counted from now.
    pub async fn extend_assignment(
        &self,
        actor: &IdentityContext,
        assignment_id: AssignmentId,
        additional_days: u32,
    ) -> AppResult<RoleAssignment> {
        let assignment = self.load_assignment(assignment_id).await?;
        self.require_assign_permission(actor, assignment.tenant_id(), assignment.agency_id())
            .await?;

        let expires_at = assignment.extended_expiry(additional_days, Utc::now())?;
        if !self
            .assignment_repository
            .update_expiry(assignment_id, expires_at)
            .await?
        {
            return Err(AppError::Validation(format!(
                "assignment '{assignment_id}' was revoked and cannot be extended"
            )));
        }

        let extended = self.load_assignment(assignment_id).await?;

        self.append_assignment_event(
            &actor.subject(),
            AuditAction::SecurityAssignmentExtended,
            &extended,
            format!(
                "extended assignment by {additional_days} days to {}",
                expires_at.to_rfc3339()
            ),
        )
        .await;

        Ok(extended)
    }
}
