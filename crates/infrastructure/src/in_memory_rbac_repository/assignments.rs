use super::*;

#[async_trait]
impl AssignmentRepository for InMemoryAssignmentRepository {
    async fn insert_assignment(&self, assignment: RoleAssignment) -> AppResult<()> {
        let mut assignments = self.assignments.write().await;

        let duplicate = assignments.values().any(|existing| {
            existing.is_active()
                && existing.user_id() == assignment.user_id()
                && existing.role_id() == assignment.role_id()
        });
        if duplicate {
            return Err(AppError::Conflict(format!(
                "user '{}' already has an active assignment of role '{}'",
                assignment.user_id(),
                assignment.role_id()
            )));
        }

        assignments.insert(assignment.assignment_id(), assignment);
        Ok(())
    }

    async fn find_assignment(
        &self,
        assignment_id: AssignmentId,
    ) -> AppResult<Option<RoleAssignment>> {
        Ok(self.assignments.read().await.get(&assignment_id).cloned())
    }

    async fn find_active_assignment(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<Option<RoleAssignment>> {
        Ok(self
            .assignments
            .read()
            .await
            .values()
            .find(|assignment| {
                assignment.is_active()
                    && assignment.user_id() == user_id
                    && assignment.role_id() == role_id
            })
            .cloned())
    }

    async fn list_active_assignments_for_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> AppResult<Vec<RoleAssignment>> {
        Ok(self
            .assignments
            .read()
            .await
            .values()
            .filter(|assignment| {
                assignment.is_active()
                    && assignment.tenant_id() == tenant_id
                    && assignment.user_id() == user_id
            })
            .cloned()
            .collect())
    }

    async fn list_assignments(
        &self,
        tenant_id: TenantId,
        query: &AssignmentQuery,
    ) -> AppResult<Vec<RoleAssignment>> {
        let assignments = self.assignments.read().await;

        let mut values: Vec<RoleAssignment> = assignments
            .values()
            .filter(|assignment| {
                assignment.tenant_id() == tenant_id
                    && (!query.active_only || assignment.is_active())
                    && query
                        .user_id
                        .is_none_or(|user_id| assignment.user_id() == user_id)
                    && query
                        .role_id
                        .is_none_or(|role_id| assignment.role_id() == role_id)
                    && query
                        .agency_id
                        .is_none_or(|agency_id| assignment.agency_id() == Some(agency_id))
            })
            .cloned()
            .collect();
        values.sort_by(|left, right| right.assigned_at().cmp(&left.assigned_at()));

        Ok(values
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    async fn count_active_assignments_for_role(&self, role_id: RoleId) -> AppResult<u64> {
        let count = self
            .assignments
            .read()
            .await
            .values()
            .filter(|assignment| assignment.is_active() && assignment.role_id() == role_id)
            .count();

        u64::try_from(count)
            .map_err(|error| AppError::Internal(format!("assignment count overflow: {error}")))
    }

    async fn deactivate_assignment(
        &self,
        assignment_id: AssignmentId,
        revoked_by: &str,
        revoked_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        Ok(self
            .assignments
            .write()
            .await
            .get_mut(&assignment_id)
            .is_some_and(|assignment| assignment.deactivate(revoked_by, revoked_at)))
    }

    async fn update_expiry(
        &self,
        assignment_id: AssignmentId,
        expires_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        Ok(self
            .assignments
            .write()
            .await
            .get_mut(&assignment_id)
            .is_some_and(|assignment| assignment.extend_to(expires_at)))
    }

    async fn deactivate_expired_assignments(
        &self,
        now: DateTime<Utc>,
        revoked_by: &str,
    ) -> AppResult<Vec<RoleAssignment>> {
        let mut assignments = self.assignments.write().await;

        Ok(assignments
            .values_mut()
            .filter(|assignment| assignment.is_expired_at(now))
            .filter_map(|assignment| {
                assignment
                    .deactivate(revoked_by, now)
                    .then(|| assignment.clone())
            })
            .collect())
    }
}
