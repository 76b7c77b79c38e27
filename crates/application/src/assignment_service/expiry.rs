use super::*;

impl AssignmentService {
    /// Deactivates every active assignment whose expiry is before `now`.
    ///
    /// Safe to run concurrently with revocation and with other sweeps: each row flips at most
    /// once. Returns how many rows this run deactivated.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let expired = self
            .assignment_repository
            .deactivate_expired_assignments(now, EXPIRY_SWEEP_SUBJECT)
            .await?;

        for assignment in &expired {
            self.append_assignment_event(
                EXPIRY_SWEEP_SUBJECT,
                AuditAction::SecurityAssignmentExpired,
                assignment,
                format!(
                    "assignment expired at {}",
                    assignment
                        .expires_at()
                        .map(|expires_at| expires_at.to_rfc3339())
                        .unwrap_or_default()
                ),
            )
            .await;
        }

        if !expired.is_empty() {
            info!(swept = expired.len(), "expired assignments deactivated");
        }

        Ok(expired.len())
    }

    /// Runs the expiry sweep on behalf of a platform admin.
    pub async fn cleanup_expired_assignments(&self, actor: &IdentityContext) -> AppResult<usize> {
        let now = Utc::now();
        if !self
            .authorization_service
            .is_platform_admin_at(actor, now)
            .await?
        {
            return Err(AppError::Forbidden(format!(
                "subject '{}' may not trigger the expiry sweep",
                actor.subject()
            )));
        }

        self.sweep_expired(now).await
    }
}
