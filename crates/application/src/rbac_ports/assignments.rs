use async_trait::async_trait;
use chrono::{DateTime, Utc};

use fleetdesk_core::{AgencyId, AppResult, TenantId, UserId};
use fleetdesk_domain::{AssignmentId, RoleAssignment, RoleId};

/// Query parameters for assignment listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentQuery {
    /// Optional grantee filter.
    pub user_id: Option<UserId>,
    /// Optional role filter.
    pub role_id: Option<RoleId>,
    /// Optional agency filter.
    pub agency_id: Option<AgencyId>,
    /// Whether to return only rows with the active flag set.
    pub active_only: bool,
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for pagination.
    pub offset: usize,
}

impl Default for AssignmentQuery {
    fn default() -> Self {
        Self {
            user_id: None,
            role_id: None,
            agency_id: None,
            active_only: true,
            limit: 50,
            offset: 0,
        }
    }
}

/// Repository port for user↔role assignments.
///
/// Rows are never hard-deleted; deactivation keeps them for audit.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Inserts an active assignment.
    ///
    /// Fails with `AppError::Conflict` when an active assignment for the same user and role
    /// exists. Concurrent inserts for the same pair must let exactly one succeed.
    async fn insert_assignment(&self, assignment: RoleAssignment) -> AppResult<()>;

    /// Finds an assignment by identifier, active or not.
    async fn find_assignment(&self, assignment_id: AssignmentId)
    -> AppResult<Option<RoleAssignment>>;

    /// Finds the active assignment for a user and role.
    async fn find_active_assignment(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<Option<RoleAssignment>>;

    /// Lists assignments of a user in a tenant with the active flag set, expired or not.
    async fn list_active_assignments_for_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> AppResult<Vec<RoleAssignment>>;

    /// Lists tenant assignments, newest first.
    async fn list_assignments(
        &self,
        tenant_id: TenantId,
        query: &AssignmentQuery,
    ) -> AppResult<Vec<RoleAssignment>>;

    /// Counts assignments with the active flag set that reference the role.
    async fn count_active_assignments_for_role(&self, role_id: RoleId) -> AppResult<u64>;

    /// Compare-and-set of the active flag from `true` to `false`.
    ///
    /// Returns `false` when the assignment was already inactive or does not exist.
    async fn deactivate_assignment(
        &self,
        assignment_id: AssignmentId,
        revoked_by: &str,
        revoked_at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Sets a new expiry on an active assignment. Returns `false` when it is no longer active.
    async fn update_expiry(
        &self,
        assignment_id: AssignmentId,
        expires_at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Deactivates every active assignment whose expiry is before `now`.
    ///
    /// Returns the rows this call deactivated; rows already inactive are left untouched.
    async fn deactivate_expired_assignments(
        &self,
        now: DateTime<Utc>,
        revoked_by: &str,
    ) -> AppResult<Vec<RoleAssignment>>;
}
