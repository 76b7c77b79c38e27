use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use fleetdesk_application::{AssignmentQuery, AssignmentRepository};
use fleetdesk_core::{AgencyId, AppError, AppResult, TenantId, UserId};
use fleetdesk_domain::{AssignmentId, RoleAssignment, RoleAssignmentRecord, RoleId};


/// PostgreSQL-backed assignment store.
///
/// Duplicate active assignments are prevented by a partial unique index on
/// `(user_id, role_id) WHERE is_active`.
#[derive(Clone)]
pub struct PostgresAssignmentRepository {
    pool: PgPool,
}

impl PostgresAssignmentRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    id: Uuid,
    user_id: Uuid,
    role_id: Uuid,
    tenant_id: Uuid,
    agency_id: Option<Uuid>,
    assigned_at: DateTime<Utc>,
    assigned_by: String,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
    reason: Option<String>,
    revoked_at: Option<DateTime<Utc>>,
    revoked_by: Option<String>,
}

impl From<AssignmentRow> for RoleAssignment {
    fn from(row: AssignmentRow) -> Self {
        RoleAssignment::restore(RoleAssignmentRecord {
            assignment_id: AssignmentId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            role_id: RoleId::from_uuid(row.role_id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            agency_id: row.agency_id.map(AgencyId::from_uuid),
            assigned_at: row.assigned_at,
            assigned_by: row.assigned_by,
            expires_at: row.expires_at,
            is_active: row.is_active,
            reason: row.reason,
            revoked_at: row.revoked_at,
            revoked_by: row.revoked_by,
        })
    }
}

#[async_trait]
impl AssignmentRepository for PostgresAssignmentRepository {
    async fn insert_assignment(&self, assignment: RoleAssignment) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rbac_role_assignments (
                id,
                user_id,
                role_id,
                tenant_id,
                agency_id,
                assigned_at,
                assigned_by,
                expires_at,
                is_active,
                reason
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, true, $9)
            "#,
        )
        .bind(assignment.assignment_id().as_uuid())
        .bind(assignment.user_id().as_uuid())
        .bind(assignment.role_id().as_uuid())
        .bind(assignment.tenant_id().as_uuid())
        .bind(assignment.agency_id().map(|agency_id| agency_id.as_uuid()))
        .bind(assignment.assigned_at())
        .bind(assignment.assigned_by())
        .bind(assignment.expires_at())
        .bind(assignment.reason())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if let sqlx::Error::Database(database_error) = &error
                && database_error.code().as_deref() == Some("23505")
            {
                return AppError::Conflict(format!(
                    "user '{}' already has an active assignment of role '{}'",
                    assignment.user_id(),
                    assignment.role_id()
                ));
            }

            AppError::Internal(format!("failed to insert role assignment: {error}"))
        })?;

        Ok(())
    }

    async fn find_assignment(
        &self,
        assignment_id: AssignmentId,
    ) -> AppResult<Option<RoleAssignment>> {
        let row = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT
                id, user_id, role_id, tenant_id, agency_id, assigned_at, assigned_by,
                expires_at, is_active, reason, revoked_at, revoked_by
            FROM rbac_role_assignments
            WHERE id = $1
            "#,
        )
        .bind(assignment_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role assignment: {error}")))?;

        Ok(row.map(RoleAssignment::from))
    }

    async fn find_active_assignment(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<Option<RoleAssignment>> {
        let row = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT
                id, user_id, role_id, tenant_id, agency_id, assigned_at, assigned_by,
                expires_at, is_active, reason, revoked_at, revoked_by
            FROM rbac_role_assignments
            WHERE user_id = $1
              AND role_id = $2
              AND is_active
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find active role assignment: {error}"))
        })?;

        Ok(row.map(RoleAssignment::from))
    }

    async fn list_active_assignments_for_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> AppResult<Vec<RoleAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT
                id, user_id, role_id, tenant_id, agency_id, assigned_at, assigned_by,
                expires_at, is_active, reason, revoked_at, revoked_by
            FROM rbac_role_assignments
            WHERE tenant_id = $1
              AND user_id = $2
              AND is_active
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list user role assignments: {error}"))
        })?;

        Ok(rows.into_iter().map(RoleAssignment::from).collect())
    }

    async fn list_assignments(
        &self,
        tenant_id: TenantId,
        query: &AssignmentQuery,
    ) -> AppResult<Vec<RoleAssignment>> {
        let limit = i64::try_from(query.limit)
            .map_err(|error| AppError::Validation(format!("invalid limit: {error}")))?;
        let offset = i64::try_from(query.offset)
            .map_err(|error| AppError::Validation(format!("invalid offset: {error}")))?;

        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT
                id, user_id, role_id, tenant_id, agency_id, assigned_at, assigned_by,
                expires_at, is_active, reason, revoked_at, revoked_by
            FROM rbac_role_assignments
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR user_id = $2)
              AND ($3::uuid IS NULL OR role_id = $3)
              AND ($4::uuid IS NULL OR agency_id = $4)
              AND (NOT $5 OR is_active)
            ORDER BY assigned_at DESC
            LIMIT $6
            OFFSET $7
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(query.user_id.map(|user_id| user_id.as_uuid()))
        .bind(query.role_id.map(|role_id| role_id.as_uuid()))
        .bind(query.agency_id.map(|agency_id| agency_id.as_uuid()))
        .bind(query.active_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list role assignments: {error}")))?;

        Ok(rows.into_iter().map(RoleAssignment::from).collect())
    }

    async fn count_active_assignments_for_role(&self, role_id: RoleId) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM rbac_role_assignments
            WHERE role_id = $1
              AND is_active
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to count role assignments: {error}"))
        })?;

        u64::try_from(count)
            .map_err(|error| AppError::Internal(format!("invalid assignment count: {error}")))
    }

    async fn deactivate_assignment(
        &self,
        assignment_id: AssignmentId,
        revoked_by: &str,
        revoked_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE rbac_role_assignments
            SET is_active = false,
                revoked_at = $2,
                revoked_by = $3
            WHERE id = $1
              AND is_active
            "#,
        )
        .bind(assignment_id.as_uuid())
        .bind(revoked_at)
        .bind(revoked_by)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to deactivate role assignment: {error}"))
        })?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_expiry(
        &self,
        assignment_id: AssignmentId,
        expires_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE rbac_role_assignments
            SET expires_at = $2
            WHERE id = $1
              AND is_active
            "#,
        )
        .bind(assignment_id.as_uuid())
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to update assignment expiry: {error}"))
        })?;

        Ok(result.rows_affected() == 1)
    }

    async fn deactivate_expired_assignments(
        &self,
        now: DateTime<Utc>,
        revoked_by: &str,
    ) -> AppResult<Vec<RoleAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            UPDATE rbac_role_assignments
            SET is_active = false,
                revoked_at = $1,
                revoked_by = $2
            WHERE is_active
              AND expires_at IS NOT NULL
              AND expires_at < $1
            RETURNING
                id, user_id, role_id, tenant_id, agency_id, assigned_at, assigned_by,
                expires_at, is_active, reason, revoked_at, revoked_by
            "#,
        )
        .bind(now)
        .bind(revoked_by)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to deactivate expired assignments: {error}"))
        })?;

        Ok(rows.into_iter().map(RoleAssignment::from).collect())
    }
}
