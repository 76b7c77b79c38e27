use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use fleetdesk_application::{AuditEvent, AuditRepository};
use fleetdesk_core::{AppError, AppResult, TenantId};


/// Append-only audit trail for RBAC mutations stored in `audit_log_entries`.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

/// One stored audit row, newest first when listed.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct StoredAuditEntry {
    /// Actor subject recorded with the event.
    pub subject: String,
    /// Stable action identifier such as `security.role.created`.
    pub action: String,
    /// Resource type label.
    pub resource_type: String,
    /// Resource identifier.
    pub resource_id: String,
    /// Optional detail payload.
    pub detail: Option<String>,
    /// Insert timestamp.
    pub created_at: DateTime<Utc>,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists the latest audit entries recorded for a tenant.
    pub async fn recent_entries(
        &self,
        tenant_id: TenantId,
        limit: u32,
    ) -> AppResult<Vec<StoredAuditEntry>> {
        sqlx::query_as::<_, StoredAuditEntry>(
            r#"
            SELECT subject, action, resource_type, resource_id, detail, created_at
            FROM audit_log_entries
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list audit entries: {error}")))
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        let AuditEvent {
            tenant_id,
            subject,
            action,
            resource_type,
            resource_id,
            detail,
        } = event;

        sqlx::query(
            r#"
            INSERT INTO audit_log_entries (
                tenant_id, subject, action, resource_type, resource_id, detail
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(subject)
        .bind(action.as_str())
        .bind(resource_type)
        .bind(resource_id)
        .bind(detail)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to append audit event '{}': {error}",
                action.as_str()
            ))
        })?;

        Ok(())
    }
}
