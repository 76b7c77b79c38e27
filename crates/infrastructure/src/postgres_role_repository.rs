use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::warn;
use uuid::Uuid;

use fleetdesk_application::RoleRepository;
use fleetdesk_core::{AppError, AppResult, TenantId};
use fleetdesk_domain::{
    AuditStamp, Permission, PermissionSet, Role, RoleId, RoleKind, RoleMetadata, RoleRecord,
};


/// PostgreSQL-backed role store.
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_permissions(
        &self,
        role_ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, Vec<String>>> {
        let rows = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            SELECT role_id, permission
            FROM rbac_role_permissions
            WHERE role_id = ANY($1)
            ORDER BY role_id, permission
            "#,
        )
        .bind(role_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load role permissions: {error}")))?;

        let mut grouped: HashMap<Uuid, Vec<String>> = HashMap::new();
        for row in rows {
            grouped.entry(row.role_id).or_default().push(row.permission);
        }

        Ok(grouped)
    }

    async fn hydrate(&self, rows: Vec<RoleRow>) -> AppResult<Vec<Role>> {
        let role_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut permissions = self.load_permissions(&role_ids).await?;

        rows.into_iter()
            .map(|row| {
                let codes = permissions.remove(&row.id).unwrap_or_default();
                row.into_role(codes)
            })
            .collect()
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: Uuid,
    tenant_id: Uuid,
    name: String,
    description: Option<String>,
    kind: String,
    is_system: bool,
    is_default: bool,
    is_active: bool,
    priority: i32,
    color: Option<String>,
    icon: Option<String>,
    created_at: DateTime<Utc>,
    created_by: String,
    updated_at: DateTime<Utc>,
    updated_by: String,
}

#[derive(Debug, FromRow)]
struct RolePermissionRow {
    role_id: Uuid,
    permission: String,
}

impl RoleRow {
    fn into_role(self, codes: Vec<String>) -> AppResult<Role> {
        let permissions = codes
            .iter()
            .filter_map(|code| match Permission::from_str(code) {
                Ok(permission) => Some(permission),
                Err(_) => {
                    warn!(role_id = %self.id, code = %code, "ignoring permission missing from catalog");
                    None
                }
            })
            .collect::<PermissionSet>();

        Role::restore(RoleRecord {
            role_id: RoleId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            name: self.name,
            description: self.description,
            kind: RoleKind::from_str(self.kind.as_str())?,
            is_system_role: self.is_system,
            is_default_role: self.is_default,
            is_active: self.is_active,
            priority: self.priority,
            permissions,
            metadata: RoleMetadata {
                color: self.color,
                icon: self.icon,
            },
            audit: AuditStamp {
                created_at: self.created_at,
                created_by: self.created_by,
                updated_at: self.updated_at,
                updated_by: self.updated_by,
            },
        })
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn insert_role(&self, role: Role) -> AppResult<()> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        sqlx::query(
            r#"
            INSERT INTO rbac_roles (
                id,
                tenant_id,
                name,
                description,
                kind,
                is_system,
                is_default,
                is_active,
                priority,
                color,
                icon,
                created_at,
                created_by,
                updated_at,
                updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(role.role_id().as_uuid())
        .bind(role.tenant_id().as_uuid())
        .bind(role.name())
        .bind(role.description())
        .bind(role.kind().as_str())
        .bind(role.is_system_role())
        .bind(role.is_default_role())
        .bind(role.is_active())
        .bind(role.priority())
        .bind(role.metadata().color.as_deref())
        .bind(role.metadata().icon.as_deref())
        .bind(role.audit().created_at)
        .bind(role.audit().created_by.as_str())
        .bind(role.audit().updated_at)
        .bind(role.audit().updated_by.as_str())
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_role_conflict(error, role.name(), "create"))?;

        replace_permissions(&mut transaction, &role).await?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(())
    }

    async fn update_role(&self, role: Role) -> AppResult<()> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        let result = sqlx::query(
            r#"
            UPDATE rbac_roles
            SET
                name = $2,
                description = $3,
                is_default = $4,
                is_active = $5,
                priority = $6,
                color = $7,
                icon = $8,
                updated_at = $9,
                updated_by = $10
            WHERE id = $1
              AND is_system = false
            "#,
        )
        .bind(role.role_id().as_uuid())
        .bind(role.name())
        .bind(role.description())
        .bind(role.is_default_role())
        .bind(role.is_active())
        .bind(role.priority())
        .bind(role.metadata().color.as_deref())
        .bind(role.metadata().icon.as_deref())
        .bind(role.audit().updated_at)
        .bind(role.audit().updated_by.as_str())
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_role_conflict(error, role.name(), "update"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "role '{}' does not exist or is a system role",
                role.role_id()
            )));
        }

        sqlx::query(
            r#"
            DELETE FROM rbac_role_permissions
            WHERE role_id = $1
            "#,
        )
        .bind(role.role_id().as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to clear role permissions: {error}"))
        })?;

        replace_permissions(&mut transaction, &role).await?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(())
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM rbac_roles
            WHERE id = $1
              AND NOT EXISTS (
                  SELECT 1
                  FROM rbac_role_assignments
                  WHERE role_id = $1
                    AND is_active
              )
            "#,
        )
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete role: {error}")))?;

        if result.rows_affected() == 0 {
            if self.find_role(role_id).await?.is_some() {
                return Err(AppError::RoleInUse(format!(
                    "role '{role_id}' gained an active assignment before it could be deleted"
                )));
            }

            return Err(AppError::NotFound(format!("role '{role_id}' does not exist")));
        }

        Ok(())
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT
                id, tenant_id, name, description, kind, is_system, is_default, is_active,
                priority, color, icon, created_at, created_by, updated_at, updated_by
            FROM rbac_roles
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role: {error}")))?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    async fn find_role_by_name(&self, tenant_id: TenantId, name: &str) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT
                id, tenant_id, name, description, kind, is_system, is_default, is_active,
                priority, color, icon, created_at, created_by, updated_at, updated_by
            FROM rbac_roles
            WHERE tenant_id = $1
              AND name = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role by name: {error}")))?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    async fn find_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<Role>> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = role_ids.iter().map(RoleId::as_uuid).collect();
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT
                id, tenant_id, name, description, kind, is_system, is_default, is_active,
                priority, color, icon, created_at, created_by, updated_at, updated_by
            FROM rbac_roles
            WHERE id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find roles: {error}")))?;

        self.hydrate(rows).await
    }

    async fn list_roles(&self, tenant_id: TenantId) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT
                id, tenant_id, name, description, kind, is_system, is_default, is_active,
                priority, color, icon, created_at, created_by, updated_at, updated_by
            FROM rbac_roles
            WHERE tenant_id = $1
            ORDER BY name
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        self.hydrate(rows).await
    }
}

async fn replace_permissions(
    transaction: &mut Transaction<'_, Postgres>,
    role: &Role,
) -> AppResult<()> {
    let codes: Vec<String> = role
        .permissions()
        .codes()
        .into_iter()
        .map(str::to_owned)
        .collect();

    if codes.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO rbac_role_permissions (role_id, permission)
        SELECT $1, UNNEST($2::text[])
        ON CONFLICT (role_id, permission) DO NOTHING
        "#,
    )
    .bind(role.role_id().as_uuid())
    .bind(&codes)
    .execute(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to persist role permissions: {error}")))?;

    Ok(())
}

fn map_role_conflict(error: sqlx::Error, role_name: &str, operation: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!("role '{role_name}' already exists"));
    }

    AppError::Internal(format!("failed to {operation} role: {error}"))
}
