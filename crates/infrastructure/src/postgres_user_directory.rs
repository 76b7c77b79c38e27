use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use fleetdesk_application::{UserDirectory, UserProfile};
use fleetdesk_core::{AppError, AppResult, TenantId, UserId};


/// Reads user display data from the `users` table.
#[derive(Clone)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    /// Creates a directory with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts or refreshes a directory entry.
    pub async fn upsert_user(&self, tenant_id: TenantId, profile: &UserProfile) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, tenant_id, display_name, email)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET display_name = EXCLUDED.display_name,
                email = EXCLUDED.email
            "#,
        )
        .bind(profile.user_id.as_uuid())
        .bind(tenant_id.as_uuid())
        .bind(profile.display_name.as_str())
        .bind(profile.email.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to upsert user: {error}")))?;

        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    display_name: String,
    email: Option<String>,
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, display_name, email
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find user: {error}")))?;

        Ok(row.map(|row| UserProfile {
            user_id: UserId::from_uuid(row.id),
            display_name: row.display_name,
            email: row.email,
        }))
    }
}
