//! Infrastructure adapters for the RBAC application ports.

#![forbid(unsafe_code)]

mod in_memory_rbac_repository;
mod postgres_assignment_repository;
mod postgres_audit_repository;
mod postgres_role_repository;
mod postgres_user_directory;

use sqlx::PgPool;
use sqlx::migrate::Migrator;

use fleetdesk_core::{AppError, AppResult};

pub use in_memory_rbac_repository::{
    InMemoryAssignmentRepository, InMemoryAuditRepository, InMemoryRoleRepository,
    InMemoryUserDirectory,
};
pub use postgres_assignment_repository::PostgresAssignmentRepository;
pub use postgres_audit_repository::{PostgresAuditRepository, StoredAuditEntry};
pub use postgres_role_repository::PostgresRoleRepository;
pub use postgres_user_directory::PostgresUserDirectory;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Applies the bundled RBAC schema migrations.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))
}
