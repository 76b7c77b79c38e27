//! Fleetdesk role assignment expiry worker.

#![forbid(unsafe_code)]

mod config;

use std::sync::Arc;

use chrono::Utc;
use fleetdesk_application::{AssignmentService, AuthorizationService, RoleService};
use fleetdesk_core::{AppError, AppResult};
use fleetdesk_infrastructure::{
    PostgresAssignmentRepository, PostgresAuditRepository, PostgresRoleRepository,
    PostgresUserDirectory, run_migrations,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::WorkerConfig;

struct Services {
    roles: RoleService,
    assignments: AssignmentService,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let pool = connect_pool(&config).await?;
    run_migrations(&pool).await?;
    let services = build_services(pool);

    if let Some(role) = services.roles.provision_system_roles().await? {
        info!(role_id = %role.role_id(), "provisioned platform super admin role");
    }

    info!(
        sweep_interval_seconds = config.sweep_interval.as_secs(),
        run_once = config.run_once,
        "fleetdesk-worker started"
    );

    loop {
        match services.assignments.sweep_expired(Utc::now()).await {
            Ok(0) => {}
            Ok(expired) => info!(expired, "deactivated expired role assignments"),
            Err(error) if config.run_once => return Err(error),
            Err(error) => warn!(error = %error, "expiry sweep failed"),
        }

        if config.run_once {
            return Ok(());
        }

        tokio::time::sleep(config.sweep_interval).await;
    }
}

async fn connect_pool(config: &WorkerConfig) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(config.database_url.as_str())
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn build_services(pool: PgPool) -> Services {
    let role_repository = Arc::new(PostgresRoleRepository::new(pool.clone()));
    let assignment_repository = Arc::new(PostgresAssignmentRepository::new(pool.clone()));
    let user_directory = Arc::new(PostgresUserDirectory::new(pool.clone()));
    let audit_repository = Arc::new(PostgresAuditRepository::new(pool));
    let authorization_service =
        AuthorizationService::new(role_repository.clone(), assignment_repository.clone());

    Services {
        roles: RoleService::new(
            authorization_service.clone(),
            role_repository.clone(),
            assignment_repository.clone(),
            audit_repository.clone(),
        ),
        assignments: AssignmentService::new(
            authorization_service,
            role_repository,
            assignment_repository,
            user_directory,
            audit_repository,
        ),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
