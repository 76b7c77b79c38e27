use async_trait::async_trait;

use fleetdesk_core::{AppResult, TenantId};
use fleetdesk_domain::{Role, RoleId};

/// Repository port for role definitions.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Inserts a new role.
    ///
    /// Fails with `AppError::Conflict` when the name already exists in the tenant. The check
    /// and the insert are atomic.
    async fn insert_role(&self, role: Role) -> AppResult<()>;

    /// Replaces an existing role, re-checking name uniqueness atomically.
    async fn update_role(&self, role: Role) -> AppResult<()>;

    /// Deletes a role definition.
    ///
    /// Callers check for active assignments first through the assignment store. The two
    /// stores are not locked together, so an assignment created between that check and this
    /// call can outlive the role until it is revoked or expires. Permission evaluation skips
    /// assignments whose role no longer resolves. Stores that share a database with the
    /// assignments should refuse the delete with `RoleInUse` while an active row exists.
    async fn delete_role(&self, role_id: RoleId) -> AppResult<()>;

    /// Finds a role by identifier.
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Finds a role by its tenant-unique name.
    async fn find_role_by_name(&self, tenant_id: TenantId, name: &str) -> AppResult<Option<Role>>;

    /// Resolves several roles at once; unknown identifiers are omitted.
    async fn find_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<Role>>;

    /// Lists roles owned by a tenant.
    async fn list_roles(&self, tenant_id: TenantId) -> AppResult<Vec<Role>>;
}
