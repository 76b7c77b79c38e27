//! Hand-written port fakes shared by service tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetdesk_core::{AgencyId, AppError, AppResult, IdentityContext, TenantId, UserId, UserKind};
use fleetdesk_domain::{
    AssignmentId, AuditStamp, Permission, PermissionSet, Role, RoleAssignment,
    RoleAssignmentRecord, RoleId, RoleInput, RoleKind, RoleMetadata,
};
use tokio::sync::Mutex;

use crate::{
    AssignmentQuery, AssignmentRepository, AssignmentService, AuditEvent, AuditRepository,
    AuthorizationService, RoleRepository, RoleService, UserDirectory, UserProfile,
};

#[derive(Default)]
pub(crate) struct FakeRoleRepository {
    pub(crate) roles: Mutex<HashMap<RoleId, Role>>,
}

#[async_trait]
impl RoleRepository for FakeRoleRepository {
    async fn insert_role(&self, role: Role) -> AppResult<()> {
        let mut roles = self.roles.lock().await;
        if roles
            .values()
            .any(|existing| existing.tenant_id() == role.tenant_id() && existing.name() == role.name())
        {
            return Err(AppError::Conflict(format!("role '{}' already exists", role.name())));
        }

        roles.insert(role.role_id(), role);
        Ok(())
    }

    async fn update_role(&self, role: Role) -> AppResult<()> {
        let mut roles = self.roles.lock().await;
        if !roles.contains_key(&role.role_id()) {
            return Err(AppError::NotFound(format!("role '{}' does not exist", role.role_id())));
        }
        if roles.values().any(|existing| {
            existing.role_id() != role.role_id()
                && existing.tenant_id() == role.tenant_id()
                && existing.name() == role.name()
        }) {
            return Err(AppError::Conflict(format!("role '{}' already exists", role.name())));
        }

        roles.insert(role.role_id(), role);
        Ok(())
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        self.roles
            .lock()
            .await
            .remove(&role_id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self.roles.lock().await.get(&role_id).cloned())
    }

    async fn find_role_by_name(&self, tenant_id: TenantId, name: &str) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .lock()
            .await
            .values()
            .find(|role| role.tenant_id() == tenant_id && role.name() == name)
            .cloned())
    }

    async fn find_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<Role>> {
        let roles = self.roles.lock().await;
        Ok(role_ids
            .iter()
            .filter_map(|role_id| roles.get(role_id).cloned())
            .collect())
    }

    async fn list_roles(&self, tenant_id: TenantId) -> AppResult<Vec<Role>> {
        Ok(self
            .roles
            .lock()
            .await
            .values()
            .filter(|role| role.tenant_id() == tenant_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct FakeAssignmentRepository {
    pub(crate) assignments: Mutex<Vec<RoleAssignment>>,
}

#[async_trait]
impl AssignmentRepository for FakeAssignmentRepository {
    async fn insert_assignment(&self, assignment: RoleAssignment) -> AppResult<()> {
        let mut assignments = self.assignments.lock().await;
        if assignments.iter().any(|existing| {
            existing.is_active()
                && existing.user_id() == assignment.user_id()
                && existing.role_id() == assignment.role_id()
        }) {
            return Err(AppError::Conflict("active assignment already exists".to_owned()));
        }

        assignments.push(assignment);
        Ok(())
    }

    async fn find_assignment(
        &self,
        assignment_id: AssignmentId,
    ) -> AppResult<Option<RoleAssignment>> {
        Ok(self
            .assignments
            .lock()
            .await
            .iter()
            .find(|assignment| assignment.assignment_id() == assignment_id)
            .cloned())
    }

    async fn find_active_assignment(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<Option<RoleAssignment>> {
        Ok(self
            .assignments
            .lock()
            .await
            .iter()
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
            .lock()
            .await
            .iter()
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
        Ok(self
            .assignments
            .lock()
            .await
            .iter()
            .filter(|assignment| assignment.tenant_id() == tenant_id)
            .filter(|assignment| !query.active_only || assignment.is_active())
            .filter(|assignment| query.user_id.is_none_or(|user_id| assignment.user_id() == user_id))
            .filter(|assignment| query.role_id.is_none_or(|role_id| assignment.role_id() == role_id))
            .filter(|assignment| {
                query
                    .agency_id
                    .is_none_or(|agency_id| assignment.agency_id() == Some(agency_id))
            })
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn count_active_assignments_for_role(&self, role_id: RoleId) -> AppResult<u64> {
        let count = self
            .assignments
            .lock()
            .await
            .iter()
            .filter(|assignment| assignment.is_active() && assignment.role_id() == role_id)
            .count();
        Ok(count as u64)
    }

    async fn deactivate_assignment(
        &self,
        assignment_id: AssignmentId,
        revoked_by: &str,
        revoked_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        Ok(self
            .assignments
            .lock()
            .await
            .iter_mut()
            .find(|assignment| assignment.assignment_id() == assignment_id)
            .is_some_and(|assignment| assignment.deactivate(revoked_by, revoked_at)))
    }

    async fn update_expiry(
        &self,
        assignment_id: AssignmentId,
        expires_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        Ok(self
            .assignments
            .lock()
            .await
            .iter_mut()
            .find(|assignment| assignment.assignment_id() == assignment_id)
            .is_some_and(|assignment| assignment.extend_to(expires_at)))
    }

    async fn deactivate_expired_assignments(
        &self,
        now: DateTime<Utc>,
        revoked_by: &str,
    ) -> AppResult<Vec<RoleAssignment>> {
        let mut swept = Vec::new();
        for assignment in self.assignments.lock().await.iter_mut() {
            if assignment.is_expired_at(now) && assignment.deactivate(revoked_by, now) {
                swept.push(assignment.clone());
            }
        }
        Ok(swept)
    }
}

#[derive(Default)]
pub(crate) struct FakeUserDirectory {
    pub(crate) users: Mutex<HashMap<UserId, UserProfile>>,
}

impl FakeUserDirectory {
    pub(crate) async fn add_user(&self, display_name: &str) -> UserId {
        let user_id = UserId::new();
        self.users.lock().await.insert(
            user_id,
            UserProfile {
                user_id,
                display_name: display_name.to_owned(),
                email: Some(format!("{}@example.com", display_name.to_lowercase())),
            },
        );
        user_id
    }
}

#[async_trait]
impl UserDirectory for FakeUserDirectory {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserProfile>> {
        Ok(self.users.lock().await.get(&user_id).cloned())
    }
}

#[derive(Default)]
pub(crate) struct FakeAuditRepository {
    pub(crate) events: Mutex<Vec<AuditEvent>>,
    unavailable: AtomicBool,
}

impl FakeAuditRepository {
    /// Makes every following append fail like an unreachable audit store.
    pub(crate) fn go_offline(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Internal("audit store unavailable".to_owned()));
        }

        self.events.lock().await.push(event);
        Ok(())
    }
}

/// Wires every service over shared fakes.
pub(crate) struct Harness {
    pub(crate) roles: Arc<FakeRoleRepository>,
    pub(crate) assignments: Arc<FakeAssignmentRepository>,
    pub(crate) users: Arc<FakeUserDirectory>,
    pub(crate) audit: Arc<FakeAuditRepository>,
    pub(crate) authorization: AuthorizationService,
    pub(crate) role_service: RoleService,
    pub(crate) assignment_service: AssignmentService,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let roles = Arc::new(FakeRoleRepository::default());
        let assignments = Arc::new(FakeAssignmentRepository::default());
        let users = Arc::new(FakeUserDirectory::default());
        let audit = Arc::new(FakeAuditRepository::default());

        let authorization = AuthorizationService::new(roles.clone(), assignments.clone());
        let role_service = RoleService::new(
            authorization.clone(),
            roles.clone(),
            assignments.clone(),
            audit.clone(),
        );
        let assignment_service = AssignmentService::new(
            authorization.clone(),
            roles.clone(),
            assignments.clone(),
            users.clone(),
            audit.clone(),
        );

        Self {
            roles,
            assignments,
            users,
            audit,
            authorization,
            role_service,
            assignment_service,
        }
    }

    /// Stores a role directly, bypassing the lifecycle service.
    pub(crate) async fn seed_role(
        &self,
        tenant_id: TenantId,
        name: &str,
        permissions: &[Permission],
    ) -> Role {
        let role = Role::new(
            RoleInput {
                tenant_id,
                name: name.to_owned(),
                description: None,
                kind: RoleKind::Custom,
                permissions: PermissionSet::from_permissions(permissions.iter().copied()),
                priority: 10,
                metadata: RoleMetadata::default(),
                is_default_role: false,
            },
            "seed",
            Utc::now(),
        );
        let Ok(role) = role else {
            panic!("seed role '{name}' should be valid");
        };

        self.roles
            .roles
            .lock()
            .await
            .insert(role.role_id(), role.clone());
        role
    }

    /// Stores an assignment row directly, allowing states the service would reject.
    pub(crate) async fn seed_assignment(
        &self,
        user_id: UserId,
        role: &Role,
        agency_id: Option<AgencyId>,
        expires_at: Option<DateTime<Utc>>,
    ) -> RoleAssignment {
        let assignment = RoleAssignment::restore(RoleAssignmentRecord {
            assignment_id: AssignmentId::new(),
            user_id,
            role_id: role.role_id(),
            tenant_id: role.tenant_id(),
            agency_id,
            assigned_at: Utc::now() - chrono::Duration::days(30),
            assigned_by: "seed".to_owned(),
            expires_at,
            is_active: true,
            reason: None,
            revoked_at: None,
            revoked_by: None,
        });

        self.assignments
            .assignments
            .lock()
            .await
            .push(assignment.clone());
        assignment
    }

    /// Creates a user in the directory holding a role with the given permissions.
    pub(crate) async fn actor_with(
        &self,
        tenant_id: TenantId,
        kind: UserKind,
        permissions: &[Permission],
    ) -> IdentityContext {
        let user_id = self.users.add_user("Operator").await;
        let role = self
            .seed_role(tenant_id, &format!("operator-{user_id}"), permissions)
            .await;
        self.seed_assignment(user_id, &role, None, None).await;
        IdentityContext::new(user_id, "Operator", tenant_id, None, kind)
    }
}

pub(crate) fn platform_admin() -> IdentityContext {
    IdentityContext::new(
        UserId::new(),
        "Platform Admin",
        TenantId::system(),
        None,
        UserKind::PlatformAdmin,
    )
}

pub(crate) fn staff(tenant_id: TenantId, user_id: UserId) -> IdentityContext {
    IdentityContext::new(user_id, "Staff", tenant_id, None, UserKind::TenantStaff)
}

pub(crate) fn audit_stamp_is_set(stamp: &AuditStamp) -> bool {
    !stamp.created_by.is_empty() && stamp.updated_at >= stamp.created_at
}
