use chrono::Utc;
use fleetdesk_core::{AppError, TenantId, UserId, UserKind};
use fleetdesk_domain::{
    AuditAction, Permission, Role, RoleKind, SUPER_ADMIN_ROLE_NAME, default_role_templates,
};

use crate::test_support::{Harness, audit_stamp_is_set, platform_admin, staff};

use super::{CreateRoleInput, RoleMetadataInput, UpdateRoleInput};

fn create_input(name: &str, codes: &[&str]) -> CreateRoleInput {
    CreateRoleInput {
        name: name.to_owned(),
        description: Some("Counter staff".to_owned()),
        kind: RoleKind::Custom,
        permission_codes: codes.iter().map(|code| (*code).to_owned()).collect(),
        priority: 40,
        metadata: RoleMetadataInput {
            color: Some("#1f6feb".to_owned()),
            icon: Some("badge".to_owned()),
        },
    }
}

async fn system_role(harness: &Harness) -> Role {
    let Ok(Some(role)) = harness.role_service.provision_system_roles().await else {
        panic!("system role should be provisioned");
    };
    role
}

#[tokio::test]
async fn create_role_validates_and_audits() {
    let harness = Harness::new();
    let tenant_id = TenantId::new();
    let actor = harness
        .actor_with(tenant_id, UserKind::TenantOwner, &[Permission::RoleManage])
        .await;

    let created = harness
        .role_service
        .create_role(
            &actor,
            tenant_id,
            create_input("Counter", &["vehicle_read", "rental_create"]),
        )
        .await;

    let Ok(role) = created else {
        panic!("role creation should succeed");
    };
    assert_eq!(role.name(), "Counter");
    assert_eq!(role.permissions().len(), 2);
    assert!(!role.is_default_role());
    assert!(audit_stamp_is_set(role.audit()));
    assert_eq!(role.audit().created_by, actor.subject());

    let events = harness.audit.events.lock().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::SecurityRoleCreated);
    assert_eq!(events[0].resource_id, role.role_id().to_string());
}

#[tokio::test]
async fn create_role_rejects_unknown_codes() {
    let harness = Harness::new();
    let tenant_id = TenantId::new();

    let result = harness
        .role_service
        .create_role(
            &platform_admin(),
            tenant_id,
            create_input("Broken", &["vehicle_read", "vehicle_fly", "warp_drive"]),
        )
        .await;

    let Err(AppError::Validation(message)) = result else {
        panic!("unknown codes should be a validation error");
    };
    assert!(message.contains("vehicle_fly"));
    assert!(message.contains("warp_drive"));
    assert!(harness.roles.roles.lock().await.is_empty());
}

#[tokio::test]
async fn duplicate_name_conflicts_only_within_tenant() {
    let harness = Harness::new();
    let admin = platform_admin();
    let tenant_a = TenantId::new();
    let tenant_b = TenantId::new();
    let service = &harness.role_service;

    let first = service
        .create_role(&admin, tenant_a, create_input("Dispatcher", &["vehicle_read"]))
        .await;
    let second = service
        .create_role(&admin, tenant_a, create_input("Dispatcher", &["vehicle_read"]))
        .await;
    let other_tenant = service
        .create_role(&admin, tenant_b, create_input("Dispatcher", &["vehicle_read"]))
        .await;

    assert!(first.is_ok());
    assert!(matches!(second, Err(AppError::Conflict(_))));
    assert!(other_tenant.is_ok());
}

#[tokio::test]
async fn create_role_requires_role_manage() {
    let harness = Harness::new();
    let tenant_id = TenantId::new();
    let actor = harness
        .actor_with(tenant_id, UserKind::TenantStaff, &[Permission::RoleRead])
        .await;

    let result = harness
        .role_service
        .create_role(&actor, tenant_id, create_input("Sneaky", &["vehicle_read"]))
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn update_role_replaces_permissions_and_renames() {
    let harness = Harness::new();
    let admin = platform_admin();
    let tenant_id = TenantId::new();
    let Ok(role) = harness
        .role_service
        .create_role(
            &admin,
            tenant_id,
            create_input("Counter", &["vehicle_read", "rental_create"]),
        )
        .await
    else {
        panic!("role creation should succeed");
    };

    let updated = harness
        .role_service
        .update_role(
            &admin,
            role.role_id(),
            UpdateRoleInput {
                name: Some("Front Desk".to_owned()),
                permission_codes: Some(vec!["rental_read".to_owned()]),
                description: Some(None),
                ..Default::default()
            },
        )
        .await;

    let Ok(updated) = updated else {
        panic!("update should succeed");
    };
    assert_eq!(updated.name(), "Front Desk");
    assert_eq!(updated.description(), None);
    assert!(updated.grants(Permission::RentalRead));
    assert!(!updated.grants(Permission::VehicleRead));
    assert_eq!(updated.priority(), 40);

    let stored = harness.roles.roles.lock().await.get(&role.role_id()).cloned();
    assert_eq!(stored, Some(updated));
}

#[tokio::test]
async fn rename_to_existing_name_conflicts() {
    let harness = Harness::new();
    let admin = platform_admin();
    let tenant_id = TenantId::new();
    harness.seed_role(tenant_id, "Taken", &[]).await;
    let role = harness.seed_role(tenant_id, "Free", &[]).await;

    let result = harness
        .role_service
        .update_role(
            &admin,
            role.role_id(),
            UpdateRoleInput {
                name: Some("Taken".to_owned()),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn system_role_is_immutable_for_everyone() {
    let harness = Harness::new();
    let role = system_role(&harness).await;
    let service = &harness.role_service;

    let admin_update = service
        .update_role(
            &platform_admin(),
            role.role_id(),
            UpdateRoleInput {
                priority: Some(1),
                ..Default::default()
            },
        )
        .await;
    let staff_update = service
        .update_role(
            &staff(TenantId::new(), UserId::new()),
            role.role_id(),
            UpdateRoleInput::default(),
        )
        .await;
    let admin_delete = service.delete_role(&platform_admin(), role.role_id()).await;

    assert!(matches!(admin_update, Err(AppError::ImmutableRole(_))));
    assert!(matches!(staff_update, Err(AppError::ImmutableRole(_))));
    assert!(matches!(admin_delete, Err(AppError::ImmutableRole(_))));
}

#[tokio::test]
async fn default_role_cannot_be_deleted() {
    let harness = Harness::new();
    let tenant_id = TenantId::new();
    let Ok(created) = harness
        .role_service
        .provision_default_roles(tenant_id, "onboarding")
        .await
    else {
        panic!("provisioning should succeed");
    };
    let Some(owner) = created.iter().find(|role| role.kind() == RoleKind::Owner) else {
        panic!("owner role should be provisioned");
    };

    let result = harness
        .role_service
        .delete_role(&platform_admin(), owner.role_id())
        .await;

    assert!(matches!(result, Err(AppError::ImmutableRole(_))));
}

#[tokio::test]
async fn delete_is_blocked_until_assignments_are_revoked() {
    let harness = Harness::new();
    let admin = platform_admin();
    let tenant_id = TenantId::new();
    let role = harness
        .seed_role(tenant_id, "Seasonal", &[Permission::VehicleRead])
        .await;
    let first = harness
        .seed_assignment(UserId::new(), &role, None, None)
        .await;
    let second = harness
        .seed_assignment(UserId::new(), &role, None, None)
        .await;

    let blocked = harness.role_service.delete_role(&admin, role.role_id()).await;
    assert!(matches!(blocked, Err(AppError::RoleInUse(_))));

    for assignment in [first, second] {
        let revoked = harness
            .assignment_service
            .revoke_assignment(&admin, assignment.assignment_id())
            .await;
        assert!(revoked.is_ok());
    }

    let deleted = harness.role_service.delete_role(&admin, role.role_id()).await;
    assert!(deleted.is_ok());
    assert!(harness.roles.roles.lock().await.is_empty());
}

#[tokio::test]
async fn role_writes_complete_while_audit_store_is_down() {
    let harness = Harness::new();
    let admin = platform_admin();
    let tenant_id = TenantId::new();
    harness.audit.go_offline();
    let service = &harness.role_service;

    let created = service
        .create_role(&admin, tenant_id, create_input("Counter", &["vehicle_read"]))
        .await;
    let Ok(role) = created else {
        panic!("role creation should be reported once it is stored");
    };
    let updated = service
        .update_role(
            &admin,
            role.role_id(),
            UpdateRoleInput {
                name: Some("Front Desk".to_owned()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(updated, Ok(ref renamed) if renamed.name() == "Front Desk"));

    let deleted = service.delete_role(&admin, role.role_id()).await;
    assert!(deleted.is_ok());
    assert!(harness.roles.roles.lock().await.is_empty());
    assert!(harness.audit.events.lock().await.is_empty());
}

#[tokio::test]
async fn clone_role_never_copies_default_flag() {
    let harness = Harness::new();
    let admin = platform_admin();
    let tenant_id = TenantId::new();
    let target_tenant = TenantId::new();
    let Ok(created) = harness
        .role_service
        .provision_default_roles(tenant_id, "onboarding")
        .await
    else {
        panic!("provisioning should succeed");
    };
    let Some(agent) = created
        .iter()
        .find(|role| role.kind() == RoleKind::RentalAgent)
    else {
        panic!("agent role should be provisioned");
    };

    let copy = harness
        .role_service
        .clone_role(
            &admin,
            agent.role_id(),
            "Night Agent".to_owned(),
            Some(target_tenant),
        )
        .await;

    let Ok(copy) = copy else {
        panic!("clone should succeed");
    };
    assert_eq!(copy.tenant_id(), target_tenant);
    assert_eq!(copy.permissions(), agent.permissions());
    assert_eq!(copy.priority(), agent.priority());
    assert_eq!(copy.metadata(), agent.metadata());
    assert_eq!(copy.kind(), RoleKind::RentalAgent);
    assert!(!copy.is_default_role());
    assert!(!copy.is_system_role());
    assert_ne!(copy.role_id(), agent.role_id());
}

#[tokio::test]
async fn cloning_system_role_into_tenant_makes_custom_role() {
    let harness = Harness::new();
    let role = system_role(&harness).await;
    let tenant_id = TenantId::new();

    let copy = harness
        .role_service
        .clone_role(
            &platform_admin(),
            role.role_id(),
            "Almost Admin".to_owned(),
            Some(tenant_id),
        )
        .await;

    let Ok(copy) = copy else {
        panic!("clone should succeed");
    };
    assert_eq!(copy.kind(), RoleKind::Custom);
    assert!(!copy.is_system_role());
    assert_eq!(copy.tenant_id(), tenant_id);
}

#[tokio::test]
async fn provisioning_is_idempotent() {
    let harness = Harness::new();
    let tenant_id = TenantId::new();
    let service = &harness.role_service;

    let first = service.provision_default_roles(tenant_id, "onboarding").await;
    let second = service.provision_default_roles(tenant_id, "onboarding").await;

    assert!(matches!(first, Ok(ref roles) if roles.len() == default_role_templates().len()));
    assert!(matches!(second, Ok(ref roles) if roles.is_empty()));
    let stored = harness.roles.roles.lock().await;
    assert_eq!(stored.len(), default_role_templates().len());
    assert!(stored.values().all(|role| role.is_default_role()));
}

#[tokio::test]
async fn system_role_provisioning_is_idempotent() {
    let harness = Harness::new();
    let role = system_role(&harness).await;

    let again = harness.role_service.provision_system_roles().await;

    assert!(matches!(again, Ok(None)));
    assert_eq!(role.name(), SUPER_ADMIN_ROLE_NAME);
    assert!(role.is_system_role());
    assert!(role.tenant_id().is_system());
    assert!(role.grants(Permission::PlatformAdmin));
}

#[tokio::test]
async fn list_roles_orders_by_priority_then_name() {
    let harness = Harness::new();
    let tenant_id = TenantId::new();
    let actor = harness
        .actor_with(tenant_id, UserKind::TenantStaff, &[Permission::RoleRead])
        .await;
    let admin = platform_admin();
    for (name, priority) in [("Beta", 20), ("Alpha", 20), ("Gamma", 70)] {
        let mut input = create_input(name, &[]);
        input.priority = priority;
        let created = harness.role_service.create_role(&admin, tenant_id, input).await;
        assert!(created.is_ok());
    }

    let roles = harness.role_service.list_roles(&actor, tenant_id).await;

    let Ok(roles) = roles else {
        panic!("listing should succeed");
    };
    let names: Vec<&str> = roles
        .iter()
        .filter(|role| !role.name().starts_with("operator-"))
        .map(Role::name)
        .collect();
    assert_eq!(names, vec!["Gamma", "Alpha", "Beta"]);
}

#[tokio::test]
async fn get_role_checks_tenant_read_permission() {
    let harness = Harness::new();
    let tenant_id = TenantId::new();
    let role = harness.seed_role(tenant_id, "Private", &[]).await;
    let system = system_role(&harness).await;
    let outsider = staff(TenantId::new(), UserId::new());

    let denied = harness.role_service.get_role(&outsider, role.role_id()).await;
    let system_visible = harness
        .role_service
        .get_role(&outsider, system.role_id())
        .await;
    let missing = harness
        .role_service
        .get_role(&platform_admin(), fleetdesk_domain::RoleId::new())
        .await;

    assert!(matches!(denied, Err(AppError::Forbidden(_))));
    assert!(matches!(system_visible, Ok(found) if found.role_id() == system.role_id()));
    assert!(matches!(missing, Err(AppError::NotFound(_))));
    assert!(Utc::now() >= role.audit().created_at);
}
