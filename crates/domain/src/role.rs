use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use fleetdesk_core::{AppError, AppResult, NonEmptyString, TenantId, UserKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Permission, PermissionSet};

/// Maximum accepted role name length.
pub const ROLE_NAME_MAX_LENGTH: usize = 100;

/// Name of the platform-wide super-admin system role.
pub const SUPER_ADMIN_ROLE_NAME: &str = "Platform Super Admin";

/// Unique identifier for a role definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a new random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Role archetype tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    /// Platform-wide super administrator.
    SuperAdmin,
    /// Tenant owner.
    Owner,
    /// Manager of one or more agencies.
    AgencyManager,
    /// Front-desk rental agent.
    RentalAgent,
    /// Rental customer.
    Client,
    /// Tenant-defined role.
    Custom,
}

impl RoleKind {
    /// Returns a stable storage value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Owner => "owner",
            Self::AgencyManager => "agency_manager",
            Self::RentalAgent => "rental_agent",
            Self::Client => "client",
            Self::Custom => "custom",
        }
    }

    /// Archetype auto-granted to new members of the given user kind.
    #[must_use]
    pub fn default_for_user_kind(user_kind: UserKind) -> Option<Self> {
        match user_kind {
            UserKind::PlatformAdmin => None,
            UserKind::TenantOwner => Some(Self::Owner),
            UserKind::TenantStaff => Some(Self::RentalAgent),
            UserKind::EndCustomer => Some(Self::Client),
        }
    }
}

impl FromStr for RoleKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "super_admin" => Ok(Self::SuperAdmin),
            "owner" => Ok(Self::Owner),
            "agency_manager" => Ok(Self::AgencyManager),
            "rental_agent" => Ok(Self::RentalAgent),
            "client" => Ok(Self::Client),
            "custom" => Ok(Self::Custom),
            _ => Err(AppError::Validation(format!(
                "unknown role kind value '{value}'"
            ))),
        }
    }
}

/// Display metadata attached to a role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMetadata {
    /// Hex color such as `#1f6feb`.
    pub color: Option<String>,
    /// Icon identifier understood by the frontend.
    pub icon: Option<String>,
}

impl RoleMetadata {
    /// Creates validated display metadata.
    pub fn new(color: Option<String>, icon: Option<String>) -> AppResult<Self> {
        let color = normalize_optional(color);
        if let Some(color) = color.as_deref() {
            let is_hex = color.len() == 7
                && color.starts_with('#')
                && color[1..].chars().all(|character| character.is_ascii_hexdigit());
            if !is_hex {
                return Err(AppError::Validation(format!(
                    "role color '{color}' must be a '#rrggbb' hex value"
                )));
            }
        }

        Ok(Self {
            color,
            icon: normalize_optional(icon),
        })
    }
}

/// Creation and last-update stamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStamp {
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Subject that created the record.
    pub created_by: String,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Subject that last updated the record.
    pub updated_by: String,
}

impl AuditStamp {
    /// Stamps a freshly created record.
    #[must_use]
    pub fn created(actor: &str, now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            created_by: actor.to_owned(),
            updated_at: now,
            updated_by: actor.to_owned(),
        }
    }

    #[must_use]
    fn touched(&self, actor: &str, now: DateTime<Utc>) -> Self {
        Self {
            created_at: self.created_at,
            created_by: self.created_by.clone(),
            updated_at: now,
            updated_by: actor.to_owned(),
        }
    }
}

/// Input for creating a tenant role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleInput {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Unique name in tenant scope.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Archetype tag.
    pub kind: RoleKind,
    /// Granted permissions.
    pub permissions: PermissionSet,
    /// Display and precedence ordering, higher first.
    pub priority: i32,
    /// Display metadata.
    pub metadata: RoleMetadata,
    /// Whether the role is auto-granted to new members of its kind.
    pub is_default_role: bool,
}

/// Partial update applied to a tenant role. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleUpdate {
    /// New name, re-checked for uniqueness by the store.
    pub name: Option<String>,
    /// New description; `Some(None)` clears it.
    pub description: Option<Option<String>>,
    /// Replacement permission set (full replace, never merged).
    pub permissions: Option<PermissionSet>,
    /// New priority.
    pub priority: Option<i32>,
    /// New display metadata.
    pub metadata: Option<RoleMetadata>,
    /// New default flag.
    pub is_default_role: Option<bool>,
    /// New activation flag.
    pub is_active: Option<bool>,
}

/// Persisted role state used by repositories to rebuild a [`Role`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRecord {
    /// Role identifier.
    pub role_id: RoleId,
    /// Owning tenant, the sentinel for system roles.
    pub tenant_id: TenantId,
    /// Role name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Archetype tag.
    pub kind: RoleKind,
    /// System role marker.
    pub is_system_role: bool,
    /// Default role marker.
    pub is_default_role: bool,
    /// Activation flag.
    pub is_active: bool,
    /// Priority.
    pub priority: i32,
    /// Granted permissions.
    pub permissions: PermissionSet,
    /// Display metadata.
    pub metadata: RoleMetadata,
    /// Audit stamps.
    pub audit: AuditStamp,
}

/// Named bundle of permissions scoped to one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    role_id: RoleId,
    tenant_id: TenantId,
    name: NonEmptyString,
    description: Option<String>,
    kind: RoleKind,
    is_system_role: bool,
    is_default_role: bool,
    is_active: bool,
    priority: i32,
    permissions: PermissionSet,
    metadata: RoleMetadata,
    audit: AuditStamp,
}

impl Role {
    /// Creates a tenant role with validated fields.
    pub fn new(input: RoleInput, actor: &str, now: DateTime<Utc>) -> AppResult<Self> {
        if input.tenant_id.is_system() {
            return Err(AppError::Validation(
                "tenant roles cannot use the system tenant".to_owned(),
            ));
        }

        if input.kind == RoleKind::SuperAdmin {
            return Err(AppError::Validation(
                "super_admin roles are reserved for the platform".to_owned(),
            ));
        }

        Ok(Self {
            role_id: RoleId::new(),
            tenant_id: input.tenant_id,
            name: validate_role_name(input.name)?,
            description: normalize_optional(input.description),
            kind: input.kind,
            is_system_role: false,
            is_default_role: input.is_default_role,
            is_active: true,
            priority: input.priority,
            permissions: input.permissions,
            metadata: input.metadata,
            audit: AuditStamp::created(actor, now),
        })
    }

    /// Creates the platform super-admin system role holding every permission.
    pub fn super_admin(now: DateTime<Utc>) -> AppResult<Self> {
        Ok(Self {
            role_id: RoleId::new(),
            tenant_id: TenantId::system(),
            name: NonEmptyString::new(SUPER_ADMIN_ROLE_NAME)?,
            description: Some("Full platform access across every tenant".to_owned()),
            kind: RoleKind::SuperAdmin,
            is_system_role: true,
            is_default_role: false,
            is_active: true,
            priority: i32::MAX,
            permissions: PermissionSet::all(),
            metadata: RoleMetadata::default(),
            audit: AuditStamp::created("system", now),
        })
    }

    /// Rebuilds a role from persisted state.
    pub fn restore(record: RoleRecord) -> AppResult<Self> {
        if record.is_system_role != record.tenant_id.is_system() {
            return Err(AppError::Internal(format!(
                "role '{}' has inconsistent system scope",
                record.role_id
            )));
        }

        Ok(Self {
            role_id: record.role_id,
            tenant_id: record.tenant_id,
            name: NonEmptyString::new(record.name)?,
            description: record.description,
            kind: record.kind,
            is_system_role: record.is_system_role,
            is_default_role: record.is_default_role,
            is_active: record.is_active,
            priority: record.priority,
            permissions: record.permissions,
            metadata: record.metadata,
            audit: record.audit,
        })
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    /// Returns the owning tenant.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the role name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the archetype tag.
    #[must_use]
    pub fn kind(&self) -> RoleKind {
        self.kind
    }

    /// Returns whether this is an immutable platform role.
    #[must_use]
    pub fn is_system_role(&self) -> bool {
        self.is_system_role
    }

    /// Returns whether new members of the role kind receive this role.
    #[must_use]
    pub fn is_default_role(&self) -> bool {
        self.is_default_role
    }

    /// Returns whether the role contributes permissions.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the display priority.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns the granted permissions.
    #[must_use]
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Returns whether the role grants the permission.
    #[must_use]
    pub fn grants(&self, permission: Permission) -> bool {
        self.permissions.contains(permission)
    }

    /// Returns display metadata.
    #[must_use]
    pub fn metadata(&self) -> &RoleMetadata {
        &self.metadata
    }

    /// Returns audit stamps.
    #[must_use]
    pub fn audit(&self) -> &AuditStamp {
        &self.audit
    }

    /// Fails when the role may not be changed.
    pub fn ensure_mutable(&self) -> AppResult<()> {
        if self.is_system_role {
            return Err(AppError::ImmutableRole(format!(
                "system role '{}' cannot be modified",
                self.name
            )));
        }

        Ok(())
    }

    /// Fails when the role may not be deleted.
    pub fn ensure_deletable(&self) -> AppResult<()> {
        self.ensure_mutable()?;

        if self.is_default_role {
            return Err(AppError::ImmutableRole(format!(
                "default role '{}' cannot be deleted while marked default",
                self.name
            )));
        }

        Ok(())
    }

    /// Returns a new role value with the update applied.
    pub fn updated(&self, update: RoleUpdate, actor: &str, now: DateTime<Utc>) -> AppResult<Self> {
        self.ensure_mutable()?;

        let name = match update.name {
            Some(name) => validate_role_name(name)?,
            None => self.name.clone(),
        };

        Ok(Self {
            role_id: self.role_id,
            tenant_id: self.tenant_id,
            name,
            description: update
                .description
                .map(normalize_optional)
                .unwrap_or_else(|| self.description.clone()),
            kind: self.kind,
            is_system_role: false,
            is_default_role: update.is_default_role.unwrap_or(self.is_default_role),
            is_active: update.is_active.unwrap_or(self.is_active),
            priority: update.priority.unwrap_or(self.priority),
            permissions: update
                .permissions
                .unwrap_or_else(|| self.permissions.clone()),
            metadata: update.metadata.unwrap_or_else(|| self.metadata.clone()),
            audit: self.audit.touched(actor, now),
        })
    }

    /// Copies this role under a new name, optionally into another tenant.
    ///
    /// The copy is never a default or system role.
    pub fn cloned_as(
        &self,
        new_name: String,
        tenant_id: TenantId,
        actor: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let kind = match self.kind {
            RoleKind::SuperAdmin => RoleKind::Custom,
            kind => kind,
        };

        Self::new(
            RoleInput {
                tenant_id,
                name: new_name,
                description: self.description.clone(),
                kind,
                permissions: self.permissions.clone(),
                priority: self.priority,
                metadata: self.metadata.clone(),
                is_default_role: false,
            },
            actor,
            now,
        )
    }
}

/// Template instantiated for every new tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultRoleTemplate {
    /// Role name.
    pub name: &'static str,
    /// Role description.
    pub description: &'static str,
    /// Archetype tag.
    pub kind: RoleKind,
    /// Display priority.
    pub priority: i32,
    /// Curated permission subset.
    pub permissions: PermissionSet,
    /// Display color.
    pub color: &'static str,
    /// Display icon.
    pub icon: &'static str,
}

impl DefaultRoleTemplate {
    /// Builds the role input for the given tenant.
    #[must_use]
    pub fn to_input(&self, tenant_id: TenantId) -> RoleInput {
        RoleInput {
            tenant_id,
            name: self.name.to_owned(),
            description: Some(self.description.to_owned()),
            kind: self.kind,
            permissions: self.permissions.clone(),
            priority: self.priority,
            metadata: RoleMetadata {
                color: Some(self.color.to_owned()),
                icon: Some(self.icon.to_owned()),
            },
            is_default_role: true,
        }
    }
}

/// Returns the fixed role templates provisioned at tenant creation.
#[must_use]
pub fn default_role_templates() -> Vec<DefaultRoleTemplate> {
    use Permission as P;

    vec![
        DefaultRoleTemplate {
            name: "Owner",
            description: "Full control over the organization and all agencies",
            kind: RoleKind::Owner,
            priority: 100,
            permissions: Permission::all()
                .iter()
                .copied()
                .filter(|permission| *permission != P::PlatformAdmin)
                .collect(),
            color: "#7c3aed",
            icon: "crown",
        },
        DefaultRoleTemplate {
            name: "Agency Manager",
            description: "Runs an agency: fleet, drivers, staff and rentals",
            kind: RoleKind::AgencyManager,
            priority: 80,
            permissions: PermissionSet::from_permissions([
                P::OrganizationRead,
                P::AgencyRead,
                P::AgencyUpdate,
                P::VehicleRead,
                P::VehicleWrite,
                P::VehicleDelete,
                P::VehicleMaintenance,
                P::DriverRead,
                P::DriverWrite,
                P::DriverDelete,
                P::RentalRead,
                P::RentalCreate,
                P::RentalUpdate,
                P::RentalCancel,
                P::RentalClose,
                P::CustomerRead,
                P::CustomerWrite,
                P::StaffRead,
                P::StaffManage,
                P::RoleRead,
                P::RoleAssign,
                P::PaymentRead,
                P::PaymentRecord,
                P::ReportRead,
                P::ReportExport,
            ]),
            color: "#2563eb",
            icon: "building",
        },
        DefaultRoleTemplate {
            name: "Rental Agent",
            description: "Handles day-to-day rentals at the counter",
            kind: RoleKind::RentalAgent,
            priority: 50,
            permissions: PermissionSet::from_permissions([
                P::AgencyRead,
                P::VehicleRead,
                P::DriverRead,
                P::RentalRead,
                P::RentalCreate,
                P::RentalUpdate,
                P::RentalClose,
                P::CustomerRead,
                P::CustomerWrite,
                P::PaymentRead,
                P::PaymentRecord,
            ]),
            color: "#059669",
            icon: "key",
        },
        DefaultRoleTemplate {
            name: "Client",
            description: "Rental customer browsing vehicles and own rentals",
            kind: RoleKind::Client,
            priority: 10,
            permissions: PermissionSet::from_permissions([
                P::AgencyRead,
                P::VehicleRead,
                P::RentalRead,
                P::RentalCreate,
            ]),
            color: "#64748b",
            icon: "user",
        },
    ]
}

fn validate_role_name(name: String) -> AppResult<NonEmptyString> {
    let name = NonEmptyString::new(name)?;
    if name.as_str().chars().count() > ROLE_NAME_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "role name must not exceed {ROLE_NAME_MAX_LENGTH} characters"
        )));
    }

    Ok(name)
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
