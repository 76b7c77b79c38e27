use serde::{Deserialize, Serialize};

use crate::{AgencyId, TenantId, UserId};

/// Coarse user classification supplied by the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserKind {
    /// Platform operator, outside the tenant model entirely.
    PlatformAdmin,
    /// Owner of the tenant organization.
    TenantOwner,
    /// Staff member of the tenant, usually bound to one agency.
    TenantStaff,
    /// Rental customer.
    EndCustomer,
}

impl UserKind {
    /// Returns a stable storage value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlatformAdmin => "platform_admin",
            Self::TenantOwner => "tenant_owner",
            Self::TenantStaff => "tenant_staff",
            Self::EndCustomer => "end_customer",
        }
    }
}

/// Identity of the caller, passed explicitly into every authorization decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityContext {
    user_id: UserId,
    display_name: String,
    tenant_id: TenantId,
    agency_id: Option<AgencyId>,
    user_kind: UserKind,
}

impl IdentityContext {
    /// Creates an identity context from session and tenancy data.
    #[must_use]
    pub fn new(
        user_id: UserId,
        display_name: impl Into<String>,
        tenant_id: TenantId,
        agency_id: Option<AgencyId>,
        user_kind: UserKind,
    ) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            tenant_id,
            agency_id,
            user_kind,
        }
    }

    /// Returns the current user identifier.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the display name for the current user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the tenant the user is signed into.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the agency the user is bound to, if any.
    #[must_use]
    pub fn agency_id(&self) -> Option<AgencyId> {
        self.agency_id
    }

    /// Returns the coarse user kind.
    #[must_use]
    pub fn user_kind(&self) -> UserKind {
        self.user_kind
    }

    /// Platform admins bypass tenant and agency scoping.
    #[must_use]
    pub fn is_platform_admin(&self) -> bool {
        self.user_kind == UserKind::PlatformAdmin
    }

    /// Returns whether the user owns the given tenant.
    #[must_use]
    pub fn is_owner_of(&self, tenant_id: TenantId) -> bool {
        self.user_kind == UserKind::TenantOwner && self.tenant_id == tenant_id
    }

    /// Returns whether the user may act inside the given tenant at all.
    #[must_use]
    pub fn belongs_to(&self, tenant_id: TenantId) -> bool {
        self.is_platform_admin() || self.tenant_id == tenant_id
    }

    /// Audit label for this actor.
    #[must_use]
    pub fn subject(&self) -> String {
        self.user_id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{IdentityContext, UserKind};
    use crate::{TenantId, UserId};

    #[test]
    fn platform_admin_belongs_to_every_tenant() {
        let identity = IdentityContext::new(
            UserId::new(),
            "root",
            TenantId::system(),
            None,
            UserKind::PlatformAdmin,
        );

        assert!(identity.belongs_to(TenantId::new()));
        assert!(!identity.is_owner_of(TenantId::new()));
    }

    #[test]
    fn staff_only_belongs_to_own_tenant() {
        let tenant_id = TenantId::new();
        let identity =
            IdentityContext::new(UserId::new(), "sam", tenant_id, None, UserKind::TenantStaff);

        assert!(identity.belongs_to(tenant_id));
        assert!(!identity.belongs_to(TenantId::new()));
        assert!(!identity.is_owner_of(tenant_id));
    }
}
