//! Closed permission catalog shipped with the software.
//!
//! Permission codes are opaque, case-sensitive strings. Callers persist and compare them
//! verbatim; they are never derived by string manipulation.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use fleetdesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Catalog version, bumped whenever a permission is added or retired.
pub const PERMISSION_CATALOG_VERSION: u16 = 1;

/// Resource category used to group permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionResource {
    /// Tenant organization settings.
    Organization,
    /// Agencies within a tenant.
    Agency,
    /// Fleet vehicles.
    Vehicle,
    /// Drivers attached to agencies.
    Driver,
    /// Rental contracts.
    Rental,
    /// Rental customers.
    Customer,
    /// Agency staff.
    Staff,
    /// Roles and assignments.
    Role,
    /// Tenant subscription plan.
    Subscription,
    /// Payments recorded against rentals.
    Payment,
    /// Reporting.
    Report,
    /// Tenant onboarding wizard.
    Onboarding,
    /// Platform operations.
    Platform,
}

impl PermissionResource {
    /// Returns a stable storage value for this resource.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Agency => "agency",
            Self::Vehicle => "vehicle",
            Self::Driver => "driver",
            Self::Rental => "rental",
            Self::Customer => "customer",
            Self::Staff => "staff",
            Self::Role => "role",
            Self::Subscription => "subscription",
            Self::Payment => "payment",
            Self::Report => "report",
            Self::Onboarding => "onboarding",
            Self::Platform => "platform",
        }
    }
}

impl Display for PermissionResource {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Atomic capability checked by authorization guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Permission {
    OrganizationRead,
    OrganizationUpdate,
    OrganizationManage,
    AgencyRead,
    AgencyCreate,
    AgencyUpdate,
    AgencyDelete,
    VehicleRead,
    VehicleWrite,
    VehicleDelete,
    VehicleMaintenance,
    DriverRead,
    DriverWrite,
    DriverDelete,
    RentalRead,
    RentalCreate,
    RentalUpdate,
    RentalCancel,
    RentalClose,
    CustomerRead,
    CustomerWrite,
    StaffRead,
    StaffManage,
    RoleRead,
    RoleManage,
    RoleAssign,
    SubscriptionRead,
    SubscriptionManage,
    PaymentRead,
    PaymentRecord,
    ReportRead,
    ReportExport,
    OnboardingManage,
    PlatformAdmin,
}

/// Catalog entry describing one permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionInfo {
    /// Stable storage code.
    pub code: &'static str,
    /// Resource category.
    pub resource: PermissionResource,
    /// Human description shown in role editors.
    pub description: &'static str,
}

const fn info(
    code: &'static str,
    resource: PermissionResource,
    description: &'static str,
) -> PermissionInfo {
    PermissionInfo {
        code,
        resource,
        description,
    }
}

impl Permission {
    /// Returns the catalog entry for this permission.
    #[must_use]
    pub const fn info(&self) -> PermissionInfo {
        use PermissionResource as R;

        match self {
            Self::OrganizationRead => info(
                "organization_read",
                R::Organization,
                "View organization profile",
            ),
            Self::OrganizationUpdate => info(
                "organization_update",
                R::Organization,
                "Edit organization profile",
            ),
            Self::OrganizationManage => info(
                "organization_manage",
                R::Organization,
                "Manage organization settings, agencies and members",
            ),
            Self::AgencyRead => info("agency_read", R::Agency, "View agencies"),
            Self::AgencyCreate => info("agency_create", R::Agency, "Create agencies"),
            Self::AgencyUpdate => info("agency_update", R::Agency, "Edit agencies"),
            Self::AgencyDelete => info("agency_delete", R::Agency, "Delete agencies"),
            Self::VehicleRead => info("vehicle_read", R::Vehicle, "View vehicles"),
            Self::VehicleWrite => info("vehicle_write", R::Vehicle, "Create and edit vehicles"),
            Self::VehicleDelete => info("vehicle_delete", R::Vehicle, "Delete vehicles"),
            Self::VehicleMaintenance => info(
                "vehicle_maintenance",
                R::Vehicle,
                "Schedule and record vehicle maintenance",
            ),
            Self::DriverRead => info("driver_read", R::Driver, "View drivers"),
            Self::DriverWrite => info("driver_write", R::Driver, "Create and edit drivers"),
            Self::DriverDelete => info("driver_delete", R::Driver, "Delete drivers"),
            Self::RentalRead => info("rental_read", R::Rental, "View rentals"),
            Self::RentalCreate => info("rental_create", R::Rental, "Create rentals"),
            Self::RentalUpdate => info("rental_update", R::Rental, "Edit rentals"),
            Self::RentalCancel => info("rental_cancel", R::Rental, "Cancel rentals"),
            Self::RentalClose => info(
                "rental_close",
                R::Rental,
                "Close rentals on vehicle return",
            ),
            Self::CustomerRead => info("customer_read", R::Customer, "View customers"),
            Self::CustomerWrite => info(
                "customer_write",
                R::Customer,
                "Create and edit customers",
            ),
            Self::StaffRead => info("staff_read", R::Staff, "View staff members"),
            Self::StaffManage => info(
                "staff_manage",
                R::Staff,
                "Invite, edit and deactivate staff members",
            ),
            Self::RoleRead => info("role_read", R::Role, "View roles and assignments"),
            Self::RoleManage => info("role_manage", R::Role, "Create, edit and delete roles"),
            Self::RoleAssign => info(
                "role_assign",
                R::Role,
                "Assign and revoke roles for users",
            ),
            Self::SubscriptionRead => info(
                "subscription_read",
                R::Subscription,
                "View subscription plan",
            ),
            Self::SubscriptionManage => info(
                "subscription_manage",
                R::Subscription,
                "Change subscription plan",
            ),
            Self::PaymentRead => info("payment_read", R::Payment, "View payments"),
            Self::PaymentRecord => info("payment_record", R::Payment, "Record payments"),
            Self::ReportRead => info("report_read", R::Report, "View reports"),
            Self::ReportExport => info("report_export", R::Report, "Export reports"),
            Self::OnboardingManage => info(
                "onboarding_manage",
                R::Onboarding,
                "Run the tenant onboarding wizard",
            ),
            Self::PlatformAdmin => info(
                "platform_admin",
                R::Platform,
                "Operate the platform across all tenants",
            ),
        }
    }

    /// Returns a stable storage value for this permission.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.info().code
    }

    /// Returns the resource category of this permission.
    #[must_use]
    pub const fn resource(&self) -> PermissionResource {
        self.info().resource
    }

    /// Returns the human description of this permission.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        self.info().description
    }

    /// Returns all known permissions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Permission] = &[
            Permission::OrganizationRead,
            Permission::OrganizationUpdate,
            Permission::OrganizationManage,
            Permission::AgencyRead,
            Permission::AgencyCreate,
            Permission::AgencyUpdate,
            Permission::AgencyDelete,
            Permission::VehicleRead,
            Permission::VehicleWrite,
            Permission::VehicleDelete,
            Permission::VehicleMaintenance,
            Permission::DriverRead,
            Permission::DriverWrite,
            Permission::DriverDelete,
            Permission::RentalRead,
            Permission::RentalCreate,
            Permission::RentalUpdate,
            Permission::RentalCancel,
            Permission::RentalClose,
            Permission::CustomerRead,
            Permission::CustomerWrite,
            Permission::StaffRead,
            Permission::StaffManage,
            Permission::RoleRead,
            Permission::RoleManage,
            Permission::RoleAssign,
            Permission::SubscriptionRead,
            Permission::SubscriptionManage,
            Permission::PaymentRead,
            Permission::PaymentRecord,
            Permission::ReportRead,
            Permission::ReportExport,
            Permission::OnboardingManage,
            Permission::PlatformAdmin,
        ];

        ALL
    }

    /// Returns all permissions of one resource category.
    #[must_use]
    pub fn for_resource(resource: PermissionResource) -> Vec<Self> {
        Self::all()
            .iter()
            .copied()
            .filter(|permission| permission.resource() == resource)
            .collect()
    }

    /// Returns whether the code names a catalog permission.
    #[must_use]
    pub fn is_valid(code: &str) -> bool {
        Self::from_str(code).is_ok()
    }

    /// Parses a transport value into a permission.
    pub fn from_transport(value: &str) -> AppResult<Self> {
        Self::from_str(value)
    }
}

impl Display for Permission {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|permission| permission.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown permission value '{value}'")))
    }
}

/// Immutable, catalog-validated set of permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    /// Creates an empty permission set.
    #[must_use]
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    /// Creates a set holding every catalog permission.
    #[must_use]
    pub fn all() -> Self {
        Self::from_permissions(Permission::all().iter().copied())
    }

    /// Creates a set from already-typed permissions.
    pub fn from_permissions(permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self(permissions.into_iter().collect())
    }

    /// Validates raw codes against the catalog.
    ///
    /// Every unknown code is reported in one validation error.
    pub fn from_codes<I, S>(codes: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut permissions = BTreeSet::new();
        let mut unknown = Vec::new();

        for code in codes {
            match Permission::from_str(code.as_ref()) {
                Ok(permission) => {
                    permissions.insert(permission);
                }
                Err(_) => unknown.push(code.as_ref().to_owned()),
            }
        }

        if !unknown.is_empty() {
            return Err(AppError::Validation(format!(
                "unknown permission codes: {}",
                unknown.join(", ")
            )));
        }

        Ok(Self(permissions))
    }

    /// Returns whether the permission is in the set.
    #[must_use]
    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    /// Returns the number of permissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates permissions in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    /// Returns a new set holding permissions from both sets.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self(self.0.union(&other.0).copied().collect())
    }

    /// Returns storage codes in catalog order.
    #[must_use]
    pub fn codes(&self) -> Vec<&'static str> {
        self.iter().map(|permission| permission.as_str()).collect()
    }

    /// Groups permissions by resource category.
    #[must_use]
    pub fn group_by_resource(&self) -> BTreeMap<PermissionResource, Vec<Permission>> {
        let mut grouped: BTreeMap<PermissionResource, Vec<Permission>> = BTreeMap::new();
        for permission in self.iter() {
            grouped
                .entry(permission.resource())
                .or_default()
                .push(permission);
        }
        grouped
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self::from_permissions(iter)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::str::FromStr;

    use proptest::prelude::*;

    use super::{Permission, PermissionResource, PermissionSet};

    #[test]
    fn permission_roundtrip_storage_value() {
        for permission in Permission::all() {
            let restored = Permission::from_str(permission.as_str());
            assert!(matches!(restored, Ok(value) if value == *permission));
        }
    }

    #[test]
    fn catalog_codes_are_unique() {
        let codes: HashSet<&str> = Permission::all()
            .iter()
            .map(|permission| permission.as_str())
            .collect();
        assert_eq!(codes.len(), Permission::all().len());
    }

    #[test]
    fn codes_are_case_sensitive() {
        assert!(Permission::is_valid("vehicle_read"));
        assert!(!Permission::is_valid("Vehicle_Read"));
        assert!(!Permission::is_valid("vehicle_read "));
    }

    #[test]
    fn serde_name_matches_storage_code() {
        let serialized = serde_json::to_string(&Permission::VehicleMaintenance);
        assert_eq!(serialized.ok().as_deref(), Some("\"vehicle_maintenance\""));
    }

    #[test]
    fn for_resource_filters_by_category() {
        let vehicle = Permission::for_resource(PermissionResource::Vehicle);
        assert_eq!(vehicle.len(), 4);
        assert!(
            vehicle
                .iter()
                .all(|permission| permission.resource() == PermissionResource::Vehicle)
        );
    }

    #[test]
    fn from_codes_reports_every_unknown_code() {
        let result = PermissionSet::from_codes(["vehicle_read", "boat_read", "car_fly"]);
        let message = result.err().map(|error| error.to_string()).unwrap_or_default();
        assert!(message.contains("boat_read"));
        assert!(message.contains("car_fly"));
    }

    #[test]
    fn group_by_resource_collects_each_category() {
        let set = PermissionSet::from_permissions([
            Permission::VehicleRead,
            Permission::VehicleWrite,
            Permission::RentalRead,
        ]);
        let grouped = set.group_by_resource();
        assert_eq!(grouped.len(), 2);
        assert_eq!(
            grouped.get(&PermissionResource::Vehicle).map(Vec::len),
            Some(2)
        );
    }

    fn permission_strategy() -> impl Strategy<Value = Permission> {
        proptest::sample::select(Permission::all().to_vec())
    }

    proptest! {
        #[test]
        fn union_is_commutative(
            left in proptest::collection::vec(permission_strategy(), 0..12),
            right in proptest::collection::vec(permission_strategy(), 0..12),
        ) {
            let left = PermissionSet::from_permissions(left);
            let right = PermissionSet::from_permissions(right);
            prop_assert_eq!(left.union(&right), right.union(&left));
        }

        #[test]
        fn union_contains_both_operands(
            left in proptest::collection::vec(permission_strategy(), 0..12),
            right in proptest::collection::vec(permission_strategy(), 0..12),
        ) {
            let left = PermissionSet::from_permissions(left);
            let right = PermissionSet::from_permissions(right);
            let union = left.union(&right);
            prop_assert!(left.iter().all(|permission| union.contains(permission)));
            prop_assert!(right.iter().all(|permission| union.contains(permission)));
            prop_assert!(union.len() <= left.len() + right.len());
        }

        #[test]
        fn unknown_codes_never_validate(code in "[a-z_]{1,24}") {
            let known = Permission::all().iter().any(|permission| permission.as_str() == code);
            prop_assert_eq!(Permission::is_valid(code.as_str()), known);
        }
    }
}
