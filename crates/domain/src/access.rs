use std::str::FromStr;

use fleetdesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::{Permission, PermissionSet};

/// Permission count above which a holder is classified as [`AccessLevel::User`].
pub const USER_ACCESS_PERMISSION_THRESHOLD: usize = 10;

/// Coarse classification of a permission set for display.
///
/// Never used to gate operations; guards always check concrete permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessLevel {
    /// Holds the platform-admin permission.
    Admin,
    /// Holds the tenant-management permission.
    Manager,
    /// Holds a broad permission set.
    User,
    /// Anything else.
    Limited,
}

impl AccessLevel {
    /// Classifies a permission set.
    #[must_use]
    pub fn classify(permissions: &PermissionSet) -> Self {
        if permissions.contains(Permission::PlatformAdmin) {
            Self::Admin
        } else if permissions.contains(Permission::OrganizationManage) {
            Self::Manager
        } else if permissions.len() > USER_ACCESS_PERMISSION_THRESHOLD {
            Self::User
        } else {
            Self::Limited
        }
    }

    /// Returns a stable display value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Manager => "MANAGER",
            Self::User => "USER",
            Self::Limited => "LIMITED",
        }
    }
}

/// Compound authorization rule over permission codes.
///
/// Expressions use a single operator throughout: `a AND b AND c` or `a OR b`
/// (`&&` and `||` are accepted as aliases). Mixing operators and parentheses are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionExpression {
    /// One permission.
    Single(Permission),
    /// Every permission is required.
    All(Vec<Permission>),
    /// Any permission suffices.
    Any(Vec<Permission>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    And,
    Or,
}

impl Operator {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "AND" | "&&" => Some(Self::And),
            "OR" | "||" => Some(Self::Or),
            _ => None,
        }
    }
}

impl PermissionExpression {
    /// Parses an expression; unknown codes and mixed operators are validation errors.
    pub fn parse(expression: &str) -> AppResult<Self> {
        if expression.contains(['(', ')']) {
            return Err(AppError::Validation(format!(
                "parenthesized permission expressions are not supported: '{expression}'"
            )));
        }

        let tokens: Vec<&str> = expression.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(AppError::Validation(
                "permission expression must not be empty".to_owned(),
            ));
        }

        let mut permissions = Vec::with_capacity(tokens.len() / 2 + 1);
        let mut operator: Option<Operator> = None;

        for (index, token) in tokens.iter().enumerate() {
            if index % 2 == 0 {
                permissions.push(Permission::from_str(token)?);
                continue;
            }

            let parsed = Operator::parse(token).ok_or_else(|| {
                AppError::Validation(format!(
                    "expected AND/OR between permissions, found '{token}'"
                ))
            })?;

            match operator {
                None => operator = Some(parsed),
                Some(existing) if existing != parsed => {
                    return Err(AppError::Validation(format!(
                        "mixed AND/OR operators are not supported: '{expression}'"
                    )));
                }
                Some(_) => {}
            }
        }

        if tokens.len() % 2 == 0 {
            return Err(AppError::Validation(format!(
                "permission expression ends with an operator: '{expression}'"
            )));
        }

        Ok(match operator {
            None => Self::Single(permissions[0]),
            Some(Operator::And) => Self::All(permissions),
            Some(Operator::Or) => Self::Any(permissions),
        })
    }

    /// Evaluates the expression with a permission predicate.
    pub fn evaluate(&self, mut granted: impl FnMut(Permission) -> bool) -> bool {
        match self {
            Self::Single(permission) => granted(*permission),
            Self::All(permissions) => permissions.iter().all(|permission| granted(*permission)),
            Self::Any(permissions) => permissions.iter().any(|permission| granted(*permission)),
        }
    }

    /// Evaluates the expression against a permission set.
    #[must_use]
    pub fn evaluate_set(&self, permissions: &PermissionSet) -> bool {
        self.evaluate(|permission| permissions.contains(permission))
    }
}

#[cfg(test)]
mod tests {
    use fleetdesk_core::AppError;
    use proptest::prelude::*;

    use super::{AccessLevel, PermissionExpression};
    use crate::{Permission, PermissionSet};

    #[test]
    fn platform_admin_is_admin_level() {
        let set = PermissionSet::from_permissions([Permission::PlatformAdmin]);
        assert_eq!(AccessLevel::classify(&set), AccessLevel::Admin);
    }

    #[test]
    fn organization_manage_is_manager_level() {
        let set = PermissionSet::from_permissions([
            Permission::OrganizationManage,
            Permission::VehicleRead,
        ]);
        assert_eq!(AccessLevel::classify(&set), AccessLevel::Manager);
    }

    #[test]
    fn threshold_is_exclusive() {
        let ten: PermissionSet = Permission::all()
            .iter()
            .copied()
            .filter(|permission| {
                !matches!(
                    permission,
                    Permission::PlatformAdmin | Permission::OrganizationManage
                )
            })
            .take(10)
            .collect();
        assert_eq!(AccessLevel::classify(&ten), AccessLevel::Limited);

        let eleven = ten.union(&PermissionSet::from_permissions([Permission::ReportExport]));
        assert_eq!(eleven.len(), 11);
        assert_eq!(AccessLevel::classify(&eleven), AccessLevel::User);
    }

    #[test]
    fn parses_homogeneous_expressions() {
        assert_eq!(
            PermissionExpression::parse("vehicle_read").ok(),
            Some(PermissionExpression::Single(Permission::VehicleRead))
        );
        assert_eq!(
            PermissionExpression::parse("vehicle_read AND rental_read").ok(),
            Some(PermissionExpression::All(vec![
                Permission::VehicleRead,
                Permission::RentalRead
            ]))
        );
        assert_eq!(
            PermissionExpression::parse("vehicle_read || rental_read OR driver_read").ok(),
            Some(PermissionExpression::Any(vec![
                Permission::VehicleRead,
                Permission::RentalRead,
                Permission::DriverRead
            ]))
        );
    }

    #[test]
    fn rejects_mixed_operators_and_parentheses() {
        assert!(matches!(
            PermissionExpression::parse("vehicle_read AND rental_read OR driver_read"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            PermissionExpression::parse("(vehicle_read AND rental_read)"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn rejects_malformed_expressions() {
        for expression in ["", "AND", "vehicle_read AND", "vehicle_read rental_read", "boat_read"] {
            assert!(
                PermissionExpression::parse(expression).is_err(),
                "expected '{expression}' to be rejected"
            );
        }
    }

    #[test]
    fn evaluation_follows_operator() {
        let granted = PermissionSet::from_permissions([Permission::VehicleRead]);
        let all = PermissionExpression::parse("vehicle_read AND rental_read");
        let any = PermissionExpression::parse("vehicle_read OR rental_read");

        assert_eq!(all.map(|expression| expression.evaluate_set(&granted)).ok(), Some(false));
        assert_eq!(any.map(|expression| expression.evaluate_set(&granted)).ok(), Some(true));
    }

    fn permission_strategy() -> impl Strategy<Value = Permission> {
        proptest::sample::select(Permission::all().to_vec())
    }

    proptest! {
        #[test]
        fn and_expression_matches_subset_check(
            required in proptest::collection::vec(permission_strategy(), 1..6),
            granted in proptest::collection::vec(permission_strategy(), 0..20),
        ) {
            let expression = required
                .iter()
                .map(|permission| permission.as_str())
                .collect::<Vec<_>>()
                .join(" AND ");
            let granted = PermissionSet::from_permissions(granted);
            let parsed = PermissionExpression::parse(expression.as_str());
            prop_assert!(parsed.is_ok());
            if let Ok(parsed) = parsed {
                let expected = required.iter().all(|permission| granted.contains(*permission));
                prop_assert_eq!(parsed.evaluate_set(&granted), expected);
            }
        }
    }
}
