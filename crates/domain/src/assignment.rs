use std::fmt::{Display, Formatter};

use chrono::{DateTime, Duration, Utc};
use fleetdesk_core::{AgencyId, AppError, AppResult, TenantId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::RoleId;

/// Upper bound for a single expiry extension.
pub const MAX_EXTENSION_DAYS: u32 = 3_650;

/// Unique identifier for a role assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssignmentId(Uuid);

impl AssignmentId {
    /// Creates a new random assignment identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an assignment identifier from an existing UUID value.
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

impl Default for AssignmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for AssignmentId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Input for granting one role to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignmentInput {
    /// Grantee.
    pub user_id: UserId,
    /// Granted role.
    pub role_id: RoleId,
    /// Tenant of the role.
    pub tenant_id: TenantId,
    /// Optional agency narrowing; `None` means tenant-wide.
    pub agency_id: Option<AgencyId>,
    /// Optional expiry, strictly after the assignment time.
    pub expires_at: Option<DateTime<Utc>>,
    /// Free-text justification.
    pub reason: Option<String>,
}

/// Persisted assignment state used by repositories to rebuild a [`RoleAssignment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignmentRecord {
    /// Assignment identifier.
    pub assignment_id: AssignmentId,
    /// Grantee.
    pub user_id: UserId,
    /// Granted role.
    pub role_id: RoleId,
    /// Tenant of the role.
    pub tenant_id: TenantId,
    /// Optional agency narrowing.
    pub agency_id: Option<AgencyId>,
    /// Assignment timestamp.
    pub assigned_at: DateTime<Utc>,
    /// Subject that granted the role.
    pub assigned_by: String,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Activation flag.
    pub is_active: bool,
    /// Free-text justification.
    pub reason: Option<String>,
    /// Revocation timestamp.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Subject that revoked the assignment.
    pub revoked_by: Option<String>,
}

/// Time-bounded grant of one role to one user.
///
/// Deactivation is terminal: a revoked or swept assignment never becomes active again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    assignment_id: AssignmentId,
    user_id: UserId,
    role_id: RoleId,
    tenant_id: TenantId,
    agency_id: Option<AgencyId>,
    assigned_at: DateTime<Utc>,
    assigned_by: String,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
    reason: Option<String>,
    revoked_at: Option<DateTime<Utc>>,
    revoked_by: Option<String>,
}

impl RoleAssignment {
    /// Creates an active assignment stamped at `now`.
    pub fn new(input: RoleAssignmentInput, assigned_by: &str, now: DateTime<Utc>) -> AppResult<Self> {
        if let Some(expires_at) = input.expires_at
            && expires_at <= now
        {
            return Err(AppError::Validation(format!(
                "assignment expiry '{}' must be after assignment time '{}'",
                expires_at.to_rfc3339(),
                now.to_rfc3339()
            )));
        }

        Ok(Self {
            assignment_id: AssignmentId::new(),
            user_id: input.user_id,
            role_id: input.role_id,
            tenant_id: input.tenant_id,
            agency_id: input.agency_id,
            assigned_at: now,
            assigned_by: assigned_by.to_owned(),
            expires_at: input.expires_at,
            is_active: true,
            reason: input
                .reason
                .map(|reason| reason.trim().to_owned())
                .filter(|reason| !reason.is_empty()),
            revoked_at: None,
            revoked_by: None,
        })
    }

    /// Rebuilds an assignment from persisted state.
    #[must_use]
    pub fn restore(record: RoleAssignmentRecord) -> Self {
        Self {
            assignment_id: record.assignment_id,
            user_id: record.user_id,
            role_id: record.role_id,
            tenant_id: record.tenant_id,
            agency_id: record.agency_id,
            assigned_at: record.assigned_at,
            assigned_by: record.assigned_by,
            expires_at: record.expires_at,
            is_active: record.is_active,
            reason: record.reason,
            revoked_at: record.revoked_at,
            revoked_by: record.revoked_by,
        }
    }

    /// Returns the assignment identifier.
    #[must_use]
    pub fn assignment_id(&self) -> AssignmentId {
        self.assignment_id
    }

    /// Returns the grantee.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the granted role.
    #[must_use]
    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    /// Returns the tenant.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the agency narrowing, if any.
    #[must_use]
    pub fn agency_id(&self) -> Option<AgencyId> {
        self.agency_id
    }

    /// Returns the assignment timestamp.
    #[must_use]
    pub fn assigned_at(&self) -> DateTime<Utc> {
        self.assigned_at
    }

    /// Returns the granting subject.
    #[must_use]
    pub fn assigned_by(&self) -> &str {
        self.assigned_by.as_str()
    }

    /// Returns the expiry, if any.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns the activation flag.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the justification.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Returns the revocation timestamp.
    #[must_use]
    pub fn revoked_at(&self) -> Option<DateTime<Utc>> {
        self.revoked_at
    }

    /// Returns the revoking subject.
    #[must_use]
    pub fn revoked_by(&self) -> Option<&str> {
        self.revoked_by.as_deref()
    }

    /// Active and not yet expired at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|expires_at| expires_at > now)
    }

    /// Active with an expiry strictly before `now`; a candidate for the sweep.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_some_and(|expires_at| expires_at < now)
    }

    /// Tenant-wide grants cover every agency; scoped grants cover only their agency.
    #[must_use]
    pub fn covers_agency(&self, agency_id: AgencyId) -> bool {
        self.agency_id.is_none_or(|scoped| scoped == agency_id)
    }

    /// Flips the active flag off. Returns `false` when the assignment was already inactive.
    pub fn deactivate(&mut self, revoked_by: &str, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }

        self.is_active = false;
        self.revoked_at = Some(now);
        self.revoked_by = Some(revoked_by.to_owned());
        true
    }

    /// Moves the expiry of an active assignment. Returns `false` when it was already inactive.
    pub fn extend_to(&mut self, expires_at: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }

        self.expires_at = Some(expires_at);
        true
    }

    /// Computes the expiry after extending by `additional_days`.
    ///
    /// Pushes an existing expiry forward, or starts from `now` when none exists.
    pub fn extended_expiry(
        &self,
        additional_days: u32,
        now: DateTime<Utc>,
    ) -> AppResult<DateTime<Utc>> {
        if !self.is_active {
            return Err(AppError::Validation(format!(
                "assignment '{}' is revoked and cannot be extended",
                self.assignment_id
            )));
        }

        if additional_days == 0 || additional_days > MAX_EXTENSION_DAYS {
            return Err(AppError::Validation(format!(
                "additional_days must be between 1 and {MAX_EXTENSION_DAYS}"
            )));
        }

        let base = self.expires_at.unwrap_or(now);
        Ok(base + Duration::days(i64::from(additional_days)))
    }
}
