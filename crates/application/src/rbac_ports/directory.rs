use async_trait::async_trait;
use fleetdesk_core::{AppResult, UserId};

/// Display data for a user, owned by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// User identifier.
    pub user_id: UserId,
    /// Display name.
    pub display_name: String,
    /// Email, when known.
    pub email: Option<String>,
}

/// Port resolving user identifiers against the user directory.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns the profile for a user, or `None` when the user is unknown.
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserProfile>>;
}
