use std::collections::HashMap;

use crate::{AssignmentQuery, UserProfile};

use super::*;

/// Assignment row enriched with role and user display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentView {
    /// Underlying assignment.
    pub assignment: RoleAssignment,
    /// Role name, absent when the role was deleted.
    pub role_name: Option<String>,
    /// User display name, absent when the directory could not resolve it.
    pub user_display_name: Option<String>,
    /// User email, when known.
    pub user_email: Option<String>,
}

impl AssignmentService {
    /// Lists tenant assignments with role names and user display data.
    ///
    /// Directory failures only leave the display fields empty.
    pub async fn list_assignments(
        &self,
        actor: &IdentityContext,
        tenant_id: TenantId,
        query: AssignmentQuery,
    ) -> AppResult<Vec<AssignmentView>> {
        self.authorization_service
            .require_permission(actor, tenant_id, Permission::RoleRead)
            .await?;

        let assignments = self
            .assignment_repository
            .list_assignments(tenant_id, &query)
            .await?;

        let mut role_ids: Vec<RoleId> = assignments.iter().map(RoleAssignment::role_id).collect();
        role_ids.sort();
        role_ids.dedup();
        let role_names: HashMap<RoleId, String> = self
            .role_repository
            .find_roles(&role_ids)
            .await?
            .into_iter()
            .map(|role| (role.role_id(), role.name().to_owned()))
            .collect();

        let mut profiles: HashMap<UserId, Option<UserProfile>> = HashMap::new();
        for assignment in &assignments {
            let user_id = assignment.user_id();
            if profiles.contains_key(&user_id) {
                continue;
            }

            let profile = match self.user_directory.find_user(user_id).await {
                Ok(profile) => profile,
                Err(error) => {
                    warn!(%user_id, error = %error, "failed to resolve user for assignment view");
                    None
                }
            };
            profiles.insert(user_id, profile);
        }

        Ok(assignments
            .into_iter()
            .map(|assignment| {
                let profile = profiles
                    .get(&assignment.user_id())
                    .and_then(Option::as_ref);
                AssignmentView {
                    role_name: role_names.get(&assignment.role_id()).cloned(),
                    user_display_name: profile.map(|profile| profile.display_name.clone()),
                    user_email: profile.and_then(|profile| profile.email.clone()),
                    assignment,
                }
            })
            .collect())
    }
}
