use std::collections::HashSet;
use uuid::Uuid;

use super::Role;

/// Principal represents the caller as resolved from an authenticated session.
///
/// `user_id` is `None` when the session carried a subject that no longer maps
/// to a user; identity-scoped actions are forbidden for such callers.
#[derive(Debug, Clone, Default)]
pub struct Principal {
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub organization_id: Option<i64>,
    pub roles: HashSet<Role>,
}

impl Principal {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    pub fn with_organization(mut self, organization_id: Option<i64>) -> Self {
        self.organization_id = organization_id;
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.has_role(*role))
    }

    /// Admin and Registrar see every organization and every submitted report.
    pub fn is_privileged(&self) -> bool {
        self.has_any_role(&[Role::Admin, Role::Registrar])
    }

    pub fn owns(&self, owner_id: Option<Uuid>) -> bool {
        matches!((self.user_id, owner_id), (Some(me), Some(owner)) if me == owner)
    }

    pub fn sorted_roles(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self.roles.iter().copied().collect();
        roles.sort();
        roles
    }
}
