//! Authorization module - visibility policy and caller resolution
//!
//! Every handler asks the policy the same question: may this caller perform
//! this action on this target? The answer is one of `Allow`, `Forbid` or
//! `NotFound`, and existence is always settled before roles are consulted.

mod evaluator;
mod principal;
mod resolver;

pub use evaluator::{Access, Action, DefaultVisibilityPolicy, Target, VisibilityPolicy};
pub use principal::Principal;
pub use resolver::resolve;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Fixed role set. Role membership is independent of organization membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum Role {
    Admin,
    Registrar,
    Pilot,
    OrganizationManager,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Registrar, Role::Pilot, Role::OrganizationManager];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Registrar => "Registrar",
            Role::Pilot => "Pilot",
            Role::OrganizationManager => "OrganizationManager",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Where a freshly signed-in caller should land.
pub fn landing_route(principal: &Principal) -> &'static str {
    if principal.has_role(Role::Admin) {
        "/reports"
    } else if principal.has_role(Role::Registrar) {
        "/registrar/dashboard"
    } else if principal.has_role(Role::OrganizationManager) {
        "/organization-manager/dashboard"
    } else if principal.has_role(Role::Pilot) {
        "/pilot/dashboard"
    } else {
        "/obstacles"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!("registrar".parse::<Role>().unwrap(), Role::Registrar);
        assert_eq!("OrganizationManager".parse::<Role>().unwrap(), Role::OrganizationManager);
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn landing_route_follows_role_precedence() {
        let id = Uuid::new_v4();
        let registrar = Principal::new(id).with_roles([Role::Registrar, Role::Pilot]);
        let manager = Principal::new(id).with_roles([Role::OrganizationManager]);
        let pilot = Principal::new(id).with_roles([Role::Pilot]);
        let admin = Principal::new(id).with_roles([Role::Admin, Role::Registrar]);

        assert_eq!(landing_route(&registrar), "/registrar/dashboard");
        assert_eq!(landing_route(&manager), "/organization-manager/dashboard");
        assert_eq!(landing_route(&pilot), "/pilot/dashboard");
        assert_eq!(landing_route(&admin), "/reports");
        assert_eq!(landing_route(&Principal::new(id)), "/obstacles");
    }
}
