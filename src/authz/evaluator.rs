use uuid::Uuid;

use super::principal::Principal;
use super::Role;
use crate::errors::{AppError, AppResult};
use crate::models::notification::Notification;
use crate::models::organization::Organization;
use crate::models::report::Report;

/// Outcome of a visibility decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Forbid,
    NotFound,
}

impl Access {
    pub fn is_allowed(self) -> bool {
        matches!(self, Access::Allow)
    }

    /// Turn the decision into a handler result. `subject` names the resource in
    /// the error message.
    pub fn require(self, subject: &str) -> AppResult<()> {
        match self {
            Access::Allow => Ok(()),
            Access::Forbid => Err(AppError::forbidden(format!("access to {subject} denied"))),
            Access::NotFound => Err(AppError::not_found(format!("{subject} not found"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ListOrganizationReports,
    ViewManagerDashboard,
    ViewReport,
    ApproveReport,
    RejectReport,
    DeleteReport,
    AssignRegistrar,
    EditDraft,
    MarkNotification,
    ManageOwnReports,
    ListAllReports,
    ViewRegistrarDashboard,
    ViewPilotDashboard,
    ManageOrganizations,
    DeleteOrganization,
    ManageUsers,
}

/// What the policy needs to know about the resource being touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The referenced entity does not exist.
    Missing,
    /// Role-gated action with no specific resource.
    System,
    Organization { id: i64 },
    Report { owner_id: Option<Uuid>, is_draft: bool },
    Notification { recipient_id: Uuid },
}

impl Target {
    pub fn organization(organization: Option<&Organization>) -> Self {
        organization.map_or(Target::Missing, |org| Target::Organization { id: org.id })
    }

    pub fn report(report: Option<&Report>) -> Self {
        report.map_or(Target::Missing, |report| Target::Report {
            owner_id: report.user_id,
            is_draft: report.status.is_draft(),
        })
    }

    pub fn notification(notification: Option<&Notification>) -> Self {
        notification.map_or(Target::Missing, |n| Target::Notification {
            recipient_id: n.user_id,
        })
    }
}

/// Policy seam so handlers never branch on roles themselves.
pub trait VisibilityPolicy: Send + Sync {
    fn decide(&self, principal: &Principal, action: Action, target: &Target) -> Access;
}

/// Default precedence table
///
/// Evaluation order:
/// 1. missing target -> NotFound (before any role is looked at)
/// 2. Admin / Registrar -> Allow for organization reports and report handling
/// 3. OrganizationManager of the same organization -> Allow
/// 4. plain member of the same organization -> Allow (read-only listing)
/// 5. per-user resources -> Allow for the owner, NotFound for everyone else
/// 6. no resolvable identity -> Forbid
#[derive(Debug, Clone, Default)]
pub struct DefaultVisibilityPolicy;

impl DefaultVisibilityPolicy {
    pub fn new() -> Self {
        Self
    }

    fn evaluate(principal: &Principal, action: Action, target: &Target) -> Access {
        if matches!(target, Target::Missing) {
            return Access::NotFound;
        }

        match (action, target) {
            (Action::ListOrganizationReports, Target::Organization { id }) => {
                if principal.user_id.is_none() {
                    Access::Forbid
                } else if principal.is_privileged() {
                    Access::Allow
                } else {
                    // Managers and plain members alike see only their own organization.
                    same_organization(principal, *id)
                }
            }
            (Action::ViewManagerDashboard, Target::Organization { id }) => {
                if principal.user_id.is_some() && principal.has_role(Role::OrganizationManager) {
                    same_organization(principal, *id)
                } else {
                    Access::Forbid
                }
            }
            // Role gate checked before the caller's organization is looked up.
            (Action::ViewManagerDashboard, Target::System) => require_any(principal, &[Role::OrganizationManager]),
            (Action::ViewReport, Target::Report { owner_id, is_draft }) => {
                if principal.owns(*owner_id) {
                    Access::Allow
                } else if principal.user_id.is_none() {
                    Access::Forbid
                } else if !is_draft && principal.is_privileged() {
                    Access::Allow
                } else {
                    Access::NotFound
                }
            }
            (
                Action::ApproveReport | Action::RejectReport | Action::DeleteReport,
                Target::Report { owner_id, is_draft },
            ) => {
                if principal.user_id.is_none() {
                    Access::Forbid
                } else if *is_draft && !principal.owns(*owner_id) {
                    Access::NotFound
                } else if principal.is_privileged() {
                    Access::Allow
                } else {
                    Access::Forbid
                }
            }
            (Action::AssignRegistrar, Target::Report { owner_id, is_draft }) => {
                if principal.user_id.is_none() {
                    Access::Forbid
                } else if *is_draft && !principal.owns(*owner_id) {
                    Access::NotFound
                } else if principal.has_role(Role::Registrar) {
                    Access::Allow
                } else {
                    Access::Forbid
                }
            }
            (Action::EditDraft, Target::Report { owner_id, is_draft }) => {
                if principal.user_id.is_none() {
                    Access::Forbid
                } else if principal.owns(*owner_id) && *is_draft {
                    Access::Allow
                } else {
                    Access::NotFound
                }
            }
            (Action::MarkNotification, Target::Notification { recipient_id }) => {
                if principal.user_id.is_none() {
                    Access::Forbid
                } else if principal.owns(Some(*recipient_id)) {
                    Access::Allow
                } else {
                    Access::NotFound
                }
            }
            (Action::ManageOwnReports, _) => {
                if principal.user_id.is_some() {
                    Access::Allow
                } else {
                    Access::Forbid
                }
            }
            (Action::ListAllReports | Action::ViewRegistrarDashboard, _) => {
                require_any(principal, &[Role::Admin, Role::Registrar])
            }
            (Action::ViewPilotDashboard, _) => require_any(principal, &[Role::Pilot]),
            (Action::ManageOrganizations, Target::System | Target::Organization { .. }) => {
                require_any(principal, &[Role::Admin, Role::Registrar, Role::OrganizationManager])
            }
            (Action::DeleteOrganization, Target::Organization { .. }) => {
                require_any(principal, &[Role::Admin, Role::Registrar])
            }
            (Action::ManageUsers, _) => require_any(principal, &[Role::Admin, Role::Registrar]),
            // An action paired with the wrong kind of target never grants access.
            _ => Access::Forbid,
        }
    }
}

impl VisibilityPolicy for DefaultVisibilityPolicy {
    fn decide(&self, principal: &Principal, action: Action, target: &Target) -> Access {
        let access = Self::evaluate(principal, action, target);
        tracing::debug!(
            user_id = ?principal.user_id,
            action = ?action,
            target = ?target,
            access = ?access,
            "visibility decision"
        );
        access
    }
}

fn same_organization(principal: &Principal, organization_id: i64) -> Access {
    if principal.organization_id == Some(organization_id) {
        Access::Allow
    } else {
        Access::Forbid
    }
}

fn require_any(principal: &Principal, roles: &[Role]) -> Access {
    if principal.user_id.is_some() && principal.has_any_role(roles) {
        Access::Allow
    } else {
        Access::Forbid
    }
}
