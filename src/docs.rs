use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::{OpenApi as OpenApiDoc, Server};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::authz::Role;
use crate::models;
use crate::routes::{self, auth::MessageResponse, health::HealthResponse};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut OpenApiDoc) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::auth::register,
        routes::auth::login,
        routes::auth::me,
        routes::auth::logout,
        routes::health::health,
        routes::obstacles::create_obstacle,
        routes::obstacles::list_drafts,
        routes::obstacles::get_draft,
        routes::obstacles::update_draft,
        routes::obstacles::all_obstacles,
        routes::obstacles::approved_obstacles,
        routes::pilot::dashboard,
        routes::pilot::my_reports,
        routes::pilot::list_notifications,
        routes::pilot::mark_read,
        routes::pilot::mark_unread,
        routes::pilot::mark_all_read,
        routes::registrar::dashboard,
        routes::registrar::pending_queue,
        routes::reports::list_reports,
        routes::reports::raw_reports,
        routes::reports::get_report,
        routes::reports::approve_report,
        routes::reports::reject_report,
        routes::reports::assign_registrar,
        routes::reports::delete_report,
        routes::organizations::list_organizations,
        routes::organizations::get_organization,
        routes::organizations::create_organization,
        routes::organizations::update_organization,
        routes::organizations::delete_organization,
        routes::organizations::organization_reports,
        routes::organization_manager::dashboard,
        routes::users::list_users,
        routes::users::get_user,
        routes::users::grant_role,
        routes::users::revoke_role,
        routes::users::assign_organization,
        routes::users::remove_organization
    ),
    components(
        schemas(
            Role,
            MessageResponse,
            HealthResponse,
            models::user::User,
            models::user::UserWithRoles,
            models::user::AuthResponse,
            models::user::MeResponse,
            models::user::LoginRequest,
            models::user::RegisterRequest,
            models::user::GrantRoleRequest,
            models::user::AssignOrganizationRequest,
            models::report::Report,
            models::report::ReportStatus,
            models::report::ReportListItem,
            models::report::ReportDetails,
            models::report::ObstacleFeature,
            models::report::ObstacleForm,
            models::report::FormAction,
            models::report::RejectRequest,
            models::report::AssignRegistrarRequest,
            models::organization::Organization,
            models::organization::Member,
            models::organization::OrganizationWithMembers,
            models::organization::OrganizationRequest,
            models::notification::Notification,
            models::dashboard::PilotDashboard,
            models::dashboard::RegistrarDashboard,
            models::dashboard::ManagerDashboard
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration and sessions"),
        (name = "Health", description = "Liveness"),
        (name = "Obstacles", description = "Submission, drafts and map layers"),
        (name = "Pilot", description = "Pilot dashboard and notifications"),
        (name = "Registrar", description = "Review queue"),
        (name = "Reports", description = "Report review and lifecycle"),
        (name = "Organizations", description = "Organizations and their reports"),
        (name = "Users", description = "User administration")
    )
)]
pub struct ApiDoc;

/// OpenAPI document with a local server entry for `port`.
pub fn build_openapi(port: u16) -> OpenApiDoc {
    let mut doc = ApiDoc::openapi();
    doc.servers = Some(vec![Server::new(format!("http://localhost:{port}"))]);
    doc
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
