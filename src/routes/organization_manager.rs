use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::app::AppState;
use crate::authz::{Action, Principal, Target};
use crate::db::{organizations, reports};
use crate::errors::{AppError, AppResult};
use crate::models::dashboard::ManagerDashboard;

pub fn routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

#[utoipa::path(
    get,
    path = "/organization-manager/dashboard",
    tag = "Organizations",
    responses(
        (status = 200, description = "Report counts for the caller's organization", body = ManagerDashboard),
        (status = 403, description = "OrganizationManager role required"),
        (status = 404, description = "Caller belongs to no organization")
    ),
    security(("bearerAuth" = []))
)]
pub async fn dashboard(State(state): State<AppState>, principal: Principal) -> AppResult<Json<ManagerDashboard>> {
    state
        .policy
        .decide(&principal, Action::ViewManagerDashboard, &Target::System)
        .require("organization manager dashboard")?;

    let mut conn = state.pool.acquire().await?;
    let organization = match principal.organization_id {
        Some(id) => organizations::find(&mut conn, id).await?,
        None => None,
    };

    state
        .policy
        .decide(&principal, Action::ViewManagerDashboard, &Target::organization(organization.as_ref()))
        .require("organization")?;
    let organization = organization.ok_or_else(|| AppError::not_found("organization not found"))?;

    let counts = reports::organization_counts(&mut conn, organization.id).await?;
    Ok(Json(ManagerDashboard {
        organization,
        total_reports: counts.total,
        pending_reports: counts.pending,
        approved_reports: counts.approved,
        rejected_reports: counts.rejected,
    }))
}
