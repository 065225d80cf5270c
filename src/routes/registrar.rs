use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::app::AppState;
use crate::authz::{Action, Principal, Target};
use crate::db::reports::{self, ReportScope};
use crate::errors::AppResult;
use crate::listing::{filter_items, ListQuery, Sort};
use crate::models::dashboard::RegistrarDashboard;
use crate::models::report::{ReportListItem, ReportStatus};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/pending", get(pending_queue))
}

#[utoipa::path(
    get,
    path = "/registrar/dashboard",
    tag = "Registrar",
    responses(
        (status = 200, description = "Report totals and the caller's pending assignments", body = RegistrarDashboard),
        (status = 403, description = "Registrar or Admin required")
    ),
    security(("bearerAuth" = []))
)]
pub async fn dashboard(State(state): State<AppState>, principal: Principal) -> AppResult<Json<RegistrarDashboard>> {
    state
        .policy
        .decide(&principal, Action::ViewRegistrarDashboard, &Target::System)
        .require("registrar dashboard")?;

    let mut conn = state.pool.acquire().await?;
    let report_count = reports::count_submitted(&mut conn).await?;
    let pending_reports_count = reports::count_with_status(&mut conn, ReportStatus::Pending).await?;
    let my_assigned_reports = match principal.user_id {
        Some(user_id) => reports::list_items(&mut conn, ReportScope::AssignedPending(user_id), Sort::default()).await?,
        None => Vec::new(),
    };

    Ok(Json(RegistrarDashboard {
        report_count,
        pending_reports_count,
        my_assigned_reports,
    }))
}

#[utoipa::path(
    get,
    path = "/registrar/pending",
    tag = "Registrar",
    params(ListQuery),
    responses(
        (status = 200, description = "Every pending report regardless of assignment", body = Vec<ReportListItem>),
        (status = 403, description = "Registrar or Admin required")
    ),
    security(("bearerAuth" = []))
)]
pub async fn pending_queue(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<ReportListItem>>> {
    state
        .policy
        .decide(&principal, Action::ViewRegistrarDashboard, &Target::System)
        .require("pending queue")?;

    let mut conn = state.pool.acquire().await?;
    let items = reports::list_items(&mut conn, ReportScope::Pending, query.sort()).await?;
    Ok(Json(filter_items(items, query.search_term())))
}
