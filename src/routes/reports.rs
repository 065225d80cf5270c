//! Report review: index, detail, approval, rejection, assignment and deletion.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Action, Principal, Role, Target};
use crate::db::reports::{self, ReportScope};
use crate::db::{effects, users};
use crate::errors::{AppError, AppResult};
use crate::listing::{filter_items, ListQuery};
use crate::models::report::{AssignRegistrarRequest, RejectRequest, Report, ReportDetails, ReportListItem};
use crate::utils::utc_now;
use crate::workflow::{lifecycle, Assignment};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reports))
        .route("/:id", get(get_report).delete(delete_report))
        .route("/:id/approve", post(approve_report))
        .route("/:id/reject", post(reject_report))
        .route("/:id/assign", post(assign_registrar))
}

/// Load a report and ask the policy about it; existence is decided first.
async fn authorize_report(state: &AppState, principal: &Principal, id: i64, action: Action) -> AppResult<Report> {
    let mut conn = state.pool.acquire().await?;
    let report = reports::find(&mut conn, id).await?;

    state
        .policy
        .decide(principal, action, &Target::report(report.as_ref()))
        .require("report")?;

    report.ok_or_else(|| AppError::not_found("report not found"))
}

#[utoipa::path(
    get,
    path = "/reports",
    tag = "Reports",
    params(ListQuery),
    responses(
        (status = 200, description = "Submitted reports", body = Vec<ReportListItem>),
        (status = 403, description = "Registrar or Admin required")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_reports(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<ReportListItem>>> {
    state
        .policy
        .decide(&principal, Action::ListAllReports, &Target::System)
        .require("report index")?;

    let mut conn = state.pool.acquire().await?;
    let items = reports::list_items(&mut conn, ReportScope::Submitted, query.sort()).await?;
    Ok(Json(filter_items(items, query.search_term())))
}

#[utoipa::path(
    get,
    path = "/api/reports",
    tag = "Reports",
    responses(
        (status = 200, description = "Raw submitted reports, newest first", body = Vec<Report>),
        (status = 403, description = "Registrar or Admin required")
    ),
    security(("bearerAuth" = []))
)]
pub async fn raw_reports(State(state): State<AppState>, principal: Principal) -> AppResult<Json<Vec<Report>>> {
    state
        .policy
        .decide(&principal, Action::ListAllReports, &Target::System)
        .require("reports")?;

    let mut conn = state.pool.acquire().await?;
    Ok(Json(reports::submitted_newest_first(&mut conn).await?))
}

#[utoipa::path(
    get,
    path = "/reports/{id}",
    tag = "Reports",
    params(("id" = i64, Path, description = "Report id")),
    responses(
        (status = 200, description = "Report with sender", body = ReportDetails),
        (status = 404, description = "Report not found or not visible")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_report(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> AppResult<Json<ReportDetails>> {
    let report = authorize_report(&state, &principal, id, Action::ViewReport).await?;
    let mut conn = state.pool.acquire().await?;
    Ok(Json(reports::details(&mut conn, report).await?))
}

#[utoipa::path(
    post,
    path = "/reports/{id}/approve",
    tag = "Reports",
    params(("id" = i64, Path, description = "Report id")),
    responses(
        (status = 200, description = "Report approved", body = Report),
        (status = 403, description = "Registrar or Admin required"),
        (status = 404, description = "Report not found"),
        (status = 409, description = "Report changed concurrently")
    ),
    security(("bearerAuth" = []))
)]
pub async fn approve_report(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> AppResult<Json<Report>> {
    let report = authorize_report(&state, &principal, id, Action::ApproveReport).await?;

    let now = utc_now();
    let transition = lifecycle::approve(&report, principal.email.as_deref(), now)?;
    let report = effects::commit(&state.pool, transition, now).await?;

    tracing::info!(report_id = id, actor = ?principal.user_id, "report approved");
    Ok(Json(report))
}

#[utoipa::path(
    post,
    path = "/reports/{id}/reject",
    tag = "Reports",
    params(("id" = i64, Path, description = "Report id")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Report rejected", body = Report),
        (status = 400, description = "Rejection reason missing"),
        (status = 403, description = "Registrar or Admin required"),
        (status = 404, description = "Report not found"),
        (status = 409, description = "Report changed concurrently")
    ),
    security(("bearerAuth" = []))
)]
pub async fn reject_report(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(payload): Json<RejectRequest>,
) -> AppResult<Json<Report>> {
    let report = authorize_report(&state, &principal, id, Action::RejectReport).await?;

    let now = utc_now();
    let transition = lifecycle::reject(
        &report,
        payload.rejection_reason.as_deref(),
        principal.email.as_deref(),
        now,
    )?;
    let report = effects::commit(&state.pool, transition, now).await?;

    tracing::info!(report_id = id, actor = ?principal.user_id, "report rejected");
    Ok(Json(report))
}

async fn resolve_assignment(state: &AppState, raw: Option<&str>) -> AppResult<Assignment> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(Assignment::Clear);
    };
    let Ok(user_id) = Uuid::parse_str(raw) else {
        return Ok(Assignment::Unknown);
    };

    let mut conn = state.pool.acquire().await?;
    if users::find_by_id(&mut conn, user_id).await?.is_none() {
        return Ok(Assignment::Unknown);
    }
    let holds_registrar = users::has_role(&mut conn, user_id, Role::Registrar).await?;
    Ok(Assignment::To { user_id, holds_registrar })
}

#[utoipa::path(
    post,
    path = "/reports/{id}/assign",
    tag = "Reports",
    params(("id" = i64, Path, description = "Report id")),
    request_body = AssignRegistrarRequest,
    responses(
        (status = 200, description = "Assignment updated", body = Report),
        (status = 403, description = "Registrar required"),
        (status = 404, description = "Report not found"),
        (status = 422, description = "Target user is not a registrar")
    ),
    security(("bearerAuth" = []))
)]
pub async fn assign_registrar(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(payload): Json<AssignRegistrarRequest>,
) -> AppResult<Json<Report>> {
    let report = authorize_report(&state, &principal, id, Action::AssignRegistrar).await?;

    let assignment = resolve_assignment(&state, payload.registrar_id.as_deref()).await?;
    let transition = lifecycle::assign_registrar(&report, assignment).map_err(|err| {
        tracing::warn!(report_id = id, error = %err, "registrar assignment refused");
        AppError::from(err)
    })?;
    let report = effects::commit(&state.pool, transition, utc_now()).await?;

    tracing::info!(report_id = id, assigned = ?report.assigned_registrar_id, "registrar assignment changed");
    Ok(Json(report))
}

#[utoipa::path(
    delete,
    path = "/reports/{id}",
    tag = "Reports",
    params(("id" = i64, Path, description = "Report id")),
    responses(
        (status = 204, description = "Report deleted and owner notified"),
        (status = 403, description = "Registrar or Admin required"),
        (status = 404, description = "Report not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_report(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let report = authorize_report(&state, &principal, id, Action::DeleteReport).await?;

    let transition = lifecycle::delete(&report, principal.email.as_deref());
    effects::commit(&state.pool, transition, utc_now()).await?;

    tracing::info!(report_id = id, actor = ?principal.user_id, "report deleted");
    Ok(StatusCode::NO_CONTENT)
}
