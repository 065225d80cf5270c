use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::app::AppState;
use crate::authz::{Action, Principal, Target};
use crate::db::organizations;
use crate::db::reports::{self, ReportScope};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::listing::{filter_items, ListQuery};
use crate::models::organization::{Organization, OrganizationRequest, OrganizationWithMembers};
use crate::models::report::ReportListItem;
use crate::utils::utc_now;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_organizations).post(create_organization))
        .route(
            "/:id",
            get(get_organization).put(update_organization).delete(delete_organization),
        )
        .route("/:id/reports", get(organization_reports))
}

async fn load_authorized(
    state: &AppState,
    principal: &Principal,
    id: i64,
    action: Action,
) -> AppResult<Organization> {
    let mut conn = state.pool.acquire().await?;
    let organization = organizations::find(&mut conn, id).await?;

    state
        .policy
        .decide(principal, action, &Target::organization(organization.as_ref()))
        .require("organization")?;

    organization.ok_or_else(|| AppError::not_found("organization not found"))
}

#[utoipa::path(
    get,
    path = "/organizations",
    tag = "Organizations",
    responses((status = 200, description = "Organizations by name, with members", body = Vec<OrganizationWithMembers>)),
    security(("bearerAuth" = []))
)]
pub async fn list_organizations(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> AppResult<Json<Vec<OrganizationWithMembers>>> {
    let mut conn = state.pool.acquire().await?;
    Ok(Json(organizations::list_with_members(&mut conn).await?))
}

#[utoipa::path(
    get,
    path = "/organizations/{id}",
    tag = "Organizations",
    params(("id" = i64, Path, description = "Organization id")),
    responses(
        (status = 200, description = "Organization with members", body = OrganizationWithMembers),
        (status = 404, description = "Organization not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_organization(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<OrganizationWithMembers>> {
    let mut conn = state.pool.acquire().await?;
    let organization = organizations::find(&mut conn, id)
        .await?
        .ok_or_else(|| AppError::not_found("organization not found"))?;
    Ok(Json(organizations::with_members(&mut conn, organization).await?))
}

#[utoipa::path(
    post,
    path = "/organizations",
    tag = "Organizations",
    request_body = OrganizationRequest,
    responses(
        (status = 201, description = "Organization created", body = Organization),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Admin, Registrar or OrganizationManager required")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_organization(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<OrganizationRequest>,
) -> AppResult<(StatusCode, Json<Organization>)> {
    state
        .policy
        .decide(&principal, Action::ManageOrganizations, &Target::System)
        .require("organizations")?;
    let (name, description) = payload.validate()?;

    let mut conn = state.pool.acquire().await?;
    let organization = organizations::insert(&mut conn, &name, description.as_deref(), utc_now()).await?;

    tracing::info!(organization_id = organization.id, name = %organization.name, "organization created");
    Ok((StatusCode::CREATED, Json(organization)))
}

#[utoipa::path(
    put,
    path = "/organizations/{id}",
    tag = "Organizations",
    params(("id" = i64, Path, description = "Organization id")),
    request_body = OrganizationRequest,
    responses(
        (status = 200, description = "Organization updated", body = Organization),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Admin, Registrar or OrganizationManager required"),
        (status = 404, description = "Organization not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_organization(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(payload): Json<OrganizationRequest>,
) -> AppResult<Json<Organization>> {
    load_authorized(&state, &principal, id, Action::ManageOrganizations).await?;
    let (name, description) = payload.validate()?;

    let mut conn = state.pool.acquire().await?;
    let organization = organizations::update(&mut conn, id, &name, description.as_deref()).await?;
    Ok(Json(organization))
}

#[utoipa::path(
    delete,
    path = "/organizations/{id}",
    tag = "Organizations",
    params(("id" = i64, Path, description = "Organization id")),
    responses(
        (status = 204, description = "Organization deleted, members detached"),
        (status = 403, description = "Admin or Registrar required"),
        (status = 404, description = "Organization not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_organization(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    load_authorized(&state, &principal, id, Action::DeleteOrganization).await?;

    let mut tx = state.pool.begin().await?;
    organizations::delete(&mut tx, id).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/organizations/{id}/reports",
    tag = "Organizations",
    params(("id" = i64, Path, description = "Organization id"), ListQuery),
    responses(
        (status = 200, description = "Submitted reports by the organization's members", body = Vec<ReportListItem>),
        (status = 403, description = "Caller is not allowed to see this organization"),
        (status = 404, description = "Organization not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn organization_reports(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<ReportListItem>>> {
    let organization = load_authorized(&state, &principal, id, Action::ListOrganizationReports).await?;

    let mut conn = state.pool.acquire().await?;
    let items = reports::list_items(&mut conn, ReportScope::Organization(organization.id), query.sort()).await?;
    Ok(Json(filter_items(items, query.search_term())))
}
