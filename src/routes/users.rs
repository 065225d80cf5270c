//! User administration
//!
//! Role memberships and organization placement. Roles come from a fixed set,
//! so there is no role CRUD here.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Action, Principal, Role, Target};
use crate::db::{organizations, users};
use crate::errors::{AppError, AppResult};
use crate::models::user::{AssignOrganizationRequest, GrantRoleRequest, UserWithRoles};
use crate::utils::utc_now;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/:id", get(get_user))
        .route("/:id/roles", post(grant_role))
        .route("/:id/roles/:role", delete(revoke_role))
        .route("/:id/organization", put(assign_organization).delete(remove_organization))
}

fn require_admin(state: &AppState, principal: &Principal) -> AppResult<()> {
    state
        .policy
        .decide(principal, Action::ManageUsers, &Target::System)
        .require("user administration")
}

fn parse_role(raw: &str) -> AppResult<Role> {
    raw.parse::<Role>().map_err(|err| AppError::validation(err.to_string()))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    responses(
        (status = 200, description = "Users by email, with roles", body = Vec<UserWithRoles>),
        (status = 403, description = "Admin or Registrar required")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_users(State(state): State<AppState>, principal: Principal) -> AppResult<Json<Vec<UserWithRoles>>> {
    require_admin(&state, &principal)?;

    let mut conn = state.pool.acquire().await?;
    Ok(Json(users::list_with_roles(&mut conn).await?))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User with roles", body = UserWithRoles),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserWithRoles>> {
    require_admin(&state, &principal)?;

    let mut conn = state.pool.acquire().await?;
    let user = users::fetch_user(&mut conn, id).await?;
    Ok(Json(users::with_roles(&mut conn, user).await?))
}

#[utoipa::path(
    post,
    path = "/users/{id}/roles",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = GrantRoleRequest,
    responses(
        (status = 200, description = "Role granted (idempotent)", body = UserWithRoles),
        (status = 400, description = "Unknown role"),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn grant_role(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<GrantRoleRequest>,
) -> AppResult<Json<UserWithRoles>> {
    require_admin(&state, &principal)?;
    let role = parse_role(&payload.role)?;

    let mut conn = state.pool.acquire().await?;
    let user = users::fetch_user(&mut conn, id).await?;
    if users::grant_role(&mut conn, id, role, utc_now()).await? {
        tracing::info!(user_id = %id, %role, granted_by = ?principal.user_id, "role granted");
    }

    Ok(Json(users::with_roles(&mut conn, user).await?))
}

#[utoipa::path(
    delete,
    path = "/users/{id}/roles/{role}",
    tag = "Users",
    params(
        ("id" = Uuid, Path, description = "User id"),
        ("role" = String, Path, description = "Role name")
    ),
    responses(
        (status = 204, description = "Role revoked"),
        (status = 400, description = "Unknown role"),
        (status = 404, description = "User does not hold the role")
    ),
    security(("bearerAuth" = []))
)]
pub async fn revoke_role(
    State(state): State<AppState>,
    principal: Principal,
    Path((id, role)): Path<(Uuid, String)>,
) -> AppResult<StatusCode> {
    require_admin(&state, &principal)?;
    let role = parse_role(&role)?;

    let mut conn = state.pool.acquire().await?;
    if !users::revoke_role(&mut conn, id, role).await? {
        return Err(AppError::not_found("role assignment not found"));
    }

    tracing::info!(user_id = %id, %role, revoked_by = ?principal.user_id, "role revoked");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/users/{id}/organization",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = AssignOrganizationRequest,
    responses(
        (status = 200, description = "User placed in organization", body = UserWithRoles),
        (status = 404, description = "User or organization not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn assign_organization(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignOrganizationRequest>,
) -> AppResult<Json<UserWithRoles>> {
    require_admin(&state, &principal)?;

    let mut conn = state.pool.acquire().await?;
    users::fetch_user(&mut conn, id).await?;
    if organizations::find(&mut conn, payload.organization_id).await?.is_none() {
        return Err(AppError::not_found("organization not found"));
    }

    users::set_organization(&mut conn, id, Some(payload.organization_id)).await?;
    let user = users::fetch_user(&mut conn, id).await?;
    Ok(Json(users::with_roles(&mut conn, user).await?))
}

#[utoipa::path(
    delete,
    path = "/users/{id}/organization",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "User detached from organization"),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn remove_organization(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    require_admin(&state, &principal)?;

    let mut conn = state.pool.acquire().await?;
    users::set_organization(&mut conn, id, None).await?;
    Ok(StatusCode::NO_CONTENT)
}
