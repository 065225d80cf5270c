//! Obstacle submission, the owner's draft workspace and the shared map layers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::app::AppState;
use crate::authz::{Action, Principal, Target};
use crate::db::{effects, reports};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::report::{ObstacleFeature, ObstacleForm, Report};
use crate::utils::utc_now;
use crate::workflow::lifecycle;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_obstacle))
        .route("/drafts", get(list_drafts))
        .route("/drafts/:id", get(get_draft).put(update_draft))
}

fn caller_id(principal: &Principal) -> AppResult<uuid::Uuid> {
    principal
        .user_id
        .ok_or_else(|| AppError::forbidden("caller has no identity"))
}

#[utoipa::path(
    post,
    path = "/obstacles",
    tag = "Obstacles",
    request_body = ObstacleForm,
    responses(
        (status = 201, description = "Report created as draft or submitted", body = Report),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Caller has no identity")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_obstacle(
    State(state): State<AppState>,
    principal: Principal,
    Json(form): Json<ObstacleForm>,
) -> AppResult<(StatusCode, Json<Report>)> {
    state
        .policy
        .decide(&principal, Action::ManageOwnReports, &Target::System)
        .require("obstacle reports")?;
    let owner = caller_id(&principal)?;

    let new_report = lifecycle::create(owner, &form, utc_now())?;
    let mut conn = state.pool.acquire().await?;
    let report = reports::insert(&mut conn, &new_report).await?;

    tracing::info!(report_id = report.id, status = %report.status, user_id = %owner, "report created");
    Ok((StatusCode::CREATED, Json(report)))
}

#[utoipa::path(
    get,
    path = "/obstacles/drafts",
    tag = "Obstacles",
    responses((status = 200, description = "Caller's drafts, newest first", body = Vec<Report>)),
    security(("bearerAuth" = []))
)]
pub async fn list_drafts(State(state): State<AppState>, principal: Principal) -> AppResult<Json<Vec<Report>>> {
    state
        .policy
        .decide(&principal, Action::ManageOwnReports, &Target::System)
        .require("drafts")?;
    let owner = caller_id(&principal)?;

    let mut conn = state.pool.acquire().await?;
    Ok(Json(reports::drafts_of(&mut conn, owner).await?))
}

async fn fetch_draft(state: &AppState, principal: &Principal, id: i64) -> AppResult<Report> {
    let mut conn = state.pool.acquire().await?;
    let report = reports::find(&mut conn, id).await?;

    state
        .policy
        .decide(principal, Action::EditDraft, &Target::report(report.as_ref()))
        .require("draft")?;

    report.ok_or_else(|| AppError::not_found("draft not found"))
}

#[utoipa::path(
    get,
    path = "/obstacles/drafts/{id}",
    tag = "Obstacles",
    params(("id" = i64, Path, description = "Report id")),
    responses(
        (status = 200, description = "Draft", body = Report),
        (status = 404, description = "No such draft owned by the caller")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_draft(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> AppResult<Json<Report>> {
    Ok(Json(fetch_draft(&state, &principal, id).await?))
}

#[utoipa::path(
    put,
    path = "/obstacles/drafts/{id}",
    tag = "Obstacles",
    params(("id" = i64, Path, description = "Report id")),
    request_body = ObstacleForm,
    responses(
        (status = 200, description = "Draft saved or submitted", body = Report),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "No such draft owned by the caller"),
        (status = 409, description = "Draft changed concurrently")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_draft(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(form): Json<ObstacleForm>,
) -> AppResult<Json<Report>> {
    let draft = fetch_draft(&state, &principal, id).await?;
    let transition = lifecycle::update_draft(&draft, &form)?;
    let report = effects::commit(&state.pool, transition, utc_now()).await?;

    tracing::info!(report_id = report.id, status = %report.status, "draft updated");
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/api/obstacles",
    tag = "Obstacles",
    responses(
        (status = 200, description = "Every submitted report with a location", body = Vec<ObstacleFeature>),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearerAuth" = []))
)]
pub async fn all_obstacles(State(state): State<AppState>, _auth: AuthUser) -> AppResult<Json<Vec<ObstacleFeature>>> {
    let mut conn = state.pool.acquire().await?;
    let features = reports::with_location(&mut conn)
        .await?
        .into_iter()
        .map(ObstacleFeature::from)
        .collect();
    Ok(Json(features))
}

#[utoipa::path(
    get,
    path = "/api/obstacles/approved",
    tag = "Obstacles",
    responses((status = 200, description = "Approved obstacles", body = Vec<ObstacleFeature>))
)]
pub async fn approved_obstacles(State(state): State<AppState>) -> AppResult<Json<Vec<ObstacleFeature>>> {
    let mut conn = state.pool.acquire().await?;
    let features = reports::approved(&mut conn)
        .await?
        .into_iter()
        .map(ObstacleFeature::from)
        .collect();
    Ok(Json(features))
}
