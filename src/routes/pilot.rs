//! Pilot workspace: dashboard, own reports and notification inbox.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Access, Action, Principal, Target};
use crate::db::reports::{self, ReportScope};
use crate::db::notifications;
use crate::errors::{AppError, AppResult};
use crate::listing::{filter_items, ListQuery};
use crate::models::dashboard::PilotDashboard;
use crate::models::notification::Notification;
use crate::models::report::ReportListItem;
use crate::routes::health::store_reachable;
use crate::utils::utc_now;

const RECENT_NOTIFICATIONS: i64 = 5;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/reports", get(my_reports))
        .route("/notifications", get(list_notifications))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/notifications/:id/read", post(mark_read))
        .route("/notifications/:id/unread", post(mark_unread))
}

fn require_pilot(state: &AppState, principal: &Principal) -> AppResult<Uuid> {
    state
        .policy
        .decide(principal, Action::ViewPilotDashboard, &Target::System)
        .require("pilot workspace")?;
    principal
        .user_id
        .ok_or_else(|| AppError::forbidden("caller has no identity"))
}

#[utoipa::path(
    get,
    path = "/pilot/dashboard",
    tag = "Pilot",
    responses(
        (status = 200, description = "Pilot dashboard", body = PilotDashboard),
        (status = 403, description = "Pilot role required")
    ),
    security(("bearerAuth" = []))
)]
pub async fn dashboard(State(state): State<AppState>, principal: Principal) -> AppResult<Json<PilotDashboard>> {
    let user_id = require_pilot(&state, &principal)?;

    let mut conn = state.pool.acquire().await?;
    let (my_reports_count, my_drafts_count) = reports::owner_counts(&mut conn, user_id).await?;
    let unread_notifications_count = notifications::unread_count(&mut conn, user_id).await?;
    let recent_notifications = notifications::for_user(&mut conn, user_id, Some(RECENT_NOTIFICATIONS)).await?;
    drop(conn);

    let system_status = match store_reachable(&state.pool).await {
        Ok(()) => "Active",
        Err(err) => {
            tracing::warn!(error = %err, "system status degraded");
            "Degraded"
        }
    };

    Ok(Json(PilotDashboard {
        my_reports_count,
        my_drafts_count,
        submitted_reports_count: my_reports_count - my_drafts_count,
        unread_notifications_count,
        recent_notifications,
        system_status: system_status.to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/pilot/reports",
    tag = "Pilot",
    params(ListQuery),
    responses(
        (status = 200, description = "Caller's reports in every status", body = Vec<ReportListItem>),
        (status = 403, description = "Pilot role required")
    ),
    security(("bearerAuth" = []))
)]
pub async fn my_reports(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<ReportListItem>>> {
    let user_id = require_pilot(&state, &principal)?;

    let mut conn = state.pool.acquire().await?;
    let items = reports::list_items(&mut conn, ReportScope::OwnedBy(user_id), query.sort()).await?;
    Ok(Json(filter_items(items, query.search_term())))
}

#[utoipa::path(
    get,
    path = "/pilot/notifications",
    tag = "Pilot",
    responses(
        (status = 200, description = "Caller's notifications, newest first", body = Vec<Notification>),
        (status = 403, description = "Pilot role required")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<Json<Vec<Notification>>> {
    let user_id = require_pilot(&state, &principal)?;

    let mut conn = state.pool.acquire().await?;
    Ok(Json(notifications::for_user(&mut conn, user_id, None).await?))
}

/// Look up a notification and report whether the caller may touch it.
/// Callers other than the recipient get a silent no-op.
async fn owned_notification(state: &AppState, principal: &Principal, id: i64) -> AppResult<bool> {
    let mut conn = state.pool.acquire().await?;
    let notification = notifications::find(&mut conn, id).await?;

    match state
        .policy
        .decide(principal, Action::MarkNotification, &Target::notification(notification.as_ref()))
    {
        Access::Allow => Ok(true),
        Access::NotFound => {
            tracing::debug!(notification_id = id, "notification update skipped");
            Ok(false)
        }
        Access::Forbid => Err(AppError::forbidden("caller has no identity")),
    }
}

#[utoipa::path(
    post,
    path = "/pilot/notifications/{id}/read",
    tag = "Pilot",
    params(("id" = i64, Path, description = "Notification id")),
    responses((status = 204, description = "Marked as read, or ignored when not the caller's")),
    security(("bearerAuth" = []))
)]
pub async fn mark_read(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    if owned_notification(&state, &principal, id).await? {
        let mut conn = state.pool.acquire().await?;
        notifications::mark_read(&mut conn, id, utc_now()).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/pilot/notifications/{id}/unread",
    tag = "Pilot",
    params(("id" = i64, Path, description = "Notification id")),
    responses((status = 204, description = "Marked as unread, or ignored when not the caller's")),
    security(("bearerAuth" = []))
)]
pub async fn mark_unread(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    if owned_notification(&state, &principal, id).await? {
        let mut conn = state.pool.acquire().await?;
        notifications::mark_unread(&mut conn, id).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/pilot/notifications/read-all",
    tag = "Pilot",
    responses((status = 204, description = "Every unread notification of the caller marked as read")),
    security(("bearerAuth" = []))
)]
pub async fn mark_all_read(State(state): State<AppState>, principal: Principal) -> AppResult<StatusCode> {
    state
        .policy
        .decide(&principal, Action::ManageOwnReports, &Target::System)
        .require("notifications")?;

    if let Some(user_id) = principal.user_id {
        let mut conn = state.pool.acquire().await?;
        let updated = notifications::mark_all_read(&mut conn, user_id, utc_now()).await?;
        tracing::debug!(user_id = %user_id, updated, "notifications marked read");
    }
    Ok(StatusCode::NO_CONTENT)
}
