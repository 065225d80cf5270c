use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app::AppState;
use crate::authz::{landing_route, resolve, Principal};
use crate::db::{organizations, users};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::user::{AuthResponse, LoginRequest, MeResponse, RegisterRequest, User};
use crate::utils::{hash_password, utc_now, verify_password};

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    message: String,
}

fn validate_email(email: &str) -> AppResult<&str> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') => Ok(email),
        _ => Err(AppError::validation("a valid email address is required")),
    }
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let email = validate_email(&payload.email)?;
    let password_hash = hash_password(&payload.password)?;

    let mut conn = state.pool.acquire().await?;
    if users::email_exists(&mut conn, email).await? {
        return Err(AppError::conflict("email already in use"));
    }

    let user = users::insert(&mut conn, email, &password_hash, utc_now()).await?;
    let token = state.jwt.encode(user.id)?;
    tracing::info!(user_id = %user.id, "user registered");

    let principal = Principal::new(user.id);
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user,
            roles: Vec::new(),
            landing_route: landing_route(&principal).to_string(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let mut conn = state.pool.acquire().await?;
    let db_user = users::find_by_email(&mut conn, &payload.email)
        .await?
        .ok_or_else(|| AppError::unauthorized("invalid credentials"))?;

    if !verify_password(&payload.password, &db_user.password_hash)? {
        tracing::warn!(email = %payload.email.trim(), "failed login attempt");
        return Err(AppError::unauthorized("invalid credentials"));
    }

    let user: User = db_user.try_into()?;
    let principal = resolve(&mut conn, user.id).await?;
    let token = state.jwt.encode(user.id)?;

    Ok(Json(AuthResponse {
        token,
        user,
        roles: principal.sorted_roles(),
        landing_route: landing_route(&principal).to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Token subject no longer exists")
    ),
    security(("bearerAuth" = []))
)]
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<MeResponse>> {
    let mut conn = state.pool.acquire().await?;
    let user = users::fetch_user(&mut conn, auth.user_id).await?;
    let principal = resolve(&mut conn, user.id).await?;
    let organization = match user.organization_id {
        Some(id) => organizations::find(&mut conn, id).await?,
        None => None,
    };

    Ok(Json(MeResponse {
        user,
        roles: principal.sorted_roles(),
        organization,
        landing_route: landing_route(&principal).to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Logout acknowledged", body = MessageResponse)),
    security(("bearerAuth" = []))
)]
pub async fn logout(_auth: AuthUser) -> AppResult<Json<MessageResponse>> {
    Ok(Json(MessageResponse {
        message: "Logged out".to_string(),
    }))
}
