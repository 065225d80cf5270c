use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{DefaultVisibilityPolicy, VisibilityPolicy};
use crate::docs;
use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{
    auth, health, obstacles, organization_manager, organizations, pilot, registrar, reports, users,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub policy: Arc<dyn VisibilityPolicy>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig) -> Self {
        Self::with_policy(pool, jwt, Arc::new(DefaultVisibilityPolicy::new()))
    }

    pub fn with_policy(pool: SqlitePool, jwt: JwtConfig, policy: Arc<dyn VisibilityPolicy>) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
            policy,
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    Ok(router(AppState::new(pool, jwt_config)))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout));

    let api_routes = Router::new()
        .route("/health", get(health::health))
        .route("/obstacles", get(obstacles::all_obstacles))
        .route("/obstacles/approved", get(obstacles::approved_obstacles))
        .route("/reports", get(reports::raw_reports));

    Router::new()
        .nest("/auth", auth_routes)
        .nest("/api", api_routes)
        .nest("/obstacles", obstacles::routes())
        .nest("/pilot", pilot::routes())
        .nest("/registrar", registrar::routes())
        .nest("/reports", reports::routes())
        .nest("/organizations", organizations::routes())
        .nest("/organization-manager", organization_manager::routes())
        .nest("/users", users::routes())
        .with_state(state)
        .merge(docs::swagger_ui())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
