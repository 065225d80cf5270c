use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sqlx::SqliteConnection;
use uuid::Uuid;

use super::principal::Principal;
use crate::app::AppState;
use crate::db::users;
use crate::errors::AppError;
use crate::jwt::AuthUser;

/// Build the principal for a token subject.
///
/// A subject with no user row yields a principal without identity, which the
/// policy forbids from every identity-scoped action.
pub async fn resolve(conn: &mut SqliteConnection, subject: Uuid) -> Result<Principal, AppError> {
    let Some(db_user) = users::find_by_id(conn, subject).await? else {
        tracing::warn!(subject = %subject, "token subject does not resolve to a user");
        return Ok(Principal::anonymous());
    };

    let roles = users::roles_of(conn, subject).await?;

    Ok(Principal::new(subject)
        .with_email(db_user.email)
        .with_organization(db_user.organization_id)
        .with_roles(roles))
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        let mut conn = state.pool.acquire().await?;
        resolve(&mut conn, auth.user_id).await
    }
}
