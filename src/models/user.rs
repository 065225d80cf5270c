use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::Role;
use crate::db::row_parsers::{parse_datetime, parse_uuid};
use crate::errors::AppError;
use crate::models::organization::Organization;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub organization_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub organization_id: Option<i64>,
    pub created_at: String,
}

impl TryFrom<DbUser> for User {
    type Error = AppError;

    fn try_from(value: DbUser) -> Result<Self, Self::Error> {
        Ok(User {
            id: parse_uuid(&value.id)?,
            email: value.email,
            organization_id: value.organization_id,
            created_at: parse_datetime(&value.created_at)?,
        })
    }
}

/// Administrative view of a user.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserWithRoles {
    #[serde(flatten)]
    pub user: User,
    pub roles: Vec<Role>,
    pub organization_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "pilot@example.com")]
    pub email: String,
    #[schema(example = "S3cureP@ssw0rd")]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "pilot@example.com")]
    pub email: String,
    #[schema(example = "S3cureP@ssw0rd")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
    pub roles: Vec<Role>,
    #[schema(example = "/pilot/dashboard")]
    pub landing_route: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub user: User,
    pub roles: Vec<Role>,
    pub organization: Option<Organization>,
    pub landing_route: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GrantRoleRequest {
    #[schema(example = "Registrar")]
    pub role: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignOrganizationRequest {
    #[schema(example = 1)]
    pub organization_id: i64,
}
