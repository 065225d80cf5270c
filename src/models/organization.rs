use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::row_parsers::{parse_datetime, parse_uuid};
use crate::errors::AppError;

const MAX_NAME_LENGTH: usize = 200;
const MAX_DESCRIPTION_LENGTH: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Organization {
    pub id: i64,
    #[schema(example = "Norsk Luftambulanse")]
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbOrganization {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

impl TryFrom<DbOrganization> for Organization {
    type Error = AppError;

    fn try_from(value: DbOrganization) -> Result<Self, Self::Error> {
        Ok(Organization {
            id: value.id,
            name: value.name,
            description: value.description,
            created_at: parse_datetime(&value.created_at)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Member {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbMember {
    pub id: String,
    pub email: String,
}

impl TryFrom<DbMember> for Member {
    type Error = AppError;

    fn try_from(value: DbMember) -> Result<Self, Self::Error> {
        Ok(Member {
            id: parse_uuid(&value.id)?,
            email: value.email,
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrganizationWithMembers {
    #[serde(flatten)]
    pub organization: Organization,
    pub members: Vec<Member>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrganizationRequest {
    #[schema(example = "Kartverket")]
    pub name: String,
    #[schema(example = "Norwegian Mapping Authority")]
    pub description: Option<String>,
}

impl OrganizationRequest {
    /// Trimmed name and description, with blank descriptions dropped.
    pub fn validate(&self) -> Result<(String, Option<String>), AppError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("name is required"));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(AppError::validation(format!(
                "name must be at most {MAX_NAME_LENGTH} characters"
            )));
        }

        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        if description.is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LENGTH) {
            return Err(AppError::validation(format!(
                "description must be at most {MAX_DESCRIPTION_LENGTH} characters"
            )));
        }

        Ok((name.to_string(), description.map(str::to_string)))
    }
}
