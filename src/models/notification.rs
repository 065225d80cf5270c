use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::row_parsers::{parse_datetime, parse_opt_datetime, parse_uuid};
use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: i64,
    pub user_id: Uuid,
    /// May reference a report that has since been deleted.
    pub report_id: i64,
    #[schema(example = "Report #12 approved")]
    pub title: String,
    pub message: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbNotification {
    pub id: i64,
    pub user_id: String,
    pub report_id: i64,
    pub title: String,
    pub message: Option<String>,
    pub is_read: bool,
    pub created_at: String,
    pub read_at: Option<String>,
}

impl TryFrom<DbNotification> for Notification {
    type Error = AppError;

    fn try_from(value: DbNotification) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: value.id,
            user_id: parse_uuid(&value.user_id)?,
            report_id: value.report_id,
            title: value.title,
            message: value.message,
            is_read: value.is_read,
            created_at: parse_datetime(&value.created_at)?,
            read_at: parse_opt_datetime(value.read_at)?,
        })
    }
}

/// A notification waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub report_id: i64,
    pub title: String,
    pub message: String,
}
