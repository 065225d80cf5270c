use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::row_parsers::{parse_datetime, parse_opt_datetime, parse_opt_uuid};
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ReportStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "Draft",
            ReportStatus::Pending => "Pending",
            ReportStatus::Approved => "Approved",
            ReportStatus::Rejected => "Rejected",
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, ReportStatus::Draft)
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, ReportStatus::Approved | ReportStatus::Rejected)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(ReportStatus::Draft),
            "Pending" => Ok(ReportStatus::Pending),
            "Approved" => Ok(ReportStatus::Approved),
            "Rejected" => Ok(ReportStatus::Rejected),
            other => Err(AppError::internal(format!("unknown report status: {other}"))),
        }
    }
}

/// An obstacle report as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Report {
    pub id: i64,
    pub user_id: Option<Uuid>,
    #[schema(example = "Crane")]
    pub obstacle_type: Option<String>,
    #[schema(example = 45)]
    pub obstacle_height: Option<i32>,
    pub obstacle_description: Option<String>,
    #[schema(example = r#"{"type":"Point","coordinates":[10.75,59.91]}"#)]
    pub obstacle_location: Option<String>,
    pub status: ReportStatus,
    pub assigned_registrar_id: Option<Uuid>,
    pub rejection_reason: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub version: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbReport {
    pub id: i64,
    pub user_id: Option<String>,
    pub obstacle_type: Option<String>,
    pub obstacle_height: Option<i32>,
    pub obstacle_description: Option<String>,
    pub obstacle_location: Option<String>,
    pub status: String,
    pub assigned_registrar_id: Option<String>,
    pub rejection_reason: Option<String>,
    pub processed_at: Option<String>,
    pub created_at: String,
    pub version: i64,
}

impl TryFrom<DbReport> for Report {
    type Error = AppError;

    fn try_from(value: DbReport) -> Result<Self, Self::Error> {
        Ok(Report {
            id: value.id,
            user_id: parse_opt_uuid(value.user_id)?,
            obstacle_type: value.obstacle_type,
            obstacle_height: value.obstacle_height,
            obstacle_description: value.obstacle_description,
            obstacle_location: value.obstacle_location,
            status: value.status.parse()?,
            assigned_registrar_id: parse_opt_uuid(value.assigned_registrar_id)?,
            rejection_reason: value.rejection_reason,
            processed_at: parse_opt_datetime(value.processed_at)?,
            created_at: parse_datetime(&value.created_at)?,
            version: value.version,
        })
    }
}

/// Row projection used by every report list view.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReportListItem {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    #[schema(example = "pilot@example.com")]
    pub sender: String,
    pub organization_name: Option<String>,
    pub obstacle_type: Option<String>,
    pub status: ReportStatus,
    pub obstacle_location: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbReportListItem {
    pub id: i64,
    pub created_at: String,
    pub sender: Option<String>,
    pub organization_name: Option<String>,
    pub obstacle_type: Option<String>,
    pub status: String,
    pub obstacle_location: Option<String>,
}

pub const UNKNOWN_SENDER: &str = "(unknown)";

impl TryFrom<DbReportListItem> for ReportListItem {
    type Error = AppError;

    fn try_from(value: DbReportListItem) -> Result<Self, Self::Error> {
        Ok(ReportListItem {
            id: value.id,
            created_at: parse_datetime(&value.created_at)?,
            sender: value.sender.unwrap_or_else(|| UNKNOWN_SENDER.to_string()),
            organization_name: value.organization_name,
            obstacle_type: value.obstacle_type,
            status: value.status.parse()?,
            obstacle_location: value.obstacle_location,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportDetails {
    pub report: Report,
    pub sender: String,
    pub organization_name: Option<String>,
    pub assigned_registrar_email: Option<String>,
}

/// Map feature served to the shared obstacle layers.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ObstacleFeature {
    pub id: i64,
    #[serde(rename = "type")]
    pub obstacle_type: Option<String>,
    pub height: Option<i32>,
    pub location: Option<String>,
}

impl From<Report> for ObstacleFeature {
    fn from(report: Report) -> Self {
        ObstacleFeature {
            id: report.id,
            obstacle_type: report.obstacle_type,
            height: report.obstacle_height,
            location: report.obstacle_location,
        }
    }
}

/// Whether a submitted form saves a draft or files the report for review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FormAction {
    Draft,
    #[default]
    Submit,
}

impl FormAction {
    pub fn target_status(self) -> ReportStatus {
        match self {
            FormAction::Draft => ReportStatus::Draft,
            FormAction::Submit => ReportStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ObstacleForm {
    #[schema(example = "Crane")]
    pub obstacle_type: Option<String>,
    /// Metres; fractional input is rounded.
    #[schema(example = 45.0)]
    pub obstacle_height: Option<f64>,
    #[schema(example = "Temporary construction crane near the harbour.")]
    pub obstacle_description: Option<String>,
    #[schema(example = r#"{"type":"Point","coordinates":[10.75,59.91]}"#)]
    pub obstacle_location: Option<String>,
    #[serde(default)]
    pub action: FormAction,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RejectRequest {
    #[schema(example = "Location does not match the description.")]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AssignRegistrarRequest {
    /// Empty or missing clears the assignment.
    pub registrar_id: Option<String>,
}
