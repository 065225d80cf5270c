use serde::Serialize;
use utoipa::ToSchema;

use crate::models::notification::Notification;
use crate::models::organization::Organization;
use crate::models::report::ReportListItem;

#[derive(Debug, Serialize, ToSchema)]
pub struct PilotDashboard {
    pub my_reports_count: i64,
    pub my_drafts_count: i64,
    pub submitted_reports_count: i64,
    pub unread_notifications_count: i64,
    pub recent_notifications: Vec<Notification>,
    /// "Active" when the store answers, "Degraded" otherwise.
    #[schema(example = "Active")]
    pub system_status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrarDashboard {
    pub report_count: i64,
    pub pending_reports_count: i64,
    pub my_assigned_reports: Vec<ReportListItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ManagerDashboard {
    pub organization: Organization,
    pub total_reports: i64,
    pub pending_reports: i64,
    pub approved_reports: i64,
    pub rejected_reports: i64,
}
