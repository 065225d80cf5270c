use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::listing::Sort;
use crate::models::report::{DbReport, DbReportListItem, Report, ReportDetails, ReportListItem, ReportStatus, UNKNOWN_SENDER};
use crate::utils::db_timestamp;
use crate::workflow::NewReport;

const REPORT_COLUMNS: &str = "id, user_id, obstacle_type, obstacle_height, obstacle_description, obstacle_location, \
     status, assigned_registrar_id, rejection_reason, processed_at, created_at, version";

/// Which rows a report list covers. Drafts only ever appear to their owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportScope {
    Submitted,
    Pending,
    OwnedBy(Uuid),
    Organization(i64),
    AssignedPending(Uuid),
}

impl ReportScope {
    fn clause(self) -> &'static str {
        match self {
            ReportScope::Submitted => "r.status <> 'Draft'",
            ReportScope::Pending => "r.status = 'Pending'",
            ReportScope::OwnedBy(_) => "r.user_id = ?",
            ReportScope::Organization(_) => "r.status <> 'Draft' AND u.organization_id = ?",
            ReportScope::AssignedPending(_) => "r.status = 'Pending' AND r.assigned_registrar_id = ?",
        }
    }
}

fn to_reports(rows: Vec<DbReport>) -> AppResult<Vec<Report>> {
    rows.into_iter().map(Report::try_from).collect()
}

pub async fn find(conn: &mut SqliteConnection, id: i64) -> AppResult<Option<Report>> {
    let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?");
    sqlx::query_as::<_, DbReport>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(Report::try_from)
        .transpose()
}

pub async fn exists(conn: &mut SqliteConnection, id: i64) -> AppResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM reports WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

pub async fn insert(conn: &mut SqliteConnection, report: &NewReport) -> AppResult<Report> {
    let id = sqlx::query(
        "INSERT INTO reports (user_id, obstacle_type, obstacle_height, obstacle_description, obstacle_location, status, created_at, version) \
         VALUES (?, ?, ?, ?, ?, ?, ?, 0)",
    )
    .bind(report.user_id.to_string())
    .bind(&report.obstacle_type)
    .bind(report.obstacle_height)
    .bind(&report.obstacle_description)
    .bind(&report.obstacle_location)
    .bind(report.status.as_str())
    .bind(db_timestamp(report.created_at))
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    find(conn, id)
        .await?
        .ok_or_else(|| AppError::internal("report vanished after insert"))
}

/// Write `report` back if nobody changed it since it was read.
///
/// The stored `version` must still equal `report.version`; on success the
/// returned report carries the incremented version.
pub async fn save(conn: &mut SqliteConnection, report: &Report) -> AppResult<Report> {
    let result = sqlx::query(
        "UPDATE reports SET obstacle_type = ?, obstacle_height = ?, obstacle_description = ?, obstacle_location = ?, \
         status = ?, assigned_registrar_id = ?, rejection_reason = ?, processed_at = ?, version = version + 1 \
         WHERE id = ? AND version = ?",
    )
    .bind(&report.obstacle_type)
    .bind(report.obstacle_height)
    .bind(&report.obstacle_description)
    .bind(&report.obstacle_location)
    .bind(report.status.as_str())
    .bind(report.assigned_registrar_id.map(|id| id.to_string()))
    .bind(&report.rejection_reason)
    .bind(report.processed_at.map(db_timestamp))
    .bind(report.id)
    .bind(report.version)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        if exists(conn, report.id).await? {
            tracing::warn!(report_id = report.id, version = report.version, "stale report update rejected");
            return Err(AppError::conflict(format!(
                "report #{} was modified by someone else",
                report.id
            )));
        }
        return Err(AppError::not_found("report not found"));
    }

    Ok(Report {
        version: report.version + 1,
        ..report.clone()
    })
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM reports WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("report not found"));
    }
    Ok(())
}

/// List projection joined with sender and organization, ordered in SQL.
pub async fn list_items(conn: &mut SqliteConnection, scope: ReportScope, sort: Sort) -> AppResult<Vec<ReportListItem>> {
    let sql = format!(
        "SELECT r.id, r.created_at, u.email AS sender, o.name AS organization_name, r.obstacle_type, r.status, r.obstacle_location \
         FROM reports r \
         LEFT JOIN users u ON u.id = r.user_id \
         LEFT JOIN organizations o ON o.id = u.organization_id \
         WHERE {} ORDER BY {}",
        scope.clause(),
        sort.order_by()
    );

    let query = sqlx::query_as::<_, DbReportListItem>(&sql);
    let query = match scope {
        ReportScope::OwnedBy(user_id) | ReportScope::AssignedPending(user_id) => query.bind(user_id.to_string()),
        ReportScope::Organization(organization_id) => query.bind(organization_id),
        ReportScope::Submitted | ReportScope::Pending => query,
    };

    query
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(ReportListItem::try_from)
        .collect()
}

pub async fn drafts_of(conn: &mut SqliteConnection, user_id: Uuid) -> AppResult<Vec<Report>> {
    let sql = format!(
        "SELECT {REPORT_COLUMNS} FROM reports WHERE user_id = ? AND status = 'Draft' ORDER BY created_at DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, DbReport>(&sql)
        .bind(user_id.to_string())
        .fetch_all(&mut *conn)
        .await?;
    to_reports(rows)
}

/// Every submitted report, newest first.
pub async fn submitted_newest_first(conn: &mut SqliteConnection) -> AppResult<Vec<Report>> {
    let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE status <> 'Draft' ORDER BY created_at DESC, id DESC");
    let rows = sqlx::query_as::<_, DbReport>(&sql).fetch_all(&mut *conn).await?;
    to_reports(rows)
}

pub async fn with_location(conn: &mut SqliteConnection) -> AppResult<Vec<Report>> {
    let sql = format!(
        "SELECT {REPORT_COLUMNS} FROM reports \
         WHERE status <> 'Draft' AND obstacle_location IS NOT NULL AND TRIM(obstacle_location) <> '' \
         ORDER BY id"
    );
    let rows = sqlx::query_as::<_, DbReport>(&sql).fetch_all(&mut *conn).await?;
    to_reports(rows)
}

pub async fn approved(conn: &mut SqliteConnection) -> AppResult<Vec<Report>> {
    let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE status = 'Approved' ORDER BY id");
    let rows = sqlx::query_as::<_, DbReport>(&sql).fetch_all(&mut *conn).await?;
    to_reports(rows)
}

pub async fn count_submitted(conn: &mut SqliteConnection) -> AppResult<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(1) FROM reports WHERE status <> 'Draft'")
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

pub async fn count_with_status(conn: &mut SqliteConnection, status: ReportStatus) -> AppResult<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(1) FROM reports WHERE status = ?")
        .bind(status.as_str())
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// `(all reports, drafts)` owned by `user_id`.
pub async fn owner_counts(conn: &mut SqliteConnection, user_id: Uuid) -> AppResult<(i64, i64)> {
    let counts: (i64, i64) = sqlx::query_as(
        "SELECT COUNT(1), COALESCE(SUM(CASE WHEN status = 'Draft' THEN 1 ELSE 0 END), 0) FROM reports WHERE user_id = ?",
    )
    .bind(user_id.to_string())
    .fetch_one(&mut *conn)
    .await?;
    Ok(counts)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

/// Counts over submitted reports filed by members of an organization.
pub async fn organization_counts(conn: &mut SqliteConnection, organization_id: i64) -> AppResult<StatusCounts> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT r.status, COUNT(1) FROM reports r JOIN users u ON u.id = r.user_id \
         WHERE u.organization_id = ? AND r.status <> 'Draft' GROUP BY r.status",
    )
    .bind(organization_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut counts = StatusCounts::default();
    for (status, count) in rows {
        counts.total += count;
        match status.parse::<ReportStatus>()? {
            ReportStatus::Pending => counts.pending = count,
            ReportStatus::Approved => counts.approved = count,
            ReportStatus::Rejected => counts.rejected = count,
            ReportStatus::Draft => {}
        }
    }
    Ok(counts)
}

pub async fn details(conn: &mut SqliteConnection, report: Report) -> AppResult<ReportDetails> {
    let owner: Option<(String, Option<String>)> = match report.user_id {
        Some(user_id) => {
            sqlx::query_as(
                "SELECT u.email, o.name FROM users u LEFT JOIN organizations o ON o.id = u.organization_id WHERE u.id = ?",
            )
            .bind(user_id.to_string())
            .fetch_optional(&mut *conn)
            .await?
        }
        None => None,
    };

    let assigned_registrar_email: Option<String> = match report.assigned_registrar_id {
        Some(registrar_id) => {
            sqlx::query_scalar("SELECT email FROM users WHERE id = ?")
                .bind(registrar_id.to_string())
                .fetch_optional(&mut *conn)
                .await?
        }
        None => None,
    };

    let (sender, organization_name) = owner.unwrap_or_else(|| (UNKNOWN_SENDER.to_string(), None));
    Ok(ReportDetails {
        report,
        sender,
        organization_name,
        assigned_registrar_email,
    })
}
