use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::notification::{DbNotification, NewNotification, Notification};
use crate::utils::db_timestamp;

const NOTIFICATION_COLUMNS: &str = "id, user_id, report_id, title, message, is_read, created_at, read_at";

pub async fn insert(conn: &mut SqliteConnection, notification: &NewNotification, now: DateTime<Utc>) -> AppResult<i64> {
    let id = sqlx::query(
        "INSERT INTO notifications (user_id, report_id, title, message, is_read, created_at) VALUES (?, ?, ?, ?, 0, ?)",
    )
    .bind(notification.user_id.to_string())
    .bind(notification.report_id)
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(db_timestamp(now))
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();
    Ok(id)
}

pub async fn find(conn: &mut SqliteConnection, id: i64) -> AppResult<Option<Notification>> {
    let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?");
    sqlx::query_as::<_, DbNotification>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(Notification::try_from)
        .transpose()
}

/// Newest first; `limit` of `None` returns everything.
pub async fn for_user(conn: &mut SqliteConnection, user_id: Uuid, limit: Option<i64>) -> AppResult<Vec<Notification>> {
    let sql = format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?"
    );
    sqlx::query_as::<_, DbNotification>(&sql)
        .bind(user_id.to_string())
        .bind(limit.unwrap_or(-1))
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(Notification::try_from)
        .collect()
}

pub async fn for_report(conn: &mut SqliteConnection, report_id: i64) -> AppResult<Vec<Notification>> {
    let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE report_id = ? ORDER BY id");
    sqlx::query_as::<_, DbNotification>(&sql)
        .bind(report_id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(Notification::try_from)
        .collect()
}

pub async fn unread_count(conn: &mut SqliteConnection, user_id: Uuid) -> AppResult<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(1) FROM notifications WHERE user_id = ? AND is_read = 0")
        .bind(user_id.to_string())
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

pub async fn mark_read(conn: &mut SqliteConnection, id: i64, now: DateTime<Utc>) -> AppResult<()> {
    sqlx::query("UPDATE notifications SET is_read = 1, read_at = ? WHERE id = ?")
        .bind(db_timestamp(now))
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn mark_unread(conn: &mut SqliteConnection, id: i64) -> AppResult<()> {
    sqlx::query("UPDATE notifications SET is_read = 0, read_at = NULL WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn mark_all_read(conn: &mut SqliteConnection, user_id: Uuid, now: DateTime<Utc>) -> AppResult<u64> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1, read_at = ? WHERE user_id = ? AND is_read = 0")
        .bind(db_timestamp(now))
        .bind(user_id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_for_report(conn: &mut SqliteConnection, report_id: i64) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM notifications WHERE report_id = ?")
        .bind(report_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
