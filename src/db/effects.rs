use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::db::{notifications, reports};
use crate::errors::AppResult;
use crate::models::report::Report;
use crate::workflow::{Effect, Transition};

/// Execute side effects in order on an open connection or transaction.
pub async fn apply(conn: &mut SqliteConnection, effects: &[Effect], now: DateTime<Utc>) -> AppResult<()> {
    for effect in effects {
        match effect {
            Effect::Notify(notification) => {
                notifications::insert(conn, notification, now).await?;
            }
            Effect::DeleteNotificationsForReport(report_id) => {
                let removed = notifications::delete_for_report(conn, *report_id).await?;
                tracing::debug!(report_id, removed, "cleared report notifications");
            }
            Effect::DeleteReport(report_id) => {
                reports::delete(conn, *report_id).await?;
            }
        }
    }
    Ok(())
}

/// Persist a transition atomically: the report row (unless the transition
/// deletes it) and then every effect. Returns the stored report.
pub async fn commit(pool: &SqlitePool, transition: Transition, now: DateTime<Utc>) -> AppResult<Report> {
    let mut tx = pool.begin().await?;

    let deletes_report = transition
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::DeleteReport(_)));

    let report = if deletes_report {
        transition.report
    } else {
        reports::save(&mut tx, &transition.report).await?
    };

    apply(&mut tx, &transition.effects, now).await?;
    tx.commit().await?;

    Ok(report)
}
