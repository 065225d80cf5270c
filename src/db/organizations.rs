use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::errors::{AppError, AppResult};
use crate::models::organization::{DbMember, DbOrganization, Member, Organization, OrganizationWithMembers};
use crate::utils::db_timestamp;

pub async fn find(conn: &mut SqliteConnection, id: i64) -> AppResult<Option<Organization>> {
    sqlx::query_as::<_, DbOrganization>("SELECT id, name, description, created_at FROM organizations WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(Organization::try_from)
        .transpose()
}

pub async fn find_by_name(conn: &mut SqliteConnection, name: &str) -> AppResult<Option<Organization>> {
    sqlx::query_as::<_, DbOrganization>(
        "SELECT id, name, description, created_at FROM organizations WHERE name = ? COLLATE NOCASE",
    )
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?
    .map(Organization::try_from)
    .transpose()
}

pub async fn members(conn: &mut SqliteConnection, organization_id: i64) -> AppResult<Vec<Member>> {
    sqlx::query_as::<_, DbMember>("SELECT id, email FROM users WHERE organization_id = ? ORDER BY email")
        .bind(organization_id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(Member::try_from)
        .collect()
}

pub async fn with_members(conn: &mut SqliteConnection, organization: Organization) -> AppResult<OrganizationWithMembers> {
    let members = members(conn, organization.id).await?;
    Ok(OrganizationWithMembers { organization, members })
}

pub async fn list_with_members(conn: &mut SqliteConnection) -> AppResult<Vec<OrganizationWithMembers>> {
    let organizations = sqlx::query_as::<_, DbOrganization>(
        "SELECT id, name, description, created_at FROM organizations ORDER BY name, id",
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut result = Vec::with_capacity(organizations.len());
    for db_org in organizations {
        let organization: Organization = db_org.try_into()?;
        result.push(with_members(conn, organization).await?);
    }
    Ok(result)
}

pub async fn insert(
    conn: &mut SqliteConnection,
    name: &str,
    description: Option<&str>,
    now: DateTime<Utc>,
) -> AppResult<Organization> {
    let id = sqlx::query("INSERT INTO organizations (name, description, created_at) VALUES (?, ?, ?)")
        .bind(name)
        .bind(description)
        .bind(db_timestamp(now))
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

    find(conn, id)
        .await?
        .ok_or_else(|| AppError::internal("organization vanished after insert"))
}

/// Zero affected rows means the organization was removed concurrently.
pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    name: &str,
    description: Option<&str>,
) -> AppResult<Organization> {
    let result = sqlx::query("UPDATE organizations SET name = ?, description = ? WHERE id = ?")
        .bind(name)
        .bind(description)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("organization not found"));
    }

    find(conn, id)
        .await?
        .ok_or_else(|| AppError::not_found("organization not found"))
}

/// Detaches members before removing the row. Run inside a transaction.
pub async fn delete(conn: &mut SqliteConnection, id: i64) -> AppResult<()> {
    let detached = sqlx::query("UPDATE users SET organization_id = NULL WHERE organization_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    let result = sqlx::query("DELETE FROM organizations WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("organization not found"));
    }

    tracing::info!(organization_id = id, detached_users = detached, "organization deleted");
    Ok(())
}
