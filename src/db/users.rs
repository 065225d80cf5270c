use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::authz::Role;
use crate::db::organizations;
use crate::errors::{AppError, AppResult};
use crate::models::user::{DbUser, User, UserWithRoles};
use crate::utils::db_timestamp;

const USER_COLUMNS: &str = "id, email, password_hash, organization_id, created_at";

pub async fn find_by_id(conn: &mut SqliteConnection, user_id: Uuid) -> AppResult<Option<DbUser>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    let user = sqlx::query_as::<_, DbUser>(&sql)
        .bind(user_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(user)
}

pub async fn find_by_email(conn: &mut SqliteConnection, email: &str) -> AppResult<Option<DbUser>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ? COLLATE NOCASE");
    let user = sqlx::query_as::<_, DbUser>(&sql)
        .bind(email.trim())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(user)
}

pub async fn fetch_user(conn: &mut SqliteConnection, user_id: Uuid) -> AppResult<User> {
    find_by_id(conn, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?
        .try_into()
}

pub async fn email_exists(conn: &mut SqliteConnection, email: &str) -> AppResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ? COLLATE NOCASE")
        .bind(email.trim())
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

pub async fn insert(
    conn: &mut SqliteConnection,
    email: &str,
    password_hash: &str,
    now: DateTime<Utc>,
) -> AppResult<User> {
    let user_id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email, password_hash, organization_id, created_at) VALUES (?, ?, ?, NULL, ?)")
        .bind(user_id.to_string())
        .bind(email.trim())
        .bind(password_hash)
        .bind(db_timestamp(now))
        .execute(&mut *conn)
        .await?;

    fetch_user(conn, user_id).await
}

pub async fn roles_of(conn: &mut SqliteConnection, user_id: Uuid) -> AppResult<Vec<Role>> {
    let names: Vec<String> = sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = ? ORDER BY role")
        .bind(user_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    let mut roles = names
        .iter()
        .map(|name| name.parse::<Role>().map_err(|e| AppError::internal(e.to_string())))
        .collect::<AppResult<Vec<_>>>()?;
    roles.sort();
    Ok(roles)
}

pub async fn has_role(conn: &mut SqliteConnection, user_id: Uuid, role: Role) -> AppResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM user_roles WHERE user_id = ? AND role = ?")
        .bind(user_id.to_string())
        .bind(role.as_str())
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

pub async fn any_with_role(conn: &mut SqliteConnection, role: Role) -> AppResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM user_roles WHERE role = ?")
        .bind(role.as_str())
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

/// Idempotent; returns whether a new membership was created.
pub async fn grant_role(conn: &mut SqliteConnection, user_id: Uuid, role: Role, now: DateTime<Utc>) -> AppResult<bool> {
    let result = sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role, created_at) VALUES (?, ?, ?)")
        .bind(user_id.to_string())
        .bind(role.as_str())
        .bind(db_timestamp(now))
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn revoke_role(conn: &mut SqliteConnection, user_id: Uuid, role: Role) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role = ?")
        .bind(user_id.to_string())
        .bind(role.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_organization(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    organization_id: Option<i64>,
) -> AppResult<()> {
    let result = sqlx::query("UPDATE users SET organization_id = ? WHERE id = ?")
        .bind(organization_id)
        .bind(user_id.to_string())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("user not found"));
    }
    Ok(())
}

pub async fn with_roles(conn: &mut SqliteConnection, user: User) -> AppResult<UserWithRoles> {
    let roles = roles_of(conn, user.id).await?;
    let organization_name = match user.organization_id {
        Some(id) => organizations::find(conn, id).await?.map(|org| org.name),
        None => None,
    };
    Ok(UserWithRoles {
        user,
        roles,
        organization_name,
    })
}

/// Every user with roles and organization name, ordered by email.
pub async fn list_with_roles(conn: &mut SqliteConnection) -> AppResult<Vec<UserWithRoles>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY email");
    let users = sqlx::query_as::<_, DbUser>(&sql).fetch_all(&mut *conn).await?;

    let memberships: Vec<(String, String)> = sqlx::query_as("SELECT user_id, role FROM user_roles")
        .fetch_all(&mut *conn)
        .await?;
    let mut roles_by_user: HashMap<String, Vec<Role>> = HashMap::new();
    for (user_id, role) in memberships {
        let role = role.parse::<Role>().map_err(|e| AppError::internal(e.to_string()))?;
        roles_by_user.entry(user_id).or_default().push(role);
    }

    let org_names: HashMap<i64, String> = sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM organizations")
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .collect();

    users
        .into_iter()
        .map(|db_user| {
            let mut roles = roles_by_user.remove(&db_user.id).unwrap_or_default();
            roles.sort();
            let user: User = db_user.try_into()?;
            let organization_name = user.organization_id.and_then(|id| org_names.get(&id).cloned());
            Ok(UserWithRoles {
                user,
                roles,
                organization_name,
            })
        })
        .collect()
}
