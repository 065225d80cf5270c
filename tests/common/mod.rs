#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

use obstacle_registry::authz::Role;
use obstacle_registry::create_app;
use obstacle_registry::db::{organizations, users};
use obstacle_registry::utils::db_timestamp;

pub const POINT: &str = r#"{"type":"Point","coordinates":[10.75,59.91]}"#;

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    _dir: TempDir,
}

pub async fn spawn_app() -> Result<TestApp> {
    let dir = tempdir().context("failed to create tempdir")?;
    let opts = SqliteConnectOptions::new()
        .filename(dir.path().join("test.db"))
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
        .await?;
    migrator.run(&pool).await?;

    std::env::set_var("JWT_SECRET", "test-secret");
    let app = create_app(pool.clone()).await?;

    Ok(TestApp { app, pool, _dir: dir })
}

impl TestApp {
    pub async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let req = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.send("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.send("POST", uri, token, Some(body)).await
    }

    /// Register through the API; returns `(token, user id)`.
    pub async fn register(&self, email: &str) -> Result<(String, Uuid)> {
        let (status, body) = self
            .post("/auth/register", None, serde_json::json!({ "email": email, "password": "password123" }))
            .await?;
        if status != StatusCode::CREATED {
            panic!("register failed: {status} - {body}");
        }
        let token = body["token"].as_str().context("missing token")?.to_string();
        let id = Uuid::parse_str(body["user"]["id"].as_str().context("missing user id")?)?;
        Ok((token, id))
    }

    pub async fn register_with_roles(&self, email: &str, roles: &[Role]) -> Result<(String, Uuid)> {
        let (token, id) = self.register(email).await?;
        for role in roles {
            self.grant(id, *role).await?;
        }
        Ok((token, id))
    }

    pub async fn grant(&self, user_id: Uuid, role: Role) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        users::grant_role(&mut conn, user_id, role, Utc::now()).await?;
        Ok(())
    }

    pub async fn create_organization(&self, name: &str) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        Ok(organizations::insert(&mut conn, name, None, Utc::now()).await?.id)
    }

    pub async fn join_organization(&self, user_id: Uuid, organization_id: i64) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        users::set_organization(&mut conn, user_id, Some(organization_id)).await?;
        Ok(())
    }

    /// Insert a report row directly, bypassing validation.
    pub async fn insert_report(&self, owner: Option<Uuid>, status: &str, obstacle_type: &str, created_at: DateTime<Utc>) -> Result<i64> {
        let id = sqlx::query(
            "INSERT INTO reports (user_id, obstacle_type, obstacle_height, obstacle_description, obstacle_location, status, created_at) \
             VALUES (?, ?, 30, 'seeded', ?, ?, ?)",
        )
        .bind(owner.map(|id| id.to_string()))
        .bind(obstacle_type)
        .bind(POINT)
        .bind(status)
        .bind(db_timestamp(created_at))
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    pub async fn assign(&self, report_id: i64, registrar: Uuid) -> Result<()> {
        sqlx::query("UPDATE reports SET assigned_registrar_id = ? WHERE id = ?")
            .bind(registrar.to_string())
            .bind(report_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn report_status(&self, report_id: i64) -> Result<Option<String>> {
        Ok(sqlx::query_scalar("SELECT status FROM reports WHERE id = ?")
            .bind(report_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn notification_titles(&self, user_id: Uuid) -> Result<Vec<String>> {
        Ok(sqlx::query_scalar("SELECT title FROM notifications WHERE user_id = ? ORDER BY id")
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await?)
    }
}

pub fn ids(body: &Value) -> Vec<i64> {
    body.as_array()
        .map(|items| items.iter().filter_map(|item| item["id"].as_i64()).collect())
        .unwrap_or_default()
}
