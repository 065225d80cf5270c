use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use obstacle_registry::authz::Role;
use obstacle_registry::seed;

mod common;

#[tokio::test]
async fn admin_grants_and_revokes_roles() -> Result<()> {
    let t = common::spawn_app().await?;
    let (admin, _) = t.register_with_roles("admin@example.com", &[Role::Admin]).await?;
    let (pilot, pilot_id) = t.register("pilot@example.com").await?;
    let roles_uri = format!("/users/{pilot_id}/roles");

    let (status, _) = t.post(&roles_uri, Some(&pilot), json!({ "role": "Admin" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t.post(&roles_uri, Some(&admin), json!({ "role": "Superuser" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = t.post(&roles_uri, Some(&admin), json!({ "role": "pilot" })).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["roles"], json!(["Pilot"]));

    let (status, body) = t.post(&roles_uri, Some(&admin), json!({ "role": "Pilot" })).await?;
    assert_eq!(status, StatusCode::OK, "granting twice is idempotent");
    assert_eq!(body["roles"], json!(["Pilot"]));

    let (_, me) = t.get("/auth/me", Some(&pilot)).await?;
    assert_eq!(me["landing_route"], "/pilot/dashboard");

    let (status, _) = t.send("DELETE", &format!("{roles_uri}/Pilot"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = t.send("DELETE", &format!("{roles_uri}/Pilot"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn admin_places_users_in_organizations() -> Result<()> {
    let t = common::spawn_app().await?;
    let (admin, _) = t.register_with_roles("admin@example.com", &[Role::Admin]).await?;
    let (_, pilot_id) = t.register("pilot@example.com").await?;
    let nla = t.create_organization("NLA").await?;
    let uri = format!("/users/{pilot_id}/organization");

    let (status, _) = t
        .send("PUT", &uri, Some(&admin), Some(json!({ "organization_id": 999 })))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = t
        .send("PUT", &uri, Some(&admin), Some(json!({ "organization_id": nla })))
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["organization_name"], "NLA");

    let (status, _) = t.send("DELETE", &uri, Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = t.get(&format!("/users/{pilot_id}"), Some(&admin)).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["organization_id"].is_null());
    Ok(())
}

#[tokio::test]
async fn seed_is_idempotent_and_admin_can_log_in() -> Result<()> {
    let t = common::spawn_app().await?;

    let first = seed::run(&t.pool, "root@example.com", "Admin123!").await?;
    assert_eq!(first.organizations_created, 4);
    assert!(first.admin_created);

    let second = seed::run(&t.pool, "root@example.com", "Admin123!").await?;
    assert_eq!(second.organizations_created, 0);
    assert!(!second.admin_created);

    let (status, body) = t
        .post("/auth/login", None, json!({ "email": "root@example.com", "password": "Admin123!" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["roles"], json!(["Admin"]));
    assert_eq!(body["landing_route"], "/reports");

    let (status, orgs) = t.get("/organizations", Some(body["token"].as_str().unwrap_or_default())).await?;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = orgs
        .as_array()
        .map(|items| items.iter().filter_map(|o| o["name"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(names, vec!["Kartverket", "Luftforsvaret", "NLA", "Politiets helikoptertjeneste"]);
    Ok(())
}

#[tokio::test]
async fn seed_skips_default_admin_when_an_admin_exists() -> Result<()> {
    let t = common::spawn_app().await?;
    t.register_with_roles("boss@example.com", &[Role::Admin]).await?;

    let summary = seed::run(&t.pool, "root@example.com", "Admin123!").await?;
    assert_eq!(summary.organizations_created, 4);
    assert!(!summary.admin_created);

    let (status, _) = t
        .post("/auth/login", None, json!({ "email": "root@example.com", "password": "Admin123!" }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}
