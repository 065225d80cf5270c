use anyhow::Result;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

use obstacle_registry::authz::Role;

mod common;
use common::{ids, POINT};

fn submission(height: f64) -> serde_json::Value {
    json!({
        "obstacle_type": "Crane",
        "obstacle_height": height,
        "obstacle_description": "Temporary construction crane near the harbour.",
        "obstacle_location": POINT,
        "action": "submit"
    })
}

#[tokio::test]
async fn submit_rejects_height_out_of_range() -> Result<()> {
    let t = common::spawn_app().await?;
    let (token, _) = t.register_with_roles("pilot@example.com", &[Role::Pilot]).await?;

    let (status, body) = t.post("/obstacles", Some(&token), submission(250.0)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"], "validation");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM reports").fetch_one(&t.pool).await?;
    assert_eq!(count, 0);
    Ok(())
}

#[tokio::test]
async fn submit_creates_pending_report() -> Result<()> {
    let t = common::spawn_app().await?;
    let (token, id) = t.register_with_roles("pilot@example.com", &[Role::Pilot]).await?;

    let (status, body) = t.post("/obstacles", Some(&token), submission(49.6)).await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "Pending");
    assert_eq!(body["obstacle_height"], 50);
    assert_eq!(body["user_id"], id.to_string());
    assert!(body["processed_at"].is_null());
    Ok(())
}

#[tokio::test]
async fn submit_without_token_is_unauthorized() -> Result<()> {
    let t = common::spawn_app().await?;

    let (status, _) = t.post("/obstacles", None, submission(50.0)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn draft_needs_only_a_location() -> Result<()> {
    let t = common::spawn_app().await?;
    let (token, _) = t.register("pilot@example.com").await?;

    let (status, body) = t
        .post("/obstacles", Some(&token), json!({ "obstacle_location": POINT, "action": "draft" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "Draft");
    assert!(body["obstacle_type"].is_null());

    let (status, body) = t
        .post("/obstacles", Some(&token), json!({ "obstacle_type": "Mast", "action": "draft" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, _) = t
        .post("/obstacles", Some(&token), json!({ "obstacle_location": "not geojson", "action": "draft" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn drafts_are_visible_only_to_their_owner() -> Result<()> {
    let t = common::spawn_app().await?;
    let (alice, _) = t.register("alice@example.com").await?;
    let (bob, _) = t.register("bob@example.com").await?;
    let (registrar, _) = t.register_with_roles("registrar@example.com", &[Role::Registrar]).await?;

    let (_, draft) = t
        .post("/obstacles", Some(&alice), json!({ "obstacle_location": POINT, "action": "draft" }))
        .await?;
    let draft_id = draft["id"].as_i64().expect("draft id");

    let (status, body) = t.get("/obstacles/drafts", Some(&alice)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![draft_id]);

    let (status, body) = t.get("/obstacles/drafts", Some(&bob)).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(ids(&body).is_empty());

    let uri = format!("/obstacles/drafts/{draft_id}");
    let (status, _) = t.get(&uri, Some(&bob)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t.get(&format!("/reports/{draft_id}"), Some(&registrar)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = t.get("/reports", Some(&registrar)).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(!ids(&body).contains(&draft_id));
    Ok(())
}

#[tokio::test]
async fn editing_a_draft_merges_fields_and_can_submit() -> Result<()> {
    let t = common::spawn_app().await?;
    let (token, _) = t.register("pilot@example.com").await?;

    let (_, draft) = t
        .post(
            "/obstacles",
            Some(&token),
            json!({ "obstacle_type": "Wind turbine", "obstacle_location": POINT, "action": "draft" }),
        )
        .await?;
    let uri = format!("/obstacles/drafts/{}", draft["id"]);

    let (status, saved) = t
        .send("PUT", &uri, Some(&token), Some(json!({ "obstacle_height": 120, "action": "draft" })))
        .await?;
    assert_eq!(status, StatusCode::OK, "{saved}");
    assert_eq!(saved["status"], "Draft");
    assert_eq!(saved["obstacle_type"], "Wind turbine");
    assert_eq!(saved["obstacle_height"], 120);

    let (status, body) = t
        .send("PUT", &uri, Some(&token), Some(json!({ "action": "submit" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "description still missing: {body}");

    let (status, submitted) = t
        .send(
            "PUT",
            &uri,
            Some(&token),
            Some(json!({ "obstacle_description": "Single turbine on the ridge.", "action": "submit" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{submitted}");
    assert_eq!(submitted["status"], "Pending");

    let (status, _) = t
        .send("PUT", &uri, Some(&token), Some(json!({ "action": "draft", "obstacle_location": POINT })))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND, "a submitted report is no longer a draft");
    Ok(())
}

#[tokio::test]
async fn map_layers_exclude_drafts_and_unapproved() -> Result<()> {
    let t = common::spawn_app().await?;
    let (token, owner) = t.register("pilot@example.com").await?;
    let now = Utc::now();

    let draft = t.insert_report(Some(owner), "Draft", "Mast", now).await?;
    let pending = t.insert_report(Some(owner), "Pending", "Crane", now - Duration::minutes(1)).await?;
    let approved = t.insert_report(Some(owner), "Approved", "Tower", now - Duration::minutes(2)).await?;

    let (status, _) = t.get("/api/obstacles", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = t.get("/api/obstacles", Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    let all = ids(&body);
    assert!(all.contains(&pending) && all.contains(&approved));
    assert!(!all.contains(&draft));

    let (status, body) = t.get("/api/obstacles/approved", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![approved]);
    assert_eq!(body[0]["type"], "Tower");
    assert_eq!(body[0]["height"], 30);
    Ok(())
}
