use anyhow::Result;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

use obstacle_registry::authz::Role;

mod common;
use common::ids;

#[tokio::test]
async fn organization_reports_are_limited_to_members() -> Result<()> {
    let t = common::spawn_app().await?;
    let nla = t.create_organization("NLA").await?;
    let kartverket = t.create_organization("Kartverket").await?;

    let (member, member_id) = t.register("member@example.com").await?;
    let (outsider, outsider_id) = t.register("outsider@example.com").await?;
    t.join_organization(member_id, nla).await?;
    t.join_organization(outsider_id, kartverket).await?;

    let now = Utc::now();
    let submitted = t.insert_report(Some(member_id), "Pending", "Crane", now).await?;
    let draft = t.insert_report(Some(member_id), "Draft", "Mast", now).await?;
    let foreign = t.insert_report(Some(outsider_id), "Pending", "Tower", now).await?;

    let uri = format!("/organizations/{nla}/reports");
    let (status, body) = t.get(&uri, Some(&member)).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(ids(&body), vec![submitted]);
    assert_eq!(body[0]["organization_name"], "NLA");
    assert!(!ids(&body).contains(&draft) && !ids(&body).contains(&foreign));

    let (status, _) = t.get(&uri, Some(&outsider)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t.get("/organizations/999/reports", Some(&member)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn privileged_callers_see_any_organization() -> Result<()> {
    let t = common::spawn_app().await?;
    let nla = t.create_organization("NLA").await?;
    let (_, member_id) = t.register("member@example.com").await?;
    t.join_organization(member_id, nla).await?;
    let id = t.insert_report(Some(member_id), "Approved", "Crane", Utc::now()).await?;

    let (registrar, _) = t.register_with_roles("registrar@example.com", &[Role::Registrar]).await?;
    let (status, body) = t.get(&format!("/organizations/{nla}/reports"), Some(&registrar)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![id]);
    Ok(())
}

#[tokio::test]
async fn organization_reports_sort_and_search() -> Result<()> {
    let t = common::spawn_app().await?;
    let nla = t.create_organization("NLA").await?;
    let (member, member_id) = t.register("member@example.com").await?;
    t.join_organization(member_id, nla).await?;

    let now = Utc::now();
    let crane = t.insert_report(Some(member_id), "Pending", "Crane", now - Duration::hours(2)).await?;
    let tower = t.insert_report(Some(member_id), "Approved", "Tower", now - Duration::hours(1)).await?;
    let mast = t.insert_report(Some(member_id), "Rejected", "Mast", now).await?;

    let base = format!("/organizations/{nla}/reports");
    let (_, body) = t.get(&base, Some(&member)).await?;
    assert_eq!(ids(&body), vec![mast, tower, crane], "newest first by default");

    let (_, body) = t.get(&format!("{base}?sortBy=obstacleType&sortOrder=asc"), Some(&member)).await?;
    assert_eq!(ids(&body), vec![crane, mast, tower]);

    let (_, body) = t.get(&format!("{base}?sortBy=bogus&sortOrder=asc"), Some(&member)).await?;
    assert_eq!(ids(&body), vec![mast, tower, crane], "unknown key falls back to the default");

    let (_, body) = t.get(&format!("{base}?search=approved"), Some(&member)).await?;
    assert_eq!(ids(&body), vec![tower]);
    Ok(())
}

#[tokio::test]
async fn manager_dashboard_counts_organization_reports() -> Result<()> {
    let t = common::spawn_app().await?;
    let nla = t.create_organization("NLA").await?;
    let (manager, manager_id) = t
        .register_with_roles("manager@example.com", &[Role::OrganizationManager])
        .await?;
    let (_, member_id) = t.register("member@example.com").await?;
    t.join_organization(manager_id, nla).await?;
    t.join_organization(member_id, nla).await?;

    let now = Utc::now();
    t.insert_report(Some(member_id), "Pending", "Crane", now).await?;
    t.insert_report(Some(member_id), "Approved", "Tower", now).await?;
    t.insert_report(Some(member_id), "Approved", "Mast", now).await?;
    t.insert_report(Some(member_id), "Draft", "Line", now).await?;

    let (status, body) = t.get("/organization-manager/dashboard", Some(&manager)).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["organization"]["name"], "NLA");
    assert_eq!(body["total_reports"], 3);
    assert_eq!(body["pending_reports"], 1);
    assert_eq!(body["approved_reports"], 2);
    assert_eq!(body["rejected_reports"], 0);
    Ok(())
}

#[tokio::test]
async fn manager_dashboard_requires_role_and_organization() -> Result<()> {
    let t = common::spawn_app().await?;
    let (pilot, _) = t.register_with_roles("pilot@example.com", &[Role::Pilot]).await?;
    let (manager, _) = t
        .register_with_roles("manager@example.com", &[Role::OrganizationManager])
        .await?;

    let (status, _) = t.get("/organization-manager/dashboard", Some(&pilot)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t.get("/organization-manager/dashboard", Some(&manager)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn organization_crud_and_member_detach() -> Result<()> {
    let t = common::spawn_app().await?;
    let (admin, _) = t.register_with_roles("admin@example.com", &[Role::Admin]).await?;
    let (pilot, pilot_id) = t.register_with_roles("pilot@example.com", &[Role::Pilot]).await?;

    let (status, _) = t.post("/organizations", Some(&pilot), json!({ "name": "Pilots Inc" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t.post("/organizations", Some(&admin), json!({ "name": "  " })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, created) = t
        .post("/organizations", Some(&admin), json!({ "name": "Luftforsvaret", "description": "" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert!(created["description"].is_null());
    let id = created["id"].as_i64().expect("organization id");

    let (status, updated) = t
        .send(
            "PUT",
            &format!("/organizations/{id}"),
            Some(&admin),
            Some(json!({ "name": "Luftforsvaret", "description": "Air Force personnel" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["description"], "Air Force personnel");

    t.join_organization(pilot_id, id).await?;
    let (status, body) = t.get(&format!("/organizations/{id}"), Some(&pilot)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["members"][0]["email"], "pilot@example.com");

    let (status, _) = t.send("DELETE", &format!("/organizations/{id}"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, me) = t.get("/auth/me", Some(&pilot)).await?;
    assert!(me["user"]["organization_id"].is_null());
    assert!(me["organization"].is_null());

    let (status, _) = t.send("DELETE", &format!("/organizations/{id}"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
