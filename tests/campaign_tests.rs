mod common;

use axum::http::StatusCode;
use common::{id_of, test_app};
use serde_json::json;
use uuid::Uuid;

// --- Campaign CRUD ---

#[tokio::test]
async fn test_create_campaign_starts_as_draft() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;

    let response = app
        .post(
            "/campaigns",
            &owner,
            json!({
                "name": "Spring Sale",
                "description": "Seasonal push",
                "objective": "sales",
                "budget_cents": 50_000,
                "start_date": "2026-03-01",
                "end_date": "2026-03-31",
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let body = response.json();
    assert_eq!(body["status"], "draft");
    assert_eq!(body["spent_cents"], 0);
    assert_eq!(body["created_by"], owner.user_id.to_string());
}

#[tokio::test]
async fn test_campaign_names_must_not_be_blank() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;

    let blank = app
        .post("/campaigns", &owner, json!({ "name": "    ", "budget_cents": 100 }))
        .await;
    assert_eq!(blank.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(blank.json()["fields"]["name"].is_array());

    let id = app.create_campaign(&owner, "Spring", 100).await;
    let uri = format!("/campaigns/{id}");
    let blank_update = app.put(&uri, &owner, json!({ "name": " \t " })).await;
    assert_eq!(blank_update.status, StatusCode::UNPROCESSABLE_ENTITY);

    let padded = app.put(&uri, &owner, json!({ "name": "  Summer  " })).await;
    assert_eq!(padded.status, StatusCode::OK);
    assert_eq!(padded.json()["name"], "Summer");
}

#[tokio::test]
async fn test_create_campaign_rejects_inverted_schedule() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;

    let response = app
        .post(
            "/campaigns",
            &owner,
            json!({
                "name": "Backwards",
                "objective": "traffic",
                "budget_cents": 1_000,
                "start_date": "2026-03-31",
                "end_date": "2026-03-01",
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_update_campaign_checks_schedule_against_stored_dates() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    let response = app
        .post(
            "/campaigns",
            &owner,
            json!({
                "name": "Scheduled",
                "objective": "traffic",
                "budget_cents": 1_000,
                "start_date": "2026-03-10",
            }),
        )
        .await;
    let id = id_of(&response.json());

    let bad = app
        .put(
            &format!("/campaigns/{id}"),
            &owner,
            json!({ "end_date": "2026-03-01" }),
        )
        .await;
    assert_eq!(bad.status, StatusCode::UNPROCESSABLE_ENTITY);

    let good = app
        .put(
            &format!("/campaigns/{id}"),
            &owner,
            json!({ "end_date": "2026-03-20", "budget_cents": 2_000 }),
        )
        .await;
    assert_eq!(good.status, StatusCode::OK);
    assert_eq!(good.json()["budget_cents"], 2_000);
    assert_eq!(good.json()["name"], "Scheduled");
}

#[tokio::test]
async fn test_free_plan_campaign_limit() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;

    for i in 0..3 {
        app.create_campaign(&owner, &format!("Campaign {i}"), 1_000)
            .await;
    }

    let response = app
        .post(
            "/campaigns",
            &owner,
            json!({ "name": "One too many", "objective": "traffic", "budget_cents": 1_000 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(response.json()["code"], "PLAN_LIMIT_REACHED");

    app.upgrade(&owner, "starter").await;
    app.create_campaign(&owner, "Now allowed", 1_000).await;
}

#[tokio::test]
async fn test_viewer_cannot_create_campaigns() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    let viewer = app.add_member(&owner, "viewer@acme.test", "viewer").await;

    let response = app
        .post(
            "/campaigns",
            &viewer,
            json!({ "name": "Nope", "objective": "traffic", "budget_cents": 1_000 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    // Viewers still read.
    assert_eq!(app.get("/campaigns", &viewer).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_campaigns_are_isolated_between_organizations() {
    let app = test_app();
    let acme = app.register("Acme", "owner@acme.test").await;
    let globex = app.register("Globex", "owner@globex.test").await;
    let id = app.create_campaign(&acme, "Private", 1_000).await;

    let uri = format!("/campaigns/{id}");
    assert_eq!(app.get(&uri, &globex).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.put(&uri, &globex, json!({ "name": "Hijacked" })).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(app.delete(&uri, &globex).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.record_metrics(&globex, id, "2026-03-01", 10, 1, 0, 10).await.status,
        StatusCode::NOT_FOUND
    );

    let page = app.get("/campaigns", &globex).await.json();
    assert_eq!(page["total"], 0);
    assert_eq!(app.get(&uri, &acme).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_list_campaigns_paginates_and_hides_archived() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    app.upgrade(&owner, "starter").await;

    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(app.create_campaign(&owner, &format!("Campaign {i}"), 1_000).await);
    }
    let archived = ids[0];
    assert_eq!(
        app.set_status(&owner, archived, "archived").await.status,
        StatusCode::OK
    );

    let page = app.get("/campaigns?page=1&per_page=2", &owner).await.json();
    assert_eq!(page["total"], 4);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["per_page"], 2);

    let last = app.get("/campaigns?page=2&per_page=3", &owner).await.json();
    assert_eq!(last["items"].as_array().unwrap().len(), 1);

    let only_archived = app.get("/campaigns?status=archived", &owner).await.json();
    assert_eq!(only_archived["total"], 1);
    assert_eq!(only_archived["items"][0]["id"], archived.to_string());
}

#[tokio::test]
async fn test_list_campaigns_search() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    app.create_campaign(&owner, "Spring Sale", 1_000).await;
    app.create_campaign(&owner, "Winter Clearance", 1_000).await;

    let page = app.get("/campaigns?search=spring", &owner).await.json();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["name"], "Spring Sale");
}

#[tokio::test]
async fn test_delete_campaign() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    let id = app.create_campaign(&owner, "Short lived", 1_000).await;

    let uri = format!("/campaigns/{id}");
    assert_eq!(app.delete(&uri, &owner).await.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&uri, &owner).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.delete(&uri, &owner).await.status, StatusCode::NOT_FOUND);
}

// --- Status transitions ---

#[tokio::test]
async fn test_status_transitions() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    let id = app.create_campaign(&owner, "Lifecycle", 10_000).await;

    assert_eq!(app.set_status(&owner, id, "paused").await.status, StatusCode::CONFLICT);
    assert_eq!(app.set_status(&owner, id, "active").await.status, StatusCode::OK);
    assert_eq!(app.set_status(&owner, id, "paused").await.status, StatusCode::OK);
    assert_eq!(app.set_status(&owner, id, "active").await.status, StatusCode::OK);
    assert_eq!(app.set_status(&owner, id, "archived").await.status, StatusCode::CONFLICT);
    assert_eq!(app.set_status(&owner, id, "completed").await.status, StatusCode::OK);
    assert_eq!(app.set_status(&owner, id, "active").await.status, StatusCode::CONFLICT);

    let archived = app.set_status(&owner, id, "archived").await;
    assert_eq!(archived.status, StatusCode::OK);
    assert_eq!(archived.json()["status"], "archived");
}

#[tokio::test]
async fn test_cannot_activate_exhausted_budget() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    let id = app.create_campaign(&owner, "Tiny", 100).await;

    // Spend recorded while still a draft.
    app.record_metrics(&owner, id, "2026-03-01", 100, 10, 1, 100)
        .await;
    assert_eq!(app.set_status(&owner, id, "active").await.status, StatusCode::CONFLICT);

    app.put(&format!("/campaigns/{id}"), &owner, json!({ "budget_cents": 500 }))
        .await;
    assert_eq!(app.set_status(&owner, id, "active").await.status, StatusCode::OK);
}

// --- Metrics ---

#[tokio::test]
async fn test_metrics_accumulate() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    let id = app.create_campaign(&owner, "Counted", 100_000).await;
    app.set_status(&owner, id, "active").await;

    app.record_metrics(&owner, id, "2026-03-01", 1_000, 50, 5, 2_500)
        .await;
    let response = app
        .record_metrics(&owner, id, "2026-03-01", 500, 25, 0, 1_000)
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let campaign = response.json();
    assert_eq!(campaign["impressions"], 1_500);
    assert_eq!(campaign["clicks"], 75);
    assert_eq!(campaign["conversions"], 5);
    assert_eq!(campaign["spent_cents"], 3_500);
    assert_eq!(campaign["status"], "active");
}

#[tokio::test]
async fn test_metrics_rejects_clicks_above_impressions() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    let id = app.create_campaign(&owner, "Odd", 1_000).await;

    let response = app.record_metrics(&owner, id, "2026-03-01", 10, 20, 0, 0).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.json()["fields"]["clicks"].is_array());

    let negative = app.record_metrics(&owner, id, "2026-03-01", -1, 0, 0, 0).await;
    assert_eq!(negative.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_metrics_refuse_totals_past_i64_range() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    let id = app.create_campaign(&owner, "Huge", 1_000).await;

    let first = app
        .record_metrics(&owner, id, "2026-03-01", i64::MAX, 0, 0, 0)
        .await;
    assert_eq!(first.status, StatusCode::OK);

    let second = app
        .record_metrics(&owner, id, "2026-03-02", i64::MAX, 0, 0, 0)
        .await;
    assert_eq!(second.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(second.json()["fields"]["impressions"].is_array());

    let spend = app
        .record_metrics(&owner, id, "2026-03-01", 0, 0, 0, i64::MAX)
        .await;
    assert_eq!(spend.status, StatusCode::OK);
    let overflow = app
        .record_metrics(&owner, id, "2026-03-01", 0, 0, 0, 1)
        .await;
    assert_eq!(overflow.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(overflow.json()["fields"]["spend_cents"].is_array());

    // Refused ingestions leave the totals untouched.
    let campaign = app.get(&format!("/campaigns/{id}"), &owner).await.json();
    assert_eq!(campaign["impressions"], i64::MAX);
    assert_eq!(campaign["spent_cents"], i64::MAX);
}

#[tokio::test]
async fn test_budget_exhaustion_pauses_and_notifies_creator() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    let member = app.add_member(&owner, "member@acme.test", "member").await;
    let id = app.create_campaign(&member, "Capped", 1_000).await;
    app.set_status(&member, id, "active").await;

    let response = app
        .record_metrics(&owner, id, "2026-03-01", 1_000, 100, 10, 1_200)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["status"], "paused");
    // Overshoot is kept.
    assert_eq!(response.json()["spent_cents"], 1_200);

    let notifications = app.notifications_for(&member).await;
    let exhausted: Vec<_> = notifications
        .iter()
        .filter(|n| n["kind"] == "budget_exhausted")
        .collect();
    assert_eq!(exhausted.len(), 1);
    assert_eq!(exhausted[0]["link"], format!("/campaigns/{id}"));

    let owner_notes = app.notifications_for(&owner).await;
    assert!(owner_notes.iter().all(|n| n["kind"] != "budget_exhausted"));
}

#[tokio::test]
async fn test_paused_campaign_does_not_notify_again() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    let id = app.create_campaign(&owner, "Capped", 1_000).await;
    app.set_status(&owner, id, "active").await;

    app.record_metrics(&owner, id, "2026-03-01", 100, 10, 0, 1_000).await;
    app.record_metrics(&owner, id, "2026-03-02", 100, 10, 0, 500).await;

    let count = app
        .notifications_for(&owner)
        .await
        .iter()
        .filter(|n| n["kind"] == "budget_exhausted")
        .count();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_archived_campaign_rejects_metrics() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    let id = app.create_campaign(&owner, "Retired", 1_000).await;
    app.set_status(&owner, id, "archived").await;

    let response = app.record_metrics(&owner, id, "2026-03-01", 10, 1, 0, 5).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

// --- Ads ---

fn ad_body(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "format": "image",
        "headline": "Save 20% this spring",
        "destination_url": "https://acme.test/spring",
    })
}

#[tokio::test]
async fn test_ad_crud() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    let campaign_id = app.create_campaign(&owner, "With ads", 1_000).await;

    let created = app
        .post(&format!("/campaigns/{campaign_id}/ads"), &owner, ad_body("Banner"))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.json()["status"], "draft");
    let ad_id = id_of(&created.json());

    let listed = app.get(&format!("/campaigns/{campaign_id}/ads"), &owner).await;
    assert_eq!(listed.json().as_array().unwrap().len(), 1);

    let updated = app
        .put(
            &format!("/ads/{ad_id}"),
            &owner,
            json!({ "headline": "Save 30%", "status": "active" }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.json()["headline"], "Save 30%");
    assert_eq!(updated.json()["status"], "active");

    assert_eq!(
        app.delete(&format!("/ads/{ad_id}"), &owner).await.status,
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        app.get(&format!("/ads/{ad_id}"), &owner).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_ad_text_must_not_be_blank() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    let campaign_id = app.create_campaign(&owner, "With ads", 1_000).await;

    let mut body = ad_body("Banner");
    body["headline"] = json!("   ");
    let blank = app
        .post(&format!("/campaigns/{campaign_id}/ads"), &owner, body)
        .await;
    assert_eq!(blank.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(blank.json()["fields"]["headline"].is_array());

    let created = app
        .post(&format!("/campaigns/{campaign_id}/ads"), &owner, ad_body("Banner"))
        .await;
    let uri = format!("/ads/{}", id_of(&created.json()));
    assert_eq!(
        app.put(&uri, &owner, json!({ "name": "  " })).await.status,
        StatusCode::UNPROCESSABLE_ENTITY
    );
    let trimmed = app.put(&uri, &owner, json!({ "headline": " Save 40% " })).await;
    assert_eq!(trimmed.json()["headline"], "Save 40%");
}

#[tokio::test]
async fn test_ad_requires_known_campaign_and_media() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;

    let missing = app
        .post(&format!("/campaigns/{}/ads", Uuid::new_v4()), &owner, ad_body("Orphan"))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let campaign_id = app.create_campaign(&owner, "With ads", 1_000).await;
    let mut body = ad_body("With media");
    body["media_file_id"] = json!(Uuid::new_v4());
    let bad_media = app
        .post(&format!("/campaigns/{campaign_id}/ads"), &owner, body)
        .await;
    assert_eq!(bad_media.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_ad_rejects_invalid_destination_url() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    let campaign_id = app.create_campaign(&owner, "With ads", 1_000).await;

    let mut body = ad_body("Broken link");
    body["destination_url"] = json!("not a url");
    let response = app
        .post(&format!("/campaigns/{campaign_id}/ads"), &owner, body)
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_archived_campaign_rejects_new_ads() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    let campaign_id = app.create_campaign(&owner, "Retired", 1_000).await;
    app.set_status(&owner, campaign_id, "archived").await;

    let response = app
        .post(&format!("/campaigns/{campaign_id}/ads"), &owner, ad_body("Late"))
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

// --- Analytics ---

#[tokio::test]
async fn test_dashboard_aggregates_range() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    let a = app.create_campaign(&owner, "Alpha", 100_000).await;
    let b = app.create_campaign(&owner, "Beta", 100_000).await;
    app.set_status(&owner, a, "active").await;

    app.record_metrics(&owner, a, "2026-03-01", 1_000, 100, 10, 5_000).await;
    app.record_metrics(&owner, b, "2026-03-03", 1_000, 50, 0, 1_000).await;
    // Outside the requested range.
    app.record_metrics(&owner, b, "2026-04-01", 9_999, 9_999, 0, 9_999).await;

    let response = app
        .get("/analytics/dashboard?from=2026-03-01&to=2026-03-07", &owner)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();

    assert_eq!(body["totals"]["impressions"], 2_000);
    assert_eq!(body["totals"]["clicks"], 150);
    assert_eq!(body["totals"]["spend_cents"], 6_000);
    assert_eq!(body["totals"]["ctr"], 7.5);
    assert_eq!(body["totals"]["cpc_cents"], 40);

    let daily = body["daily"].as_array().unwrap();
    assert_eq!(daily.len(), 7);
    assert_eq!(daily[1]["impressions"], 0);

    let top = body["top_campaigns"].as_array().unwrap();
    assert_eq!(top[0]["name"], "Alpha");

    let statuses = body["campaigns_by_status"].as_array().unwrap();
    let active = statuses.iter().find(|s| s["status"] == "active").unwrap();
    assert_eq!(active["count"], 1);
}

#[tokio::test]
async fn test_dashboard_rejects_inverted_range() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;

    let response = app
        .get("/analytics/dashboard?from=2026-03-07&to=2026-03-01", &owner)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let too_long = app
        .get("/analytics/dashboard?from=2024-01-01&to=2026-03-01", &owner)
        .await;
    assert_eq!(too_long.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_campaign_analytics_scoped_to_campaign() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    let a = app.create_campaign(&owner, "Alpha", 100_000).await;
    let b = app.create_campaign(&owner, "Beta", 100_000).await;
    app.record_metrics(&owner, a, "2026-03-02", 400, 40, 4, 800).await;
    app.record_metrics(&owner, b, "2026-03-02", 1_000, 10, 0, 100).await;

    let response = app
        .get(
            &format!("/analytics/campaigns/{a}?from=2026-03-01&to=2026-03-03"),
            &owner,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["campaign"]["id"], a.to_string());
    assert_eq!(body["totals"]["impressions"], 400);
    assert_eq!(body["totals"]["conversion_rate"], 10.0);
    assert_eq!(body["totals"]["cpa_cents"], 200);
    assert_eq!(body["daily"].as_array().unwrap().len(), 3);

    let other = app.register("Globex", "owner@globex.test").await;
    assert_eq!(
        app.get(&format!("/analytics/campaigns/{a}"), &other).await.status,
        StatusCode::NOT_FOUND
    );
}
