mod common;

use adpulse::{AppConfig, MockStorageService};
use axum::http::StatusCode;
use common::{Account, TestApp, id_of, test_app, test_app_with};
use serde_json::{Value, json};
use uuid::Uuid;

async fn presign(app: &TestApp, account: &Account, filename: &str, file_type: &str, size: i64) -> common::TestResponse {
    app.post(
        "/files/presigned",
        account,
        json!({ "filename": filename, "file_type": file_type, "size_bytes": size }),
    )
    .await
}

async fn register_file(app: &TestApp, account: &Account, key: &str, content_type: &str, size: i64) -> common::TestResponse {
    app.post(
        "/files",
        account,
        json!({
            "resource_key": key,
            "file_name": "banner.png",
            "content_type": content_type,
            "size_bytes": size,
        }),
    )
    .await
}

fn key_of(response: &Value) -> String {
    response["resource_key"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_presigned_key_is_under_org_prefix() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;

    let response = presign(&app, &owner, "Spring Banner.PNG", "image/png", 2_048).await;
    assert_eq!(response.status, StatusCode::OK);
    let key = key_of(&response.json());
    assert!(key.starts_with(&format!("orgs/{}/media/", owner.organization_id)));
    assert!(key.ends_with(".png"));
    assert!(
        response.json()["upload_url"]
            .as_str()
            .unwrap()
            .contains("signature=fake")
    );

    let no_extension = presign(&app, &owner, "README", "application/pdf", 10).await;
    assert!(key_of(&no_extension.json()).ends_with(".bin"));
}

#[tokio::test]
async fn test_presigned_rejects_type_and_size() {
    let app = test_app_with(
        AppConfig {
            max_upload_bytes: 1_000,
            ..AppConfig::default()
        },
        MockStorageService::new(),
    );
    let owner = app.register("Acme", "owner@acme.test").await;

    let exe = presign(&app, &owner, "tool.exe", "application/x-msdownload", 10).await;
    assert_eq!(exe.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(exe.json()["fields"]["file_type"].is_array());

    let big = presign(&app, &owner, "movie.mp4", "video/mp4", 1_001).await;
    assert_eq!(big.status, StatusCode::UNPROCESSABLE_ENTITY);

    let empty = presign(&app, &owner, "empty.png", "image/png", 0).await;
    assert_eq!(empty.status, StatusCode::UNPROCESSABLE_ENTITY);

    let at_limit = presign(&app, &owner, "movie.mp4", "video/mp4", 1_000).await;
    assert_eq!(at_limit.status, StatusCode::OK);
}

#[tokio::test]
async fn test_presigned_storage_failure_is_bad_gateway() {
    let app = test_app_with(AppConfig::default(), MockStorageService::new_failing());
    let owner = app.register("Acme", "owner@acme.test").await;

    let response = presign(&app, &owner, "a.png", "image/png", 10).await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert!(!response.text.contains("Mock Storage Error"));
}

#[tokio::test]
async fn test_register_and_list_media() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;

    let key = key_of(&presign(&app, &owner, "banner.png", "image/png", 2_048).await.json());
    let registered = register_file(&app, &owner, &key, "image/png", 2_048).await;
    assert_eq!(registered.status, StatusCode::CREATED);
    let body = registered.json();
    assert_eq!(body["kind"], "image");
    assert_eq!(body["storage_key"], key.as_str());
    assert!(body["download_url"].as_str().unwrap().contains("download=fake"));

    let pdf_key = format!("orgs/{}/media/{}.pdf", owner.organization_id, Uuid::new_v4());
    register_file(&app, &owner, &pdf_key, "application/pdf", 100).await;

    let all = app.get("/files", &owner).await.json();
    assert_eq!(all.as_array().unwrap().len(), 2);
    let images = app.get("/files?kind=image", &owner).await.json();
    assert_eq!(images.as_array().unwrap().len(), 1);
    assert_eq!(images[0]["id"], body["id"]);

    let stats = app.get("/admin/stats", &owner).await.json();
    assert_eq!(stats["storage_used_bytes"], 2_148);
}

#[tokio::test]
async fn test_register_refuses_foreign_or_traversing_keys() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;

    let foreign = format!("orgs/{}/media/x.png", Uuid::new_v4());
    assert_eq!(
        register_file(&app, &owner, &foreign, "image/png", 10).await.status,
        StatusCode::FORBIDDEN
    );

    let traversal = format!("orgs/{}/../{}/x.png", owner.organization_id, Uuid::new_v4());
    assert_eq!(
        register_file(&app, &owner, &traversal, "image/png", 10).await.status,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_register_enforces_storage_quota() {
    let app = test_app_with(
        AppConfig {
            max_upload_bytes: 2 * 1024 * 1024 * 1024,
            ..AppConfig::default()
        },
        MockStorageService::new(),
    );
    let owner = app.register("Acme", "owner@acme.test").await;
    let gib: i64 = 1024 * 1024 * 1024;

    let first = format!("orgs/{}/media/a.mp4", owner.organization_id);
    assert_eq!(
        register_file(&app, &owner, &first, "video/mp4", gib - 10).await.status,
        StatusCode::CREATED
    );

    let second = format!("orgs/{}/media/b.mp4", owner.organization_id);
    assert_eq!(
        register_file(&app, &owner, &second, "video/mp4", 11).await.status,
        StatusCode::PAYMENT_REQUIRED
    );
    assert_eq!(
        register_file(&app, &owner, &second, "video/mp4", 10).await.status,
        StatusCode::CREATED
    );
}

#[tokio::test]
async fn test_delete_media_removes_object() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    let key = format!("orgs/{}/media/gone.png", owner.organization_id);
    let id = id_of(&register_file(&app, &owner, &key, "image/png", 10).await.json());

    let response = app.delete(&format!("/files/{id}"), &owner).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(app.storage.deleted_keys(), vec![key]);
    assert_eq!(app.get("/files", &owner).await.json().as_array().unwrap().len(), 0);

    assert_eq!(
        app.delete(&format!("/files/{id}"), &owner).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_ad_can_reference_registered_media() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    let key = format!("orgs/{}/media/hero.png", owner.organization_id);
    let media_id = id_of(&register_file(&app, &owner, &key, "image/png", 10).await.json());
    let campaign_id = app.create_campaign(&owner, "Visual", 1_000).await;

    let response = app
        .post(
            &format!("/campaigns/{campaign_id}/ads"),
            &owner,
            json!({
                "name": "Hero",
                "format": "image",
                "headline": "Look at this",
                "destination_url": "https://acme.test",
                "media_file_id": media_id,
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.json()["media_file_id"], media_id.to_string());
}
