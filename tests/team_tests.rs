mod common;

use adpulse::repository::Repository;
use axum::http::{Method, StatusCode};
use common::{id_of, test_app, token_from_invite_url};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_invitation_preview_and_accept() {
    let app = test_app();
    let owner = app.register("Acme Ads", "owner@acme.test").await;

    let created = app
        .post(
            "/team/invitations",
            &owner,
            json!({ "email": "New.Hire@Acme.test", "role": "member" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let body = created.json();
    assert_eq!(body["invitation"]["email"], "new.hire@acme.test");
    assert!(body["invitation"].get("token_hash").is_none());
    let url = body["invite_url"].as_str().unwrap();
    assert!(url.starts_with("http://localhost:3001/invite/"));
    let token = token_from_invite_url(url);

    let preview = app
        .send(
            Method::GET,
            &format!("/team/invitations/{token}/preview"),
            None,
            None,
        )
        .await;
    assert_eq!(preview.status, StatusCode::OK);
    assert_eq!(preview.json()["organization_name"], "Acme Ads");
    assert_eq!(preview.json()["role"], "member");

    let accepted = app
        .send(
            Method::POST,
            "/auth/accept-invitation",
            None,
            Some(json!({ "token": token, "name": "New Hire", "password": "a-long-password" })),
        )
        .await;
    assert_eq!(accepted.status, StatusCode::CREATED);
    let member = common::account_from(&accepted.json());
    assert_eq!(member.organization_id, owner.organization_id);
    assert_eq!(accepted.json()["user"]["role"], "member");

    // Single use.
    let again = app
        .send(
            Method::POST,
            "/auth/accept-invitation",
            None,
            Some(json!({ "token": token, "name": "Again", "password": "a-long-password" })),
        )
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
    let preview_after = app
        .send(
            Method::GET,
            &format!("/team/invitations/{token}/preview"),
            None,
            None,
        )
        .await;
    assert_eq!(preview_after.status, StatusCode::NOT_FOUND);

    let joined = app
        .notifications_for(&owner)
        .await
        .into_iter()
        .filter(|n| n["kind"] == "member_joined")
        .count();
    assert_eq!(joined, 1);

    let members = app.get("/team/members", &member).await.json();
    assert_eq!(members.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_invitation_token() {
    let app = test_app();
    let response = app
        .send(
            Method::POST,
            "/auth/accept-invitation",
            None,
            Some(json!({ "token": "made-up", "name": "Nobody", "password": "a-long-password" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invitation_conflicts() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    app.register("Globex", "taken@globex.test").await;

    let existing_user = app
        .post(
            "/team/invitations",
            &owner,
            json!({ "email": "taken@globex.test", "role": "member" }),
        )
        .await;
    assert_eq!(existing_user.status, StatusCode::CONFLICT);

    app.invite(&owner, "pending@acme.test", "member").await;
    let duplicate = app
        .post(
            "/team/invitations",
            &owner,
            json!({ "email": "pending@acme.test", "role": "viewer" }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invitation_role_rules() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    app.upgrade(&owner, "starter").await;

    let as_owner = app
        .post(
            "/team/invitations",
            &owner,
            json!({ "email": "boss@acme.test", "role": "owner" }),
        )
        .await;
    assert_eq!(as_owner.status, StatusCode::UNPROCESSABLE_ENTITY);

    let admin = app.add_member(&owner, "admin@acme.test", "admin").await;
    let admin_invites_admin = app
        .post(
            "/team/invitations",
            &admin,
            json!({ "email": "admin2@acme.test", "role": "admin" }),
        )
        .await;
    assert_eq!(admin_invites_admin.status, StatusCode::FORBIDDEN);

    let admin_invites_member = app
        .post(
            "/team/invitations",
            &admin,
            json!({ "email": "member@acme.test", "role": "member" }),
        )
        .await;
    assert_eq!(admin_invites_member.status, StatusCode::CREATED);

    let member = app.add_member(&owner, "plain@acme.test", "member").await;
    let member_invites = app
        .post(
            "/team/invitations",
            &member,
            json!({ "email": "friend@acme.test", "role": "viewer" }),
        )
        .await;
    assert_eq!(member_invites.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_seat_limit_counts_pending_invitations() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;

    // Free plan: two seats, the owner holds one.
    app.invite(&owner, "first@acme.test", "member").await;
    let over = app
        .post(
            "/team/invitations",
            &owner,
            json!({ "email": "second@acme.test", "role": "member" }),
        )
        .await;
    assert_eq!(over.status, StatusCode::PAYMENT_REQUIRED);
}

#[tokio::test]
async fn test_revoking_invitation_frees_seat() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    app.invite(&owner, "first@acme.test", "member").await;

    let pending = app.get("/team/invitations", &owner).await.json();
    let invitation_id = id_of(&pending[0]);
    assert_eq!(
        app.delete(&format!("/team/invitations/{invitation_id}"), &owner)
            .await
            .status,
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        app.get("/team/invitations", &owner).await.json().as_array().unwrap().len(),
        0
    );

    app.invite(&owner, "second@acme.test", "member").await;
}

#[tokio::test]
async fn test_role_change_rules() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    app.upgrade(&owner, "starter").await;
    let admin = app.add_member(&owner, "admin@acme.test", "admin").await;
    let member = app.add_member(&owner, "member@acme.test", "member").await;

    let role_uri = |id: Uuid| format!("/team/members/{id}/role");

    // Nobody changes their own role.
    assert_eq!(
        app.put(&role_uri(admin.user_id), &admin, json!({ "role": "member" })).await.status,
        StatusCode::FORBIDDEN
    );
    // The owner's role is fixed, and ownership is never granted.
    assert_eq!(
        app.put(&role_uri(owner.user_id), &admin, json!({ "role": "member" })).await.status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.put(&role_uri(member.user_id), &owner, json!({ "role": "owner" })).await.status,
        StatusCode::FORBIDDEN
    );
    // Only the owner promotes to admin.
    assert_eq!(
        app.put(&role_uri(member.user_id), &admin, json!({ "role": "admin" })).await.status,
        StatusCode::FORBIDDEN
    );

    let demoted = app
        .put(&role_uri(member.user_id), &admin, json!({ "role": "viewer" }))
        .await;
    assert_eq!(demoted.status, StatusCode::OK);
    assert_eq!(demoted.json()["role"], "viewer");

    // Takes effect on the member's existing token.
    let denied = app
        .post(
            "/campaigns",
            &member,
            json!({ "name": "Too late", "objective": "traffic", "budget_cents": 100 }),
        )
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    assert_eq!(
        app.put(&role_uri(member.user_id), &owner, json!({ "role": "admin" })).await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_remove_member_revokes_access_and_reassigns_records() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    let member = app.add_member(&owner, "member@acme.test", "member").await;
    let campaign_id = app.create_campaign(&member, "Inherited", 1_000).await;

    assert_eq!(
        app.delete(&format!("/team/members/{}", owner.user_id), &owner).await.status,
        StatusCode::FORBIDDEN
    );

    let removed = app
        .delete(&format!("/team/members/{}", member.user_id), &owner)
        .await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);

    assert_eq!(app.get("/campaigns", &member).await.status, StatusCode::UNAUTHORIZED);
    let refresh = app
        .send(
            Method::POST,
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": member.refresh_token })),
        )
        .await;
    assert_eq!(refresh.status, StatusCode::UNAUTHORIZED);

    let campaign = app
        .repo
        .get_campaign(owner.organization_id, campaign_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(campaign.created_by, owner.user_id);
}

#[tokio::test]
async fn test_admin_cannot_remove_admin() {
    let app = test_app();
    let owner = app.register("Acme", "owner@acme.test").await;
    app.upgrade(&owner, "starter").await;
    let first = app.add_member(&owner, "a1@acme.test", "admin").await;
    let second = app.add_member(&owner, "a2@acme.test", "admin").await;

    assert_eq!(
        app.delete(&format!("/team/members/{}", second.user_id), &first).await.status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.delete(&format!("/team/members/{}", second.user_id), &owner).await.status,
        StatusCode::NO_CONTENT
    );
}

#[tokio::test]
async fn test_members_of_other_org_are_not_found() {
    let app = test_app();
    let acme = app.register("Acme", "owner@acme.test").await;
    let globex = app.register("Globex", "owner@globex.test").await;
    let globex_member = app.add_member(&globex, "m@globex.test", "member").await;

    assert_eq!(
        app.delete(&format!("/team/members/{}", globex_member.user_id), &acme)
            .await
            .status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.put(
            &format!("/team/members/{}/role", globex_member.user_id),
            &acme,
            json!({ "role": "viewer" })
        )
        .await
        .status,
        StatusCode::NOT_FOUND
    );
}
