#![allow(dead_code)]

use std::sync::Arc;

use adpulse::{
    AppConfig, AppState, MemoryRepository, MockStorageService, create_router,
    repository::Repository,
};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

/// TestApp
///
/// A router over the in-memory repository and the mock storage, plus handles to
/// both so tests can seed data and inspect side effects.
pub struct TestApp {
    pub router: Router,
    pub repo: Arc<MemoryRepository>,
    pub storage: MockStorageService,
    pub config: AppConfig,
}

/// An authenticated caller created through the public API.
#[derive(Debug, Clone)]
pub struct Account {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
}

impl TestResponse {
    /// The body parsed as JSON, `Value::Null` for an empty or non-JSON body.
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text).unwrap_or(Value::Null)
    }
}

pub fn test_app() -> TestApp {
    test_app_with(AppConfig::default(), MockStorageService::new())
}

pub fn test_app_with(config: AppConfig, storage: MockStorageService) -> TestApp {
    let repo = Arc::new(MemoryRepository::new());
    let state = AppState {
        repo: repo.clone(),
        storage: Arc::new(storage.clone()),
        config: config.clone(),
    };
    TestApp {
        router: create_router(state),
        repo,
        storage,
        config,
    }
}

impl TestApp {
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.dispatch(request).await
    }

    pub async fn dispatch(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            text: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&self, uri: &str, account: &Account) -> TestResponse {
        self.send(Method::GET, uri, Some(&account.access_token), None)
            .await
    }

    pub async fn post(&self, uri: &str, account: &Account, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(&account.access_token), Some(body))
            .await
    }

    pub async fn put(&self, uri: &str, account: &Account, body: Value) -> TestResponse {
        self.send(Method::PUT, uri, Some(&account.access_token), Some(body))
            .await
    }

    pub async fn delete(&self, uri: &str, account: &Account) -> TestResponse {
        self.send(Method::DELETE, uri, Some(&account.access_token), None)
            .await
    }

    /// Registers a new organization and returns its owner.
    pub async fn register(&self, organization_name: &str, email: &str) -> Account {
        let response = self
            .send(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({
                    "organization_name": organization_name,
                    "name": "Owner",
                    "email": email,
                    "password": "correct-horse-battery",
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
        account_from(&response.json())
    }

    /// Invites `email` with `role` and accepts the invitation, returning the new member.
    pub async fn add_member(&self, inviter: &Account, email: &str, role: &str) -> Account {
        let token = self.invite(inviter, email, role).await;
        let response = self
            .send(
                Method::POST,
                "/auth/accept-invitation",
                None,
                Some(json!({
                    "token": token,
                    "name": "Teammate",
                    "password": "another-long-password",
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
        account_from(&response.json())
    }

    /// Creates an invitation and returns the raw token carried by its URL.
    pub async fn invite(&self, inviter: &Account, email: &str, role: &str) -> String {
        let response = self
            .post(
                "/team/invitations",
                inviter,
                json!({ "email": email, "role": role }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
        token_from_invite_url(response.json()["invite_url"].as_str().unwrap())
    }

    pub async fn upgrade(&self, owner: &Account, plan: &str) {
        let response = self
            .put("/subscriptions", owner, json!({ "plan": plan }))
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    }

    /// Creates a draft campaign and returns its id.
    pub async fn create_campaign(&self, account: &Account, name: &str, budget_cents: i64) -> Uuid {
        let response = self
            .post(
                "/campaigns",
                account,
                json!({
                    "name": name,
                    "objective": "traffic",
                    "budget_cents": budget_cents,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
        id_of(&response.json())
    }

    pub async fn set_status(&self, account: &Account, campaign_id: Uuid, status: &str) -> TestResponse {
        self.post(
            &format!("/campaigns/{campaign_id}/status"),
            account,
            json!({ "status": status }),
        )
        .await
    }

    pub async fn record_metrics(
        &self,
        account: &Account,
        campaign_id: Uuid,
        date: &str,
        impressions: i64,
        clicks: i64,
        conversions: i64,
        spend_cents: i64,
    ) -> TestResponse {
        self.post(
            &format!("/campaigns/{campaign_id}/metrics"),
            account,
            json!({
                "date": date,
                "impressions": impressions,
                "clicks": clicks,
                "conversions": conversions,
                "spend_cents": spend_cents,
            }),
        )
        .await
    }

    pub async fn notifications_for(&self, account: &Account) -> Vec<Value> {
        self.repo
            .list_notifications(account.user_id, false)
            .await
            .unwrap()
            .into_iter()
            .map(|n| serde_json::to_value(n).unwrap())
            .collect()
    }
}

pub fn account_from(body: &Value) -> Account {
    Account {
        access_token: body["access_token"].as_str().unwrap().to_string(),
        refresh_token: body["refresh_token"].as_str().unwrap().to_string(),
        user_id: body["user"]["id"].as_str().unwrap().parse().unwrap(),
        organization_id: body["user"]["organization_id"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap(),
        email: body["user"]["email"].as_str().unwrap().to_string(),
    }
}

pub fn id_of(body: &Value) -> Uuid {
    body["id"].as_str().unwrap().parse().unwrap()
}

pub fn token_from_invite_url(url: &str) -> String {
    url.rsplit('/').next().unwrap().to_string()
}
