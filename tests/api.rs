//! HTTP API tests driving the router with `oneshot` against the in-memory store.

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use bank_ledger::{
    app::{AppState, router},
    models::account::{CreateAccountParams, Currency},
    services::{token::TokenMaker, user_service::TokenDurations},
    store::{MemoryStore, Querier},
};
use serde_json::{Value, json};
use tower::ServiceExt;

const KEY: &str = "abcdefghijklmnopqrstuvwxyz012345";

struct TestApp {
    router: Router,
    store: MemoryStore,
}

impl TestApp {
    fn new() -> Self {
        let store = MemoryStore::new();
        let state = AppState {
            store: Arc::new(store.clone()),
            tokens: Arc::new(TokenMaker::new(KEY).unwrap()),
            durations: TokenDurations {
                access: chrono::Duration::minutes(15),
                refresh: chrono::Duration::hours(24),
            },
        };
        Self {
            router: router(state, Duration::from_secs(5)),
            store,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
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

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Register `username` and return an access token.
    async fn user(&self, username: &str) -> String {
        let (status, _) = self
            .send(
                Method::POST,
                "/users",
                None,
                Some(json!({
                    "username": username,
                    "password": "secret123",
                    "full_name": format!("{username} tester"),
                    "email": format!("{username}@example.com"),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = self
            .send(
                Method::POST,
                "/users/login",
                None,
                Some(json!({ "username": username, "password": "secret123" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["access_token"].as_str().unwrap().to_string()
    }

    async fn account(&self, owner: &str, currency: Currency, balance: i64) -> i64 {
        self.store
            .create_account(CreateAccountParams {
                owner: owner.to_string(),
                currency,
                balance,
            })
            .await
            .unwrap()
            .id
    }
}

fn transfer_body(from: i64, to: i64, amount: i64, currency: &str) -> Option<Value> {
    Some(json!({
        "from_account_id": from,
        "to_account_id": to,
        "amount": amount,
        "currency": currency,
    }))
}

#[tokio::test]
async fn health_reports_store_connected() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn protected_routes_require_bearer_token() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/accounts/1", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _) = app
        .send(Method::GET, "/accounts/1", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_hides_password_and_rejects_duplicates() {
    let app = TestApp::new();
    let body = json!({
        "username": "alice",
        "password": "secret123",
        "full_name": "Alice",
        "email": "alice@example.com",
    });

    let (status, user) = app
        .send(Method::POST, "/users", None, Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["username"], "alice");
    assert!(user.get("hashed_password").is_none());

    let (status, err) = app.send(Method::POST, "/users", None, Some(body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["error"]["code"], "unique_violation");
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = TestApp::new();
    app.user("alice").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/users/login",
            None,
            Some(json!({ "username": "alice", "password": "wrong123" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            Method::POST,
            "/users/login",
            None,
            Some(json!({ "username": "nobody", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn refresh_token_renews_access() {
    let app = TestApp::new();
    app.user("alice").await;
    let (_, login) = app
        .send(
            Method::POST,
            "/users/login",
            None,
            Some(json!({ "username": "alice", "password": "secret123" })),
        )
        .await;

    let (status, body) = app
        .send(
            Method::POST,
            "/tokens/renew_access",
            None,
            Some(json!({ "refresh_token": login["refresh_token"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let token = body["access_token"].as_str().unwrap();
    let (status, _) = app
        .send(Method::GET, "/accounts?page_id=1&page_size=5", Some(token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn refresh_token_is_not_a_bearer_credential() {
    let app = TestApp::new();
    app.user("alice").await;
    let (_, login) = app
        .send(
            Method::POST,
            "/users/login",
            None,
            Some(json!({ "username": "alice", "password": "secret123" })),
        )
        .await;

    let refresh = login["refresh_token"].as_str().unwrap();
    let (status, body) = app
        .send(Method::GET, "/accounts?page_id=1&page_size=5", Some(refresh), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _) = app
        .send(
            Method::POST,
            "/tokens/renew_access",
            None,
            Some(json!({ "refresh_token": login["access_token"] })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn oversized_page_id_is_a_bad_request() {
    let app = TestApp::new();
    let alice = app.user("alice").await;

    let (status, body) = app
        .send(
            Method::GET,
            "/accounts?page_id=9223372036854775807&page_size=10",
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_request");
}

#[tokio::test]
async fn account_lifecycle() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;

    let (status, account) = app
        .send(
            Method::POST,
            "/accounts",
            Some(&alice),
            Some(json!({ "currency": "EUR" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["owner"], "alice");
    assert_eq!(account["balance"], 0);
    assert_eq!(account["currency"], "EUR");
    let id = account["id"].as_i64().unwrap();

    let (status, _) = app
        .send(
            Method::POST,
            "/accounts",
            Some(&alice),
            Some(json!({ "currency": "EUR" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            Method::POST,
            "/accounts",
            Some(&alice),
            Some(json!({ "currency": "GBP" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/accounts/{id}");
    let (status, fetched) = app.send(Method::GET, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, account);

    let (status, _) = app.send(Method::GET, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send(Method::GET, "/accounts/9999", Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, listed) = app
        .send(Method::GET, "/accounts?page_id=1&page_size=5", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(Method::GET, "/accounts?page_id=1&page_size=50", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send(Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send(Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send(Method::GET, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn transfer_moves_money_and_records_history() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let from = app.account("alice", Currency::Usd, 100).await;
    let to = app.account("bob", Currency::Usd, 50).await;

    let (status, result) = app
        .send(Method::POST, "/transfers", Some(&alice), transfer_body(from, to, 30, "USD"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["from_account"]["balance"], 70);
    assert_eq!(result["to_account"]["balance"], 80);
    assert_eq!(result["from_entry"]["amount"], -30);
    assert_eq!(result["to_entry"]["amount"], 30);
    let transfer_id = result["transfer"]["id"].as_i64().unwrap();

    // Both parties can read the transfer
    for token in [&alice, &bob] {
        let (status, transfer) = app
            .send(Method::GET, &format!("/transfers/{transfer_id}"), Some(token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(transfer, result["transfer"]);
    }

    let carol = app.user("carol").await;
    let (status, _) = app
        .send(Method::GET, &format!("/transfers/{transfer_id}"), Some(&carol), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, entries) = app
        .send(
            Method::GET,
            &format!("/accounts/{from}/entries?page_id=1&page_size=5"),
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entries, json!([result["from_entry"]]));

    // Accounts with history cannot be deleted
    let (status, body) = app
        .send(Method::DELETE, &format!("/accounts/{from}"), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "foreign_key_violation");
}

#[tokio::test]
async fn transfer_request_checks() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    app.user("bob").await;
    let alice_usd = app.account("alice", Currency::Usd, 100).await;
    let bob_usd = app.account("bob", Currency::Usd, 100).await;
    let bob_eur = app.account("bob", Currency::Eur, 100).await;

    let cases = [
        (transfer_body(alice_usd, bob_usd, 0, "USD"), StatusCode::BAD_REQUEST),
        (transfer_body(alice_usd, bob_usd, 10, "XYZ"), StatusCode::BAD_REQUEST),
        (transfer_body(alice_usd, alice_usd, 10, "USD"), StatusCode::BAD_REQUEST),
        (transfer_body(alice_usd, bob_eur, 10, "USD"), StatusCode::BAD_REQUEST),
        (transfer_body(alice_usd, 9999, 10, "USD"), StatusCode::NOT_FOUND),
        (transfer_body(bob_usd, alice_usd, 10, "USD"), StatusCode::UNAUTHORIZED),
    ];
    for (body, expected) in cases {
        let (status, _) = app
            .send(Method::POST, "/transfers", Some(&alice), body.clone())
            .await;
        assert_eq!(status, expected, "request {body:?}");
    }

    for id in [alice_usd, bob_usd, bob_eur] {
        assert_eq!(app.store.get_account(id).await.unwrap().balance, 100);
    }
}
