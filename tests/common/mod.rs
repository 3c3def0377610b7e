#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use glowshine_api::config::AppConfig;
use glowshine_api::db::{establish_connection_with_config, run_migrations, DbConfig};
use glowshine_api::entities::{coupon, product, user_account};
use glowshine_api::{api_routes, AppState};
use std::sync::Arc;
use tower::ServiceExt;

/// In-process test application over an in-memory SQLite store.
///
/// The pool is pinned to a single connection; with `sqlite::memory:` every
/// pooled connection would otherwise get its own private database.
pub struct TestApp {
    pub state: AppState,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let db_config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let db = Arc::new(
            establish_connection_with_config(&db_config)
                .await
                .expect("failed to open in-memory database"),
        );
        run_migrations(&db).await.expect("failed to create schema");

        let config = AppConfig::new("sqlite::memory:", "127.0.0.1", 0);
        let state = AppState::new(db, config, None);
        Self { state }
    }

    pub fn router(&self) -> Router {
        api_routes(self.state.clone())
    }

    pub async fn seed_account(&self, email: &str, name: &str) -> user_account::Model {
        self.state
            .services
            .accounts
            .create(email, name)
            .await
            .expect("failed to seed account")
    }

    pub async fn seed_product(&self, id: &str, name: &str, price: i64) -> product::Model {
        self.state
            .services
            .products
            .create(product::Model {
                id: id.to_string(),
                name: name.to_string(),
                category: "skincare".to_string(),
                price,
                description: None,
                image: None,
            })
            .await
            .expect("failed to seed product")
    }

    pub async fn seed_coupon(&self, email: &str, code: &str, amount: i64) -> coupon::Model {
        self.state
            .services
            .coupons
            .grant(email, code, amount, "test coupon")
            .await
            .expect("failed to seed coupon")
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send_json(request).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send_json(request).await
    }

    pub async fn put_json(
        &self,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(Method::PUT)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send_json(request).await
    }

    /// Posts an urlencoded form and returns the raw response body, the way
    /// the payment gateway talks to us.
    pub async fn post_form(&self, uri: &str, params: &[(String, String)]) -> (StatusCode, String) {
        let body = serde_urlencoded::to_string(params).expect("failed to encode form");
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    /// Posts JSON and returns the raw body, for endpoints that answer HTML.
    pub async fn post_json_raw(
        &self,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, String) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn send_json(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, value)
    }
}
