#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use parley::auth::{BlacklistStore, MemoryBlacklist};
use parley::{ServerConfig, create_app, db::Database};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const JWT_SECRET: &[u8] = b"test-jwt-secret-that-is-long-enough";
pub const PASSWORD: &str = "correct horse battery";

pub struct TestApp {
    pub router: Router,
    pub db: Database,
    pub blacklist: Arc<dyn BlacklistStore>,
}

/// Build a config backed by a fresh in-memory database.
pub async fn test_config(memory_blacklist: bool) -> ServerConfig {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let blacklist: Arc<dyn BlacklistStore> = if memory_blacklist {
        Arc::new(MemoryBlacklist::new())
    } else {
        Arc::new(db.revoked_tokens())
    };
    ServerConfig {
        db,
        blacklist,
        jwt_secret: JWT_SECRET.to_vec(),
        secure_cookies: false,
        session_ttl: 3600,
        purge_interval: Duration::from_secs(300),
        ws_ping_interval: None,
    }
}

pub async fn create_test_app() -> TestApp {
    app_from_config(test_config(false).await)
}

pub async fn create_test_app_with_memory_blacklist() -> TestApp {
    app_from_config(test_config(true).await)
}

fn app_from_config(config: ServerConfig) -> TestApp {
    TestApp {
        router: create_app(&config),
        db: config.db.clone(),
        blacklist: config.blacklist.clone(),
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Value of the `name` cookie set by `response`, if any.
pub fn set_cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| v.strip_prefix(&prefix))
        .map(|rest| rest.split(';').next().unwrap_or("").to_string())
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn register(&self, email: &str, display_name: &str) -> Response<Body> {
        let body = serde_json::json!({
            "email": email,
            "display_name": display_name,
            "password": PASSWORD,
        });
        self.send(
            Request::builder()
                .method("POST")
                .uri("/api/users")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Response<Body> {
        let body = serde_json::json!({ "email": email, "password": password });
        self.send(
            Request::builder()
                .method("POST")
                .uri("/api/session")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Register a user and log in, returning the issued token.
    pub async fn signed_in(&self, email: &str) -> String {
        let response = self.register(email, "Tester").await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = self.login(email, PASSWORD).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        json["token"].as_str().unwrap().to_string()
    }

    pub async fn get_session_with_cookie(&self, token: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method("GET")
                .uri("/api/session")
                .header("cookie", format!("session_token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn get_session_with_bearer(&self, token: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method("GET")
                .uri("/api/session")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn logout_with_cookie(&self, token: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method("DELETE")
                .uri("/api/session")
                .header("cookie", format!("session_token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }
}
