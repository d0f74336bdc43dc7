#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use securecloud_gateway::api::build_router;
use securecloud_gateway::config::Config;
use securecloud_gateway::services::auth::Role;
use securecloud_gateway::services::collaborators::Collaborators;
use securecloud_gateway::services::collaborators::model::NewUser;
use securecloud_gateway::state::AppState;

pub const PASSWORD: &str = "correct-horse-battery";

pub fn config() -> Config {
    Config::with_signing_secret("integration-signing-secret-0123456789abcdef")
}

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(config())
    }

    pub fn with_config(config: Config) -> Self {
        let state = AppState::new(&config, Collaborators::in_memory()).unwrap();
        let router = build_router(state.clone(), &config);
        Self { state, router }
    }

    pub async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Reply {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Reply {
        self.send(request(Method::GET, uri, token, None)).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Reply {
        self.send(request(Method::POST, uri, token, Some(body))).await
    }

    /// Registers through the API and logs in. Returns (access_token, refresh_token).
    pub async fn register_and_login(&self, email: &str) -> (String, String) {
        let registered = self
            .post(
                "/api/v1/auth/register",
                None,
                json!({ "email": email, "password": PASSWORD, "name": "Test User" }),
            )
            .await;
        assert_eq!(registered.status, StatusCode::CREATED, "{}", registered.body);

        let login = self
            .post(
                "/api/v1/auth/login",
                None,
                json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(login.status, StatusCode::OK, "{}", login.body);

        (
            login.body["access_token"].as_str().unwrap().to_string(),
            login.body["refresh_token"].as_str().unwrap().to_string(),
        )
    }

    /// An admin created straight in the data store. Returns the admin's id.
    pub async fn create_admin(&self, email: &str) -> uuid::Uuid {
        self.state
            .collaborators
            .data
            .create_user(NewUser {
                email: email.to_string(),
                name: "Admin".to_string(),
                password: PASSWORD.to_string(),
                role: Role::Admin,
            })
            .await
            .unwrap()
            .id
    }

    /// An admin created straight in the data store, with a freshly issued access token.
    pub async fn admin_token(&self) -> String {
        let admin = self.create_admin("admin@securecloud.test").await;
        self.state
            .tokens
            .issue(admin, Role::Admin)
            .await
            .unwrap()
            .access_token
    }

    pub async fn user_id(&self, email: &str) -> String {
        let admin = self
            .state
            .tokens
            .issue(uuid::Uuid::new_v4(), Role::Admin)
            .await
            .unwrap()
            .access_token;
        let users = self.get("/api/v1/users?limit=100", Some(&admin)).await;
        assert_eq!(users.status, StatusCode::OK, "{}", users.body);
        users.body["users"]
            .as_array()
            .unwrap()
            .iter()
            .find(|u| u["email"] == email)
            .map(|u| u["id"].as_str().unwrap().to_string())
            .unwrap()
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
