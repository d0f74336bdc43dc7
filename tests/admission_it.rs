mod common;

use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::json;

use common::{TestApp, config, request};
use securecloud_gateway::lifecycle::Phase;
use securecloud_gateway::services::rate_limit::RateLimitPolicy;

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();
    let reply = app.get("/health", None).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "healthy");
    assert!(reply.body["time"].is_string());
}

#[tokio::test]
async fn test_unknown_route_returns_not_found_envelope() {
    let app = TestApp::new();
    let reply = app.get("/api/v1/nonexistent", None).await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body, json!({ "error": "route not found" }));
    assert!(reply.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_wrong_method_returns_405_envelope() {
    let app = TestApp::new();
    let reply = app.post("/health", None, json!({})).await;

    assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(reply.body["error"], "method not allowed");
}

#[tokio::test]
async fn test_request_id_is_echoed_or_minted() {
    let app = TestApp::new();

    let supplied = app
        .send(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "trace-abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(supplied.headers["x-request-id"], "trace-abc-123");

    let long_id = "span-0123456789".repeat(20);
    let long = app
        .send(
            Request::builder()
                .uri("/health")
                .header("x-request-id", long_id.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(long.headers["x-request-id"], long_id.as_str());

    let minted = app.get("/health", None).await;
    let id = minted.headers["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn test_preflight_short_circuits_with_cors_headers() {
    let app = TestApp::new();
    let reply = app
        .send(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/v1/alerts")
                .header(header::ORIGIN, "https://console.securecloud.test")
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    // Preflight answers before auth, so no token is needed.
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    assert_eq!(reply.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(reply.headers.contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
    assert!(reply.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let app = TestApp::new();

    for uri in ["/health", "/api/v1/nonexistent"] {
        let reply = app.get(uri, None).await;
        assert_eq!(reply.headers["x-frame-options"], "DENY", "{uri}");
        assert_eq!(reply.headers["x-content-type-options"], "nosniff", "{uri}");
        assert_eq!(reply.headers["referrer-policy"], "no-referrer", "{uri}");
    }
}

#[tokio::test]
async fn test_protected_route_requires_bearer() {
    let app = TestApp::new();

    let missing = app.get("/api/v1/alerts", None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["error"], "missing bearer token");

    let garbage = app.get("/api/v1/alerts", Some("not-a-jwt")).await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);

    let (access, _) = app.register_and_login("analyst@securecloud.test").await;
    let ok = app.get("/api/v1/alerts", Some(&access)).await;
    assert_eq!(ok.status, StatusCode::OK, "{}", ok.body);
    assert_eq!(ok.body["alerts"].as_array().unwrap().len(), 3);
    assert_eq!(ok.body["pagination"]["total"], 3);
}

#[tokio::test]
async fn test_websocket_route_rejects_anonymous_upgrade() {
    let app = TestApp::new();
    let reply = app.get("/ws", None).await;

    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rate_limit_rejects_with_retry_after() {
    let mut config = config();
    config.rate_limit = RateLimitPolicy {
        enabled: true,
        max_requests: 2,
        window: Duration::from_secs(60),
    };
    let app = TestApp::with_config(config);

    let first = app.get("/health", None).await;
    assert_eq!(first.headers["x-ratelimit-limit"], "2");
    assert_eq!(first.headers["x-ratelimit-remaining"], "1");
    assert_eq!(app.get("/health", None).await.status, StatusCode::OK);

    let limited = app.get("/health", None).await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.body["error"], "rate limit exceeded");
    assert!(limited.headers.contains_key(header::RETRY_AFTER));
    assert_eq!(limited.headers["x-ratelimit-remaining"], "0");
}

#[tokio::test]
async fn test_rate_limit_can_be_disabled() {
    let mut config = config();
    config.rate_limit = RateLimitPolicy {
        enabled: false,
        max_requests: 1,
        window: Duration::from_secs(60),
    };
    let app = TestApp::with_config(config);

    for _ in 0..5 {
        let reply = app.get("/health", None).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(!reply.headers.contains_key("x-ratelimit-limit"));
    }
}

#[tokio::test]
async fn test_draining_refuses_new_requests() {
    let app = TestApp::new();
    app.state.lifecycle.advance(Phase::Accepting);
    app.state.lifecycle.advance(Phase::Draining);

    let reply = app.get("/health", None).await;
    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(reply.headers[header::CONNECTION], "close");
    assert_eq!(reply.body["error"], "server is shutting down");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let mut config = config();
    config.body_limit_bytes = 64;
    let app = TestApp::with_config(config);

    let reply = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "email": "someone@securecloud.test", "password": "x".repeat(256) }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_login_with_wrong_password_is_unauthorized() {
    let app = TestApp::new();
    app.register_and_login("analyst@securecloud.test").await;

    let reply = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "email": "analyst@securecloud.test", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "invalid credentials");
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = TestApp::new();
    app.register_and_login("analyst@securecloud.test").await;

    let reply = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({
                "email": "analyst@securecloud.test",
                "password": common::PASSWORD,
                "name": "Again",
            }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_logout_revokes_access_and_refresh_tokens() {
    let app = TestApp::new();
    let (access, refresh) = app.register_and_login("analyst@securecloud.test").await;

    let logout = app
        .post(
            "/api/v1/auth/logout",
            Some(&access),
            json!({ "refresh_token": refresh }),
        )
        .await;
    assert_eq!(logout.status, StatusCode::OK, "{}", logout.body);

    let after = app.get("/api/v1/alerts", Some(&access)).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(after.body["error"], "token revoked");

    let refreshed = app
        .post(
            "/api/v1/auth/refresh",
            None,
            json!({ "refresh_token": refresh }),
        )
        .await;
    assert_eq!(refreshed.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_is_single_use() {
    let app = TestApp::new();
    let (_, refresh) = app.register_and_login("analyst@securecloud.test").await;

    let first = app
        .post(
            "/api/v1/auth/refresh",
            None,
            json!({ "refresh_token": refresh }),
        )
        .await;
    assert_eq!(first.status, StatusCode::OK, "{}", first.body);
    assert_eq!(first.body["token_type"], "Bearer");
    let rotated = first.body["access_token"].as_str().unwrap();
    assert_eq!(
        app.get("/api/v1/dashboard/stats", Some(rotated)).await.status,
        StatusCode::OK
    );

    let reused = app
        .post(
            "/api/v1/auth/refresh",
            None,
            json!({ "refresh_token": refresh }),
        )
        .await;
    assert_eq!(reused.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reused.body["error"], "invalid refresh token");
}

#[tokio::test]
async fn test_firewall_changes_require_admin() {
    let app = TestApp::new();
    let (user, _) = app.register_and_login("analyst@securecloud.test").await;
    let rule = json!({ "action": "block", "source_ip": "198.51.100.4", "port": 443, "protocol": "tcp" });

    let denied = app
        .post("/api/v1/firewall/rules", Some(&user), rule.clone())
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let admin = app.admin_token().await;
    let created = app
        .post("/api/v1/firewall/rules", Some(&admin), rule)
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);

    let listed = app.get("/api/v1/firewall/rules", Some(&user)).await;
    assert_eq!(listed.body["rules"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_users_can_only_read_themselves() {
    let app = TestApp::new();
    let (first, _) = app.register_and_login("first@securecloud.test").await;
    app.register_and_login("second@securecloud.test").await;

    let admin = app.admin_token().await;
    let users = app.get("/api/v1/users", Some(&admin)).await;
    assert_eq!(users.status, StatusCode::OK, "{}", users.body);
    let second_id = users.body["users"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "second@securecloud.test")
        .map(|u| u["id"].as_str().unwrap().to_string())
        .unwrap();

    let other = app
        .get(&format!("/api/v1/users/{second_id}"), Some(&first))
        .await;
    assert_eq!(other.status, StatusCode::FORBIDDEN);

    let listing = app.get("/api/v1/users", Some(&first)).await;
    assert_eq!(listing.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deleted_user_loses_access_and_refresh() {
    let app = TestApp::new();
    let (access, refresh) = app.register_and_login("leaver@securecloud.test").await;
    let user_id = app.user_id("leaver@securecloud.test").await;
    let admin = app.admin_token().await;

    let deleted = app
        .send(request(
            Method::DELETE,
            &format!("/api/v1/users/{user_id}"),
            Some(&admin),
            None,
        ))
        .await;
    assert_eq!(deleted.status, StatusCode::OK, "{}", deleted.body);

    let after = app.get("/api/v1/alerts", Some(&access)).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(after.body["error"], "token revoked");

    let refreshed = app
        .post(
            "/api/v1/auth/refresh",
            None,
            json!({ "refresh_token": refresh }),
        )
        .await;
    assert_eq!(refreshed.status, StatusCode::UNAUTHORIZED);
    assert_eq!(refreshed.body["error"], "invalid refresh token");
}

#[tokio::test]
async fn test_demoted_admin_loses_admin_tokens() {
    let app = TestApp::new();
    let demoted_id = app.create_admin("ops@securecloud.test").await;
    let login = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "email": "ops@securecloud.test", "password": common::PASSWORD }),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK, "{}", login.body);
    let old_access = login.body["access_token"].as_str().unwrap().to_string();
    let old_refresh = login.body["refresh_token"].as_str().unwrap().to_string();
    assert_eq!(
        app.get("/api/v1/users", Some(&old_access)).await.status,
        StatusCode::OK
    );

    let admin = app.admin_token().await;
    let demoted = app
        .send(request(
            Method::PUT,
            &format!("/api/v1/users/{demoted_id}"),
            Some(&admin),
            Some(json!({ "role": "user" })),
        ))
        .await;
    assert_eq!(demoted.status, StatusCode::OK, "{}", demoted.body);
    assert_eq!(demoted.body["role"], "user");

    let stale = app.get("/api/v1/users", Some(&old_access)).await;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);
    assert_eq!(stale.body["error"], "token revoked");

    let refreshed = app
        .post(
            "/api/v1/auth/refresh",
            None,
            json!({ "refresh_token": old_refresh }),
        )
        .await;
    assert_eq!(refreshed.status, StatusCode::UNAUTHORIZED);

    let relogin = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "email": "ops@securecloud.test", "password": common::PASSWORD }),
        )
        .await;
    assert_eq!(relogin.status, StatusCode::OK, "{}", relogin.body);
    let fresh = relogin.body["access_token"].as_str().unwrap();
    assert_eq!(
        app.get("/api/v1/users", Some(fresh)).await.status,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_profile_edit_keeps_tokens() {
    let app = TestApp::new();
    let (access, _) = app.register_and_login("keeper@securecloud.test").await;
    let user_id = app.user_id("keeper@securecloud.test").await;

    let renamed = app
        .send(request(
            Method::PUT,
            &format!("/api/v1/users/{user_id}"),
            Some(&access),
            Some(json!({ "name": "Renamed" })),
        ))
        .await;
    assert_eq!(renamed.status, StatusCode::OK, "{}", renamed.body);
    assert_eq!(
        app.get("/api/v1/alerts", Some(&access)).await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_ready_reports_probes_and_phase() {
    let app = TestApp::new();
    let reply = app.get("/ready", None).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ready");
    assert_eq!(reply.body["phase"], "starting");
    assert_eq!(reply.body["checks"]["data_store"], "up");
    assert_eq!(reply.body["checks"]["cache"], "disabled");
}

#[tokio::test]
async fn test_metrics_count_admitted_and_refused_requests() {
    let app = TestApp::new();
    app.get("/health", None).await;
    app.get("/api/v1/alerts", None).await;

    let reply = app.get("/metrics", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(
        reply.headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );

    let text = reply.body.as_str().unwrap();
    assert!(text.contains("gateway_requests_total"));
    assert!(text.contains(r#"gateway_auth_failures_total{reason="missing"}"#));
}

#[tokio::test]
async fn test_graphql_over_http() {
    let app = TestApp::new();
    let query = json!({ "query": "{ alerts { items { id } pageInfo { total } } }" });

    let anonymous = app.post("/graphql", None, query.clone()).await;
    assert_eq!(anonymous.status, StatusCode::OK);
    assert_eq!(anonymous.body["errors"][0]["extensions"]["code"], "UNAUTHORIZED");

    let (access, _) = app.register_and_login("analyst@securecloud.test").await;
    let authed = app.post("/graphql", Some(&access), query).await;
    assert_eq!(authed.status, StatusCode::OK);
    assert!(authed.body.get("errors").is_none(), "{}", authed.body);
    assert_eq!(authed.body["data"]["alerts"]["pageInfo"]["total"], 3);

    let broken = app
        .post("/graphql", Some(&access), json!({ "query": "{ alerts { " }))
        .await;
    assert_eq!(broken.status, StatusCode::OK);
    assert_eq!(broken.body["errors"][0]["extensions"]["code"], "GRAPHQL_SYNTAX_ERROR");
}

#[tokio::test]
async fn test_graphql_rejects_invalid_bearer() {
    let app = TestApp::new();
    let reply = app
        .send(request(
            Method::POST,
            "/graphql",
            Some("not-a-jwt"),
            Some(json!({ "query": "{ __typename }" })),
        ))
        .await;

    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}
