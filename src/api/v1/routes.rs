/*
 * Responsibility
 * - v1 URL structure (nested under /api/v1)
 * - /auth is public; every other group is protected (see api::classify)
 * - Role checks live in the handlers
 */
use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

use crate::api::v1::handlers::{alerts, auth, dashboard, firewall, network, threats, users};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route(
            "/alerts",
            get(alerts::list_alerts).post(alerts::create_alert),
        )
        .route(
            "/alerts/{id}",
            get(alerts::get_alert)
                .put(alerts::update_alert)
                .delete(alerts::delete_alert),
        )
        .route("/network/interfaces", get(network::list_interfaces))
        .route("/network/stats", get(network::network_stats))
        .route("/network/monitor/start", post(network::start_monitoring))
        .route("/network/monitor/stop", post(network::stop_monitoring))
        .route(
            "/firewall/rules",
            get(firewall::list_rules).post(firewall::add_rule),
        )
        .route("/firewall/rules/{id}", delete(firewall::delete_rule))
        .route("/threats", get(threats::list_threats))
        .route("/threats/analyze", post(threats::analyze))
        .route("/threats/{id}", get(threats::get_threat))
        .route("/users", get(users::list_users))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/dashboard/stats", get(dashboard::stats))
        .route("/dashboard/recent-activity", get(dashboard::recent_activity))
}
