pub mod alerts;
pub mod auth;
pub mod dashboard;
pub mod firewall;
pub mod network;
pub mod threats;
pub mod users;
