pub mod alerts;
pub mod auth;
pub mod firewall;
pub mod network;
pub mod pagination;
pub mod threats;
pub mod users;
