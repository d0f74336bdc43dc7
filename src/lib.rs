pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod graphql;
pub mod lifecycle;
pub mod middleware;
pub mod services;
pub mod state;
