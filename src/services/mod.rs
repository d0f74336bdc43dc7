/*
 * Responsibility
 * - Domain services shared by middleware, handlers and GraphQL resolvers
 * - auth: token lifecycle; rate_limit: per-client windows; collaborators: fronted services
 */
pub mod auth;
pub mod cache;
pub mod collaborators;
pub mod events;
pub mod metrics;
pub mod rate_limit;
