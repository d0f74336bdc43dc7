/*
 * Responsibility
 * - Fixed GraphQL schema over the collaborators (query / mutation / subscription)
 * - Dispatch: parse -> validate -> execute, with typed error codes in `extensions.code`
 */
mod dispatch;
mod errors;
mod schema;

pub use dispatch::{GraphQLRequestBody, dispatch};
pub use errors::codes;
pub use schema::{GatewaySchema, MutationRoot, QueryRoot, SubscriptionRoot, build_schema};
