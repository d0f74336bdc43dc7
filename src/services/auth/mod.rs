pub mod access_jwt;
pub mod error;
pub mod factory;
pub mod password;
pub mod principal;
pub mod refresh_token;
pub mod revocation;
pub mod token_service;

pub use access_jwt::{AccessTokenClaims, AccessTokenCodec};
pub use error::TokenError;
pub use factory::build_token_service;
pub use principal::{Principal, Role};
pub use refresh_token::{InMemoryRefreshStore, RefreshTokenStore};
pub use token_service::{TokenPair, TokenService};
