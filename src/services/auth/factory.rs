/// Factory: build `TokenService` from application `Config`.
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::services::auth::{AccessTokenCodec, InMemoryRefreshStore, TokenService};

pub fn build_token_service(config: &AuthConfig) -> Arc<TokenService> {
    let codec = AccessTokenCodec::new(
        config.signing_secret.as_bytes(),
        &config.issuer,
        &config.audience,
        config.access_token_ttl_seconds,
    );

    Arc::new(TokenService::new(
        codec,
        Arc::new(InMemoryRefreshStore::new()),
        config.refresh_token_ttl_seconds,
    ))
}
