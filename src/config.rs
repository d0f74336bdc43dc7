/*
 * Responsibility
 * - Load settings from the environment (.env honoured in development)
 * - Validate them; a production deployment without a real signing secret does not start
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::services::rate_limit::RateLimitPolicy;

const DEV_SIGNING_SECRET: &str = "securecloud-development-signing-secret-change-me";
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone)]
pub struct AuthConfig {
    pub issuer: String,
    pub audience: String,
    pub signing_secret: String,
    pub access_token_ttl_seconds: u64,
    pub refresh_token_ttl_seconds: u64,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .field("refresh_token_ttl_seconds", &self.refresh_token_ttl_seconds)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct CollaboratorConfig {
    pub capture_engine_url: Option<Url>,
    pub analysis_engine_url: Option<Url>,
    pub redis_url: Option<String>,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,

    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub auth: AuthConfig,
    pub rate_limit: RateLimitPolicy,
    pub trust_proxy_headers: bool,

    pub drain_deadline: Duration,
    pub request_deadline: Duration,
    pub body_limit_bytes: usize,

    pub collaborators: CollaboratorConfig,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_url(key: &'static str) -> Result<Option<Url>, ConfigError> {
    match std::env::var(key) {
        Ok(s) if !s.trim().is_empty() => Url::parse(s.trim())
            .map(Some)
            .map_err(|_| ConfigError::Invalid(key)),
        _ => Ok(None),
    }
}

impl Config {
    /// Development defaults with the given signing secret. Every field is public, so
    /// callers adjust what they need.
    pub fn with_signing_secret(secret: impl Into<String>) -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            app_env: AppEnv::Development,
            cors_allowed_origins: Vec::new(),
            auth: AuthConfig {
                issuer: "securecloud-gateway".to_string(),
                audience: "securecloud-api".to_string(),
                signing_secret: secret.into(),
                access_token_ttl_seconds: 3600,
                refresh_token_ttl_seconds: 2_592_000,
            },
            rate_limit: RateLimitPolicy::default(),
            trust_proxy_headers: false,
            drain_deadline: Duration::from_secs(5),
            request_deadline: Duration::from_secs(30),
            body_limit_bytes: 1024 * 1024,
            collaborators: CollaboratorConfig {
                capture_engine_url: None,
                analysis_engine_url: None,
                redis_url: None,
                timeout: Duration::from_secs(5),
            },
            bootstrap_admin: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = env_or("PORT", 8080);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let signing_secret = match std::env::var("JWT_SIGNING_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ if app_env.is_production() => {
                return Err(ConfigError::Missing("JWT_SIGNING_SECRET"));
            }
            _ => {
                tracing::warn!("JWT_SIGNING_SECRET not set; using the development secret");
                DEV_SIGNING_SECRET.to_string()
            }
        };
        if app_env.is_production() && signing_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid("JWT_SIGNING_SECRET"));
        }

        let auth = AuthConfig {
            issuer: std::env::var("AUTH_ISSUER")
                .unwrap_or_else(|_| "securecloud-gateway".to_string()),
            audience: std::env::var("AUTH_AUDIENCE")
                .unwrap_or_else(|_| "securecloud-api".to_string()),
            signing_secret,
            access_token_ttl_seconds: env_or("ACCESS_TOKEN_TTL_SECONDS", 3600),
            refresh_token_ttl_seconds: env_or("REFRESH_TOKEN_TTL_SECONDS", 2_592_000),
        };
        if auth.access_token_ttl_seconds == 0 {
            return Err(ConfigError::Invalid("ACCESS_TOKEN_TTL_SECONDS"));
        }

        let rate_limit = RateLimitPolicy {
            enabled: env_or("RATE_LIMIT_ENABLED", true),
            max_requests: env_or("RATE_LIMIT_MAX_REQUESTS", 100),
            window: Duration::from_secs(env_or("RATE_LIMIT_WINDOW_SECONDS", 60)),
        };
        if rate_limit.window.is_zero() {
            return Err(ConfigError::Invalid("RATE_LIMIT_WINDOW_SECONDS"));
        }

        let collaborators = CollaboratorConfig {
            capture_engine_url: env_url("CAPTURE_ENGINE_URL")?,
            analysis_engine_url: env_url("ANALYSIS_ENGINE_URL")?,
            redis_url: std::env::var("REDIS_URL").ok().filter(|s| !s.trim().is_empty()),
            timeout: Duration::from_secs(env_or("COLLABORATOR_TIMEOUT_SECONDS", 5)),
        };

        let bootstrap_admin = match (
            std::env::var("ADMIN_EMAIL").ok(),
            std::env::var("ADMIN_PASSWORD").ok(),
        ) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(BootstrapAdmin { email, password })
            }
            (Some(_), None) => return Err(ConfigError::Missing("ADMIN_PASSWORD")),
            _ => None,
        };

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            auth,
            rate_limit,
            trust_proxy_headers: env_or("TRUST_PROXY_HEADERS", false),
            drain_deadline: Duration::from_secs(env_or("DRAIN_DEADLINE_SECONDS", 5)),
            request_deadline: Duration::from_secs(env_or("REQUEST_DEADLINE_SECONDS", 30)),
            body_limit_bytes: env_or("BODY_LIMIT_BYTES", 1024 * 1024),
            collaborators,
            bootstrap_admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::with_signing_secret("s");

        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.auth.access_token_ttl_seconds, 3600);
        assert_eq!(config.auth.refresh_token_ttl_seconds, 30 * 24 * 3600);
        assert_eq!(config.drain_deadline, Duration::from_secs(5));
        assert!(!config.app_env.is_production());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let mut config = Config::with_signing_secret("super-secret-value");
        config.bootstrap_admin = Some(BootstrapAdmin {
            email: "root@example.com".into(),
            password: "hunter2hunter2".into(),
        });
        let printed = format!("{config:?}");

        assert!(!printed.contains("super-secret-value"));
        assert!(!printed.contains("hunter2hunter2"));
        assert!(printed.contains("root@example.com"));
    }
}
