//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the API.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the API server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ApiConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Token signing and login users.
    pub auth: AuthConfig,

    /// Public/authenticated route table.
    pub routes: RoutesConfig,

    /// Cross-origin allow-list for the browser front end.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Seed data for the in-memory catalog.
    pub catalog: CatalogConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Where the rate limiter takes the client key from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    /// Peer IP address of the TCP connection.
    #[default]
    Peer,
    /// First hop of `X-Forwarded-For`, falling back to the peer address.
    /// Only safe behind a trusted reverse proxy.
    ForwardedFor,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests admitted per client within one window.
    pub limit: u32,

    /// Fixed window length in seconds.
    pub window_secs: u64,

    /// Idle time after which a client's window is evicted.
    pub retention_secs: u64,

    /// How often the sweeper looks for idle windows.
    pub sweep_interval_secs: u64,

    /// Client key extraction strategy.
    pub key_source: KeySource,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 100,
            window_secs: 60,
            retention_secs: 300,
            sweep_interval_secs: 60,
            key_source: KeySource::Peer,
        }
    }
}

/// Token signing and verification settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret shared by the issuer and the verifier.
    /// Empty means "not configured" and fails validation.
    pub signing_key: String,

    /// HMAC algorithm name: HS256, HS384 or HS512.
    pub algorithm: String,

    /// Lifetime of issued tokens in seconds.
    pub token_ttl_secs: u64,

    /// Clock skew tolerated when checking `exp`.
    pub leeway_secs: u64,

    /// Optional `iss` claim written into issued tokens.
    pub issuer: Option<String>,

    /// Accounts allowed to log in.
    pub users: Vec<UserConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signing_key: String::new(),
            algorithm: "HS256".to_string(),
            // Front end session limit: 5 minutes.
            token_ttl_secs: 300,
            leeway_secs: 0,
            issuer: None,
            users: Vec::new(),
        }
    }
}

/// A login account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserConfig {
    pub username: String,

    /// Lowercase hex SHA-256 digest of the password.
    pub password_sha256: String,

    #[serde(default)]
    pub roles: Vec<String>,
}

/// Access class of a route rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Public,
    Authenticated,
}

/// A single route rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteRuleConfig {
    /// Exact path (`/api/health`) or subtree pattern (`/api/auth/**`).
    pub pattern: String,

    /// Methods the rule applies to. Empty means any method.
    #[serde(default)]
    pub methods: Vec<String>,

    pub access: Access,
}

impl RouteRuleConfig {
    fn public(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            methods: Vec::new(),
            access: Access::Public,
        }
    }
}

/// Ordered route table. First match wins.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    pub rules: Vec<RouteRuleConfig>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                RouteRuleConfig::public("/api/auth/**"),
                RouteRuleConfig::public("/swagger-ui/**"),
                RouteRuleConfig::public("/api/regionais/**"),
                RouteRuleConfig::public("/v3/api-docs/**"),
            ],
        }
    }
}

/// CORS allow-list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            // Vite dev server
            allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty output for development, JSON for production.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A regional office entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegionalConfig {
    pub id: u32,
    pub nome: String,
    #[serde(default = "default_true")]
    pub ativo: bool,
}

fn default_true() -> bool {
    true
}

/// Catalog seed data.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CatalogConfig {
    pub regionais: Vec<RegionalConfig>,
}
