//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject missing or weak signing keys before the server binds
//! - Validate value ranges (limits, windows, TTLs > 0)
//! - Check route patterns, methods and CORS origins
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ApiConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use axum::http::Method;
use thiserror::Error;
use url::Url;

use crate::config::schema::ApiConfig;
use crate::security::credentials::parse_algorithm;

/// Minimum HMAC key length in bytes.
pub const MIN_SIGNING_KEY_LEN: usize = 32;

/// Longest accepted rate window (one day).
pub const MAX_RATE_WINDOW_SECS: u64 = 86_400;

/// Longest accepted idle retention (one week).
pub const MAX_RATE_RETENTION_SECS: u64 = 7 * 86_400;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("auth.signing_key is not set")]
    MissingSigningKey,

    #[error("auth.signing_key must be at least 32 bytes, got {0}")]
    WeakSigningKey(usize),

    #[error("auth.algorithm '{0}' is not a supported HMAC algorithm")]
    UnsupportedAlgorithm(String),

    #[error("auth.token_ttl_secs must be greater than zero")]
    ZeroTokenTtl,

    #[error("auth.users: duplicate username '{0}'")]
    DuplicateUser(String),

    #[error("auth.users: password_sha256 for '{0}' is not a 64-character hex digest")]
    InvalidPasswordDigest(String),

    #[error("rate_limit.{0} must be greater than zero")]
    ZeroRateSetting(&'static str),

    #[error("rate_limit.{field} ({value}) must not exceed {max}")]
    RateSettingTooLarge {
        field: &'static str,
        value: u64,
        max: u64,
    },

    #[error("rate_limit.retention_secs ({retention}) must not be shorter than window_secs ({window})")]
    RetentionShorterThanWindow { retention: u64, window: u64 },

    #[error("routes.rules[{index}]: invalid pattern '{pattern}': {reason}")]
    InvalidRoutePattern {
        index: usize,
        pattern: String,
        reason: &'static str,
    },

    #[error("routes.rules[{index}]: invalid method '{method}'")]
    InvalidRouteMethod { index: usize, method: String },

    #[error("cors.allowed_origins: '{0}' is not an http(s) origin")]
    InvalidOrigin(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("catalog.regionais: duplicate id {0}")]
    DuplicateRegional(u32),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ApiConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_auth(config, &mut errors);
    validate_rate_limit(config, &mut errors);
    validate_routes(config, &mut errors);

    for origin in &config.cors.allowed_origins {
        if !is_http_origin(origin) {
            errors.push(ValidationError::InvalidOrigin(origin.clone()));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    let mut seen = HashSet::new();
    for regional in &config.catalog.regionais {
        if !seen.insert(regional.id) {
            errors.push(ValidationError::DuplicateRegional(regional.id));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_auth(config: &ApiConfig, errors: &mut Vec<ValidationError>) {
    let auth = &config.auth;

    match auth.signing_key.len() {
        0 => errors.push(ValidationError::MissingSigningKey),
        n if n < MIN_SIGNING_KEY_LEN => errors.push(ValidationError::WeakSigningKey(n)),
        _ => {}
    }

    if parse_algorithm(&auth.algorithm).is_none() {
        errors.push(ValidationError::UnsupportedAlgorithm(auth.algorithm.clone()));
    }

    if auth.token_ttl_secs == 0 {
        errors.push(ValidationError::ZeroTokenTtl);
    }

    let mut usernames = HashSet::new();
    for user in &auth.users {
        if !usernames.insert(user.username.as_str()) {
            errors.push(ValidationError::DuplicateUser(user.username.clone()));
        }
        let digest = &user.password_sha256;
        if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            errors.push(ValidationError::InvalidPasswordDigest(user.username.clone()));
        }
    }
}

fn validate_rate_limit(config: &ApiConfig, errors: &mut Vec<ValidationError>) {
    let rl = &config.rate_limit;
    if !rl.enabled {
        return;
    }

    if rl.limit == 0 {
        errors.push(ValidationError::ZeroRateSetting("limit"));
    }
    if rl.window_secs == 0 {
        errors.push(ValidationError::ZeroRateSetting("window_secs"));
    }
    if rl.sweep_interval_secs == 0 {
        errors.push(ValidationError::ZeroRateSetting("sweep_interval_secs"));
    }
    if rl.window_secs > MAX_RATE_WINDOW_SECS {
        errors.push(ValidationError::RateSettingTooLarge {
            field: "window_secs",
            value: rl.window_secs,
            max: MAX_RATE_WINDOW_SECS,
        });
    }
    if rl.retention_secs > MAX_RATE_RETENTION_SECS {
        errors.push(ValidationError::RateSettingTooLarge {
            field: "retention_secs",
            value: rl.retention_secs,
            max: MAX_RATE_RETENTION_SECS,
        });
    }
    if rl.retention_secs < rl.window_secs {
        errors.push(ValidationError::RetentionShorterThanWindow {
            retention: rl.retention_secs,
            window: rl.window_secs,
        });
    }
}

fn validate_routes(config: &ApiConfig, errors: &mut Vec<ValidationError>) {
    for (index, rule) in config.routes.rules.iter().enumerate() {
        if let Err(reason) = check_pattern(&rule.pattern) {
            errors.push(ValidationError::InvalidRoutePattern {
                index,
                pattern: rule.pattern.clone(),
                reason,
            });
        }
        for method in &rule.methods {
            if Method::from_bytes(method.to_ascii_uppercase().as_bytes()).is_err() {
                errors.push(ValidationError::InvalidRouteMethod {
                    index,
                    method: method.clone(),
                });
            }
        }
    }
}

fn check_pattern(pattern: &str) -> Result<(), &'static str> {
    if !pattern.starts_with('/') {
        return Err("must start with '/'");
    }
    let body = pattern.strip_suffix("/**").unwrap_or(pattern);
    if body.contains('*') {
        return Err("'**' is only allowed as the final segment");
    }
    Ok(())
}

fn is_http_origin(origin: &str) -> bool {
    match Url::parse(origin) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host().is_some()
                && url.path() == "/"
                && !origin.ends_with('/')
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{Access, RouteRuleConfig, UserConfig};

    fn valid_config() -> ApiConfig {
        let mut config = ApiConfig::default();
        config.auth.signing_key = "k".repeat(MIN_SIGNING_KEY_LEN);
        config
    }

    #[test]
    fn test_default_with_key_is_valid() {
        assert_eq!(validate_config(&valid_config()), Ok(()));
    }

    #[test]
    fn test_missing_signing_key_is_fatal() {
        let config = ApiConfig::default();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::MissingSigningKey));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid_config();
        config.auth.signing_key = "short".into();
        config.rate_limit.limit = 0;
        config.rate_limit.retention_secs = 10;
        config.cors.allowed_origins.push("localhost:3000".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::WeakSigningKey(5)));
        assert!(errors.contains(&ValidationError::ZeroRateSetting("limit")));
    }

    #[test]
    fn test_disabled_rate_limit_skips_checks() {
        let mut config = valid_config();
        config.rate_limit.enabled = false;
        config.rate_limit.limit = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_oversized_rate_window_is_rejected() {
        let mut config = valid_config();
        config.rate_limit.window_secs = u64::MAX;
        config.rate_limit.retention_secs = u64::MAX;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::RateSettingTooLarge {
                    field: "window_secs",
                    value: u64::MAX,
                    max: MAX_RATE_WINDOW_SECS,
                },
                ValidationError::RateSettingTooLarge {
                    field: "retention_secs",
                    value: u64::MAX,
                    max: MAX_RATE_RETENTION_SECS,
                },
            ]
        );

        config.rate_limit.window_secs = MAX_RATE_WINDOW_SECS;
        config.rate_limit.retention_secs = MAX_RATE_RETENTION_SECS;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_route_patterns() {
        assert!(check_pattern("/api/auth/**").is_ok());
        assert!(check_pattern("/api/health").is_ok());
        assert!(check_pattern("/**").is_ok());
        assert!(check_pattern("api/auth").is_err());
        assert!(check_pattern("/api/*/x").is_err());
        assert!(check_pattern("/api/**/x").is_err());
    }

    #[test]
    fn test_bad_rule_method() {
        let mut config = valid_config();
        config.routes.rules.push(RouteRuleConfig {
            pattern: "/api/x".into(),
            methods: vec!["GE T".into()],
            access: Access::Public,
        });
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidRouteMethod { index: 4, .. }));
    }

    #[test]
    fn test_user_digest_and_duplicates() {
        let mut config = valid_config();
        let user = UserConfig {
            username: "admin".into(),
            password_sha256: "zz".into(),
            roles: vec![],
        };
        config.auth.users = vec![user.clone(), user];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateUser("admin".into())));
        assert!(errors.contains(&ValidationError::InvalidPasswordDigest("admin".into())));
    }

    #[test]
    fn test_origins() {
        assert!(is_http_origin("http://localhost:5173"));
        assert!(is_http_origin("https://admin.example.org"));
        assert!(!is_http_origin("http://localhost:5173/"));
        assert!(!is_http_origin("ftp://example.org"));
        assert!(!is_http_origin("*"));
    }
}
