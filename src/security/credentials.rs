//! Bearer token issuance and verification.
//!
//! # Responsibilities
//! - Issue HMAC-signed JWTs for logged-in users
//! - Verify presented tokens: structure, expiry, then signature
//! - Extract the subject identity and roles for downstream handlers
//!
//! # Design Decisions
//! - Pure and synchronous: no network, no retries, same key → same answer
//! - Expiry is judged from the claims before the signature is checked,
//!   so an expired token reports `Expired` whatever its signature
//! - The clock is an explicit parameter in `verify_at`, `verify` reads
//!   the system clock

use std::collections::HashSet;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,

    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// The authenticated caller resolved from a valid token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub subject: String,
    pub roles: Vec<String>,
}

/// Why a presented token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,
}

/// Verification seam used by the authorization pipeline.
pub trait VerifyCredential: Send + Sync {
    fn verify(&self, token: &str) -> Result<Identity, CredentialError>;
}

/// Map a configured algorithm name to an HMAC algorithm.
pub fn parse_algorithm(name: &str) -> Option<Algorithm> {
    match name.to_ascii_uppercase().as_str() {
        "HS256" => Some(Algorithm::HS256),
        "HS384" => Some(Algorithm::HS384),
        "HS512" => Some(Algorithm::HS512),
        _ => None,
    }
}

fn base_validation(algorithm: Algorithm) -> Validation {
    let mut validation = Validation::new(algorithm);
    // Expiry is checked against our own clock reading. `exp` stays out of the
    // required set: jsonwebtoken reads it as unsigned, `Claims` already requires it.
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::from(["sub".to_string()]);
    validation
}

/// Validates bearer tokens against the process signing key.
pub struct CredentialVerifier {
    algorithm: Algorithm,
    decoding_key: DecodingKey,
    leeway_secs: i64,
}

impl CredentialVerifier {
    pub fn new(secret: &[u8], algorithm: Algorithm, leeway_secs: u64) -> Self {
        Self {
            algorithm,
            decoding_key: DecodingKey::from_secret(secret),
            leeway_secs: i64::try_from(leeway_secs).unwrap_or(i64::MAX),
        }
    }

    /// Build from validated configuration. Unknown algorithms fall back to HS256.
    pub fn from_config(config: &AuthConfig) -> Self {
        let algorithm = parse_algorithm(&config.algorithm).unwrap_or(Algorithm::HS256);
        Self::new(config.signing_key.as_bytes(), algorithm, config.leeway_secs)
    }

    /// Verify a token against an explicit clock reading (Unix seconds).
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Identity, CredentialError> {
        // 1. Structure
        let header = decode_header(token).map_err(|_| CredentialError::Malformed)?;

        let mut unverified = base_validation(self.algorithm);
        unverified.insecure_disable_signature_validation();
        let claims = decode::<Claims>(token, &self.decoding_key, &unverified)
            .map_err(|_| CredentialError::Malformed)?
            .claims;

        if claims.sub.trim().is_empty() {
            return Err(CredentialError::Malformed);
        }

        // 2. Expiry
        if now >= claims.exp.saturating_add(self.leeway_secs) {
            return Err(CredentialError::Expired);
        }

        // 3. Signature, only with the configured algorithm
        if header.alg != self.algorithm {
            return Err(CredentialError::InvalidSignature);
        }

        let verified = decode::<Claims>(token, &self.decoding_key, &base_validation(self.algorithm))
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => CredentialError::InvalidSignature,
                _ => CredentialError::Malformed,
            })?
            .claims;

        Ok(Identity {
            subject: verified.sub,
            roles: verified.roles,
        })
    }
}

impl VerifyCredential for CredentialVerifier {
    fn verify(&self, token: &str) -> Result<Identity, CredentialError> {
        self.verify_at(token, Utc::now().timestamp())
    }
}

/// A freshly signed token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: i64,
}

/// Error raised while signing a token.
#[derive(Debug, Error)]
#[error("failed to sign token: {0}")]
pub struct IssueError(#[from] jsonwebtoken::errors::Error);

/// Signs access tokens for authenticated users.
pub struct TokenIssuer {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    ttl_secs: i64,
    issuer: Option<String>,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], algorithm: Algorithm, ttl_secs: u64, issuer: Option<String>) -> Self {
        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
            issuer,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        let algorithm = parse_algorithm(&config.algorithm).unwrap_or(Algorithm::HS256);
        Self::new(
            config.signing_key.as_bytes(),
            algorithm,
            config.token_ttl_secs,
            config.issuer.clone(),
        )
    }

    pub fn issue(&self, subject: &str, roles: &[String]) -> Result<IssuedToken, IssueError> {
        self.issue_at(subject, roles, Utc::now().timestamp())
    }

    pub fn issue_at(&self, subject: &str, roles: &[String], now: i64) -> Result<IssuedToken, IssueError> {
        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
            roles: roles.to_vec(),
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?;

        Ok(IssuedToken {
            token,
            token_type: "Bearer",
            expires_at: claims.exp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-key-at-least-32-characters-long";
    const NOW: i64 = 1_760_000_000;

    fn issuer(ttl: u64) -> TokenIssuer {
        TokenIssuer::new(SECRET, Algorithm::HS256, ttl, None)
    }

    fn verifier() -> CredentialVerifier {
        CredentialVerifier::new(SECRET, Algorithm::HS256, 0)
    }

    fn tamper_signature(token: &str) -> String {
        let (head, sig) = token.rsplit_once('.').unwrap();
        let mut chars: Vec<char> = sig.chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        format!("{}.{}", head, chars.into_iter().collect::<String>())
    }

    #[test]
    fn test_issue_and_verify() {
        let issued = issuer(300).issue_at("admin", &["ADMIN".to_string()], NOW).unwrap();
        assert_eq!(issued.expires_at, NOW + 300);
        assert_eq!(issued.token_type, "Bearer");

        let identity = verifier().verify_at(&issued.token, NOW + 10).unwrap();
        assert_eq!(identity.subject, "admin");
        assert_eq!(identity.roles, vec!["ADMIN".to_string()]);
    }

    #[test]
    fn test_expired_token() {
        let issued = issuer(300).issue_at("admin", &[], NOW).unwrap();
        assert_eq!(verifier().verify_at(&issued.token, NOW + 300), Err(CredentialError::Expired));
        assert_eq!(verifier().verify_at(&issued.token, NOW + 10_000), Err(CredentialError::Expired));
    }

    #[test]
    fn test_leeway_extends_expiry() {
        let issued = issuer(300).issue_at("admin", &[], NOW).unwrap();
        let lenient = CredentialVerifier::new(SECRET, Algorithm::HS256, 60);
        assert!(lenient.verify_at(&issued.token, NOW + 330).is_ok());
        assert_eq!(lenient.verify_at(&issued.token, NOW + 360), Err(CredentialError::Expired));
    }

    #[test]
    fn test_expired_wins_over_bad_signature() {
        let issued = issuer(300).issue_at("admin", &[], NOW).unwrap();
        let tampered = tamper_signature(&issued.token);
        assert_eq!(verifier().verify_at(&tampered, NOW + 301), Err(CredentialError::Expired));

        let foreign = TokenIssuer::new(b"another-secret-key-that-is-long-enough", Algorithm::HS256, 300, None)
            .issue_at("admin", &[], NOW)
            .unwrap();
        assert_eq!(verifier().verify_at(&foreign.token, NOW + 301), Err(CredentialError::Expired));
    }

    #[test]
    fn test_tampered_signature() {
        let issued = issuer(300).issue_at("admin", &[], NOW).unwrap();
        let tampered = tamper_signature(&issued.token);
        assert_eq!(verifier().verify_at(&tampered, NOW), Err(CredentialError::InvalidSignature));
    }

    #[test]
    fn test_wrong_key() {
        let foreign = TokenIssuer::new(b"another-secret-key-that-is-long-enough", Algorithm::HS256, 300, None)
            .issue_at("admin", &[], NOW)
            .unwrap();
        assert_eq!(verifier().verify_at(&foreign.token, NOW), Err(CredentialError::InvalidSignature));
    }

    #[test]
    fn test_algorithm_mismatch() {
        let hs512 = TokenIssuer::new(SECRET, Algorithm::HS512, 300, None)
            .issue_at("admin", &[], NOW)
            .unwrap();
        assert_eq!(verifier().verify_at(&hs512.token, NOW), Err(CredentialError::InvalidSignature));
    }

    #[test]
    fn test_malformed_tokens() {
        let v = verifier();
        for token in ["", "abc", "a.b.c", "Bearer x.y.z", "eyJhbGciOiJIUzI1NiJ9.@@@.sig"] {
            assert_eq!(v.verify_at(token, NOW), Err(CredentialError::Malformed), "{token}");
        }
    }

    #[test]
    fn test_missing_claims_are_malformed() {
        #[derive(Serialize)]
        struct NoExp {
            sub: String,
        }

        let token = encode(
            &Header::new(Algorithm::HS256),
            &NoExp { sub: "admin".into() },
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();
        assert_eq!(verifier().verify_at(&token, NOW), Err(CredentialError::Malformed));

        let blank = issuer(300).issue_at("  ", &[], NOW).unwrap();
        assert_eq!(verifier().verify_at(&blank.token, NOW), Err(CredentialError::Malformed));
    }

    #[test]
    fn test_negative_expiry_is_expired() {
        #[derive(Serialize)]
        struct Raw {
            sub: String,
            exp: i64,
        }

        let token = encode(
            &Header::new(Algorithm::HS256),
            &Raw { sub: "a".into(), exp: -5 },
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();
        assert_eq!(verifier().verify_at(&token, NOW), Err(CredentialError::Expired));
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!(parse_algorithm("hs384"), Some(Algorithm::HS384));
        assert_eq!(parse_algorithm("RS256"), None);
        assert_eq!(parse_algorithm("none"), None);
    }
}
