//! Login: exchanges username/password for a bearer token.

use axum::{extract::State, Json};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::api::AppState;
use crate::config::UserConfig;
use crate::http::response::ApiError;
use crate::security::credentials::IssuedToken;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login accounts loaded from configuration.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: Vec<UserConfig>,
}

impl UserDirectory {
    pub fn new(users: Vec<UserConfig>) -> Self {
        Self { users }
    }

    /// Check a password; returns the account's roles on success.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<&[String]> {
        let user = self.users.iter().find(|u| u.username == username)?;
        let digest = format!("{:x}", Sha256::digest(password.as_bytes()));
        if constant_time_eq(digest.as_bytes(), user.password_sha256.to_ascii_lowercase().as_bytes()) {
            Some(&user.roles)
        } else {
            None
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<IssuedToken>, ApiError> {
    let Some(roles) = state.users.authenticate(&body.username, &body.password) else {
        tracing::info!(username = %body.username, "Login refused");
        return Err(ApiError::InvalidCredentials);
    };

    let issued = state.issuer.issue(&body.username, roles).map_err(|e| {
        tracing::error!(error = %e, "Failed to issue token");
        ApiError::Internal
    })?;

    tracing::info!(username = %body.username, expires_at = issued.expires_at, "Login succeeded");
    Ok(Json(issued))
}
