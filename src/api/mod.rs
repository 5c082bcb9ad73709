//! Business endpoints behind the authorization pipeline.
//!
//! Handlers only run for admitted requests; they read the caller from
//! the `AuthContext` extension when they need it.

pub mod artists;
pub mod auth;
pub mod regionais;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::config::ApiConfig;
use crate::security::TokenIssuer;
use crate::store::Catalog;

use self::auth::UserDirectory;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub issuer: Arc<TokenIssuer>,
    pub users: Arc<UserDirectory>,
}

impl AppState {
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            catalog: Arc::new(Catalog::from_config(&config.catalog)),
            issuer: Arc::new(TokenIssuer::from_config(&config.auth)),
            users: Arc::new(UserDirectory::new(config.auth.users.clone())),
        }
    }
}

/// Routes for the business endpoints.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/regionais", get(regionais::list))
        .route("/api/artists", get(artists::list).post(artists::create))
        .route("/api/artists/{id}", get(artists::get))
        .with_state(state)
}
