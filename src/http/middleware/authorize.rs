//! Authorization middleware.
//! Refuses requests the pipeline rejects and attaches the caller to the rest.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::KeySource;
use crate::http::request::{request_context, request_id};
use crate::observability::metrics;
use crate::security::{AuthorizationPipeline, Identity, Verdict};

/// State required by the authorization middleware.
#[derive(Clone)]
pub struct AuthState {
    pub pipeline: Arc<AuthorizationPipeline>,
    pub key_source: KeySource,
}

/// Resolved caller attached to admitted requests.
///
/// `identity` is `None` on public routes.
#[derive(Clone, Debug, Default)]
pub struct AuthContext {
    pub identity: Option<Identity>,
}

impl AuthContext {
    pub fn subject(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.subject.as_str())
    }
}

/// Run the pipeline before any handler sees the request.
pub async fn authorize(
    State(state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let ctx = request_context(&request, state.key_source);

    match state.pipeline.authorize(ctx) {
        Verdict::Admit(identity) => {
            metrics::record_verdict(if identity.is_some() { "admitted" } else { "public" });
            request.extensions_mut().insert(AuthContext { identity });
            next.run(request).await
        }
        Verdict::Reject(reason) => {
            tracing::debug!(
                request_id = %request_id(request.headers()),
                method = %request.method(),
                path = %request.uri().path(),
                reason = reason.code(),
                "Request refused"
            );
            metrics::record_verdict(reason.code());
            reason.into_response()
        }
    }
}
