//! Authorization pipeline: an explicit, ordered chain of decision stages.
//!
//! # Responsibilities
//! - Build an immutable [`RequestContext`] per request
//! - Run each [`Stage`] in order; the first `Done` ends evaluation
//! - Produce a single [`Verdict`] before any business logic runs
//!
//! # Stages
//! ```text
//! RateLimitStage   → Reject(RateLimited) | Continue
//! RouteStage       → Admit(None) for public routes | Continue
//! CredentialStage  → Reject(Unauthenticated | Malformed | InvalidSignature | Expired)
//!                    | Continue(context + identity)
//! end of chain     → Admit(context.identity)
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use thiserror::Error;

use crate::config::ApiConfig;
use crate::config::validation::ValidationError;
use crate::routing::{RouteClass, RouteClassifier};
use crate::security::credentials::{CredentialError, CredentialVerifier, Identity, VerifyCredential};
use crate::security::rate_limit::{RateDecision, RateLimiter};

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("rate limit exceeded")]
    RateLimited { retry_after: Duration },

    #[error("authentication required")]
    Unauthenticated,

    #[error("bearer token is malformed")]
    Malformed,

    #[error("bearer token signature is invalid")]
    InvalidSignature,

    #[error("bearer token has expired")]
    Expired,
}

impl RejectReason {
    /// Stable code for logs, metrics and response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::RateLimited { .. } => "rate_limited",
            RejectReason::Unauthenticated => "unauthenticated",
            RejectReason::Malformed => "malformed_token",
            RejectReason::InvalidSignature => "invalid_signature",
            RejectReason::Expired => "token_expired",
        }
    }
}

impl From<CredentialError> for RejectReason {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Malformed => RejectReason::Malformed,
            CredentialError::InvalidSignature => RejectReason::InvalidSignature,
            CredentialError::Expired => RejectReason::Expired,
        }
    }
}

/// Final outcome for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Admit(Option<Identity>),
    Reject(RejectReason),
}

/// Everything the stages may look at. Never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub client_key: String,
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub identity: Option<Identity>,
}

impl RequestContext {
    pub fn new(client_key: impl Into<String>, method: Method, path: impl Into<String>, bearer: Option<String>) -> Self {
        Self {
            client_key: client_key.into(),
            method,
            path: path.into(),
            bearer,
            identity: None,
        }
    }

    /// Return a copy carrying the resolved identity.
    pub fn with_identity(self, identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            ..self
        }
    }
}

/// What a stage decided.
#[derive(Debug)]
pub enum Flow {
    Continue(RequestContext),
    Done(Verdict),
}

/// One decision step of the pipeline.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;
    fn evaluate(&self, ctx: RequestContext) -> Flow;
}

/// Rejects clients that exhausted their window.
pub struct RateLimitStage {
    limiter: Arc<RateLimiter>,
}

impl RateLimitStage {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl Stage for RateLimitStage {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn evaluate(&self, ctx: RequestContext) -> Flow {
        match self.limiter.check(&ctx.client_key) {
            RateDecision::Admit { .. } => Flow::Continue(ctx),
            RateDecision::Limited { retry_after } => {
                tracing::warn!(client = %ctx.client_key, path = %ctx.path, ?retry_after, "Rate limit exceeded");
                Flow::Done(Verdict::Reject(RejectReason::RateLimited { retry_after }))
            }
        }
    }
}

/// Admits public routes without looking at credentials.
pub struct RouteStage {
    classifier: Arc<RouteClassifier>,
}

impl RouteStage {
    pub fn new(classifier: Arc<RouteClassifier>) -> Self {
        Self { classifier }
    }
}

impl Stage for RouteStage {
    fn name(&self) -> &'static str {
        "route"
    }

    fn evaluate(&self, ctx: RequestContext) -> Flow {
        match self.classifier.classify(&ctx.path, &ctx.method) {
            RouteClass::Public => Flow::Done(Verdict::Admit(None)),
            RouteClass::RequiresAuth => Flow::Continue(ctx),
        }
    }
}

/// Requires a valid bearer token.
pub struct CredentialStage {
    verifier: Arc<dyn VerifyCredential>,
}

impl CredentialStage {
    pub fn new(verifier: Arc<dyn VerifyCredential>) -> Self {
        Self { verifier }
    }
}

impl Stage for CredentialStage {
    fn name(&self) -> &'static str {
        "credential"
    }

    fn evaluate(&self, ctx: RequestContext) -> Flow {
        let Some(token) = ctx.bearer.as_deref() else {
            return Flow::Done(Verdict::Reject(RejectReason::Unauthenticated));
        };

        match self.verifier.verify(token) {
            Ok(identity) => Flow::Continue(ctx.with_identity(identity)),
            Err(err) => Flow::Done(Verdict::Reject(err.into())),
        }
    }
}

/// Ordered list of stages evaluated once per request.
pub struct AuthorizationPipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl AuthorizationPipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Assemble the standard chain from configuration.
    ///
    /// The rate limiter is passed in so the server can share it with the
    /// sweeper; `None` leaves rate limiting out of the chain.
    pub fn from_config(config: &ApiConfig, limiter: Option<Arc<RateLimiter>>) -> Result<Self, ValidationError> {
        let classifier = Arc::new(RouteClassifier::from_config(&config.routes.rules)?);
        let verifier: Arc<dyn VerifyCredential> = Arc::new(CredentialVerifier::from_config(&config.auth));
        Ok(Self::standard(limiter, classifier, verifier))
    }

    /// Rate limit, then route classification, then credentials.
    pub fn standard(
        limiter: Option<Arc<RateLimiter>>,
        classifier: Arc<RouteClassifier>,
        verifier: Arc<dyn VerifyCredential>,
    ) -> Self {
        let mut stages: Vec<Box<dyn Stage>> = Vec::with_capacity(3);
        if let Some(limiter) = limiter {
            stages.push(Box::new(RateLimitStage::new(limiter)));
        }
        stages.push(Box::new(RouteStage::new(classifier)));
        stages.push(Box::new(CredentialStage::new(verifier)));
        Self::new(stages)
    }

    /// Stage names in evaluation order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Decide the fate of one request.
    pub fn authorize(&self, ctx: RequestContext) -> Verdict {
        let mut ctx = ctx;
        for stage in &self.stages {
            match stage.evaluate(ctx) {
                Flow::Continue(next) => ctx = next,
                Flow::Done(verdict) => {
                    if let Verdict::Reject(reason) = &verdict {
                        tracing::debug!(stage = stage.name(), reason = reason.code(), "Request rejected");
                    }
                    return verdict;
                }
            }
        }
        Verdict::Admit(ctx.identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{Access, RouteRuleConfig, RoutesConfig};
    use crate::security::credentials::TokenIssuer;
    use jsonwebtoken::Algorithm;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SECRET: &[u8] = b"pipeline-test-secret-0123456789abcdef";

    /// Verifier wrapper that counts calls.
    struct CountingVerifier {
        inner: CredentialVerifier,
        calls: AtomicUsize,
    }

    impl VerifyCredential for CountingVerifier {
        fn verify(&self, token: &str) -> Result<Identity, CredentialError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.verify(token)
        }
    }

    struct Harness {
        pipeline: AuthorizationPipeline,
        verifier: Arc<CountingVerifier>,
        issuer: TokenIssuer,
    }

    fn harness(limit: u32, rules: Vec<RouteRuleConfig>) -> Harness {
        let verifier = Arc::new(CountingVerifier {
            inner: CredentialVerifier::new(SECRET, Algorithm::HS256, 0),
            calls: AtomicUsize::new(0),
        });
        let limiter = Arc::new(RateLimiter::new(limit, Duration::from_secs(60), Duration::from_secs(300)));
        let classifier = Arc::new(RouteClassifier::from_config(&rules).unwrap());
        let pipeline = AuthorizationPipeline::standard(Some(limiter), classifier, verifier.clone());
        Harness {
            pipeline,
            verifier,
            issuer: TokenIssuer::new(SECRET, Algorithm::HS256, 300, None),
        }
    }

    fn default_harness(limit: u32) -> Harness {
        harness(limit, RoutesConfig::default().rules)
    }

    fn get(path: &str, bearer: Option<String>) -> RequestContext {
        RequestContext::new("10.0.0.1", Method::GET, path, bearer)
    }

    #[test]
    fn test_stage_order() {
        let h = default_harness(5);
        assert_eq!(h.pipeline.stage_names(), vec!["rate_limit", "route", "credential"]);
    }

    #[test]
    fn test_public_route_without_credential() {
        let h = default_harness(5);
        assert_eq!(h.pipeline.authorize(get("/api/regionais", None)), Verdict::Admit(None));
        assert_eq!(h.verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_public_route_ignores_bad_credential() {
        let h = default_harness(5);
        let verdict = h.pipeline.authorize(get("/api/regionais", Some("garbage".into())));
        assert_eq!(verdict, Verdict::Admit(None));
        assert_eq!(h.verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_protected_route_with_valid_token() {
        let h = default_harness(5);
        let token = h.issuer.issue("maria", &["EDITOR".to_string()]).unwrap().token;

        match h.pipeline.authorize(get("/api/artists/5", Some(token))) {
            Verdict::Admit(Some(identity)) => {
                assert_eq!(identity.subject, "maria");
                assert_eq!(identity.roles, vec!["EDITOR".to_string()]);
            }
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn test_protected_route_without_token() {
        let h = default_harness(5);
        assert_eq!(
            h.pipeline.authorize(get("/api/artists", None)),
            Verdict::Reject(RejectReason::Unauthenticated)
        );
    }

    #[test]
    fn test_credential_failures_map_one_to_one() {
        let h = default_harness(50);
        let expired = h.issuer.issue_at("maria", &[], 1_000).unwrap().token;

        assert_eq!(
            h.pipeline.authorize(get("/api/artists", Some("not-a-jwt".into()))),
            Verdict::Reject(RejectReason::Malformed)
        );
        assert_eq!(
            h.pipeline.authorize(get("/api/artists", Some(expired))),
            Verdict::Reject(RejectReason::Expired)
        );

        let foreign = TokenIssuer::new(b"some-other-secret-0123456789abcdef", Algorithm::HS256, 300, None)
            .issue("maria", &[])
            .unwrap()
            .token;
        assert_eq!(
            h.pipeline.authorize(get("/api/artists", Some(foreign))),
            Verdict::Reject(RejectReason::InvalidSignature)
        );
    }

    #[test]
    fn test_rate_limit_precedes_authentication() {
        // limit=5: requests 1-5 fail auth, request 6 is rate limited before auth
        let h = default_harness(5);

        for _ in 0..5 {
            assert_eq!(
                h.pipeline.authorize(get("/api/artists/1", None)),
                Verdict::Reject(RejectReason::Unauthenticated)
            );
        }
        assert!(matches!(
            h.pipeline.authorize(get("/api/artists/1", None)),
            Verdict::Reject(RejectReason::RateLimited { .. })
        ));
    }

    #[test]
    fn test_rate_limited_requests_never_reach_verifier() {
        let h = default_harness(3);
        let token = h.issuer.issue("maria", &[]).unwrap().token;

        let admitted = (0..10)
            .filter(|_| matches!(h.pipeline.authorize(get("/api/artists", Some(token.clone()))), Verdict::Admit(_)))
            .count();

        assert_eq!(admitted, 3);
        assert_eq!(h.verifier.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_public_routes_are_rate_limited_too() {
        let h = default_harness(2);
        assert_eq!(h.pipeline.authorize(get("/api/regionais", None)), Verdict::Admit(None));
        assert_eq!(h.pipeline.authorize(get("/api/regionais", None)), Verdict::Admit(None));
        assert!(matches!(
            h.pipeline.authorize(get("/api/regionais", None)),
            Verdict::Reject(RejectReason::RateLimited { .. })
        ));
    }

    #[test]
    fn test_configured_public_artists_variant() {
        let mut rules = RoutesConfig::default().rules;
        rules.push(RouteRuleConfig {
            pattern: "/api/artists/**".into(),
            methods: vec![],
            access: Access::Public,
        });
        let h = harness(5, rules);
        assert_eq!(h.pipeline.authorize(get("/api/artists/1", None)), Verdict::Admit(None));
    }

    #[test]
    fn test_without_rate_limiter() {
        let verifier: Arc<dyn VerifyCredential> = Arc::new(CredentialVerifier::new(SECRET, Algorithm::HS256, 0));
        let classifier = Arc::new(RouteClassifier::from_config(&RoutesConfig::default().rules).unwrap());
        let pipeline = AuthorizationPipeline::standard(None, classifier, verifier);

        assert_eq!(pipeline.stage_names(), vec!["route", "credential"]);
        for _ in 0..500 {
            assert_eq!(pipeline.authorize(get("/api/regionais", None)), Verdict::Admit(None));
        }
    }

    #[test]
    fn test_reject_codes() {
        assert_eq!(RejectReason::Unauthenticated.code(), "unauthenticated");
        assert_eq!(RejectReason::from(CredentialError::Expired), RejectReason::Expired);
        assert_eq!(
            RejectReason::RateLimited { retry_after: Duration::from_secs(1) }.code(),
            "rate_limited"
        );
    }
}
