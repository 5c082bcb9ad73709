//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → pipeline.rs (build RequestContext, run stages in order)
//!         → rate_limit.rs (per-client fixed window)
//!         → routing::classifier (public or not)
//!         → credentials.rs (bearer token verification)
//!     → Verdict: Admit(identity?) or Reject(reason)
//! ```
//!
//! # Design Decisions
//! - Explicit stage list, no hidden ordering
//! - Fail closed: unmatched routes need a credential
//! - Rate limiting runs first so abusive clients never cost a signature check
//! - No trust in client input

pub mod credentials;
pub mod pipeline;
pub mod rate_limit;

pub use credentials::{CredentialError, CredentialVerifier, Identity, TokenIssuer, VerifyCredential};
pub use pipeline::{AuthorizationPipeline, RejectReason, RequestContext, Verdict};
pub use rate_limit::RateLimiter;
