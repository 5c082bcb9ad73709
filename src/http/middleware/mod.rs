//! Request middleware.
//!
//! - `authorize.rs`: runs the authorization pipeline before any handler
//! - `metrics.rs`: request counters and latency

pub mod authorize;
pub mod metrics;

pub use authorize::{authorize, AuthContext, AuthState};
pub use metrics::track_metrics;
