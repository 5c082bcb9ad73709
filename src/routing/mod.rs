//! Route classification subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (path, method)
//!     → classifier.rs (ordered rule lookup)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: Public or RequiresAuth
//!
//! Rule compilation (at startup):
//!     RouteRuleConfig[]
//!     → Compile matchers (path pattern AND method set)
//!     → Freeze as immutable RouteClassifier
//! ```
//!
//! # Design Decisions
//! - Rules compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always yields same class
//! - First match wins, in configuration order
//! - Secure by default: no match means authentication required

pub mod classifier;
pub mod matcher;

pub use classifier::{RouteClass, RouteClassifier};
