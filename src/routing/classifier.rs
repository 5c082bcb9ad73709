//! Route classification: public or authentication required.
//!
//! # Responsibilities
//! - Hold the ordered rule table compiled from configuration
//! - Classify (path, method) pairs, first match wins
//! - Default to `RequiresAuth` for anything unmatched
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Pure function of the rule table: classification is idempotent
//! - Non-normalized paths (dot segments, `//`, encoded dots or slashes)
//!   are never public, so a public prefix cannot be used to reach
//!   a protected resource through path tricks

use axum::http::Method;

use crate::config::schema::{Access, RouteRuleConfig};
use crate::config::validation::ValidationError;
use crate::routing::matcher::{AndMatcher, Matcher, MethodMatcher, PathPatternMatcher};

/// Outcome of classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    RequiresAuth,
}

impl From<Access> for RouteClass {
    fn from(access: Access) -> Self {
        match access {
            Access::Public => RouteClass::Public,
            Access::Authenticated => RouteClass::RequiresAuth,
        }
    }
}

/// A compiled rule.
#[derive(Debug)]
struct Rule {
    pattern: String,
    matcher: AndMatcher,
    class: RouteClass,
}

/// Ordered, immutable rule table.
#[derive(Debug, Default)]
pub struct RouteClassifier {
    rules: Vec<Rule>,
}

impl RouteClassifier {
    /// Compile the configured rules, preserving their order.
    pub fn from_config(rules: &[RouteRuleConfig]) -> Result<Self, ValidationError> {
        let mut compiled = Vec::with_capacity(rules.len());

        for (index, rule) in rules.iter().enumerate() {
            let methods = rule
                .methods
                .iter()
                .map(|m| {
                    Method::from_bytes(m.to_ascii_uppercase().as_bytes()).map_err(|_| {
                        ValidationError::InvalidRouteMethod {
                            index,
                            method: m.clone(),
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            compiled.push(Rule {
                pattern: rule.pattern.clone(),
                matcher: AndMatcher::new(vec![
                    Box::new(PathPatternMatcher::new(rule.pattern.as_str())),
                    Box::new(MethodMatcher::new(methods)),
                ]),
                class: rule.access.into(),
            });
        }

        tracing::debug!(rules = compiled.len(), "Route table compiled");
        Ok(Self { rules: compiled })
    }

    /// Classify a request. Unmatched requests require authentication.
    pub fn classify(&self, path: &str, method: &Method) -> RouteClass {
        if !is_normalized(path) {
            return RouteClass::RequiresAuth;
        }

        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(path, method))
            .map(|rule| {
                tracing::trace!(pattern = %rule.pattern, class = ?rule.class, "Route rule matched");
                rule.class
            })
            .unwrap_or(RouteClass::RequiresAuth)
    }
}

fn is_normalized(path: &str) -> bool {
    let Some(rest) = path.strip_prefix('/') else {
        return false;
    };

    let lower = rest.to_ascii_lowercase();
    if lower.contains("%2e") || lower.contains("%2f") || lower.contains("%5c") || rest.contains('\\') {
        return false;
    }

    let segments: Vec<&str> = rest.split('/').collect();
    let last = segments.len() - 1;
    segments.iter().enumerate().all(|(i, segment)| match *segment {
        "." | ".." => false,
        // A single trailing slash is fine, `//` is not.
        "" => i == last,
        _ => true,
    })
}
