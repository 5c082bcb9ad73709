//! Route matching logic.
//!
//! # Responsibilities
//! - Match a request path against an exact path or a `/prefix/**` subtree
//! - Match the request method against an allowed set
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Path matching is case-sensitive, method matching is exact
//! - Subtree patterns stop at segment boundaries (`/a/**` never matches `/ab`)
//! - Empty method set = any method (wildcard)
//! - No regex to guarantee O(n) matching

use axum::http::Method;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the path and method match this condition.
    fn matches(&self, path: &str, method: &Method) -> bool;
}

/// Matches a path pattern: either an exact path or a `/**` subtree.
#[derive(Debug, Clone)]
pub struct PathPatternMatcher {
    base: String,
    subtree: bool,
}

impl PathPatternMatcher {
    /// Create a matcher from a pattern such as `/api/auth/**` or `/api/health`.
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        match pattern.strip_suffix("/**") {
            Some(base) => Self {
                base: base.to_string(),
                subtree: true,
            },
            None => Self {
                base: pattern,
                subtree: false,
            },
        }
    }
}

impl Matcher for PathPatternMatcher {
    fn matches(&self, path: &str, _method: &Method) -> bool {
        if !self.subtree {
            return path == self.base;
        }
        // `/**` leaves an empty base and matches everything.
        match path.strip_prefix(self.base.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// Matches the request method against a fixed set.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    methods: Vec<Method>,
}

impl MethodMatcher {
    pub fn new(methods: Vec<Method>) -> Self {
        Self { methods }
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, _path: &str, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, path: &str, method: &Method) -> bool {
        // All matchers must pass (AND)
        self.matchers.iter().all(|m| m.matches(path, method))
    }
}
