//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, client key, bearer extraction)
//!     → middleware/ (authorization pipeline, metrics)
//!     → api handlers (admitted requests only)
//!     → response.rs (rejections and errors as JSON)
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use middleware::AuthContext;
pub use request::X_REQUEST_ID;
pub use server::{HttpServer, StartupError};
