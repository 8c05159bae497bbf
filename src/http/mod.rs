//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (+ ConnectionContext)
//!     → server.rs (hyper auto HTTP/1.1 + HTTP/2, middleware)
//!     → request.rs (decoded path, host, cookies, request ID)
//!     → handler.rs (push step, resolve, conditional GET)
//!     → negotiate.rs (smallest acceptable variant)
//!     → response.rs (headers, status, body)
//!     → Send to client
//! ```

pub mod handler;
pub mod negotiate;
pub mod push;
pub mod request;
pub mod response;
pub mod server;

pub use handler::AppState;
pub use push::{PushCapability, PushError, Pusher};
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
