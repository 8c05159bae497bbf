//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → tracker.rs (register, generate connection key)
//!     → connection.rs (state log, in-flight accounting)
//!     → Hand off to HTTP layer with a ConnectionContext
//!
//! Connection States:
//!     New → Active ⇄ Idle → Closed | Hijacked
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - The registry is an owned value shared by Arc, not a global
//! - Each record has its own lock; the registry lock only guards the maps

pub mod connection;
pub mod listener;
pub mod tracker;

pub use connection::{ConnState, ConnectionActivity, ConnectionContext, ConnectionId};
pub use listener::Listener;
pub use tracker::{ConnectionRegistry, TrackerError};
