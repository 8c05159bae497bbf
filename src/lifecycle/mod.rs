//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Compile site → Start listeners
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then the site, then listeners
//! - Ordered shutdown: stop accept, drain, close
//! - Drain is bounded by the write timeout

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
