//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM
//! - Report which one arrived so the caller can start the drain
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A handler that cannot be installed is reported, not ignored

use std::io;

/// Which signal ended the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
}

/// Wait for the first shutdown signal.
#[cfg(unix)]
pub async fn wait_for_signal() -> io::Result<Signal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|_| Signal::Interrupt),
        _ = terminate.recv() => Ok(Signal::Terminate),
    }
}

/// Wait for the first shutdown signal.
#[cfg(not(unix))]
pub async fn wait_for_signal() -> io::Result<Signal> {
    tokio::signal::ctrl_c().await.map(|_| Signal::Interrupt)
}
