//! Connection state machine and lifecycle records.
//!
//! # Responsibilities
//! - Generate unique connection IDs for the transport
//! - Record every state transition of a connection with its timestamp
//! - Track in-flight requests to derive Active / Idle transitions
//! - Render a connection's history for diagnostics
//!
//! Connection States:
//! ```text
//! New → Active ⇄ Idle → Closed
//!          └──────────→ Hijacked
//! ```

use std::fmt::{self, Write as _};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::net::tracker::{ConnectionRegistry, TrackerError};
use crate::observability::metrics;

/// Counter for transport connection IDs.
/// Relaxed ordering is sufficient since we only need uniqueness.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Transport-level identity of an accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Connection state for lifecycle tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnState {
    /// Accepted, no request read yet.
    New,
    /// Serving at least one request.
    Active,
    /// Kept alive between requests.
    Idle,
    /// Closed.
    Closed,
    /// Taken over by a protocol upgrade.
    Hijacked,
}

impl ConnState {
    /// Closed and hijacked connections leave the registry.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnState::Closed | ConnState::Hijacked)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnState::New => "new",
            ConnState::Active => "active",
            ConnState::Idle => "idle",
            ConnState::Closed => "closed",
            ConnState::Hijacked => "hijacked",
        }
    }
}

impl fmt::Display for ConnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single logged transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub state: ConnState,
    pub at: DateTime<Utc>,
}

/// Correlation handle inserted into every request served on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionContext {
    /// Generated identifier keying the connection's record.
    pub key: Uuid,
    pub connection: ConnectionId,
    pub peer: SocketAddr,
}

#[derive(Debug, Default)]
struct RecordState {
    begin: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    log: Vec<Transition>,
}

/// History of one connection. Guarded by its own lock so distinct
/// connections never contend with each other.
#[derive(Debug)]
pub struct ConnectionRecord {
    key: Uuid,
    peer: SocketAddr,
    state: Mutex<RecordState>,
}

/// Point-in-time copy of a record.
#[derive(Debug, Clone, Serialize)]
pub struct RecordSnapshot {
    pub key: Uuid,
    pub peer: SocketAddr,
    pub begin: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub log: Vec<Transition>,
}

impl ConnectionRecord {
    pub fn new(key: Uuid, peer: SocketAddr) -> Self {
        Self {
            key,
            peer,
            state: Mutex::new(RecordState::default()),
        }
    }

    pub fn key(&self) -> Uuid {
        self.key
    }

    /// Append a transition. Returns whether the connection is now finished.
    ///
    /// Fails once the record has ended; a finished record never grows.
    pub fn record(&self, state: ConnState, at: DateTime<Utc>) -> Result<bool, TrackerError> {
        let mut inner = self.state.lock().expect("connection record mutex poisoned");
        if inner.end.is_some() {
            return Err(TrackerError::Stale(self.key));
        }

        if inner.begin.is_none() {
            inner.begin = Some(at);
        }
        inner.log.push(Transition { state, at });

        if state.is_terminal() {
            inner.end = Some(at);
        }
        Ok(state.is_terminal())
    }

    pub fn snapshot(&self) -> RecordSnapshot {
        let inner = self.state.lock().expect("connection record mutex poisoned");
        RecordSnapshot {
            key: self.key,
            peer: self.peer,
            begin: inner.begin,
            end: inner.end,
            log: inner.log.clone(),
        }
    }

    /// Human readable history; empty if the connection never began.
    pub fn render(&self) -> String {
        self.snapshot().render()
    }
}

impl RecordSnapshot {
    pub fn render(&self) -> String {
        let Some(begin) = self.begin else {
            return String::new();
        };

        let mut out = String::new();
        let _ = writeln!(out, "BEGIN CONN DATA: {}", timestamp(begin));
        for t in &self.log {
            let offset = (t.at - begin).num_milliseconds() as f64 / 1000.0;
            let _ = writeln!(out, " {:+06.3}s: CONN STATE = {}", offset, t.state);
        }
        match self.end {
            Some(end) => {
                let _ = writeln!(out, "END CONN DATA: {}", timestamp(end));
            }
            None => out.push_str("...\n"),
        }
        out
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// In-flight request accounting for one connection.
///
/// Drives the Active / Idle transitions and the idle timeout. Counter
/// updates and the transitions they cause happen under one lock, so the
/// last logged state always agrees with the in-flight count.
#[derive(Debug)]
pub struct ConnectionActivity {
    connection: ConnectionId,
    registry: Arc<ConnectionRegistry>,
    state: Mutex<ActivityState>,
}

#[derive(Debug)]
struct ActivityState {
    in_flight: usize,
    idle_since: tokio::time::Instant,
    finished: bool,
}

impl ConnectionActivity {
    pub fn new(connection: ConnectionId, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            connection,
            registry,
            state: Mutex::new(ActivityState {
                in_flight: 0,
                idle_since: tokio::time::Instant::now(),
                finished: false,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ActivityState> {
        self.state.lock().expect("connection activity mutex poisoned")
    }

    /// Mark a request as started. The returned guard ends it on drop.
    pub fn begin_request(self: &Arc<Self>) -> RequestGuard {
        let mut state = self.lock();
        state.in_flight += 1;
        if state.in_flight == 1 && !state.finished {
            self.record(ConnState::Active);
        }
        drop(state);

        RequestGuard {
            activity: Arc::clone(self),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// When the idle timeout should next be checked.
    pub fn idle_deadline(&self, idle_timeout: Duration) -> tokio::time::Instant {
        let state = self.lock();
        if state.in_flight > 0 {
            return tokio::time::Instant::now() + idle_timeout;
        }
        state.idle_since + idle_timeout
    }

    /// True when no request is in flight and none has been for `idle_timeout`.
    pub fn idle_expired(&self, idle_timeout: Duration) -> bool {
        let state = self.lock();
        state.in_flight == 0 && state.idle_since.elapsed() >= idle_timeout
    }

    fn end_request(&self) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        if state.in_flight == 0 {
            state.idle_since = tokio::time::Instant::now();
            if !state.finished {
                self.record(ConnState::Idle);
            }
        }
    }

    /// Record `state` for this connection. Once a terminal state is logged
    /// every later transition is dropped, so requests that outlive their
    /// connection never touch the registry.
    pub fn transition(&self, next: ConnState) {
        let mut state = self.lock();
        if state.finished {
            return;
        }
        if next.is_terminal() {
            state.finished = true;
        }
        self.record(next);
    }

    /// Log `Closed` unless the connection already finished.
    pub fn close(&self) {
        self.transition(ConnState::Closed);
    }

    /// Tracking failures are logged and never reach the transport.
    fn record(&self, state: ConnState) {
        match self.registry.transition(self.connection, state) {
            Ok(()) => metrics::record_transition(state),
            Err(e) => {
                tracing::error!(connection = %self.connection, state = %state, error = %e, "Connection tracking failed");
            }
        }
    }
}

/// Ends a request on drop.
#[derive(Debug)]
pub struct RequestGuard {
    activity: Arc<ConnectionActivity>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.activity.end_request();
    }
}
