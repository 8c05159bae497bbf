//! Connection lifecycle registry.
//!
//! # Responsibilities
//! - Map live connections to a generated key, and keys to their records
//! - Append state transitions under each record's own lock
//! - Drop both mappings when a connection closes or is hijacked
//! - Expose live records for diagnostics
//!
//! # Design Decisions
//! - One reader/writer lock guards both maps: writers on accept and removal,
//!   readers on lookup
//! - Missing or duplicate keys are returned as `TrackerError`; the caller
//!   decides what a violated invariant costs, the maps are never left half
//!   updated

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::net::connection::{
    ConnState, ConnectionContext, ConnectionId, ConnectionRecord, RecordSnapshot,
};

/// Invariant violations in the connection registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("connection {0} is already tracked")]
    DuplicateConnection(ConnectionId),
    #[error("connection key {0} already exists")]
    DuplicateKey(Uuid),
    #[error("connection {0} is not tracked")]
    UnknownConnection(ConnectionId),
    #[error("connection key {0} does not exist")]
    UnknownKey(Uuid),
    #[error("connection key {0} refers to a finished connection")]
    Stale(Uuid),
}

#[derive(Debug, Default)]
struct Maps {
    conn_to_key: HashMap<ConnectionId, Uuid>,
    key_to_record: HashMap<Uuid, Arc<ConnectionRecord>>,
}

/// Registry of live connections and their transition logs.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    maps: RwLock<Maps>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly accepted connection under a fresh key.
    pub fn accept(
        &self,
        connection: ConnectionId,
        peer: SocketAddr,
    ) -> Result<ConnectionContext, TrackerError> {
        self.accept_with_key(connection, peer, Uuid::new_v4())
    }

    /// Register a connection under a caller-chosen key.
    pub fn accept_with_key(
        &self,
        connection: ConnectionId,
        peer: SocketAddr,
        key: Uuid,
    ) -> Result<ConnectionContext, TrackerError> {
        let mut maps = self.maps.write().expect("connection registry lock poisoned");

        if maps.key_to_record.contains_key(&key) {
            return Err(TrackerError::DuplicateKey(key));
        }
        if maps.conn_to_key.contains_key(&connection) {
            return Err(TrackerError::DuplicateConnection(connection));
        }

        maps.key_to_record
            .insert(key, Arc::new(ConnectionRecord::new(key, peer)));
        maps.conn_to_key.insert(connection, key);

        Ok(ConnectionContext {
            key,
            connection,
            peer,
        })
    }

    /// Record a state transition happening now.
    pub fn transition(&self, connection: ConnectionId, state: ConnState) -> Result<(), TrackerError> {
        self.transition_at(connection, state, Utc::now())
    }

    /// Record a state transition at `at`. Terminal states remove the
    /// connection from the registry.
    pub fn transition_at(
        &self,
        connection: ConnectionId,
        state: ConnState,
        at: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        let (key, record) = self.lookup(connection)?;

        if record.record(state, at)? {
            self.remove(key, connection)?;
        }
        Ok(())
    }

    /// Resolve a connection to its key and record.
    pub fn lookup(&self, connection: ConnectionId) -> Result<(Uuid, Arc<ConnectionRecord>), TrackerError> {
        let maps = self.maps.read().expect("connection registry lock poisoned");

        let key = *maps
            .conn_to_key
            .get(&connection)
            .ok_or(TrackerError::UnknownConnection(connection))?;
        let record = maps
            .key_to_record
            .get(&key)
            .cloned()
            .ok_or(TrackerError::UnknownKey(key))?;

        Ok((key, record))
    }

    /// Look up a record by key.
    pub fn record(&self, key: Uuid) -> Option<Arc<ConnectionRecord>> {
        let maps = self.maps.read().expect("connection registry lock poisoned");
        maps.key_to_record.get(&key).cloned()
    }

    fn remove(&self, key: Uuid, connection: ConnectionId) -> Result<(), TrackerError> {
        let mut maps = self.maps.write().expect("connection registry lock poisoned");

        if !maps.key_to_record.contains_key(&key) {
            return Err(TrackerError::UnknownKey(key));
        }
        if maps.conn_to_key.get(&connection) != Some(&key) {
            return Err(TrackerError::UnknownConnection(connection));
        }

        maps.key_to_record.remove(&key);
        maps.conn_to_key.remove(&connection);
        Ok(())
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.maps
            .read()
            .expect("connection registry lock poisoned")
            .key_to_record
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshots of every live connection, oldest first.
    pub fn snapshots(&self) -> Vec<RecordSnapshot> {
        let records: Vec<Arc<ConnectionRecord>> = {
            let maps = self.maps.read().expect("connection registry lock poisoned");
            maps.key_to_record.values().cloned().collect()
        };

        let mut snapshots: Vec<RecordSnapshot> = records.iter().map(|r| r.snapshot()).collect();
        snapshots.sort_by_key(|s| s.begin);
        snapshots
    }

    /// Text rendering of every live connection.
    pub fn render(&self) -> String {
        self.snapshots().iter().map(RecordSnapshot::render).collect()
    }
}
