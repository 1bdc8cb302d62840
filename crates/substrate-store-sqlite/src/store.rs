// crates/substrate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Substrate Store
// Description: Shared connection pool backing the routing, stream, blackboard,
//              and audit trait implementations.
// Purpose: One durable engine satisfying four of the control plane's
//          interfaces, so a `lab` deployment can run every subsystem against
//          a single file.
// Dependencies: rusqlite
// ============================================================================

//! ## Overview
//! `SqliteSubstrateStore` owns one writer connection (guarded by a mutex,
//! since `SQLite` permits only one writer at a time even under WAL) and a
//! small pool of read-only connections selected round-robin, matching the
//! run-state store's read/write split. Each interface implementation lives in
//! its own module (`routing`, `event_stream`, `blackboard`, `audit`) and reads
//! through `read_connection()` / writes through `write_connection()`.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use rusqlite::Connection;

use crate::config::SqliteStoreConfig;
use crate::errors::SqliteStoreError;
use crate::schema::ensure_parent_dir;
use crate::schema::initialize_schema;
use crate::schema::open_connection;
use crate::schema::validate_store_path;

/// Durable store backing the routing registry, event streams, blackboard, and
/// audit chain over a single `SQLite` database file.
#[derive(Clone)]
pub struct SqliteSubstrateStore {
    write_connection: Arc<Mutex<Connection>>,
    read_connections: Arc<Vec<Mutex<Connection>>>,
    read_cursor: Arc<AtomicUsize>,
}

impl SqliteSubstrateStore {
    /// Opens (creating if absent) the `SQLite`-backed substrate store at `config.path`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is unsafe, the directory
    /// cannot be created, or the connection/schema cannot be initialized.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut write_connection = open_connection(config)?;
        initialize_schema(&mut write_connection)?;
        let mut read_connections = Vec::with_capacity(config.read_pool_size);
        for _ in 0..config.read_pool_size {
            let mut conn = open_connection(config)?;
            initialize_schema(&mut conn)?;
            read_connections.push(Mutex::new(conn));
        }
        Ok(Self {
            write_connection: Arc::new(Mutex::new(write_connection)),
            read_connections: Arc::new(read_connections),
            read_cursor: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub(crate) fn write_connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.write_connection.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub(crate) fn read_connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        let len = self.read_connections.len();
        let index = self.read_cursor.fetch_add(1, Ordering::Relaxed) % len;
        self.read_connections[index].lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
