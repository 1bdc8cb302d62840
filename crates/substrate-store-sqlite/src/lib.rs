// crates/substrate-store-sqlite/src/lib.rs
// ============================================================================
// Module: Substrate SQLite Store
// Description: Durable routing registry, event stream, blackboard, memory,
//              and audit sink backed by a single SQLite WAL database.
// Purpose: The one durable engine every `lab` deployment can run without a
//          cloud account, and a reference implementation of all storage
//          interfaces for sellable deployments that choose SQLite.
// Dependencies: rusqlite, substrate-core
// ============================================================================

//! ## Overview
//! `SqliteSubstrateStore` satisfies [`substrate_core::RoutingRegistryStore`],
//! [`substrate_core::EventStream`], [`substrate_core::Blackboard`],
//! [`substrate_core::MemoryStore`], and [`substrate_core::AuditSink`] from
//! one open database handle. Each trait's implementation lives in its own
//! module; `store.rs` owns the shared connection pool all of them read and
//! write through.

mod audit;
mod blackboard;
mod event_stream;
mod memory;
mod routing;

pub mod config;
pub mod errors;
pub mod schema;
mod store;

pub use config::SqliteStoreConfig;
pub use config::SqliteStoreMode;
pub use config::SqliteSyncMode;
pub use errors::SqliteStoreError;
pub use store::SqliteSubstrateStore;
