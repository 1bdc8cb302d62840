// crates/substrate-adapters/src/lib.rs
// ============================================================================
// Module: Substrate Adapters
// Description: Backend-class guard, adapter cache, and concrete adapter implementations.
// Purpose: Turn a resolved ResourceRoute into a typed, policy-checked adapter.
// Dependencies: substrate-core, aws-sdk-s3, aws-config, tokio
// ============================================================================

//! ## Overview
//! This crate is the Backend Resolver / Adapter Factory subsystem: it owns
//! the backend-class guard, the per-route adapter cache, and two concrete
//! backend sets — an S3-compatible durable set and a filesystem/in-memory
//! `lab`-only set. Cloud SDKs beyond S3 are out of scope (§1); operators
//! extend `factory::AdapterFactory` with additional backend types the same
//! way they would add a new `EvidenceProvider` in the teacher crate.

pub mod backend_class;
pub mod cache;
pub mod factory;
pub mod lab;
pub mod s3;

pub use backend_class::FORBIDDEN_BACKEND_TYPES;
pub use backend_class::ensure_backend_allowed;
pub use backend_class::is_forbidden_backend_type;
pub use cache::AdapterCache;
pub use factory::AdapterFactory;
pub use factory::ObjectStoreHandle;
pub use lab::filesystem::FilesystemBlackboard;
pub use lab::filesystem::FilesystemObjectStore;
pub use lab::in_memory::InMemoryBlackboard;
pub use lab::in_memory::InMemoryEventStream;
pub use lab::in_memory::InMemoryMemoryStore;
pub use lab::in_memory::InMemoryObjectStore;
pub use s3::S3ObjectStore;
