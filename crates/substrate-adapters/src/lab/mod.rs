// crates/substrate-adapters/src/lab/mod.rs
// ============================================================================
// Module: Lab Adapters
// Description: Non-durable adapter implementations permitted only in lab mode.
// Purpose: Aggregate the filesystem and in-memory backend sets.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Everything re-exported here is a forbidden backend class outside `lab`
//! mode; see [`crate::backend_class`].

pub mod filesystem;
pub mod in_memory;
