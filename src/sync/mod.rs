//! Chain State Synchronization Module
//!
//! This module provides the engine keeping an in-memory view of accounts, contacts, tokens,
//! balances and chain status in step with a remote node. It is composed of several submodules,
//! each responsible for one part of the process:
//!
//! - `engine`: The entry point. Runs the startup pipeline and drives the recurring loops.
//! - `store`: The canonical state, published to consumers as immutable snapshots.
//! - `events`: Event types and handlers used to notify consumers of state changes.
//! - `registry`: Resolution of named records through the system registry.
//! - `catalog`: Enumeration of the tokens listed by the token registry.
//! - `identity`: Periodic reconciliation of accounts and contacts.
//! - `balances`: Balance refresh for every account and token.
//! - `status`: Chain status polling and new-block detection.
//! - `height_tracker`: Monotonic block height bookkeeping for refresh triggering.

/// Balance refresh across accounts and tokens
pub mod balances;
/// Token catalog built from the token registry
pub mod catalog;
/// Main coordinator for the sync loops
pub mod engine;
/// Event system for notifying consumers
pub mod events;
/// Tracks the last block balances were refreshed for
pub mod height_tracker;
/// Account and contact discovery
pub mod identity;
/// System registry name resolution
pub mod registry;
/// Chain status polling
pub mod status;
/// Snapshot-based state store
pub mod store;
/// Domain types and errors
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::*;
pub use types::*;
