//! JSON-RPC integration with the remote chain node
//!
//! This module provides the `RemoteNode` capability used by every synchronizer, the HTTP
//! client implementing it, and the wire types returned by the node.

/// HTTP JSON-RPC client for the node
mod client;
/// The capability surface consumed by the sync engine
mod node;
/// Type definitions for node responses and errors
mod types;

pub use client::JsonRpcClient;
pub use node::RemoteNode;
pub use types::*;
