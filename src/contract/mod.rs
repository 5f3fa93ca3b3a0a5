//! Typed access to the on-chain contracts the engine reads.
//!
//! A `ContractBinding` pairs a deployed address with one of the known interfaces and
//! dispatches calls through the node's generic `eth_call`.

/// Method tables and ABI encoding for each contract kind
mod abi;
/// Address-bound contract handles
mod binding;

pub use abi::{ContractError, ContractKind, MethodAbi};
pub use binding::{ContractBinding, TokenRecord};
