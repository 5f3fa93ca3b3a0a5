//!
//! Utility module for the sync engine.
//!
//! Re-exports formatting helpers used when reporting balances.
/// Exact formatting of token amounts
pub mod index;

pub use index::format_token_amount;
