//! Types for node JSON-RPC responses

use ethers_core::types::U256;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Arbitrary metadata a node keeps next to an address.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Identity information the node reports for a single address.
///
/// Addresses carrying a key-store `uuid` are locally managed accounts; the rest are contacts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
	/// Display name chosen by the user.
	#[serde(default)]
	pub name: String,
	/// Free-form metadata, delivered by some nodes as a JSON-encoded string.
	#[serde(default, deserialize_with = "deserialize_metadata")]
	pub meta: Metadata,
	/// Key-store identifier, present only for accounts the node holds keys for.
	#[serde(default)]
	pub uuid: Option<String>,
}

fn deserialize_metadata<'de, D>(deserializer: D) -> Result<Metadata, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Option::<serde_json::Value>::deserialize(deserializer)?;
	Ok(match value {
		Some(serde_json::Value::Object(map)) => map,
		Some(serde_json::Value::String(encoded)) => {
			match serde_json::from_str::<serde_json::Value>(&encoded) {
				Ok(serde_json::Value::Object(map)) => map,
				_ => Metadata::new(),
			}
		}
		_ => Metadata::new(),
	})
}

/// Peer connectivity as reported by the node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
	/// Peers currently exchanging data with the node.
	#[serde(default)]
	pub active: u64,
	/// Peers with an open connection.
	#[serde(default)]
	pub connected: u64,
	/// Configured peer limit.
	#[serde(default)]
	pub max: u64,
}

/// Chain synchronization state of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "RawSyncState")]
pub enum SyncState {
	/// The node is at the chain head.
	Synced,
	/// The node is importing blocks.
	Syncing {
		starting_block: U256,
		current_block: U256,
		highest_block: U256,
	},
}

impl SyncState {
	pub fn is_syncing(&self) -> bool {
		matches!(self, SyncState::Syncing { .. })
	}
}

/// `eth_syncing` answers either `false` or a progress object.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSyncState {
	Flag(bool),
	Progress {
		#[serde(rename = "startingBlock")]
		starting_block: U256,
		#[serde(rename = "currentBlock")]
		current_block: U256,
		#[serde(rename = "highestBlock")]
		highest_block: U256,
	},
}

impl From<RawSyncState> for SyncState {
	fn from(raw: RawSyncState) -> Self {
		match raw {
			RawSyncState::Flag(false) => SyncState::Synced,
			RawSyncState::Flag(true) => SyncState::Syncing {
				starting_block: U256::zero(),
				current_block: U256::zero(),
				highest_block: U256::zero(),
			},
			RawSyncState::Progress {
				starting_block,
				current_block,
				highest_block,
			} => SyncState::Syncing {
				starting_block,
				current_block,
				highest_block,
			},
		}
	}
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct JsonRpcResponse {
	#[serde(default)]
	pub result: Option<serde_json::Value>,
	#[serde(default)]
	pub error: Option<JsonRpcErrorObject>,
}

/// Error object returned by the node in place of a result.
#[derive(Debug, Deserialize)]
pub(crate) struct JsonRpcErrorObject {
	pub code: i64,
	pub message: String,
}

/// Error types for node calls
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
	#[error("HTTP error: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("HTTP status: {0}")]
	HttpStatus(u16),

	#[error("JSON parse error: {0}")]
	JsonError(#[from] serde_json::Error),

	#[error("Node error {code}: {message}")]
	NodeError { code: i64, message: String },

	#[error("Call to {method} timed out after {timeout:?}")]
	Timeout { method: String, timeout: Duration },

	#[error("No result returned for {0}")]
	NoResult(String),
}
