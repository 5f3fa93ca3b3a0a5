use super::types::{AccountInfo, PeerInfo, RpcError, SyncState};
use ethers_core::types::{Address, Bytes, U256};
use std::collections::BTreeMap;

/// Remote procedures the sync engine needs from a node.
///
/// Every method is a suspension point and may fail with an `RpcError`, which covers both
/// connectivity problems and node-side failures such as reverted calls.
#[async_trait::async_trait]
pub trait RemoteNode: Send + Sync {
	/// Addresses managed by the node, in the node's order.
	async fn list_accounts(&self) -> Result<Vec<Address>, RpcError>;

	/// Name, metadata and key-store identifier for every known address.
	async fn accounts_info(&self) -> Result<BTreeMap<Address, AccountInfo>, RpcError>;

	async fn block_number(&self) -> Result<U256, RpcError>;

	async fn client_version(&self) -> Result<String, RpcError>;

	async fn net_chain(&self) -> Result<String, RpcError>;

	async fn net_peers(&self) -> Result<PeerInfo, RpcError>;

	async fn syncing(&self) -> Result<SyncState, RpcError>;

	/// Native currency balance of `address` at the latest block.
	async fn balance(&self, address: Address) -> Result<U256, RpcError>;

	/// Outbound transaction count (nonce) of `address` at the latest block.
	async fn transaction_count(&self, address: Address) -> Result<U256, RpcError>;

	/// Address of the well-known system registry.
	async fn registry_address(&self) -> Result<Address, RpcError>;

	/// Read-only contract call returning the raw ABI-encoded output.
	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcError>;
}
