//!
//! JSON-RPC client for the chain node.
//!
//! This module provides an async HTTP client speaking JSON-RPC 2.0 to the node. Every call is
//! bounded by a timeout, and connection-level send failures are retried with exponential backoff
//! inside a short window. Errors reported by the node itself are never retried.

use super::node::RemoteNode;
use super::types::*;
use backoff::{ExponentialBackoff, future::retry};
use ethers_core::types::{Address, Bytes, U256};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Node JSON-RPC client
#[derive(Clone)]
pub struct JsonRpcClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// The node's JSON-RPC HTTP endpoint.
	url: String,
	/// Upper bound for a single call, retries included.
	call_timeout: Duration,
	/// How long transient send failures are retried.
	retry_window: Duration,
	/// Request id counter shared between clones.
	next_id: Arc<AtomicU64>,
}

impl JsonRpcClient {
	/// Create a new node client.
	///
	/// # Arguments
	/// * `url` - The HTTP endpoint of the node.
	/// * `call_timeout` - Maximum duration of a single call.
	/// * `retry_window` - How long connection failures are retried before giving up.
	pub fn new(
		url: String,
		call_timeout: Duration,
		retry_window: Duration,
	) -> Result<Self, RpcError> {
		let http_client = Client::builder().connect_timeout(call_timeout).build()?;

		Ok(Self {
			http_client,
			url,
			call_timeout,
			retry_window,
			next_id: Arc::new(AtomicU64::new(1)),
		})
	}

	/// Execute a JSON-RPC request and decode its result.
	///
	/// # Arguments
	/// * `method` - The remote procedure name.
	/// * `params` - Positional parameters as a JSON array.
	///
	/// # Returns
	/// The decoded result, or an `RpcError` on transport failure, node error or timeout.
	pub async fn request<T: DeserializeOwned>(
		&self,
		method: &str,
		params: serde_json::Value,
	) -> Result<T, RpcError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let request_body = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": method,
			"params": params,
		});

		debug!("Calling {} (id {})", method, id);

		let call = async {
			let policy = ExponentialBackoff {
				current_interval: self.retry_window / 4,
				initial_interval: self.retry_window / 4,
				max_elapsed_time: Some(self.retry_window),
				..ExponentialBackoff::default()
			};

			let http_client = &self.http_client;
			let url = self.url.as_str();
			let body = &request_body;

			let response = retry(policy, || async move {
				http_client
					.post(url)
					.header("Content-Type", "application/json")
					.json(body)
					.send()
					.await
					.map_err(|e| {
						if e.is_connect() {
							debug!("Transient send failure for {}: {}", method, e);
							backoff::Error::transient(e)
						} else {
							backoff::Error::permanent(e)
						}
					})
			})
			.await?;

			if !response.status().is_success() {
				return Err(RpcError::HttpStatus(response.status().as_u16()));
			}

			let envelope: JsonRpcResponse = response.json().await?;
			Self::decode_envelope(method, envelope)
		};

		tokio::time::timeout(self.call_timeout, call)
			.await
			.map_err(|_| RpcError::Timeout {
				method: method.to_string(),
				timeout: self.call_timeout,
			})?
	}

	fn decode_envelope<T: DeserializeOwned>(
		method: &str,
		envelope: JsonRpcResponse,
	) -> Result<T, RpcError> {
		if let Some(error) = envelope.error {
			return Err(RpcError::NodeError {
				code: error.code,
				message: error.message,
			});
		}

		let result = envelope
			.result
			.ok_or_else(|| RpcError::NoResult(method.to_string()))?;

		Ok(serde_json::from_value(result)?)
	}
}

#[async_trait::async_trait]
impl RemoteNode for JsonRpcClient {
	async fn list_accounts(&self) -> Result<Vec<Address>, RpcError> {
		self.request("personal_listAccounts", json!([])).await
	}

	async fn accounts_info(&self) -> Result<BTreeMap<Address, AccountInfo>, RpcError> {
		self.request("parity_accountsInfo", json!([])).await
	}

	async fn block_number(&self) -> Result<U256, RpcError> {
		self.request("eth_blockNumber", json!([])).await
	}

	async fn client_version(&self) -> Result<String, RpcError> {
		self.request("web3_clientVersion", json!([])).await
	}

	async fn net_chain(&self) -> Result<String, RpcError> {
		self.request("parity_netChain", json!([])).await
	}

	async fn net_peers(&self) -> Result<PeerInfo, RpcError> {
		self.request("parity_netPeers", json!([])).await
	}

	async fn syncing(&self) -> Result<SyncState, RpcError> {
		self.request("eth_syncing", json!([])).await
	}

	async fn balance(&self, address: Address) -> Result<U256, RpcError> {
		self.request("eth_getBalance", json!([address, "latest"]))
			.await
	}

	async fn transaction_count(&self, address: Address) -> Result<U256, RpcError> {
		self.request("eth_getTransactionCount", json!([address, "latest"]))
			.await
	}

	async fn registry_address(&self) -> Result<Address, RpcError> {
		self.request("parity_registryAddress", json!([])).await
	}

	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcError> {
		self.request("eth_call", json!([{ "to": to, "data": data }, "latest"]))
			.await
	}
}
