//! Resolution of named records through the well-known system registry.

use crate::contract::{ContractBinding, ContractKind};
use crate::rpc::RemoteNode;
use crate::sync::types::SyncError;

use ethers_core::types::Address;
use ethers_core::utils::keccak256;
use std::sync::Arc;
use tracing::{debug, info};

/// Record type tag for address records.
pub const ADDRESS_RECORD: &str = "A";

/// Registry name of the token registry.
pub const TOKEN_REGISTRY_NAME: &str = "tokenreg";

/// Resolves names to addresses through the system registry.
pub struct RegistryResolver {
	node: Arc<dyn RemoteNode>,
	registry: ContractBinding,
}

impl RegistryResolver {
	/// Look up the system registry address and bind to it.
	///
	/// Fails with `NotFound` when the node reports no registry.
	pub async fn connect(node: Arc<dyn RemoteNode>) -> Result<Self, SyncError> {
		let address = node.registry_address().await?;
		if address.is_zero() {
			return Err(SyncError::NotFound("system registry".to_string()));
		}

		info!("System registry at {:?}", address);
		Ok(Self {
			node,
			registry: ContractBinding::new(address, ContractKind::Registry),
		})
	}

	pub fn registry(&self) -> ContractBinding {
		self.registry
	}

	/// Resolve `name` under `record_type`; an empty record is `NotFound`.
	pub async fn resolve(&self, name: &str, record_type: &str) -> Result<Address, SyncError> {
		let address = self
			.registry
			.get_address(self.node.as_ref(), keccak256(name), record_type)
			.await?;

		if address.is_zero() {
			return Err(SyncError::NotFound(format!(
				"registry record {} ({})",
				name, record_type
			)));
		}

		debug!("Resolved {} ({}) to {:?}", name, record_type, address);
		Ok(address)
	}

	/// Resolve the token registry and bind to it.
	pub async fn token_registry(&self) -> Result<ContractBinding, SyncError> {
		let address = self.resolve(TOKEN_REGISTRY_NAME, ADDRESS_RECORD).await?;
		Ok(ContractBinding::new(address, ContractKind::TokenRegistry))
	}
}
