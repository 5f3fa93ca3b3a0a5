use super::abi::{ContractError, ContractKind};
use crate::rpc::RemoteNode;
use ethers_core::abi::Token;
use ethers_core::types::{Address, Bytes, U256};
use tracing::debug;

/// One entry of the token registry's enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
	pub address: Address,
	pub tag: String,
	pub format: U256,
	pub name: String,
}

/// A deployed contract: its address plus the interface used to talk to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContractBinding {
	address: Address,
	kind: ContractKind,
}

impl ContractBinding {
	pub fn new(address: Address, kind: ContractKind) -> Self {
		Self { address, kind }
	}

	pub fn address(&self) -> Address {
		self.address
	}

	pub fn kind(&self) -> ContractKind {
		self.kind
	}

	/// Invoke a read-only method and decode its outputs.
	pub async fn call(
		&self,
		node: &dyn RemoteNode,
		method: &str,
		args: &[Token],
	) -> Result<Vec<Token>, ContractError> {
		let abi = self
			.kind
			.method(method)
			.ok_or_else(|| ContractError::UnknownMethod {
				kind: self.kind,
				method: method.to_string(),
			})?;

		let data = abi.encode_call(args)?;
		debug!("Calling {}.{} at {:?}", self.kind, method, self.address);
		let output = node.call(self.address, Bytes::from(data)).await?;
		abi.decode_output(output.as_ref())
	}

	/// Registry lookup of `name_hash` under the record type `type_tag`.
	pub async fn get_address(
		&self,
		node: &dyn RemoteNode,
		name_hash: [u8; 32],
		type_tag: &str,
	) -> Result<Address, ContractError> {
		let outputs = self
			.call(
				node,
				"getAddress",
				&[
					Token::FixedBytes(name_hash.to_vec()),
					Token::String(type_tag.to_string()),
				],
			)
			.await?;
		address_at(&outputs, 0, "getAddress")
	}

	pub async fn token_count(&self, node: &dyn RemoteNode) -> Result<U256, ContractError> {
		let outputs = self.call(node, "tokenCount", &[]).await?;
		uint_at(&outputs, 0, "tokenCount")
	}

	pub async fn token(
		&self,
		node: &dyn RemoteNode,
		index: u64,
	) -> Result<TokenRecord, ContractError> {
		let outputs = self
			.call(node, "token", &[Token::Uint(U256::from(index))])
			.await?;

		Ok(TokenRecord {
			address: address_at(&outputs, 0, "token")?,
			tag: string_at(&outputs, 1, "token")?,
			format: uint_at(&outputs, 2, "token")?,
			name: string_at(&outputs, 3, "token")?,
		})
	}

	pub async fn balance_of(
		&self,
		node: &dyn RemoteNode,
		owner: Address,
	) -> Result<U256, ContractError> {
		let outputs = self
			.call(node, "balanceOf", &[Token::Address(owner)])
			.await?;
		uint_at(&outputs, 0, "balanceOf")
	}

	pub async fn total_supply(&self, node: &dyn RemoteNode) -> Result<U256, ContractError> {
		let outputs = self.call(node, "totalSupply", &[]).await?;
		uint_at(&outputs, 0, "totalSupply")
	}
}

fn output_at(outputs: &[Token], index: usize, method: &str) -> Result<Token, ContractError> {
	outputs
		.get(index)
		.cloned()
		.ok_or_else(|| ContractError::Decode {
			method: method.to_string(),
			reason: format!("missing output {}", index),
		})
}

fn mismatch(method: &str, index: usize, expected: &str) -> ContractError {
	ContractError::Decode {
		method: method.to_string(),
		reason: format!("output {} is not {}", index, expected),
	}
}

fn address_at(outputs: &[Token], index: usize, method: &str) -> Result<Address, ContractError> {
	output_at(outputs, index, method)?
		.into_address()
		.ok_or_else(|| mismatch(method, index, "an address"))
}

fn uint_at(outputs: &[Token], index: usize, method: &str) -> Result<U256, ContractError> {
	output_at(outputs, index, method)?
		.into_uint()
		.ok_or_else(|| mismatch(method, index, "an integer"))
}

fn string_at(outputs: &[Token], index: usize, method: &str) -> Result<String, ContractError> {
	output_at(outputs, index, method)?
		.into_string()
		.ok_or_else(|| mismatch(method, index, "a string"))
}
