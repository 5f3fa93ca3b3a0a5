//! Interface descriptions for the contracts the engine talks to.

use crate::rpc::RpcError;
use ethers_core::abi::{self, ParamType, Token};
use std::fmt;

/// The closed set of contract interfaces the engine reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKind {
	/// The well-known name registry.
	Registry,
	/// The registry enumerating fungible tokens.
	TokenRegistry,
	/// A standard fungible token.
	Eip20,
}

impl fmt::Display for ContractKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			ContractKind::Registry => "registry",
			ContractKind::TokenRegistry => "tokenreg",
			ContractKind::Eip20 => "eip20",
		};
		f.write_str(name)
	}
}

/// Inputs and outputs of one contract method.
#[derive(Debug, Clone)]
pub struct MethodAbi {
	pub name: &'static str,
	pub inputs: Vec<ParamType>,
	pub outputs: Vec<ParamType>,
}

impl ContractKind {
	/// Look up a method of this interface by name.
	pub fn method(&self, name: &str) -> Option<MethodAbi> {
		let (name, inputs, outputs) = match (self, name) {
			(ContractKind::Registry, "getAddress") => (
				"getAddress",
				vec![ParamType::FixedBytes(32), ParamType::String],
				vec![ParamType::Address],
			),
			(ContractKind::TokenRegistry, "tokenCount") => {
				("tokenCount", vec![], vec![ParamType::Uint(256)])
			}
			(ContractKind::TokenRegistry, "token") => (
				"token",
				vec![ParamType::Uint(256)],
				vec![
					ParamType::Address,
					ParamType::String,
					ParamType::Uint(256),
					ParamType::String,
					ParamType::Address,
				],
			),
			(ContractKind::Eip20, "balanceOf") => {
				("balanceOf", vec![ParamType::Address], vec![ParamType::Uint(256)])
			}
			(ContractKind::Eip20, "totalSupply") => {
				("totalSupply", vec![], vec![ParamType::Uint(256)])
			}
			_ => return None,
		};

		Some(MethodAbi {
			name,
			inputs,
			outputs,
		})
	}
}

impl MethodAbi {
	/// 4-byte selector followed by the encoded arguments.
	pub fn encode_call(&self, args: &[Token]) -> Result<Vec<u8>, ContractError> {
		if !Token::types_check(args, &self.inputs) {
			return Err(ContractError::InvalidArguments {
				method: self.name.to_string(),
			});
		}

		let mut data = abi::short_signature(self.name, &self.inputs).to_vec();
		data.extend(abi::encode(args));
		Ok(data)
	}

	pub fn decode_output(&self, data: &[u8]) -> Result<Vec<Token>, ContractError> {
		abi::decode(&self.outputs, data).map_err(|e| ContractError::Decode {
			method: self.name.to_string(),
			reason: e.to_string(),
		})
	}
}

/// Error types for contract calls
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
	#[error("Transport error: {0}")]
	Transport(#[from] RpcError),

	#[error("Contract {kind} has no method {method}")]
	UnknownMethod { kind: ContractKind, method: String },

	#[error("Arguments do not match the signature of {method}")]
	InvalidArguments { method: String },

	#[error("Failed to decode output of {method}: {reason}")]
	Decode { method: String, reason: String },
}
