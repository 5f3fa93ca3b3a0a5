//! Token catalog: enumeration of every token registered in the token registry.
//!
//! The build is all-or-nothing. A catalog missing a token would silently under-report that
//! token's balances, so any failed per-token call fails the whole build.

use crate::contract::{ContractBinding, ContractError, ContractKind, TokenRecord};
use crate::rpc::RemoteNode;
use crate::sync::types::{SyncError, Token, TokenIcons};

use ethers_core::types::U256;
use futures::{StreamExt, TryStreamExt, stream};
use tracing::info;

/// Largest token count accepted from a registry.
pub const MAX_TOKENS: u64 = 10_000;

/// Contract calls kept in flight while enumerating.
const MAX_CONCURRENT_CALLS: usize = 16;

pub struct TokenCatalog;

impl TokenCatalog {
	/// Enumerate the tokens of `token_registry` in registry order, with their supplies.
	pub async fn build(
		node: &dyn RemoteNode,
		token_registry: &ContractBinding,
	) -> Result<Vec<Token>, SyncError> {
		let count = token_registry.token_count(node).await?;
		if count > U256::from(MAX_TOKENS) {
			return Err(SyncError::Contract(ContractError::Decode {
				method: "tokenCount".to_string(),
				reason: format!("implausible count {}", count),
			}));
		}
		let count = count.low_u64();

		info!("Token registry lists {} tokens", count);

		let records: Vec<TokenRecord> = stream::iter(0..count)
			.map(|index| token_registry.token(node, index))
			.buffered(MAX_CONCURRENT_CALLS)
			.try_collect()
			.await?;

		let mut tokens: Vec<Token> = records
			.into_iter()
			.map(|record| Token {
				address: record.address,
				icons: TokenIcons::for_token_name(&record.name),
				tag: record.tag,
				format: record.format,
				name: record.name,
				supply: U256::zero(),
				contract: ContractBinding::new(record.address, ContractKind::Eip20),
			})
			.collect();

		let supplies: Vec<U256> = stream::iter(&tokens)
			.map(|token| token.contract.total_supply(node))
			.buffered(MAX_CONCURRENT_CALLS)
			.try_collect()
			.await?;

		for (token, supply) in tokens.iter_mut().zip(supplies) {
			token.supply = supply;
		}

		Ok(tokens)
	}
}
