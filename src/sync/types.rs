use crate::contract::{ContractBinding, ContractError};
use crate::rpc::{Metadata, PeerInfo, RpcError, SyncState};

use chrono::{DateTime, Utc};
use ethers_core::types::{Address, U256};

/// Icon references for a token, small and normal size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIcons {
	pub small: String,
	pub normal: String,
}

impl TokenIcons {
	/// Icons served for a registered token, derived from its lower-cased name.
	pub fn for_token_name(name: &str) -> Self {
		let name = name.to_lowercase();
		Self {
			small: format!("/images/contracts/{}-32.png", name),
			normal: format!("/images/contracts/{}-56.png", name),
		}
	}
}

/// Descriptor of the chain's base currency, listed first in every balance sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeCurrency {
	pub name: &'static str,
	pub tag: &'static str,
}

pub const NATIVE_CURRENCY: NativeCurrency = NativeCurrency {
	name: "Ethereum",
	tag: "ΞTH",
};

/// A fungible token enumerated from the token registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
	pub address: Address,
	/// Ticker tag, e.g. `GAV`.
	pub tag: String,
	/// Display scaling as published by the registry (e.g. `10^18`).
	pub format: U256,
	pub name: String,
	pub icons: TokenIcons,
	pub supply: U256,
	pub contract: ContractBinding,
}

/// What a balance is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Asset {
	/// The base currency of the chain.
	Native,
	/// A registered token, by contract address.
	Token(Address),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
	pub asset: Asset,
	pub value: U256,
}

/// A locally managed account, identified by its key-store uuid.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
	pub uuid: String,
	pub address: Address,
	pub name: String,
	pub meta: Metadata,
	/// Base currency first, then one entry per token in catalog order.
	pub balances: Vec<Balance>,
	/// Raw outbound transaction count as reported by the node.
	pub tx_count: U256,
	pub balances_updated_at: Option<DateTime<Utc>>,
}

impl Account {
	pub fn new(uuid: String, address: Address) -> Self {
		Self {
			uuid,
			address,
			name: String::new(),
			meta: Metadata::new(),
			balances: Vec::new(),
			tx_count: U256::zero(),
			balances_updated_at: None,
		}
	}

	pub fn balance_of(&self, asset: Asset) -> Option<U256> {
		self.balances
			.iter()
			.find(|balance| balance.asset == asset)
			.map(|balance| balance.value)
	}
}

/// An address known to the node without a key-store entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
	pub address: Address,
	pub name: String,
	pub meta: Metadata,
}

impl Contact {
	pub fn new(address: Address) -> Self {
		Self {
			address,
			name: String::new(),
			meta: Metadata::new(),
		}
	}
}

/// A contract published to consumers, named by its role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedContract {
	pub name: String,
	pub contract: ContractBinding,
}

impl NamedContract {
	pub fn new(name: impl Into<String>, contract: ContractBinding) -> Self {
		Self {
			name: name.into(),
			contract,
		}
	}
}

/// Chain head and node health, replaced wholesale on every status tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainStatus {
	pub block_number: U256,
	pub client_version: String,
	pub net_chain: String,
	pub net_peers: PeerInfo,
	pub syncing: SyncState,
	pub fetched_at: DateTime<Utc>,
}

/// Consistent point-in-time view of everything the engine tracks.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
	pub accounts: Vec<Account>,
	pub contacts: Vec<Contact>,
	pub tokens: Vec<Token>,
	/// Registry, token registry, then every token contract.
	pub contracts: Vec<NamedContract>,
	pub status: Option<ChainStatus>,
	/// Set while the node reports no accounts, until dismissed.
	pub show_first_run: bool,
}

impl Snapshot {
	pub fn account(&self, uuid: &str) -> Option<&Account> {
		self.accounts.iter().find(|account| account.uuid == uuid)
	}

	pub fn token(&self, address: Address) -> Option<&Token> {
		self.tokens.iter().find(|token| token.address == address)
	}
}

/// Error types for the sync engine
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
	#[error("Transport error: {0}")]
	Transport(#[from] RpcError),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("{failed} of {total} balance fetches failed")]
	PartialBatch { failed: usize, total: usize },

	#[error("Balance refresh could not be dispatched: {0}")]
	Dispatch(String),

	#[error("Contract error: {0}")]
	Contract(ContractError),
}

impl From<ContractError> for SyncError {
	fn from(error: ContractError) -> Self {
		match error {
			ContractError::Transport(e) => SyncError::Transport(e),
			other => SyncError::Contract(other),
		}
	}
}
