//! Scripted in-memory node and event recorder shared by the sync tests.

use crate::contract::ContractKind;
use crate::rpc::{AccountInfo, PeerInfo, RemoteNode, RpcError, SyncState};
use crate::sync::events::{SyncEvent, SyncEventHandler};
use crate::sync::types::SyncError;

use ethers_core::abi::{self, Token};
use ethers_core::types::{Address, Bytes, U256};
use ethers_core::utils::keccak256;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

pub fn address(n: u64) -> Address {
	Address::from_low_u64_be(n)
}

fn scripted_failure(what: &str) -> RpcError {
	RpcError::NodeError {
		code: -32000,
		message: format!("scripted failure: {}", what),
	}
}

#[derive(Default)]
struct MockState {
	listing: Vec<Address>,
	infos: BTreeMap<Address, AccountInfo>,
	fail_identities: bool,
	identity_delay: Option<Duration>,

	block_number: U256,
	fail_status: bool,

	balances: HashMap<Address, U256>,
	tx_counts: HashMap<Address, U256>,
	failing_balances: HashSet<Address>,

	registry: Option<Address>,
	calls: HashMap<(Address, Vec<u8>), Option<Vec<u8>>>,

	balance_calls: usize,
	call_delay: Option<Duration>,

	contract_call_delay: Option<Duration>,
	contract_calls_in_flight: usize,
	peak_contract_calls: usize,
}

/// A node whose every answer is scripted by the test.
///
/// Unscripted contract calls fail like a reverted call would.
#[derive(Default)]
pub struct MockNode {
	state: Mutex<MockState>,
}

impl MockNode {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replace the identity listing. Entries with a uuid are accounts, the rest contacts.
	pub fn set_identities(&self, entries: &[(Address, &str, Option<&str>)]) {
		let mut state = self.state.lock().unwrap();
		state.listing = entries
			.iter()
			.filter(|(_, _, uuid)| uuid.is_some())
			.map(|(address, _, _)| *address)
			.collect();
		state.infos = entries
			.iter()
			.map(|(address, name, uuid)| {
				(
					*address,
					AccountInfo {
						name: name.to_string(),
						meta: Default::default(),
						uuid: uuid.map(str::to_string),
					},
				)
			})
			.collect();
	}

	pub fn fail_identities(&self, fail: bool) {
		self.state.lock().unwrap().fail_identities = fail;
	}

	pub fn set_block(&self, number: u64) {
		self.state.lock().unwrap().block_number = U256::from(number);
	}

	pub fn fail_status(&self, fail: bool) {
		self.state.lock().unwrap().fail_status = fail;
	}

	pub fn set_balance(&self, owner: Address, value: U256, tx_count: u64) {
		let mut state = self.state.lock().unwrap();
		state.balances.insert(owner, value);
		state.tx_counts.insert(owner, U256::from(tx_count));
		state.failing_balances.remove(&owner);
	}

	pub fn fail_balance(&self, owner: Address) {
		self.state.lock().unwrap().failing_balances.insert(owner);
	}

	/// Number of native balance queries served so far.
	pub fn balance_calls(&self) -> usize {
		self.state.lock().unwrap().balance_calls
	}

	/// Delay applied to every native balance query.
	pub fn set_call_delay(&self, delay: Duration) {
		self.state.lock().unwrap().call_delay = Some(delay);
	}

	/// Delay applied to the address listing, so identities arrive after other answers.
	pub fn set_identity_delay(&self, delay: Duration) {
		self.state.lock().unwrap().identity_delay = Some(delay);
	}

	/// Delay applied to every contract call.
	pub fn set_contract_call_delay(&self, delay: Duration) {
		self.state.lock().unwrap().contract_call_delay = Some(delay);
	}

	/// Highest number of contract calls that were outstanding at once.
	pub fn peak_contract_calls(&self) -> usize {
		self.state.lock().unwrap().peak_contract_calls
	}

	pub fn set_registry(&self, registry: Address) {
		self.state.lock().unwrap().registry = Some(registry);
	}

	pub fn answer_call(
		&self,
		to: Address,
		kind: ContractKind,
		method: &str,
		args: &[Token],
		outputs: &[Token],
	) {
		let data = kind.method(method).unwrap().encode_call(args).unwrap();
		self.state
			.lock()
			.unwrap()
			.calls
			.insert((to, data), Some(abi::encode(outputs)));
	}

	pub fn fail_call(&self, to: Address, kind: ContractKind, method: &str, args: &[Token]) {
		let data = kind.method(method).unwrap().encode_call(args).unwrap();
		self.state.lock().unwrap().calls.insert((to, data), None);
	}

	/// Script a registry at `registry` pointing `tokenreg` at `token_registry`, which in turn
	/// enumerates `tokens` as `(address, tag, name, supply)` with an `10^18` format.
	pub fn install_token_registry(
		&self,
		registry: Address,
		token_registry: Address,
		tokens: &[(Address, &str, &str, u64)],
	) {
		self.set_registry(registry);
		self.answer_call(
			registry,
			ContractKind::Registry,
			"getAddress",
			&[
				Token::FixedBytes(keccak256("tokenreg").to_vec()),
				Token::String("A".to_string()),
			],
			&[Token::Address(token_registry)],
		);
		self.answer_call(
			token_registry,
			ContractKind::TokenRegistry,
			"tokenCount",
			&[],
			&[Token::Uint(U256::from(tokens.len()))],
		);
		for (index, (token, tag, name, supply)) in tokens.iter().enumerate() {
			self.answer_call(
				token_registry,
				ContractKind::TokenRegistry,
				"token",
				&[Token::Uint(U256::from(index))],
				&[
					Token::Address(*token),
					Token::String(tag.to_string()),
					Token::Uint(U256::exp10(18)),
					Token::String(name.to_string()),
					Token::Address(address(0xfeed)),
				],
			);
			self.answer_call(
				*token,
				ContractKind::Eip20,
				"totalSupply",
				&[],
				&[Token::Uint(U256::from(*supply))],
			);
		}
	}

	pub fn set_token_balance(&self, token: Address, owner: Address, value: U256) {
		self.answer_call(
			token,
			ContractKind::Eip20,
			"balanceOf",
			&[Token::Address(owner)],
			&[Token::Uint(value)],
		);
	}

	pub fn fail_token_balance(&self, token: Address, owner: Address) {
		self.fail_call(token, ContractKind::Eip20, "balanceOf", &[Token::Address(owner)]);
	}
}

#[async_trait::async_trait]
impl RemoteNode for MockNode {
	async fn list_accounts(&self) -> Result<Vec<Address>, RpcError> {
		let delay = self.state.lock().unwrap().identity_delay;
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
		let state = self.state.lock().unwrap();
		if state.fail_identities {
			return Err(scripted_failure("personal_listAccounts"));
		}
		Ok(state.listing.clone())
	}

	async fn accounts_info(&self) -> Result<BTreeMap<Address, AccountInfo>, RpcError> {
		let state = self.state.lock().unwrap();
		if state.fail_identities {
			return Err(scripted_failure("parity_accountsInfo"));
		}
		Ok(state.infos.clone())
	}

	async fn block_number(&self) -> Result<U256, RpcError> {
		let state = self.state.lock().unwrap();
		if state.fail_status {
			return Err(scripted_failure("eth_blockNumber"));
		}
		Ok(state.block_number)
	}

	async fn client_version(&self) -> Result<String, RpcError> {
		Ok("Parity//v1.4.0-unstable/x86_64-linux-gnu/rustc1.12.0".to_string())
	}

	async fn net_chain(&self) -> Result<String, RpcError> {
		Ok("morden".to_string())
	}

	async fn net_peers(&self) -> Result<PeerInfo, RpcError> {
		Ok(PeerInfo {
			active: 2,
			connected: 5,
			max: 25,
		})
	}

	async fn syncing(&self) -> Result<SyncState, RpcError> {
		Ok(SyncState::Synced)
	}

	async fn balance(&self, owner: Address) -> Result<U256, RpcError> {
		let (delay, result) = {
			let mut state = self.state.lock().unwrap();
			state.balance_calls += 1;
			let result = if state.failing_balances.contains(&owner) {
				Err(scripted_failure("eth_getBalance"))
			} else {
				Ok(state.balances.get(&owner).copied().unwrap_or_default())
			};
			(state.call_delay, result)
		};
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
		result
	}

	async fn transaction_count(&self, owner: Address) -> Result<U256, RpcError> {
		let state = self.state.lock().unwrap();
		Ok(state.tx_counts.get(&owner).copied().unwrap_or_default())
	}

	async fn registry_address(&self) -> Result<Address, RpcError> {
		self.state
			.lock()
			.unwrap()
			.registry
			.ok_or_else(|| scripted_failure("parity_registryAddress"))
	}

	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcError> {
		let (delay, result) = {
			let mut state = self.state.lock().unwrap();
			state.contract_calls_in_flight += 1;
			state.peak_contract_calls =
				state.peak_contract_calls.max(state.contract_calls_in_flight);
			let result = match state.calls.get(&(to, data.to_vec())) {
				Some(Some(output)) => Ok(Bytes::from(output.clone())),
				_ => Err(scripted_failure("eth_call")),
			};
			(state.contract_call_delay, result)
		};
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
		self.state.lock().unwrap().contract_calls_in_flight -= 1;
		result
	}
}

/// Handler keeping every event it receives.
#[derive(Default)]
pub struct RecordingHandler {
	events: Mutex<Vec<SyncEvent>>,
}

impl RecordingHandler {
	pub fn events(&self) -> Vec<SyncEvent> {
		self.events.lock().unwrap().clone()
	}
}

#[async_trait::async_trait]
impl SyncEventHandler for RecordingHandler {
	async fn handle(&self, event: &SyncEvent) -> Result<(), SyncError> {
		self.events.lock().unwrap().push(event.clone());
		Ok(())
	}

	fn name(&self) -> &'static str {
		"RecordingHandler"
	}
}
