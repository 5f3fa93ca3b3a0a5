//! Balance refresh for every account across the base currency and all catalog tokens.
//!
//! A run works from a snapshot of the accounts and tokens, issues every per-account and
//! per-(account, token) query concurrently, and commits each account as soon as its own
//! queries are done. A failed token query only drops that token from the account's sequence
//! for this run; a failed base-currency or transaction-count query leaves the account as it
//! was. Missing values correct themselves on the next block.

use crate::rpc::{RemoteNode, RpcError};
use crate::sync::events::{EventDispatcher, SyncEvent};
use crate::sync::store::StateStore;
use crate::sync::types::{Asset, Balance, SyncError, Token};

use chrono::Utc;
use ethers_core::types::{Address, U256};
use futures::StreamExt;
use futures::future::join_all;
use futures::stream::FuturesUnordered;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of one balance run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceReport {
	/// Accounts whose balance sequence was rebuilt.
	pub updated: usize,
	/// Accounts whose base-currency or transaction-count query failed.
	pub failed_accounts: usize,
	/// Individual (account, token) queries that failed.
	pub failed_pairs: usize,
	/// Total queries issued.
	pub total: usize,
}

impl BalanceReport {
	pub fn failed(&self) -> usize {
		self.failed_accounts + self.failed_pairs
	}

	/// `PartialBatch` when any query of the run failed.
	pub fn into_result(self) -> Result<Self, SyncError> {
		if self.failed() > 0 {
			Err(SyncError::PartialBatch {
				failed: self.failed(),
				total: self.total,
			})
		} else {
			Ok(self)
		}
	}
}

/// Freshly fetched values for one account.
struct AccountBalances {
	balances: Vec<Balance>,
	tx_count: U256,
	failed_pairs: usize,
}

pub struct BalanceSynchronizer {
	node: Arc<dyn RemoteNode>,
	store: Arc<StateStore>,
	events: EventDispatcher,
}

impl BalanceSynchronizer {
	pub fn new(node: Arc<dyn RemoteNode>, store: Arc<StateStore>, events: EventDispatcher) -> Self {
		Self {
			node,
			store,
			events,
		}
	}

	/// Refresh every account's balances.
	///
	/// Per-unit failures are reported in the `BalanceReport`. Only a run in which no account
	/// could be fetched at all fails with `Dispatch`.
	pub async fn run(&self) -> Result<BalanceReport, SyncError> {
		let (targets, tokens) = {
			let snapshot = self.store.snapshot();
			let targets: Vec<(String, Address)> = snapshot
				.accounts
				.iter()
				.map(|account| (account.uuid.clone(), account.address))
				.collect();
			(targets, snapshot.tokens.clone())
		};
		let tokens = tokens.as_slice();
		let account_count = targets.len();

		let mut report = BalanceReport {
			total: targets.len() * (2 + tokens.len()),
			..BalanceReport::default()
		};
		if targets.is_empty() {
			return Ok(report);
		}

		let mut pending: FuturesUnordered<_> = targets
			.into_iter()
			.map(|(uuid, address)| async move {
				let fetched = self.fetch_account(address, tokens).await;
				(uuid, address, fetched)
			})
			.collect();

		let mut last_error = None;
		while let Some((uuid, address, fetched)) = pending.next().await {
			match fetched {
				Ok(fetched) => {
					report.failed_pairs += fetched.failed_pairs;
					if self.commit(&uuid, address, fetched) {
						report.updated += 1;
					}
				}
				Err(e) => {
					warn!("Balance refresh for {:?} failed: {}", address, e);
					report.failed_accounts += 1;
					last_error = Some(e);
				}
			}
		}

		self.events
			.dispatch(&SyncEvent::BalancesUpdated {
				updated: report.updated,
				failed: report.failed(),
			})
			.await;

		if report.failed_accounts == account_count {
			if let Some(e) = last_error {
				return Err(SyncError::Dispatch(e.to_string()));
			}
		}

		Ok(report)
	}

	async fn fetch_account(
		&self,
		address: Address,
		tokens: &[Token],
	) -> Result<AccountBalances, RpcError> {
		let node = self.node.as_ref();
		let native = async {
			futures::try_join!(node.balance(address), node.transaction_count(address))
		};
		let token_balances = join_all(
			tokens
				.iter()
				.map(|token| token.contract.balance_of(node, address)),
		);

		let (native, token_balances) = futures::join!(native, token_balances);
		let (value, tx_count) = native?;

		let mut balances = Vec::with_capacity(tokens.len() + 1);
		balances.push(Balance {
			asset: Asset::Native,
			value,
		});

		let mut failed_pairs = 0;
		for (token, result) in tokens.iter().zip(token_balances) {
			match result {
				Ok(value) => balances.push(Balance {
					asset: Asset::Token(token.address),
					value,
				}),
				Err(e) => {
					warn!(
						"{} balance of {:?} unavailable this round: {}",
						token.tag, address, e
					);
					failed_pairs += 1;
				}
			}
		}

		Ok(AccountBalances {
			balances,
			tx_count,
			failed_pairs,
		})
	}

	/// Replace the balances of the account, if it is still held with the same address.
	fn commit(&self, uuid: &str, address: Address, fetched: AccountBalances) -> bool {
		self.store.update(|state| {
			let Some(account) = state
				.accounts
				.iter_mut()
				.find(|account| account.uuid == uuid && account.address == address)
			else {
				debug!("Account {} changed during balance refresh, skipping", uuid);
				return false;
			};

			account.balances = fetched.balances;
			account.tx_count = fetched.tx_count;
			account.balances_updated_at = Some(Utc::now());
			true
		})
	}
}
