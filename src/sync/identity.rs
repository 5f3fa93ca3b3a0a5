//! Account and contact discovery.
//!
//! Every tick fetches the node's address listing together with the per-address identity
//! information and reconciles it with the held state. Accounts are matched by key-store uuid
//! and contacts by address, so balances and other locally accumulated fields survive renames
//! and metadata churn. Entries the node stops reporting are dropped.

use crate::rpc::{AccountInfo, RemoteNode};
use crate::sync::events::{EventDispatcher, SyncEvent};
use crate::sync::store::StateStore;
use crate::sync::types::{Account, Contact, SyncError};

use ethers_core::types::{Address, U256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Outcome of a successful identity tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityCounts {
	pub accounts: usize,
	pub contacts: usize,
	/// Accounts that were not held before this tick.
	pub new_accounts: usize,
}

pub struct IdentitySynchronizer {
	node: Arc<dyn RemoteNode>,
	store: Arc<StateStore>,
	events: EventDispatcher,
	/// Whether the last successful tick saw any accounts; `None` before the first one.
	had_accounts: Option<bool>,
	/// Balance refresh requests for newly discovered accounts.
	balance_trigger: Option<watch::Sender<Option<U256>>>,
}

impl IdentitySynchronizer {
	pub fn new(node: Arc<dyn RemoteNode>, store: Arc<StateStore>, events: EventDispatcher) -> Self {
		Self {
			node,
			store,
			events,
			had_accounts: None,
			balance_trigger: None,
		}
	}

	/// Request a balance refresh on `trigger` whenever a tick adds accounts.
	pub fn with_balance_trigger(mut self, trigger: watch::Sender<Option<U256>>) -> Self {
		self.balance_trigger = Some(trigger);
		self
	}

	/// Fetch and merge one identity listing. On failure the held state is left untouched.
	pub async fn tick(&mut self) -> Result<IdentityCounts, SyncError> {
		let (addresses, infos) =
			futures::try_join!(self.node.list_accounts(), self.node.accounts_info())?;

		let had_accounts = self.had_accounts;
		let counts = self.store.update(|state| {
			let known: HashSet<String> =
				state.accounts.iter().map(|account| account.uuid.clone()).collect();
			let (accounts, contacts) = merge_identities(
				std::mem::take(&mut state.accounts),
				std::mem::take(&mut state.contacts),
				&addresses,
				infos,
			);
			state.accounts = accounts;
			state.contacts = contacts;

			let has_accounts = !state.accounts.is_empty();
			if had_accounts != Some(has_accounts) {
				state.show_first_run = !has_accounts;
			}

			IdentityCounts {
				accounts: state.accounts.len(),
				contacts: state.contacts.len(),
				new_accounts: state
					.accounts
					.iter()
					.filter(|account| !known.contains(&account.uuid))
					.count(),
			}
		});

		debug!(
			"Merged identities: {} accounts ({} new), {} contacts",
			counts.accounts, counts.new_accounts, counts.contacts
		);

		if counts.new_accounts > 0 {
			if let Some(trigger) = &self.balance_trigger {
				// keep the requested block, only mark the request as pending
				trigger.send_modify(|_| ());
			}
		}

		let has_accounts = counts.accounts > 0;
		if self.had_accounts != Some(has_accounts) {
			self.had_accounts = Some(has_accounts);
			self.events
				.dispatch(&SyncEvent::FirstRunChanged {
					show_first_run: !has_accounts,
				})
				.await;
		}

		self.events
			.dispatch(&SyncEvent::IdentitiesUpdated {
				accounts: counts.accounts,
				contacts: counts.contacts,
			})
			.await;

		Ok(counts)
	}
}

/// Reconcile a fresh identity listing with the previously held accounts and contacts.
///
/// Entries are visited in listing order first, then any remaining reported addresses in
/// address order. Existing records are reused and only their name and metadata are
/// overwritten; new records start with no balances. Records not reported are dropped.
pub fn merge_identities(
	previous_accounts: Vec<Account>,
	previous_contacts: Vec<Contact>,
	listing: &[Address],
	mut infos: BTreeMap<Address, AccountInfo>,
) -> (Vec<Account>, Vec<Contact>) {
	let mut known_accounts: HashMap<String, Account> = previous_accounts
		.into_iter()
		.map(|account| (account.uuid.clone(), account))
		.collect();
	let mut known_contacts: HashMap<Address, Contact> = previous_contacts
		.into_iter()
		.map(|contact| (contact.address, contact))
		.collect();

	let mut reported: Vec<(Address, AccountInfo)> = listing
		.iter()
		.filter_map(|address| infos.remove_entry(address))
		.collect();
	reported.extend(infos);

	let mut accounts = Vec::new();
	let mut contacts = Vec::new();

	for (address, info) in reported {
		match info.uuid {
			Some(uuid) => {
				let mut account = known_accounts
					.remove(&uuid)
					.unwrap_or_else(|| Account::new(uuid, address));
				account.address = address;
				account.name = info.name;
				account.meta = info.meta;
				accounts.push(account);
			}
			None => {
				let mut contact = known_contacts
					.remove(&address)
					.unwrap_or_else(|| Contact::new(address));
				contact.name = info.name;
				contact.meta = info.meta;
				contacts.push(contact);
			}
		}
	}

	(accounts, contacts)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sync::events::SyncEventHandler;
	use crate::sync::testing::{MockNode, RecordingHandler, address};
	use crate::sync::types::{Asset, Balance};

	fn synchronizer(
		node: Arc<MockNode>,
	) -> (IdentitySynchronizer, Arc<StateStore>, Arc<RecordingHandler>) {
		let store = Arc::new(StateStore::new());
		let recorder = Arc::new(RecordingHandler::default());
		let mut events = EventDispatcher::new();
		events.register_handler(recorder.clone() as Arc<dyn SyncEventHandler>);
		(
			IdentitySynchronizer::new(node, store.clone(), events),
			store,
			recorder,
		)
	}

	fn first_run_changes(recorder: &RecordingHandler) -> Vec<bool> {
		recorder
			.events()
			.into_iter()
			.filter_map(|event| match event {
				SyncEvent::FirstRunChanged { show_first_run } => Some(show_first_run),
				_ => None,
			})
			.collect()
	}

	#[tokio::test]
	async fn splits_accounts_and_contacts() {
		let node = Arc::new(MockNode::new());
		node.set_identities(&[
			(address(1), "Main", Some("uuid-1")),
			(address(2), "Friend", None),
		]);
		let (mut sync, store, _) = synchronizer(node);

		let counts = sync.tick().await.unwrap();
		assert_eq!(
			counts,
			IdentityCounts {
				accounts: 1,
				contacts: 1,
				new_accounts: 1,
			}
		);

		let snapshot = store.snapshot();
		assert_eq!(snapshot.accounts[0].uuid, "uuid-1");
		assert_eq!(snapshot.accounts[0].name, "Main");
		assert_eq!(snapshot.contacts[0].address, address(2));
		assert_eq!(snapshot.contacts[0].name, "Friend");
	}

	#[tokio::test]
	async fn account_identity_survives_address_and_name_changes() {
		let node = Arc::new(MockNode::new());
		node.set_identities(&[(address(1), "Main", Some("uuid-1"))]);
		let (mut sync, store, _) = synchronizer(node.clone());
		sync.tick().await.unwrap();

		store.update(|state| {
			state.accounts[0].balances = vec![Balance {
				asset: Asset::Native,
				value: U256::from(7),
			}];
			state.accounts[0].tx_count = U256::from(3);
		});

		node.set_identities(&[(address(9), "Renamed", Some("uuid-1"))]);
		sync.tick().await.unwrap();

		let snapshot = store.snapshot();
		assert_eq!(snapshot.accounts.len(), 1);
		let account = &snapshot.accounts[0];
		assert_eq!(account.uuid, "uuid-1");
		assert_eq!(account.address, address(9));
		assert_eq!(account.name, "Renamed");
		assert_eq!(account.balance_of(Asset::Native), Some(U256::from(7)));
		assert_eq!(account.tx_count, U256::from(3));
	}

	#[tokio::test]
	async fn unreported_entries_are_dropped() {
		let node = Arc::new(MockNode::new());
		node.set_identities(&[
			(address(1), "A", Some("uuid-1")),
			(address(2), "B", Some("uuid-2")),
			(address(3), "C", None),
		]);
		let (mut sync, store, _) = synchronizer(node.clone());
		sync.tick().await.unwrap();

		node.set_identities(&[(address(2), "B", Some("uuid-2"))]);
		sync.tick().await.unwrap();

		let snapshot = store.snapshot();
		assert_eq!(snapshot.accounts.len(), 1);
		assert_eq!(snapshot.accounts[0].uuid, "uuid-2");
		assert!(snapshot.contacts.is_empty());
	}

	#[tokio::test]
	async fn repeated_identical_listings_are_idempotent() {
		let node = Arc::new(MockNode::new());
		node.set_identities(&[
			(address(1), "A", Some("uuid-1")),
			(address(2), "B", Some("uuid-2")),
			(address(3), "C", None),
		]);
		let (mut sync, store, _) = synchronizer(node);
		sync.tick().await.unwrap();
		store.update(|state| state.accounts[1].tx_count = U256::from(11));

		let first = store.snapshot();
		sync.tick().await.unwrap();
		let second = store.snapshot();

		assert_eq!(first.accounts, second.accounts);
		assert_eq!(first.contacts, second.contacts);
	}

	#[tokio::test]
	async fn accounts_follow_listing_order() {
		let node = Arc::new(MockNode::new());
		node.set_identities(&[
			(address(5), "Five", Some("uuid-5")),
			(address(1), "One", Some("uuid-1")),
		]);
		let (mut sync, store, _) = synchronizer(node);
		sync.tick().await.unwrap();

		let names: Vec<String> = store
			.snapshot()
			.accounts
			.iter()
			.map(|account| account.name.clone())
			.collect();
		assert_eq!(names, vec!["Five", "One"]);
	}

	#[tokio::test]
	async fn first_run_is_reported_on_transitions_only() {
		let node = Arc::new(MockNode::new());
		let (mut sync, store, recorder) = synchronizer(node.clone());

		sync.tick().await.unwrap();
		sync.tick().await.unwrap();
		assert!(store.snapshot().show_first_run);

		node.set_identities(&[(address(1), "Main", Some("uuid-1"))]);
		sync.tick().await.unwrap();
		sync.tick().await.unwrap();
		assert!(!store.snapshot().show_first_run);

		node.set_identities(&[]);
		sync.tick().await.unwrap();

		assert_eq!(first_run_changes(&recorder), vec![true, false, true]);
	}

	#[tokio::test]
	async fn failed_ticks_leave_state_untouched() {
		let node = Arc::new(MockNode::new());
		node.set_identities(&[(address(1), "Main", Some("uuid-1"))]);
		let (mut sync, store, _) = synchronizer(node.clone());
		sync.tick().await.unwrap();

		node.fail_identities(true);
		node.set_identities(&[]);
		assert!(matches!(sync.tick().await, Err(SyncError::Transport(_))));
		assert_eq!(store.snapshot().accounts.len(), 1);
	}

	#[tokio::test]
	async fn first_run_flag_is_set_with_the_accounts() {
		let node = Arc::new(MockNode::new());
		let (mut sync, store, _) = synchronizer(node.clone());
		sync.tick().await.unwrap();
		let before = store.snapshot();

		node.set_identities(&[(address(1), "Main", Some("uuid-1"))]);
		sync.tick().await.unwrap();
		let after = store.snapshot();

		assert!(before.accounts.is_empty() && before.show_first_run);
		assert!(!after.accounts.is_empty() && !after.show_first_run);
	}

	#[tokio::test]
	async fn new_accounts_request_a_balance_refresh() {
		let node = Arc::new(MockNode::new());
		node.set_identities(&[(address(1), "Main", Some("uuid-1"))]);
		let (sync, _, _) = synchronizer(node.clone());
		let (sender, mut trigger) = watch::channel(Some(U256::from(4)));
		let mut sync = sync.with_balance_trigger(sender);

		assert_eq!(sync.tick().await.unwrap().new_accounts, 1);
		assert!(trigger.has_changed().unwrap());
		assert_eq!(*trigger.borrow_and_update(), Some(U256::from(4)));

		// same listing, renamed
		node.set_identities(&[(address(1), "Renamed", Some("uuid-1"))]);
		assert_eq!(sync.tick().await.unwrap().new_accounts, 0);
		assert!(!trigger.has_changed().unwrap());

		node.set_identities(&[
			(address(1), "Renamed", Some("uuid-1")),
			(address(2), "Second", Some("uuid-2")),
			(address(3), "Friend", None),
		]);
		assert_eq!(sync.tick().await.unwrap().new_accounts, 1);
		assert!(trigger.has_changed().unwrap());
	}
}
