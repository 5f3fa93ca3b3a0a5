//! Chain status polling and new-block detection.
//!
//! Each tick gathers the chain head, client version, chain name, peers and sync state in one
//! concurrent round. A tick is all-or-nothing: if any call fails the previous status stays in
//! place. When the head moves strictly above the last refreshed block, a balance refresh is
//! requested on the trigger channel without waiting for it.

use crate::rpc::RemoteNode;
use crate::sync::events::{EventDispatcher, SyncEvent};
use crate::sync::height_tracker::HeightTracker;
use crate::sync::store::StateStore;
use crate::sync::types::{ChainStatus, SyncError};

use chrono::Utc;
use ethers_core::types::U256;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

/// Outcome of a successful status tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTick {
	pub block_number: U256,
	/// Whether a balance refresh was requested.
	pub triggered: bool,
}

pub struct StatusPoller {
	node: Arc<dyn RemoteNode>,
	store: Arc<StateStore>,
	events: EventDispatcher,
	tracker: HeightTracker,
	balance_trigger: watch::Sender<Option<U256>>,
}

impl StatusPoller {
	pub fn new(
		node: Arc<dyn RemoteNode>,
		store: Arc<StateStore>,
		events: EventDispatcher,
		balance_trigger: watch::Sender<Option<U256>>,
	) -> Self {
		Self {
			node,
			store,
			events,
			tracker: HeightTracker::new(),
			balance_trigger,
		}
	}

	pub fn tracker(&self) -> &HeightTracker {
		&self.tracker
	}

	pub async fn tick(&mut self) -> Result<StatusTick, SyncError> {
		let node = self.node.as_ref();
		let (block_number, client_version, net_chain, net_peers, syncing) = futures::try_join!(
			node.block_number(),
			node.client_version(),
			node.net_chain(),
			node.net_peers(),
			node.syncing()
		)?;

		let status = ChainStatus {
			block_number,
			client_version,
			net_chain,
			net_peers,
			syncing,
			fetched_at: Utc::now(),
		};
		self.store.update(|state| state.status = Some(status.clone()));
		self.events.dispatch(&SyncEvent::StatusUpdated { status }).await;

		let mut triggered = false;
		if self.tracker.is_advance(block_number) {
			if self.balance_trigger.send(Some(block_number)).is_ok() {
				self.tracker.record_trigger(block_number);
				triggered = true;
				self.events.dispatch(&SyncEvent::NewBlock { block_number }).await;
			} else {
				warn!("Balance worker is gone, block {} not refreshed", block_number);
			}
		}

		Ok(StatusTick {
			block_number,
			triggered,
		})
	}
}
