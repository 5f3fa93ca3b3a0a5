//! Canonical state store shared by all synchronizers.
//!
//! The store holds the current `Snapshot` behind an `Arc`. Readers clone the `Arc` and keep a
//! consistent view for as long as they like; writers apply a short, synchronous mutation under
//! the write lock. When readers still hold the previous snapshot, the mutation is applied to a
//! copy, so a reader never observes a collection mid-rebuild.
//!
//! No lock is ever held across a remote call: synchronizers read a snapshot, fetch, and only
//! then mutate.

use super::types::Snapshot;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Default)]
pub struct StateStore {
	state: RwLock<Arc<Snapshot>>,
}

impl StateStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Current snapshot. Cheap; never blocks on network work.
	pub fn snapshot(&self) -> Arc<Snapshot> {
		self.state
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}

	/// Apply `mutate` atomically with respect to `snapshot` readers.
	pub fn update<R>(&self, mutate: impl FnOnce(&mut Snapshot) -> R) -> R {
		let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
		mutate(Arc::make_mut(&mut guard))
	}
}
