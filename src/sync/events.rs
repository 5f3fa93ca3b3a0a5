//! Event system for the sync engine.
//!
//! This module defines the events the engine publishes, the handler trait consumers implement,
//! and the dispatcher that fans each event out to every registered handler. Events let the
//! presentation layer react to state changes (first-run banner, new block, refreshed balances)
//! without polling the snapshot.

use crate::sync::types::{ChainStatus, SyncError};
use ethers_core::types::U256;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// The recurring loops and one-shot stages that can report a failed tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
	TokenCatalog,
	Identities,
	Status,
	Balances,
}

/// Events published by the sync engine
#[derive(Debug, Clone)]
pub enum SyncEvent {
	/// The token catalog was built at startup
	TokensLoaded { count: usize },
	/// Accounts and contacts were reconciled with the node
	IdentitiesUpdated { accounts: usize, contacts: usize },
	/// The node went from having no accounts to having some, or back
	FirstRunChanged { show_first_run: bool },
	/// Chain status was replaced
	StatusUpdated { status: ChainStatus },
	/// A higher block was seen and a balance refresh was requested
	NewBlock { block_number: U256 },
	/// A balance refresh finished
	BalancesUpdated { updated: usize, failed: usize },
	/// A tick or stage failed and was abandoned
	TickFailed { stage: SyncStage, reason: String },
}

/// Trait for handling sync events.
///
/// Implementors receive all events and can perform side effects such as UI notifications.
#[async_trait::async_trait]
pub trait SyncEventHandler: Send + Sync {
	/// Handle a sync event.
	async fn handle(&self, event: &SyncEvent) -> Result<(), SyncError>;

	/// Get the name of this handler for logging and diagnostics.
	fn name(&self) -> &'static str;
}

/// Event dispatcher that manages multiple event handlers.
///
/// Cloning is cheap; every synchronizer holds its own clone.
#[derive(Clone, Default)]
pub struct EventDispatcher {
	handlers: Vec<Arc<dyn SyncEventHandler>>,
}

impl EventDispatcher {
	/// Create a new, empty event dispatcher.
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a new event handler.
	///
	/// Handlers are called in the order they are registered.
	pub fn register_handler(&mut self, handler: Arc<dyn SyncEventHandler>) {
		self.handlers.push(handler);
	}

	/// Dispatch an event to all registered handlers.
	///
	/// Errors from handlers are logged, but do not stop other handlers from running.
	pub async fn dispatch(&self, event: &SyncEvent) {
		for handler in &self.handlers {
			if let Err(e) = handler.handle(event).await {
				error!("Handler {} failed to process event: {}", handler.name(), e);
			}
		}
	}
}

/// Handler that writes every event to the log.
pub struct LoggingHandler;

#[async_trait::async_trait]
impl SyncEventHandler for LoggingHandler {
	async fn handle(&self, event: &SyncEvent) -> Result<(), SyncError> {
		match event {
			SyncEvent::TokensLoaded { count } => {
				info!("Token catalog loaded with {} tokens", count)
			}
			SyncEvent::IdentitiesUpdated { accounts, contacts } => {
				debug!("Identities: {} accounts, {} contacts", accounts, contacts)
			}
			SyncEvent::FirstRunChanged { show_first_run } => {
				info!("First-run state changed: show_first_run={}", show_first_run)
			}
			SyncEvent::StatusUpdated { status } => debug!(
				"Status: block {} on {} ({} peers)",
				status.block_number, status.net_chain, status.net_peers.connected
			),
			SyncEvent::NewBlock { block_number } => info!("New block {}", block_number),
			SyncEvent::BalancesUpdated { updated, failed } => {
				if *failed > 0 {
					warn!("Balances refreshed for {} accounts, {} fetches failed", updated, failed)
				} else {
					debug!("Balances refreshed for {} accounts", updated)
				}
			}
			SyncEvent::TickFailed { stage, reason } => warn!("{:?} tick failed: {}", stage, reason),
		}
		Ok(())
	}

	fn name(&self) -> &'static str {
		"LoggingHandler"
	}
}
