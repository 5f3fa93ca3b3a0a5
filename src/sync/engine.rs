//! Sync engine and integration point for all synchronizers.
//!
//! This module defines the `SyncEngine`, which owns the canonical state store and coordinates
//! every component that keeps it fresh:
//! - the one-shot startup pipeline: system registry, token registry, token catalog
//! - the identity loop reconciling accounts and contacts
//! - the status loop polling chain health and detecting new blocks
//! - the balance worker refreshing balances whenever a new block is seen or accounts appear
//!
//! Loops use a fixed delay between ticks, so a slow tick pushes the next one later. Failures
//! are logged and the loop carries on; nothing but `shutdown` stops a loop. Balance refresh
//! requests are delivered over a `watch` channel, so requests arriving while a refresh is in
//! flight coalesce into a single follow-up run.

use crate::config::EngineConfig;
use crate::rpc::RemoteNode;
use crate::sync::{
	balances::BalanceSynchronizer,
	catalog::TokenCatalog,
	events::{EventDispatcher, LoggingHandler, SyncEvent, SyncEventHandler, SyncStage},
	identity::IdentitySynchronizer,
	registry::{RegistryResolver, TOKEN_REGISTRY_NAME},
	status::StatusPoller,
	store::StateStore,
	types::{NamedContract, Snapshot, SyncError},
};

use ethers_core::types::U256;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Main sync engine that owns the state and drives all synchronizers.
pub struct SyncEngine {
	node: Arc<dyn RemoteNode>,
	store: Arc<StateStore>,
	events: EventDispatcher,
	config: EngineConfig,
}

impl SyncEngine {
	/// Create an engine with the logging handler registered.
	pub fn new(node: Arc<dyn RemoteNode>, config: EngineConfig) -> Self {
		let mut events = EventDispatcher::new();
		events.register_handler(Arc::new(LoggingHandler));

		Self {
			node,
			store: Arc::new(StateStore::new()),
			events,
			config,
		}
	}

	/// Register an additional event handler. Must happen before `start`.
	pub fn register_handler(&mut self, handler: Arc<dyn SyncEventHandler>) {
		self.events.register_handler(handler);
	}

	/// Resolve the token registry and build the token catalog.
	///
	/// On success the catalog and the contracts list are published and the number of tokens
	/// returned. On failure the held tokens are left as they are.
	pub async fn load_tokens(&self) -> Result<usize, SyncError> {
		let resolver = RegistryResolver::connect(self.node.clone()).await?;
		let token_registry = resolver.token_registry().await?;
		let tokens = TokenCatalog::build(self.node.as_ref(), &token_registry).await?;
		let count = tokens.len();

		let mut contracts = vec![
			NamedContract::new("registry", resolver.registry()),
			NamedContract::new(TOKEN_REGISTRY_NAME, token_registry),
		];
		contracts.extend(
			tokens
				.iter()
				.map(|token| NamedContract::new(token.name.clone(), token.contract)),
		);
		for named in &contracts {
			debug!(
				"Contract {} ({}) at {:?}",
				named.name,
				named.contract.kind(),
				named.contract.address()
			);
		}

		self.store.update(|state| {
			state.contracts = contracts;
			state.tokens = tokens;
		});

		self.events.dispatch(&SyncEvent::TokensLoaded { count }).await;
		Ok(count)
	}

	/// Run the startup pipeline, then spawn the recurring loops.
	///
	/// A failed pipeline leaves the token set empty; accounts, contacts, status and base
	/// currency balances are still kept in sync.
	pub async fn start(self) -> SyncHandle {
		info!("Starting sync engine against {}", self.config.node_url);

		if let Err(e) = self.load_tokens().await {
			error!("Token catalog unavailable, continuing without tokens: {}", e);
			self.events
				.dispatch(&SyncEvent::TickFailed {
					stage: SyncStage::TokenCatalog,
					reason: e.to_string(),
				})
				.await;
		}

		let (shutdown_sender, shutdown) = watch::channel(false);
		let (trigger_sender, trigger) = watch::channel::<Option<U256>>(None);

		let identity =
			IdentitySynchronizer::new(self.node.clone(), self.store.clone(), self.events.clone())
				.with_balance_trigger(trigger_sender.clone());
		let status = StatusPoller::new(
			self.node.clone(),
			self.store.clone(),
			self.events.clone(),
			trigger_sender,
		);
		let balances = BalanceSynchronizer::new(
			self.node.clone(),
			self.store.clone(),
			self.events.clone(),
		);

		let tasks = vec![
			tokio::spawn(run_identity_loop(
				identity,
				self.config.identity_interval,
				self.events.clone(),
				shutdown.clone(),
			)),
			tokio::spawn(run_status_loop(
				status,
				self.config.status_interval,
				self.events.clone(),
				shutdown.clone(),
			)),
			tokio::spawn(run_balance_worker(
				balances,
				trigger,
				self.events.clone(),
				shutdown,
			)),
		];

		SyncHandle {
			store: self.store,
			shutdown: shutdown_sender,
			tasks,
		}
	}
}

/// Handle to a running engine.
pub struct SyncHandle {
	store: Arc<StateStore>,
	shutdown: watch::Sender<bool>,
	tasks: Vec<JoinHandle<()>>,
}

impl SyncHandle {
	/// Consistent view of the current state.
	pub fn snapshot(&self) -> Arc<Snapshot> {
		self.store.snapshot()
	}

	/// Hide the first-run indicator until the account set next becomes empty.
	pub fn dismiss_first_run(&self) {
		self.store.update(|state| state.show_first_run = false);
	}

	/// Stop every loop and wait for them to finish.
	pub async fn shutdown(self) {
		self.shutdown.send_replace(true);
		for task in self.tasks {
			if let Err(e) = task.await {
				error!("Sync task ended abnormally: {}", e);
			}
		}
		info!("Sync engine stopped");
	}
}

/// Wait `delay`, returning `true` if shutdown was requested meanwhile.
async fn sleep_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
	tokio::select! {
		_ = tokio::time::sleep(delay) => *shutdown.borrow(),
		_ = shutdown.changed() => true,
	}
}

async fn report_failure(events: &EventDispatcher, stage: SyncStage, error: &SyncError) {
	error!("{:?} tick failed: {}", stage, error);
	events
		.dispatch(&SyncEvent::TickFailed {
			stage,
			reason: error.to_string(),
		})
		.await;
}

async fn run_identity_loop(
	mut identity: IdentitySynchronizer,
	interval: Duration,
	events: EventDispatcher,
	mut shutdown: watch::Receiver<bool>,
) {
	loop {
		tokio::select! {
			result = identity.tick() => {
				if let Err(e) = result {
					report_failure(&events, SyncStage::Identities, &e).await;
				}
			}
			_ = shutdown.changed() => break,
		}
		if sleep_or_shutdown(interval, &mut shutdown).await {
			break;
		}
	}
	debug!("Identity loop stopped");
}

async fn run_status_loop(
	mut status: StatusPoller,
	interval: Duration,
	events: EventDispatcher,
	mut shutdown: watch::Receiver<bool>,
) {
	loop {
		tokio::select! {
			result = status.tick() => {
				if let Err(e) = result {
					report_failure(&events, SyncStage::Status, &e).await;
				}
			}
			_ = shutdown.changed() => break,
		}
		if sleep_or_shutdown(interval, &mut shutdown).await {
			break;
		}
	}
	status.tracker().log_progress();
	debug!("Status loop stopped");
}

async fn run_balance_worker(
	balances: BalanceSynchronizer,
	mut trigger: watch::Receiver<Option<U256>>,
	events: EventDispatcher,
	mut shutdown: watch::Receiver<bool>,
) {
	loop {
		tokio::select! {
			changed = trigger.changed() => {
				if changed.is_err() {
					break;
				}
			}
			_ = shutdown.changed() => break,
		}

		let requested = *trigger.borrow_and_update();
		match requested {
			Some(block) => debug!("Refreshing balances for block {}", block),
			None => debug!("Refreshing balances for new accounts"),
		}

		tokio::select! {
			result = balances.run() => match result.and_then(|report| report.into_result()) {
				Ok(report) => debug!("Balances refreshed for {} accounts", report.updated),
				Err(e @ SyncError::PartialBatch { .. }) => {
					warn!("Balance refresh incomplete: {}", e)
				}
				Err(e) => report_failure(&events, SyncStage::Balances, &e).await,
			},
			_ = shutdown.changed() => break,
		}
	}
	debug!("Balance worker stopped");
}
