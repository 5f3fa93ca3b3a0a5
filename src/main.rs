mod config;
mod contract;
mod rpc;
mod sync;
mod utils;

use std::time::Duration;
use tracing::{error, info};

use crate::config::EngineConfig;
use crate::rpc::JsonRpcClient;
use crate::sync::{Asset, NATIVE_CURRENCY, Snapshot, SyncEngine};
use crate::utils::format_token_amount;

#[tokio::main]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	let config = match EngineConfig::from_env() {
		Ok(config) => config,
		Err(e) => {
			error!("Invalid configuration: {}", e);
			return;
		}
	};

	let client = match JsonRpcClient::new(
		config.node_url.clone(),
		config.call_timeout,
		config.retry_window,
	) {
		Ok(client) => client,
		Err(e) => {
			error!("Failed to create node client: {}", e);
			return;
		}
	};

	info!("Created node client for {}", config.node_url);

	let summary_interval = config.status_interval.max(Duration::from_secs(5));
	let handle = SyncEngine::new(std::sync::Arc::new(client), config)
		.start()
		.await;

	let mut summary = tokio::time::interval(summary_interval);
	loop {
		tokio::select! {
			_ = summary.tick() => log_summary(&handle.snapshot()),
			signal = tokio::signal::ctrl_c() => {
				if let Err(e) = signal {
					error!("Failed to listen for shutdown signal: {}", e);
				}
				break;
			}
		}
	}

	info!("Shutting down");
	handle.shutdown().await;
}

fn log_summary(snapshot: &Snapshot) {
	if let Some(status) = &snapshot.status {
		info!(
			"Block {} on {} | {} | {}/{} peers{}",
			status.block_number,
			status.net_chain,
			status.client_version,
			status.net_peers.connected,
			status.net_peers.max,
			if status.syncing.is_syncing() { " | syncing" } else { "" }
		);
	}

	info!(
		"{} accounts, {} contacts, {} tokens besides {} ({})",
		snapshot.accounts.len(),
		snapshot.contacts.len(),
		snapshot.tokens.len(),
		NATIVE_CURRENCY.name,
		NATIVE_CURRENCY.tag
	);

	for account in &snapshot.accounts {
		let balances: Vec<String> = account
			.balances
			.iter()
			.map(|balance| match balance.asset {
				Asset::Native => format!(
					"{} {}",
					format_token_amount(balance.value, ethers_core::types::U256::exp10(18)),
					NATIVE_CURRENCY.tag
				),
				Asset::Token(address) => match snapshot.token(address) {
					Some(token) => format!(
						"{} {}",
						format_token_amount(balance.value, token.format),
						token.tag
					),
					None => format!("{} @{:?}", balance.value, address),
				},
			})
			.collect();
		info!(
			"{} ({:?}, {} txs): {}",
			account.name,
			account.address,
			account.tx_count,
			balances.join(", ")
		);
	}

	if snapshot.show_first_run {
		info!("No accounts yet: create or import one on the node to get started");
	}
}
