//! Engine configuration, read from the environment with sensible defaults.

use std::time::Duration;

/// Configuration for the sync engine and its node client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
	/// JSON-RPC endpoint of the node.
	pub node_url: String,
	/// Delay between identity (accounts/contacts) ticks.
	pub identity_interval: Duration,
	/// Delay between chain status ticks.
	pub status_interval: Duration,
	/// Upper bound for any single remote call.
	pub call_timeout: Duration,
	/// Window during which connection failures are retried.
	pub retry_window: Duration,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			node_url: "http://127.0.0.1:8545".to_string(),
			identity_interval: Duration::from_millis(1000),
			status_interval: Duration::from_millis(1000),
			call_timeout: Duration::from_secs(10),
			retry_window: Duration::from_secs(2),
		}
	}
}

impl EngineConfig {
	/// Build a configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Build a configuration from an arbitrary key lookup, falling back to defaults.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let defaults = Self::default();
		let millis = |key: &'static str, default: Duration| -> Result<Duration, ConfigError> {
			match lookup(key) {
				None => Ok(default),
				Some(raw) => match raw.trim().parse::<u64>() {
					Ok(0) | Err(_) => Err(ConfigError::InvalidValue { key, value: raw }),
					Ok(ms) => Ok(Duration::from_millis(ms)),
				},
			}
		};

		Ok(Self {
			node_url: lookup("NODE_RPC_URL").unwrap_or(defaults.node_url),
			identity_interval: millis("ACCOUNTS_POLL_INTERVAL_MS", defaults.identity_interval)?,
			status_interval: millis("STATUS_POLL_INTERVAL_MS", defaults.status_interval)?,
			call_timeout: millis("RPC_CALL_TIMEOUT_MS", defaults.call_timeout)?,
			retry_window: millis("RPC_RETRY_WINDOW_MS", defaults.retry_window)?,
		})
	}
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Invalid value {value:?} for {key}: expected a positive number of milliseconds")]
	InvalidValue { key: &'static str, value: String },
}
