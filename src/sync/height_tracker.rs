//! Block height tracking for balance refresh triggering.
//!
//! The tracker remembers the highest block for which a balance refresh was requested. It only
//! ever moves forward: equal or lower readings (including reorg regressions) never trigger.

use ethers_core::types::U256;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct HeightTracker {
	/// Highest block a refresh was dispatched for; `None` until the first one.
	last_seen: Option<U256>,
	/// Number of refreshes dispatched.
	triggers: usize,
	/// Readings below the stored height.
	regressions: usize,
}

impl HeightTracker {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn last_seen(&self) -> Option<U256> {
		self.last_seen
	}

	/// Whether `height` is strictly above the stored height.
	pub fn is_advance(&mut self, height: U256) -> bool {
		match self.last_seen {
			None => true,
			Some(last) if height > last => true,
			Some(last) => {
				if height < last {
					self.regressions += 1;
					debug!("Block height went back from {} to {}", last, height);
				}
				false
			}
		}
	}

	/// Store `height` once a refresh for it was dispatched.
	pub fn record_trigger(&mut self, height: U256) {
		if self.last_seen.is_none_or(|last| height > last) {
			self.last_seen = Some(height);
			self.triggers += 1;
		}
	}

	pub fn stats(&self) -> HeightStats {
		HeightStats {
			last_seen: self.last_seen,
			triggers: self.triggers,
			regressions: self.regressions,
		}
	}

	pub fn log_progress(&self) {
		if let Some(last) = self.last_seen {
			info!("{}", self.stats().summary());
			debug!("Last refreshed block {}", last);
		}
	}
}

/// Statistics about height tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeightStats {
	pub last_seen: Option<U256>,
	pub triggers: usize,
	pub regressions: usize,
}

impl HeightStats {
	/// Get a human-readable summary of the tracking statistics
	pub fn summary(&self) -> String {
		format!(
			"Block tracking at {}: {} refreshes triggered{}",
			self.last_seen
				.map(|height| height.to_string())
				.unwrap_or_else(|| "-".to_string()),
			self.triggers,
			if self.regressions == 0 {
				String::new()
			} else {
				format!(" ({} regressions)", self.regressions)
			}
		)
	}
}
