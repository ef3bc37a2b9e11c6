//! Nonce ledger record types.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a nonce for a given signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonceStatus {
	/// Handed out by the build endpoint, not yet consumed on chain.
	Reserved,
	/// Consumed by a successful execution.
	Used,
}

/// A single ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceEntry {
	pub status: NonceStatus,
	/// Milliseconds since the Unix epoch at which the entry was last written.
	pub ts: u64,
}

impl NonceEntry {
	pub fn reserved(ts: u64) -> Self {
		Self {
			status: NonceStatus::Reserved,
			ts,
		}
	}

	pub fn used(ts: u64) -> Self {
		Self {
			status: NonceStatus::Used,
			ts,
		}
	}

	pub fn is_used(&self) -> bool {
		self.status == NonceStatus::Used
	}
}
