//! In-memory nonce ledger, for tests and ephemeral deployments.

use std::time::Duration;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use relayer_types::{current_timestamp_millis, NonceEntry};
use tokio::sync::Mutex;

use crate::nonce_ledger::{clamp_ttl, LedgerState, NonceLedgerInterface};
use crate::StorageError;

/// Nonce ledger that never touches disk.
pub struct MemoryNonceLedger {
	ttl: Duration,
	state: Mutex<LedgerState>,
}

impl MemoryNonceLedger {
	pub fn new(ttl: Duration) -> Self {
		Self {
			ttl: clamp_ttl(ttl),
			state: Mutex::new(LedgerState::default()),
		}
	}

	/// Snapshot of the current contents.
	pub async fn snapshot(&self) -> LedgerState {
		self.state.lock().await.clone()
	}

	async fn with_state<R>(&self, op: impl FnOnce(&mut LedgerState, u64) -> R + Send) -> R {
		let mut state = self.state.lock().await;
		let now = current_timestamp_millis();
		state.collect_garbage(now, self.ttl);
		op(&mut state, now)
	}
}

impl Default for MemoryNonceLedger {
	fn default() -> Self {
		Self::new(Duration::from_secs(1200))
	}
}

#[async_trait]
impl NonceLedgerInterface for MemoryNonceLedger {
	async fn is_used(&self, signer: Address, nonce: U256) -> Result<bool, StorageError> {
		Ok(self
			.with_state(|state, _| state.get(&signer, &nonce).is_some_and(|e| e.is_used()))
			.await)
	}

	async fn is_known(&self, signer: Address, nonce: U256) -> Result<bool, StorageError> {
		Ok(self
			.with_state(|state, _| state.get(&signer, &nonce).is_some())
			.await)
	}

	async fn reserve(&self, signer: Address, nonce: U256) -> Result<(), StorageError> {
		self.with_state(|state, now| {
			state.reserve(&signer, &nonce, now);
		})
		.await;
		Ok(())
	}

	async fn mark_used(&self, signer: Address, nonce: U256) -> Result<(), StorageError> {
		self.with_state(|state, now| state.mark_used(&signer, &nonce, now))
			.await;
		Ok(())
	}

	async fn reserve_if_unknown(
		&self,
		signer: Address,
		nonce: U256,
	) -> Result<bool, StorageError> {
		Ok(self
			.with_state(|state, now| state.reserve(&signer, &nonce, now))
			.await)
	}

	async fn entry(&self, signer: Address, nonce: U256) -> Result<Option<NonceEntry>, StorageError> {
		Ok(self.with_state(|state, _| state.get(&signer, &nonce)).await)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	#[tokio::test]
	async fn test_memory_ledger_lifecycle() {
		let ledger = MemoryNonceLedger::default();
		let signer = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
		let nonce = U256::from(3u64);

		assert!(ledger.reserve_if_unknown(signer, nonce).await.unwrap());
		assert!(!ledger.reserve_if_unknown(signer, nonce).await.unwrap());
		assert!(!ledger.is_used(signer, nonce).await.unwrap());

		ledger.mark_used(signer, nonce).await.unwrap();
		assert!(ledger.is_used(signer, nonce).await.unwrap());
		assert_eq!(ledger.snapshot().await.len(), 1);
	}
}
