//! File-backed nonce ledger.
//!
//! The whole ledger is held in memory behind one async mutex and the file is
//! rewritten (temp file + rename) after every mutation, including garbage
//! collection. One mutex for all signers keeps reserve-after-check atomic.

use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use relayer_types::{current_timestamp_millis, NonceEntry};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::nonce_ledger::{clamp_ttl, LedgerState, NonceLedgerInterface};
use crate::{write_atomic, StorageError};

/// Nonce ledger persisted as a single JSON document.
pub struct FileNonceLedger {
	path: PathBuf,
	ttl: Duration,
	state: Mutex<LedgerState>,
}

impl FileNonceLedger {
	/// Opens the ledger at `path`, creating it if missing.
	///
	/// A file that cannot be parsed is logged and replaced by an empty ledger
	/// on the next write. `ttl` is raised to [`crate::MIN_NONCE_TTL`] if lower.
	pub async fn open(path: impl Into<PathBuf>, ttl: Duration) -> Result<Self, StorageError> {
		let path = path.into();
		let state = match tokio::fs::read(&path).await {
			Ok(bytes) => match LedgerState::from_json(&bytes) {
				Ok(state) => state,
				Err(e) => {
					warn!(path = %path.display(), error = %e, "Unreadable nonce ledger, starting empty");
					LedgerState::default()
				},
			},
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				write_atomic(&path, b"{}").await?;
				LedgerState::default()
			},
			Err(e) => {
				warn!(path = %path.display(), error = %e, "Failed to read nonce ledger, starting empty");
				LedgerState::default()
			},
		};

		info!(
			path = %path.display(),
			entries = state.len(),
			ttl_seconds = clamp_ttl(ttl).as_secs(),
			"Nonce ledger loaded"
		);

		Ok(Self {
			path,
			ttl: clamp_ttl(ttl),
			state: Mutex::new(state),
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	async fn persist(&self, state: &LedgerState) -> Result<(), StorageError> {
		write_atomic(&self.path, &state.to_json()?).await
	}

	/// Runs `op` under the ledger lock after garbage collection.
	///
	/// `op` returns its result and whether it changed the state; the file is
	/// rewritten if either `op` or collection changed anything.
	async fn with_state<R>(
		&self,
		op: impl FnOnce(&mut LedgerState, u64) -> (R, bool) + Send,
	) -> Result<R, StorageError> {
		let mut state = self.state.lock().await;
		let now = current_timestamp_millis();

		let removed = state.collect_garbage(now, self.ttl);
		if removed > 0 {
			debug!(removed, "Collected stale nonce reservations");
		}

		let (result, changed) = op(&mut state, now);
		if changed || removed > 0 {
			self.persist(&state).await?;
		}
		Ok(result)
	}
}

#[async_trait]
impl NonceLedgerInterface for FileNonceLedger {
	async fn is_used(&self, signer: Address, nonce: U256) -> Result<bool, StorageError> {
		self.with_state(|state, _| {
			let used = state.get(&signer, &nonce).is_some_and(|e| e.is_used());
			(used, false)
		})
		.await
	}

	async fn is_known(&self, signer: Address, nonce: U256) -> Result<bool, StorageError> {
		self.with_state(|state, _| (state.get(&signer, &nonce).is_some(), false))
			.await
	}

	async fn reserve(&self, signer: Address, nonce: U256) -> Result<(), StorageError> {
		self.with_state(|state, now| ((), state.reserve(&signer, &nonce, now)))
			.await
	}

	async fn mark_used(&self, signer: Address, nonce: U256) -> Result<(), StorageError> {
		self.with_state(|state, now| {
			state.mark_used(&signer, &nonce, now);
			((), true)
		})
		.await
	}

	async fn reserve_if_unknown(
		&self,
		signer: Address,
		nonce: U256,
	) -> Result<bool, StorageError> {
		self.with_state(|state, now| {
			let created = state.reserve(&signer, &nonce, now);
			(created, created)
		})
		.await
	}

	async fn entry(&self, signer: Address, nonce: U256) -> Result<Option<NonceEntry>, StorageError> {
		self.with_state(|state, _| (state.get(&signer, &nonce), false))
			.await
	}
}
