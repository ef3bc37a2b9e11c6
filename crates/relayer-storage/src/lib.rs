//! Storage module for the intent relayer.
//!
//! Three stores live here, all plain files so an operator can inspect them:
//!
//! - the nonce ledger (`nonces.json`), a map of signer to nonce to
//!   reservation state, rewritten whole on every mutation;
//! - the indexer checkpoint (`index_state.json`), the next block to scan;
//! - the executed-event log (`intents.jsonl`), one JSON record per line,
//!   append-only.

pub mod checkpoint;
pub mod event_log;
pub mod implementations;
pub mod nonce_ledger;

pub use checkpoint::CheckpointStore;
pub use event_log::EventLog;
pub use implementations::file::FileNonceLedger;
pub use implementations::memory::MemoryNonceLedger;
pub use nonce_ledger::{LedgerState, NonceLedgerInterface, MIN_NONCE_TTL};

#[cfg(feature = "testing")]
pub use nonce_ledger::MockNonceLedgerInterface;

use std::path::Path;

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Writes `data` to `path` atomically by writing a sibling temp file and
/// renaming it over the target. Parent directories are created as needed.
pub(crate) async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StorageError> {
	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() {
			tokio::fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(format!("Failed to create directory: {e}")))?;
		}
	}

	let temp_path = path.with_extension("tmp");
	tokio::fs::write(&temp_path, data)
		.await
		.map_err(|e| StorageError::Backend(e.to_string()))?;

	tokio::fs::rename(&temp_path, path)
		.await
		.map_err(|e| StorageError::Backend(e.to_string()))?;

	Ok(())
}
