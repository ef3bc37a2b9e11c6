//! Indexer checkpoint persistence.
//!
//! The checkpoint is the first block the next scan pass starts from, stored
//! as `{ "lastProcessedBlock": <n> }`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{write_atomic, StorageError};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexCheckpoint {
	last_processed_block: u64,
}

/// File-backed indexer checkpoint.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
	path: PathBuf,
}

impl CheckpointStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Reads the checkpoint. A missing or unparsable file yields `None`.
	pub async fn load(&self) -> Result<Option<u64>, StorageError> {
		let bytes = match tokio::fs::read(&self.path).await {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		match serde_json::from_slice::<IndexCheckpoint>(&bytes) {
			Ok(checkpoint) => Ok(Some(checkpoint.last_processed_block)),
			Err(e) => {
				warn!(path = %self.path.display(), error = %e, "Ignoring unreadable checkpoint");
				Ok(None)
			},
		}
	}

	/// Atomically replaces the checkpoint.
	pub async fn save(&self, last_processed_block: u64) -> Result<(), StorageError> {
		let data = serde_json::to_vec_pretty(&IndexCheckpoint {
			last_processed_block,
		})
		.map_err(|e| StorageError::Serialization(e.to_string()))?;
		write_atomic(&self.path, &data).await
	}
}
