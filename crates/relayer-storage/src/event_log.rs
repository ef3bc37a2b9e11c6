//! Append-only executed-event store.
//!
//! One [`ExecutedEventRecord`] per line. Appends take an exclusive advisory
//! lock so concurrent writers never interleave partial lines. The indexer
//! may append the same record again after a restart; readers that need
//! uniqueness use [`EventLog::read_deduplicated`].

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use relayer_types::ExecutedEventRecord;
use tracing::warn;

use crate::StorageError;

#[derive(Debug, Clone)]
pub struct EventLog {
	path: PathBuf,
}

impl EventLog {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Appends one record as a single line.
	pub async fn append(&self, record: &ExecutedEventRecord) -> Result<(), StorageError> {
		let mut line =
			serde_json::to_vec(record).map_err(|e| StorageError::Serialization(e.to_string()))?;
		line.push(b'\n');

		let path = self.path.clone();
		tokio::task::spawn_blocking(move || {
			if let Some(parent) = path.parent() {
				if !parent.as_os_str().is_empty() {
					std::fs::create_dir_all(parent).map_err(|e| {
						StorageError::Backend(format!("Failed to create directory: {e}"))
					})?;
				}
			}

			let mut file = std::fs::OpenOptions::new()
				.create(true)
				.append(true)
				.open(&path)
				.map_err(|e| StorageError::Backend(format!("Failed to open event log: {e}")))?;

			FileExt::lock_exclusive(&file)
				.map_err(|e| StorageError::Backend(format!("Failed to acquire lock: {e}")))?;
			let written = file.write_all(&line).and_then(|_| file.flush());
			let _ = FileExt::unlock(&file);

			written.map_err(|e| StorageError::Backend(format!("Failed to append event: {e}")))
		})
		.await
		.map_err(|e| StorageError::Backend(format!("Failed to spawn blocking task: {e}")))?
	}

	/// Reads every record in file order. Unparsable lines are skipped.
	/// A missing file reads as empty.
	pub async fn read_all(&self) -> Result<Vec<ExecutedEventRecord>, StorageError> {
		let content = match tokio::fs::read_to_string(&self.path).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let mut records = Vec::new();
		for (index, line) in content.lines().enumerate() {
			if line.trim().is_empty() {
				continue;
			}
			match serde_json::from_str::<ExecutedEventRecord>(line) {
				Ok(record) => records.push(record),
				Err(e) => warn!(line = index + 1, error = %e, "Skipping malformed event line"),
			}
		}
		Ok(records)
	}

	/// Reads records keeping only the first occurrence of each
	/// (transaction hash, log index).
	pub async fn read_deduplicated(&self) -> Result<Vec<ExecutedEventRecord>, StorageError> {
		let mut seen = HashSet::new();
		Ok(self
			.read_all()
			.await?
			.into_iter()
			.filter(|record| seen.insert(record.dedup_key()))
			.collect())
	}
}
