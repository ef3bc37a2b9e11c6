//! `IntentExecuted` indexer.
//!
//! [`ChainIndexer`] follows the settlement contract from a persisted
//! checkpoint to the chain head, one small block range at a time, and
//! appends every executed intent to the JSONL event log. The checkpoint is
//! only written after a pass has drained the whole range up to the head it
//! observed, so an interrupted or failed pass is re-scanned from the last
//! checkpoint on the next start. Duplicate appends across restarts are
//! expected; readers dedup on `(txHash, logIndex)`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use relayer_config::Config;
use relayer_delivery::{ChainInterface, DeliveryError};
use relayer_storage::{CheckpointStore, EventLog, StorageError};
use relayer_types::{
	decode_intent_executed, ChainLog, ExecutedEventRecord, IntentExecutedPayload,
	INTENT_EXECUTED_TOPIC,
};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

/// Errors that end an indexing run.
#[derive(Debug, Error)]
pub enum IndexerError {
	#[error("Chain error: {0}")]
	Chain(#[from] DeliveryError),
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

#[derive(Debug, Clone)]
pub struct IndexerSettings {
	pub settlement: Address,
	/// Recorded on every event; the settlement is deployed on one chain.
	pub chain_id: u64,
	/// First block to scan when no checkpoint exists.
	pub start_block: Option<u64>,
	/// Without a checkpoint or start block, scan this many blocks back from head.
	pub lookback_blocks: u64,
	/// Block span of one `eth_getLogs` query.
	pub chunk_size: u64,
	pub poll_interval: Duration,
}

impl IndexerSettings {
	pub fn from_config(config: &Config) -> Self {
		let indexer = &config.indexer;
		Self {
			settlement: config.relayer.settlement,
			chain_id: config.relayer.chain_id,
			start_block: indexer.start_block,
			lookback_blocks: indexer.lookback_blocks,
			chunk_size: indexer.chunk_size.max(1),
			poll_interval: Duration::from_secs(indexer.poll_interval_seconds),
		}
	}
}

/// How a single pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
	/// Nothing to scan; the cursor is past the head.
	Idle,
	/// The range was drained and the checkpoint now points at `next_block`.
	Completed { next_block: u64 },
	/// Shutdown was requested between chunks; no checkpoint was written.
	Interrupted,
}

pub struct ChainIndexer {
	chain: Arc<dyn ChainInterface>,
	events: EventLog,
	checkpoint: CheckpointStore,
	settings: IndexerSettings,
	// (txHash, logIndex) keys appended during this process lifetime
	seen: HashSet<String>,
}

impl ChainIndexer {
	pub fn new(
		chain: Arc<dyn ChainInterface>,
		events: EventLog,
		checkpoint: CheckpointStore,
		settings: IndexerSettings,
	) -> Self {
		Self {
			chain,
			events,
			checkpoint,
			settings,
			seen: HashSet::new(),
		}
	}

	/// Checkpoint if present, else the configured start block, else
	/// `head - lookback` floored at zero.
	pub async fn resolve_start_block(&self) -> Result<u64, IndexerError> {
		if let Some(block) = self.checkpoint.load().await? {
			return Ok(block);
		}
		if let Some(block) = self.settings.start_block {
			return Ok(block);
		}
		let head = self.chain.current_block_number().await?;
		Ok(head.saturating_sub(self.settings.lookback_blocks))
	}

	/// Runs passes until shutdown is requested or an error occurs.
	pub async fn run(mut self, mut stop_rx: broadcast::Receiver<()>) -> Result<(), IndexerError> {
		let mut cursor = self.resolve_start_block().await?;
		info!(from_block = cursor, "Starting from block");

		loop {
			match self.run_pass(cursor, &mut stop_rx).await? {
				PassOutcome::Interrupted => break,
				PassOutcome::Completed { next_block } => cursor = next_block,
				PassOutcome::Idle => {},
			}

			tokio::select! {
				_ = tokio::time::sleep(self.settings.poll_interval) => {},
				_ = stop_rx.recv() => break,
			}
		}

		info!(next_block = cursor, "Indexer stopped");
		Ok(())
	}

	/// Scans `[from_block, head]` in chunks and checkpoints `head + 1`.
	pub async fn run_pass(
		&mut self,
		from_block: u64,
		stop_rx: &mut broadcast::Receiver<()>,
	) -> Result<PassOutcome, IndexerError> {
		let head = self.chain.current_block_number().await?;
		if from_block > head {
			debug!(from_block, head, "No new blocks");
			return Ok(PassOutcome::Idle);
		}

		let mut chunk_from = from_block;
		while chunk_from <= head {
			if stop_requested(stop_rx) {
				info!(chunk_from, head, "Shutdown requested, leaving checkpoint untouched");
				return Ok(PassOutcome::Interrupted);
			}
			let chunk_to = chunk_from
				.saturating_add(self.settings.chunk_size.max(1) - 1)
				.min(head);
			self.scan_chunk(chunk_from, chunk_to).await?;
			chunk_from = chunk_to + 1;
		}

		let next_block = head + 1;
		self.checkpoint.save(next_block).await?;
		debug!(next_block, "Checkpoint saved");
		Ok(PassOutcome::Completed { next_block })
	}

	/// Fetches and records the events of one block range. Returns how many
	/// new records were appended.
	async fn scan_chunk(&mut self, from_block: u64, to_block: u64) -> Result<usize, IndexerError> {
		let logs = self
			.chain
			.get_logs(
				self.settings.settlement,
				INTENT_EXECUTED_TOPIC,
				from_block,
				to_block,
			)
			.await?;

		let mut appended = 0;
		for log in &logs {
			let Some(record) = self.to_record(log) else {
				continue;
			};
			if !self.seen.insert(record.dedup_key()) {
				continue;
			}
			self.events.append(&record).await?;
			appended += 1;
			info!(
				block_number = record.block_number,
				tx_hash = %record.tx_hash,
				log_index = record.log_index,
				signer = %record.event.signer,
				nonce = %record.event.nonce,
				amount_out = %record.event.amount_out,
				"IntentExecuted"
			);
		}
		Ok(appended)
	}

	fn to_record(&self, log: &ChainLog) -> Option<ExecutedEventRecord> {
		let (Some(block_number), Some(tx_hash), Some(log_index)) =
			(log.block_number, log.transaction_hash, log.log_index)
		else {
			warn!("Skipping log without block coordinates");
			return None;
		};
		let Some(event) = decode_intent_executed(log) else {
			warn!(tx_hash = %tx_hash, log_index, "Skipping undecodable IntentExecuted log");
			return None;
		};
		Some(ExecutedEventRecord {
			chain_id: self.settings.chain_id,
			block_number,
			tx_hash: tx_hash.to_string(),
			log_index,
			event: IntentExecutedPayload::from(&event),
		})
	}
}

// A closed or lagged channel also counts as a stop request.
fn stop_requested(stop_rx: &mut broadcast::Receiver<()>) -> bool {
	!matches!(stop_rx.try_recv(), Err(TryRecvError::Empty))
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, B256, U256};
	use alloy_sol_types::SolEvent;
	use mockall::Sequence;
	use relayer_delivery::MockChainInterface;
	use relayer_types::IntentExecuted;
	use std::sync::Mutex;
	use tempfile::TempDir;

	const SETTLEMENT: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");

	fn settings() -> IndexerSettings {
		IndexerSettings {
			settlement: SETTLEMENT,
			chain_id: 8453,
			start_block: None,
			lookback_blocks: 50_000,
			chunk_size: 10,
			poll_interval: Duration::from_millis(10),
		}
	}

	fn executed_log(block: u64, tx_byte: u8, log_index: u64, nonce: u64) -> ChainLog {
		let event = IntentExecuted {
			signer: address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
			adapter: address!("631B038B3Cf7Ac5f513dC74750345E48beceBCC0"),
			tokenIn: address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
			tokenOut: address!("4200000000000000000000000000000000000006"),
			amountIn: U256::from(1_000_000u64),
			amountOut: U256::from(990u64),
			feePaid: U256::from(10u64),
			nonce: U256::from(nonce),
		};
		let data = event.encode_log_data();
		ChainLog {
			address: SETTLEMENT,
			topics: data.topics().to_vec(),
			data: data.data.clone(),
			block_number: Some(block),
			transaction_hash: Some(B256::repeat_byte(tx_byte)),
			log_index: Some(log_index),
		}
	}

	fn make_indexer(
		dir: &TempDir,
		chain: MockChainInterface,
		settings: IndexerSettings,
	) -> ChainIndexer {
		ChainIndexer::new(
			Arc::new(chain),
			EventLog::new(dir.path().join("intents.jsonl")),
			CheckpointStore::new(dir.path().join("index_state.json")),
			settings,
		)
	}

	#[tokio::test]
	async fn test_start_block_prefers_checkpoint() {
		let dir = TempDir::new().unwrap();
		CheckpointStore::new(dir.path().join("index_state.json"))
			.save(1234)
			.await
			.unwrap();
		let mut chain = MockChainInterface::new();
		chain.expect_current_block_number().never();
		let mut settings = settings();
		settings.start_block = Some(10);

		let indexer = make_indexer(&dir, chain, settings);
		assert_eq!(indexer.resolve_start_block().await.unwrap(), 1234);
	}

	#[tokio::test]
	async fn test_start_block_uses_configured_block() {
		let dir = TempDir::new().unwrap();
		let mut chain = MockChainInterface::new();
		chain.expect_current_block_number().never();
		let mut settings = settings();
		settings.start_block = Some(10);

		let indexer = make_indexer(&dir, chain, settings);
		assert_eq!(indexer.resolve_start_block().await.unwrap(), 10);
	}

	#[tokio::test]
	async fn test_start_block_lookback_floors_at_zero() {
		let dir = TempDir::new().unwrap();
		let mut chain = MockChainInterface::new();
		chain
			.expect_current_block_number()
			.returning(|| Box::pin(async { Ok(20_000) }));
		let indexer = make_indexer(&dir, chain, settings());
		assert_eq!(indexer.resolve_start_block().await.unwrap(), 0);

		let mut chain = MockChainInterface::new();
		chain
			.expect_current_block_number()
			.returning(|| Box::pin(async { Ok(80_000) }));
		let indexer = make_indexer(&dir, chain, settings());
		assert_eq!(indexer.resolve_start_block().await.unwrap(), 30_000);
	}

	#[tokio::test]
	async fn test_pass_scans_chunks_in_order_and_checkpoints() {
		let dir = TempDir::new().unwrap();
		let mut chain = MockChainInterface::new();
		chain
			.expect_current_block_number()
			.returning(|| Box::pin(async { Ok(125) }));

		let mut seq = Sequence::new();
		for (from, to) in [(100u64, 109u64), (110, 119), (120, 125)] {
			chain
				.expect_get_logs()
				.withf(move |contract, topic, f, t| {
					*contract == SETTLEMENT && *topic == INTENT_EXECUTED_TOPIC && *f == from && *t == to
				})
				.times(1)
				.in_sequence(&mut seq)
				.returning(move |_, _, from, _| {
					let logs = if from == 110 {
						vec![executed_log(113, 0xaa, 0, 1), executed_log(115, 0xbb, 2, 2)]
					} else {
						vec![]
					};
					Box::pin(async move { Ok(logs) })
				});
		}

		let mut indexer = make_indexer(&dir, chain, settings());
		let (_stop_tx, mut stop_rx) = broadcast::channel(1);
		let outcome = indexer.run_pass(100, &mut stop_rx).await.unwrap();

		assert_eq!(outcome, PassOutcome::Completed { next_block: 126 });
		let records = indexer.events.read_all().await.unwrap();
		assert_eq!(records.len(), 2);
		assert_eq!(records[0].block_number, 113);
		assert_eq!(records[0].chain_id, 8453);
		assert_eq!(records[0].event.amount_out, "990");
		assert_eq!(records[1].log_index, 2);
		assert_eq!(indexer.checkpoint.load().await.unwrap(), Some(126));
	}

	#[tokio::test]
	async fn test_pass_deduplicates_within_process() {
		let dir = TempDir::new().unwrap();
		let mut chain = MockChainInterface::new();
		chain
			.expect_current_block_number()
			.returning(|| Box::pin(async { Ok(15) }));
		chain.expect_get_logs().times(2).returning(|_, _, _, _| {
			Box::pin(async { Ok(vec![executed_log(12, 0xcc, 1, 5)]) })
		});

		let mut indexer = make_indexer(&dir, chain, settings());
		let (_stop_tx, mut stop_rx) = broadcast::channel(1);
		indexer.run_pass(0, &mut stop_rx).await.unwrap();

		assert_eq!(indexer.events.read_all().await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_pass_idle_when_cursor_past_head() {
		let dir = TempDir::new().unwrap();
		let mut chain = MockChainInterface::new();
		chain
			.expect_current_block_number()
			.returning(|| Box::pin(async { Ok(99) }));
		chain.expect_get_logs().never();

		let mut indexer = make_indexer(&dir, chain, settings());
		let (_stop_tx, mut stop_rx) = broadcast::channel(1);

		assert_eq!(indexer.run_pass(100, &mut stop_rx).await.unwrap(), PassOutcome::Idle);
		assert_eq!(indexer.checkpoint.load().await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_rpc_failure_does_not_advance_checkpoint() {
		let dir = TempDir::new().unwrap();
		let mut chain = MockChainInterface::new();
		chain
			.expect_current_block_number()
			.returning(|| Box::pin(async { Ok(30) }));
		chain.expect_get_logs().returning(|_, _, from, _| {
			Box::pin(async move {
				if from == 0 {
					Ok(vec![])
				} else {
					Err(DeliveryError::Network("range too large".into()))
				}
			})
		});

		let mut indexer = make_indexer(&dir, chain, settings());
		let (_stop_tx, mut stop_rx) = broadcast::channel(1);

		let err = indexer.run_pass(0, &mut stop_rx).await.unwrap_err();
		assert!(matches!(err, IndexerError::Chain(_)));
		assert_eq!(indexer.checkpoint.load().await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_stop_between_chunks_skips_checkpoint() {
		let dir = TempDir::new().unwrap();
		let mut chain = MockChainInterface::new();
		chain
			.expect_current_block_number()
			.returning(|| Box::pin(async { Ok(50) }));
		chain.expect_get_logs().never();

		let mut indexer = make_indexer(&dir, chain, settings());
		let (stop_tx, mut stop_rx) = broadcast::channel(1);
		stop_tx.send(()).unwrap();

		assert_eq!(
			indexer.run_pass(0, &mut stop_rx).await.unwrap(),
			PassOutcome::Interrupted
		);
		assert_eq!(indexer.checkpoint.load().await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_resume_from_checkpoint_scans_no_earlier_blocks() {
		let dir = TempDir::new().unwrap();
		CheckpointStore::new(dir.path().join("index_state.json"))
			.save(40)
			.await
			.unwrap();
		let mut chain = MockChainInterface::new();
		chain
			.expect_current_block_number()
			.returning(|| Box::pin(async { Ok(45) }));
		chain
			.expect_get_logs()
			.withf(|_, _, from, _| *from >= 40)
			.returning(|_, _, _, _| Box::pin(async { Ok(vec![]) }));

		let mut indexer = make_indexer(&dir, chain, settings());
		let start = indexer.resolve_start_block().await.unwrap();
		let (_stop_tx, mut stop_rx) = broadcast::channel(1);

		assert_eq!(
			indexer.run_pass(start, &mut stop_rx).await.unwrap(),
			PassOutcome::Completed { next_block: 46 }
		);
	}

	// Blocks carrying one IntentExecuted each, spread across chunk edges.
	const EVENT_BLOCKS: [u64; 6] = [3, 17, 29, 30, 44, 58];

	/// A chain at `head` serving `EVENT_BLOCKS`, recording every queried range.
	fn chain_at(head: u64, queried: Arc<Mutex<Vec<(u64, u64)>>>) -> MockChainInterface {
		let mut chain = MockChainInterface::new();
		chain
			.expect_current_block_number()
			.returning(move || Box::pin(async move { Ok(head) }));
		chain.expect_get_logs().returning(move |_, _, from, to| {
			queried.lock().unwrap().push((from, to));
			let logs = EVENT_BLOCKS
				.iter()
				.filter(|block| (from..=to).contains(*block))
				.map(|block| executed_log(*block, *block as u8, 0, *block))
				.collect::<Vec<_>>();
			Box::pin(async move { Ok(logs) })
		});
		chain
	}

	#[tokio::test]
	async fn test_restart_at_boundary_matches_uninterrupted_run() {
		let mut settings = settings();
		settings.start_block = Some(0);
		let (_stop_tx, mut stop_rx) = broadcast::channel(1);

		// Stopped after head 29, then a fresh process resumes to head 59.
		let restarted = TempDir::new().unwrap();
		let queried = Arc::new(Mutex::new(Vec::new()));
		let mut first = make_indexer(&restarted, chain_at(29, queried.clone()), settings.clone());
		let start = first.resolve_start_block().await.unwrap();
		assert_eq!(
			first.run_pass(start, &mut stop_rx).await.unwrap(),
			PassOutcome::Completed { next_block: 30 }
		);
		drop(first);

		let mut second = make_indexer(&restarted, chain_at(59, queried.clone()), settings.clone());
		let start = second.resolve_start_block().await.unwrap();
		assert_eq!(start, 30);
		assert_eq!(
			second.run_pass(start, &mut stop_rx).await.unwrap(),
			PassOutcome::Completed { next_block: 60 }
		);

		let straight = TempDir::new().unwrap();
		let chain = chain_at(59, Arc::new(Mutex::new(Vec::new())));
		let mut single = make_indexer(&straight, chain, settings);
		single.run_pass(0, &mut stop_rx).await.unwrap();

		// Ranges are contiguous from 0 to 59: no block scanned twice, none skipped.
		let ranges = queried.lock().unwrap().clone();
		let mut next = 0;
		for (from, to) in &ranges {
			assert_eq!(*from, next);
			assert!(to >= from);
			next = to + 1;
		}
		assert_eq!(next, 60);

		let resumed = EventLog::new(restarted.path().join("intents.jsonl"))
			.read_deduplicated()
			.await
			.unwrap();
		let uninterrupted = EventLog::new(straight.path().join("intents.jsonl"))
			.read_deduplicated()
			.await
			.unwrap();
		assert_eq!(resumed.len(), EVENT_BLOCKS.len());
		assert_eq!(resumed, uninterrupted);
	}

	#[tokio::test]
	async fn test_run_until_stopped() {
		let dir = TempDir::new().unwrap();
		let mut chain = MockChainInterface::new();
		chain
			.expect_current_block_number()
			.returning(|| Box::pin(async { Ok(5) }));
		chain.expect_get_logs().returning(|_, _, _, _| {
			Box::pin(async { Ok(vec![executed_log(3, 0xdd, 0, 9)]) })
		});
		let mut settings = settings();
		settings.start_block = Some(0);

		let indexer = make_indexer(&dir, chain, settings);
		let (stop_tx, stop_rx) = broadcast::channel(1);
		let handle = tokio::spawn(indexer.run(stop_rx));

		tokio::time::sleep(Duration::from_millis(100)).await;
		stop_tx.send(()).unwrap();
		handle.await.unwrap().unwrap();

		let checkpoint = CheckpointStore::new(dir.path().join("index_state.json"));
		assert_eq!(checkpoint.load().await.unwrap(), Some(6));
		let events = EventLog::new(dir.path().join("intents.jsonl"));
		assert_eq!(events.read_all().await.unwrap().len(), 1);
	}
}
