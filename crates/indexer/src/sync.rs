//! Sync orchestration: single-flight incremental scan passes.
//!
//! One pass: read the cursor, scan `(cursor, latest]` plus any blocks
//! that previously failed, classify newly found contracts, persist the
//! merged document. The persisted cache only ever changes here.

use crate::store::{merge, CacheStore};
use crate::tokens::TokenClassifier;
use chrono::Utc;
use scry_core::error::ScryResult;
use scry_core::{Cache, ScanProgress, SyncReport, SyncState};
use scry_provider::{BatchScanner, ChainReader, DEFAULT_WINDOW};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;

/// Drives incremental sync passes.
///
/// At most one pass is in flight at a time: concurrent callers serialize
/// on an async mutex, and a late caller re-reads the cursor under the
/// lock, finds itself at height, and returns the existing cache without
/// touching the node again.
pub struct SyncOrchestrator {
    reader: Arc<dyn ChainReader>,
    store: CacheStore,
    window: usize,
    gate: Mutex<()>,
    state_tx: watch::Sender<SyncState>,
    progress: Option<mpsc::UnboundedSender<ScanProgress>>,
    cancel: CancellationToken,
}

impl SyncOrchestrator {
    pub fn new(reader: Arc<dyn ChainReader>, store: CacheStore) -> Self {
        let (state_tx, _) = watch::channel(SyncState::Idle);
        Self {
            reader,
            store,
            window: DEFAULT_WINDOW,
            gate: Mutex::new(()),
            state_tx,
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Override the scan window (default: 20).
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    /// Publish scan progress events to `progress`.
    pub fn with_progress(mut self, progress: mpsc::UnboundedSender<ScanProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Abandon in-flight passes once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Observer for the orchestrator lifecycle.
    pub fn state(&self) -> watch::Receiver<SyncState> {
        self.state_tx.subscribe()
    }

    /// Reads the last-persisted snapshot without syncing. Never blocks on
    /// a pass in flight.
    pub fn snapshot(&self) -> Cache {
        self.store.load()
    }

    /// Runs one sync pass up to the current chain height.
    pub async fn sync(&self) -> ScryResult<(Cache, SyncReport)> {
        let _flight = self.gate.lock().await;
        let result = self.run_pass().await;
        self.state_tx.send_replace(SyncState::Idle);
        result
    }

    async fn run_pass(&self) -> ScryResult<(Cache, SyncReport)> {
        let started = Instant::now();
        self.state_tx.send_replace(SyncState::Scanning);

        // Height query failure is fatal for the whole pass.
        let latest = self.reader.latest_height().await?;
        let mut cache = self.store.load();
        let start_height = cache.last_scanned_block;

        // Blocks that failed in earlier passes go first, then the new range.
        let mut targets: Vec<u64> = cache.incomplete_blocks.iter().copied().collect();
        if !cache.is_synced_to(latest) {
            targets.extend(cache.next_block()..=latest);
        }

        if targets.is_empty() {
            tracing::debug!(latest, cursor = cache.last_scanned_block, "already at height");
            let report = SyncReport {
                start_height,
                end_height: cache.last_scanned_block,
                scanned_blocks: 0,
                new_transactions: 0,
                new_contracts: 0,
                new_tokens: 0,
                incomplete_blocks: Vec::new(),
                no_op: true,
                elapsed_ms: started.elapsed().as_millis() as u64,
            };
            return Ok((cache, report));
        }

        tracing::info!(
            latest,
            cursor = cache.last_scanned_block,
            targets = targets.len(),
            "syncing"
        );

        let mut scanner = BatchScanner::new(Arc::clone(&self.reader))
            .with_window(self.window)
            .with_cancellation(self.cancel.clone());
        if let Some(progress) = &self.progress {
            scanner = scanner.with_progress(progress.clone());
        }

        // A scan error aborts the pass; the persisted document is untouched.
        let outcome = scanner.scan(&targets).await?;

        let stats = merge(&mut cache, outcome.blocks);
        cache.incomplete_blocks = outcome.failed.iter().copied().collect();
        if !outcome.failed.is_empty() {
            tracing::warn!(blocks = ?outcome.failed, "incomplete blocks, retrying next sync");
        }

        self.state_tx.send_replace(SyncState::ClassifyingTokens);
        let classifier = TokenClassifier::new(Arc::clone(&self.reader));
        let new_tokens = classifier.classify_new(&mut cache, &stats.new_contracts).await;
        cache.sort_tokens();

        // The cursor covers the whole target range; incomplete blocks stay
        // tracked below it rather than holding every future pass back.
        cache.last_scanned_block = cache.last_scanned_block.max(latest as i64);
        cache.last_synced = Some(Utc::now());

        self.state_tx.send_replace(SyncState::Persisting);
        self.store.persist(&cache)?;

        let report = SyncReport {
            start_height,
            end_height: cache.last_scanned_block,
            scanned_blocks: stats.new_blocks,
            new_transactions: stats.new_transactions,
            new_contracts: stats.new_contracts.len() as u64,
            new_tokens,
            incomplete_blocks: outcome.failed,
            no_op: false,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        tracing::info!(
            cursor = cache.last_scanned_block,
            blocks = cache.blocks.len(),
            txs = cache.transactions.len(),
            tokens = cache.tokens.len(),
            contracts = cache.contracts.len(),
            elapsed_ms = report.elapsed_ms,
            "sync complete"
        );
        Ok((cache, report))
    }
}
