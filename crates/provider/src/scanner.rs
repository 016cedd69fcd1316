//! Windowed batch scanner with bounded concurrency and per-block retry.
//!
//! Fetches explicit block-number targets in sequential windows. Fetches
//! inside a window run concurrently; blocks are still emitted in ascending
//! number order. A block that keeps failing is reported, not fatal.

use crate::ChainReader;
use scry_core::error::{ScryError, ScryResult};
use scry_core::{BlockSummary, ChainBlock, ScanOutcome, ScanProgress, ScannedBlock, TxSummary};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Concurrent block fetches per window. Windows run sequentially to bound
/// memory and node load.
pub const DEFAULT_WINDOW: usize = 20;

/// Attempts per block before it is reported as incomplete.
const MAX_RETRIES: u32 = 3;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

/// Windowed scanner over a [`ChainReader`].
///
/// ```ignore
/// let scanner = BatchScanner::new(reader).with_window(20);
/// let outcome = scanner.scan(&targets).await?;
/// ```
pub struct BatchScanner {
    reader: Arc<dyn ChainReader>,
    window: usize,
    progress: Option<mpsc::UnboundedSender<ScanProgress>>,
    cancel: CancellationToken,
}

impl BatchScanner {
    pub fn new(reader: Arc<dyn ChainReader>) -> Self {
        Self {
            reader,
            window: DEFAULT_WINDOW,
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Override the per-window fan-out (default: 20).
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    /// Publish a [`ScanProgress`] event after each window closes.
    pub fn with_progress(mut self, progress: mpsc::UnboundedSender<ScanProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Abandon the scan at the next window boundary once cancelled. No new
    /// node requests are issued after cancellation.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Scans `targets` (ascending block numbers) window by window.
    ///
    /// Failures are isolated per block: a block that exhausts its retries
    /// lands in [`ScanOutcome::failed`] without aborting its siblings.
    pub async fn scan(&self, targets: &[u64]) -> ScryResult<ScanOutcome> {
        let total = targets.len() as u64;
        let mut outcome = ScanOutcome::default();
        let mut attempted = 0u64;

        tracing::info!(targets = total, window = self.window, "scanning");

        for window in targets.chunks(self.window) {
            if self.cancel.is_cancelled() {
                tracing::info!(attempted, total, "scan cancelled");
                return Err(ScryError::Cancelled);
            }

            let mut tasks = JoinSet::new();
            for &number in window {
                let reader = Arc::clone(&self.reader);
                let cancel = self.cancel.clone();
                tasks.spawn(async move {
                    (number, fetch_block_with_retry(reader, number, cancel).await)
                });
            }

            let mut fetched: HashMap<u64, ScannedBlock> = HashMap::new();
            while let Some(result) = tasks.join_next().await {
                match result {
                    Ok((number, Ok(block))) => {
                        fetched.insert(number, block);
                    }
                    Ok((number, Err(e))) => {
                        tracing::warn!(number, error = %e, "block fetch failed");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "scan task panicked");
                    }
                }
            }

            // Emit in target order, not completion order.
            for &number in window {
                match fetched.remove(&number) {
                    Some(block) => outcome.blocks.push(block),
                    None => outcome.failed.push(number),
                }
            }

            attempted += window.len() as u64;
            if let Some(progress) = &self.progress {
                let _ = progress.send(ScanProgress {
                    scanned: attempted,
                    total,
                });
            }
        }

        tracing::info!(
            fetched = outcome.blocks.len(),
            failed = outcome.failed.len(),
            "scan done"
        );
        Ok(outcome)
    }
}

/// Fetch one block with exponential backoff, then extract its summary,
/// transactions, and any contract creations.
async fn fetch_block_with_retry(
    reader: Arc<dyn ChainReader>,
    number: u64,
    cancel: CancellationToken,
) -> Result<ScannedBlock, String> {
    let mut last_err = String::new();
    for attempt in 0..=MAX_RETRIES {
        if cancel.is_cancelled() {
            return Err("cancelled".into());
        }
        if attempt > 0 {
            tokio::time::sleep(RETRY_BASE_DELAY * 2u32.pow(attempt - 1)).await;
        }

        match reader.get_block(number.into(), true).await {
            Ok(Some(block)) => return Ok(extract_block(reader.as_ref(), block).await),
            Ok(None) => last_err = format!("block {number} not found"),
            Err(e) => last_err = format!("{e}"),
        }
    }
    Err(last_err)
}

/// The per-block visitor step: summary, tx summaries, creation targets.
async fn extract_block(reader: &dyn ChainReader, block: ChainBlock) -> ScannedBlock {
    let mut transactions = Vec::with_capacity(block.transactions.len());
    let mut created_contracts = Vec::new();

    for tx in &block.transactions {
        transactions.push(TxSummary {
            hash: tx.hash,
            from: tx.from,
            to: tx.to,
            value_wei: tx.value.to_string(),
            block_number: block.number,
            timestamp: block.timestamp,
            gas_price_wei: tx.gas_price.to_string(),
        });

        // The deploy address only exists in the receipt. A failed lookup
        // loses the contract, not the block.
        if tx.to.is_none() {
            match reader.get_receipt(tx.hash).await {
                Ok(Some(receipt)) => {
                    if let Some(addr) = receipt.contract_address {
                        created_contracts.push(addr);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(tx = %tx.hash, error = %e, "receipt lookup failed");
                }
            }
        }
    }

    ScannedBlock {
        summary: BlockSummary {
            number: block.number,
            timestamp: block.timestamp,
            miner: block.miner,
            tx_count: block.transactions.len() as u32,
            gas_used: block.gas_used,
            gas_limit: block.gas_limit,
        },
        transactions,
        created_contracts,
    }
}
