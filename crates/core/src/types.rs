//! Domain types for the scry explorer.

use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Chain data, as delivered by the node
// ---------------------------------------------------------------------------

/// A block fetched from the node, with embedded transactions.
#[derive(Debug, Clone)]
pub struct ChainBlock {
    pub number: u64,
    pub timestamp: u64,
    pub miner: Address,
    pub gas_used: u64,
    pub gas_limit: u64,
    pub transactions: Vec<ChainTx>,
}

/// The transaction fields the indexer consumes.
#[derive(Debug, Clone)]
pub struct ChainTx {
    pub hash: B256,
    /// `None` marks a contract-creation transaction.
    pub to: Option<Address>,
    pub from: Address,
    pub value: U256,
    pub gas_price: u128,
}

/// The receipt fields the indexer consumes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptInfo {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    /// Set when the transaction deployed a contract.
    pub contract_address: Option<Address>,
    pub gas_used: u64,
    pub success: bool,
}

/// A transaction looked up by hash, joined with its receipt when mined.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxLookup {
    pub hash: B256,
    pub from: Address,
    pub to: Option<Address>,
    pub value_wei: String,
    pub gas_price_wei: String,
    pub block_number: Option<u64>,
    pub receipt: Option<ReceiptInfo>,
}

// ---------------------------------------------------------------------------
// Persisted cache
// ---------------------------------------------------------------------------

/// One scanned block's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    pub number: u64,
    pub timestamp: u64,
    pub miner: Address,
    pub tx_count: u32,
    pub gas_used: u64,
    pub gas_limit: u64,
}

/// One cached transaction.
///
/// Wei amounts are decimal strings: they exceed `u64`, and the JSON document
/// must stay readable by consumers without big-integer support.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxSummary {
    pub hash: B256,
    pub from: Address,
    pub to: Option<Address>,
    pub value_wei: String,
    pub block_number: u64,
    pub timestamp: u64,
    pub gas_price_wei: String,
}

/// A contract classified as an ERC-20 token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply_raw: String,
    /// `total_supply_raw / 10^decimals`. Display only, never used for math.
    pub total_supply_formatted: f64,
}

/// The persisted aggregate. Mutated only by the sync orchestrator and
/// rewritten in full after each pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cache {
    /// Highest fully processed block number. `-1` = never synced.
    pub last_scanned_block: i64,
    /// Ascending by block number, unique by `number`.
    pub blocks: Vec<BlockSummary>,
    /// Ascending by block number, then in-block order; unique by `hash`.
    pub transactions: Vec<TxSummary>,
    /// Contract-creation targets, deduplicated, discovery order.
    pub contracts: Vec<Address>,
    /// Contracts already probed for ERC-20, regardless of outcome.
    pub checked_contracts: Vec<Address>,
    /// Unique by `address`, sorted descending by formatted supply.
    pub tokens: Vec<TokenRecord>,
    /// Blocks at or below the cursor whose fetch failed after all retries.
    /// Retried at the start of every subsequent sync.
    pub incomplete_blocks: BTreeSet<u64>,
    pub last_synced: Option<DateTime<Utc>>,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            last_scanned_block: -1,
            blocks: Vec::new(),
            transactions: Vec::new(),
            contracts: Vec::new(),
            checked_contracts: Vec::new(),
            tokens: Vec::new(),
            incomplete_blocks: BTreeSet::new(),
            last_synced: None,
        }
    }
}

impl Cache {
    pub fn empty() -> Self {
        Self::default()
    }

    /// First block number the next sync pass should request.
    pub fn next_block(&self) -> u64 {
        (self.last_scanned_block + 1) as u64
    }

    pub fn is_synced_to(&self, height: u64) -> bool {
        self.last_scanned_block >= 0 && self.last_scanned_block as u64 >= height
    }

    /// Cached transactions touching `addr`, in cache order.
    pub fn address_history(&self, addr: Address) -> Vec<&TxSummary> {
        self.transactions
            .iter()
            .filter(|tx| tx.from == addr || tx.to == Some(addr))
            .collect()
    }

    /// Re-establishes the descending-supply ordering after token updates.
    pub fn sort_tokens(&mut self) {
        self.tokens.sort_by(|a, b| {
            b.total_supply_formatted
                .partial_cmp(&a.total_supply_formatted)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}

// ---------------------------------------------------------------------------
// Scan output
// ---------------------------------------------------------------------------

/// Everything the scanner extracted from one block.
#[derive(Debug, Clone)]
pub struct ScannedBlock {
    pub summary: BlockSummary,
    pub transactions: Vec<TxSummary>,
    /// Deploy targets of contract-creation transactions in this block.
    pub created_contracts: Vec<Address>,
}

/// Result of one scan pass over a target list.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Ascending by block number.
    pub blocks: Vec<ScannedBlock>,
    /// Targets that failed after all retries.
    pub failed: Vec<u64>,
}

/// Progress event published after each scan window closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanProgress {
    /// Targets attempted so far. Monotonically increasing.
    pub scanned: u64,
    pub total: u64,
}

// ---------------------------------------------------------------------------
// Sync orchestration
// ---------------------------------------------------------------------------

/// Orchestrator lifecycle, observable through a `watch` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncState {
    Idle,
    Scanning,
    ClassifyingTokens,
    Persisting,
}

/// Outcome metadata for one sync pass. Tolerated failures are surfaced
/// here instead of being silently dropped.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Cursor before the pass.
    pub start_height: i64,
    /// Cursor after the pass.
    pub end_height: i64,
    pub scanned_blocks: u64,
    pub new_transactions: u64,
    pub new_contracts: u64,
    pub new_tokens: u64,
    /// Blocks still unfetched after this pass; retried next sync.
    pub incomplete_blocks: Vec<u64>,
    pub no_op: bool,
    pub elapsed_ms: u64,
}

// ---------------------------------------------------------------------------
// Derived views (never persisted)
// ---------------------------------------------------------------------------

/// Node in the address-interaction graph.
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: Address,
    pub label: String,
    /// Current on-chain balance in ether. 0 when the lookup failed.
    pub balance: f64,
}

/// Undirected edge. Endpoints are sorted, `source <= target`.
#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub source: Address,
    pub target: Address,
    pub weight: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// `0x1234…` style truncation used as a node label.
pub fn display_label(addr: &Address) -> String {
    let s = addr.to_string();
    format!("{}...{}", &s[..6], &s[s.len() - 4..])
}
