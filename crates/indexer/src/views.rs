//! Query surface consumed by presentation layers.
//!
//! Every response carries `lastScannedBlock` and `lastSynced` so callers
//! can display staleness. Errors have exactly one wire shape:
//! `{"error": message}`.

use crate::{graph, heatmap};
use alloy_eips::BlockId;
use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use scry_core::error::{ScryError, ScryResult};
use scry_core::{BlockSummary, Cache, GraphEdge, GraphNode, TokenRecord, TxSummary};
use scry_provider::ChainReader;
use serde::Serialize;
use std::sync::Arc;

/// Entries on the dashboard's recent-activity lists.
const DASHBOARD_ITEMS: usize = 6;

const WEI_PER_GWEI: f64 = 1e9;

/// View kinds the query surface serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    All,
    Transactions,
    Tokens,
    Network,
    Dashboard,
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AllView<'a> {
    blocks: &'a [BlockSummary],
    transactions: &'a [TxSummary],
    tokens: &'a [TokenRecord],
    contracts: &'a [Address],
    block_count: usize,
    tx_count: usize,
    token_count: usize,
    contract_count: usize,
    last_scanned_block: i64,
    last_synced: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionsView<'a> {
    transactions: &'a [TxSummary],
    last_scanned_block: i64,
    last_synced: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokensView<'a> {
    tokens: &'a [TokenRecord],
    last_scanned_block: i64,
    last_synced: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NetworkView {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    last_scanned_block: i64,
    last_synced: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardView<'a> {
    latest_blocks: Vec<&'a BlockSummary>,
    latest_transactions: Vec<&'a TxSummary>,
    gas_price_gwei: f64,
    last_scanned_block: i64,
    last_synced: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddressView<'a> {
    address: Address,
    balance_wei: String,
    balance_ether: f64,
    tx_count: u64,
    history: Vec<&'a TxSummary>,
    last_scanned_block: i64,
    last_synced: Option<DateTime<Utc>>,
}

/// The single wire error shape.
pub fn error_body(err: &ScryError) -> serde_json::Value {
    serde_json::json!({ "error": err.to_string() })
}

/// The hour-bucketed activity heatmap, optionally reduced to days.
/// Cache-local: needs no node connection.
pub fn heatmap_view(cache: &Cache, daily: bool) -> ScryResult<serde_json::Value> {
    let buckets = heatmap::build_heatmap(&cache.transactions);
    if daily {
        to_value(&heatmap::daily_totals(&buckets))
    } else {
        to_value(&buckets)
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Renders views over a cache snapshot. Needs the node only for the
/// balance- and fee-enriched views; everything else is cache-local.
pub struct ViewServer {
    reader: Arc<dyn ChainReader>,
}

impl ViewServer {
    pub fn new(reader: Arc<dyn ChainReader>) -> Self {
        Self { reader }
    }

    pub async fn render(&self, kind: ViewKind, cache: &Cache) -> ScryResult<serde_json::Value> {
        let value = match kind {
            ViewKind::All => to_value(&AllView {
                blocks: &cache.blocks,
                transactions: &cache.transactions,
                tokens: &cache.tokens,
                contracts: &cache.contracts,
                block_count: cache.blocks.len(),
                tx_count: cache.transactions.len(),
                token_count: cache.tokens.len(),
                contract_count: cache.contracts.len(),
                last_scanned_block: cache.last_scanned_block,
                last_synced: cache.last_synced,
            })?,
            ViewKind::Transactions => to_value(&TransactionsView {
                transactions: &cache.transactions,
                last_scanned_block: cache.last_scanned_block,
                last_synced: cache.last_synced,
            })?,
            ViewKind::Tokens => to_value(&TokensView {
                tokens: &cache.tokens,
                last_scanned_block: cache.last_scanned_block,
                last_synced: cache.last_synced,
            })?,
            ViewKind::Network => {
                let network = graph::build_network_graph(Arc::clone(&self.reader), cache).await;
                to_value(&NetworkView {
                    nodes: network.nodes,
                    edges: network.edges,
                    last_scanned_block: cache.last_scanned_block,
                    last_synced: cache.last_synced,
                })?
            }
            ViewKind::Dashboard => {
                // Fee estimate degrades to 0 when the node is unreachable;
                // the dashboard still serves the cached snapshot.
                let gas_price = match self.reader.get_fee_estimate().await {
                    Ok(wei) => wei as f64 / WEI_PER_GWEI,
                    Err(e) => {
                        tracing::warn!(error = %e, "fee estimate unavailable");
                        0.0
                    }
                };
                to_value(&DashboardView {
                    latest_blocks: cache.blocks.iter().rev().take(DASHBOARD_ITEMS).collect(),
                    latest_transactions: cache
                        .transactions
                        .iter()
                        .rev()
                        .take(DASHBOARD_ITEMS)
                        .collect(),
                    gas_price_gwei: gas_price,
                    last_scanned_block: cache.last_scanned_block,
                    last_synced: cache.last_synced,
                })?
            }
        };
        Ok(value)
    }

    /// Live block lookup by number or hash.
    pub async fn block_detail(&self, id: BlockId) -> ScryResult<serde_json::Value> {
        let block = self
            .reader
            .get_block(id, true)
            .await?
            .ok_or_else(|| ScryError::NotFound(format!("block {id:?}")))?;

        let transactions: Vec<TxSummary> = block
            .transactions
            .iter()
            .map(|tx| TxSummary {
                hash: tx.hash,
                from: tx.from,
                to: tx.to,
                value_wei: tx.value.to_string(),
                block_number: block.number,
                timestamp: block.timestamp,
                gas_price_wei: tx.gas_price.to_string(),
            })
            .collect();

        to_value(&serde_json::json!({
            "number": block.number,
            "timestamp": block.timestamp,
            "miner": block.miner,
            "gasUsed": block.gas_used,
            "gasLimit": block.gas_limit,
            "txCount": transactions.len(),
            "transactions": transactions,
        }))
    }

    /// Live transaction lookup, joined with its receipt.
    pub async fn tx_detail(&self, hash: alloy_primitives::B256) -> ScryResult<serde_json::Value> {
        let lookup = self
            .reader
            .get_transaction(hash)
            .await?
            .ok_or_else(|| ScryError::NotFound(format!("transaction {hash}")))?;
        to_value(&lookup)
    }

    /// Live balance and nonce plus the cached per-address history.
    pub async fn address_detail(
        &self,
        cache: &Cache,
        addr: Address,
    ) -> ScryResult<serde_json::Value> {
        let (balance, tx_count) = tokio::join!(
            self.reader.get_balance(addr),
            self.reader.get_tx_count(addr),
        );
        let balance = balance?;
        let tx_count = tx_count?;

        to_value(&AddressView {
            address: addr,
            balance_wei: balance.to_string(),
            balance_ether: balance.to_string().parse::<f64>().unwrap_or(0.0) / 1e18,
            tx_count,
            history: cache.address_history(addr),
            last_scanned_block: cache.last_scanned_block,
            last_synced: cache.last_synced,
        })
    }
}

fn to_value<T: Serialize>(value: &T) -> ScryResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| ScryError::Internal(format!("serialize view: {e}")))
}
