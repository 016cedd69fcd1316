//! Address-interaction graph derived from cached transactions.

use alloy_primitives::{Address, U256};
use scry_core::types::display_label;
use scry_core::{Cache, GraphEdge, GraphNode, NetworkGraph, TxSummary};
use scry_provider::ChainReader;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Max concurrent balance lookups while enriching the graph.
const BALANCE_CONCURRENCY: usize = 20;

const WEI_PER_ETHER: f64 = 1e18;

/// One pass over the cached transactions: the participant set plus
/// undirected edge weights keyed by the sorted address pair.
///
/// Contract creations (`to` absent) contribute a participant but no edge.
pub fn build_edges(
    transactions: &[TxSummary],
) -> (BTreeSet<Address>, BTreeMap<(Address, Address), u64>) {
    let mut participants = BTreeSet::new();
    let mut edges: BTreeMap<(Address, Address), u64> = BTreeMap::new();

    for tx in transactions {
        participants.insert(tx.from);
        if let Some(to) = tx.to {
            participants.insert(to);
            let key = if tx.from <= to {
                (tx.from, to)
            } else {
                (to, tx.from)
            };
            *edges.entry(key).or_default() += 1;
        }
    }

    (participants, edges)
}

/// Builds the full graph: the edge fold, then one balance lookup per
/// participant with bounded concurrency. Balance failures degrade to 0.
pub async fn build_network_graph(reader: Arc<dyn ChainReader>, cache: &Cache) -> NetworkGraph {
    let (participants, edges) = build_edges(&cache.transactions);

    tracing::info!(
        nodes = participants.len(),
        edges = edges.len(),
        concurrency = BALANCE_CONCURRENCY,
        "fetching balances"
    );

    let semaphore = Arc::new(Semaphore::new(BALANCE_CONCURRENCY));
    let mut tasks = JoinSet::new();
    for &addr in &participants {
        let reader = Arc::clone(&reader);
        let sem = semaphore.clone();
        tasks.spawn(async move {
            let _permit = sem.acquire().await.unwrap();
            let balance = match reader.get_balance(addr).await {
                Ok(wei) => wei_to_ether(wei),
                Err(e) => {
                    tracing::debug!(address = %addr, error = %e, "balance lookup failed");
                    0.0
                }
            };
            (addr, balance)
        });
    }

    let mut balances: BTreeMap<Address, f64> = BTreeMap::new();
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok((addr, balance)) => {
                balances.insert(addr, balance);
            }
            Err(e) => tracing::warn!(error = %e, "balance task panicked"),
        }
    }

    NetworkGraph {
        nodes: participants
            .iter()
            .map(|addr| GraphNode {
                id: *addr,
                label: display_label(addr),
                balance: balances.get(addr).copied().unwrap_or(0.0),
            })
            .collect(),
        edges: edges
            .into_iter()
            .map(|((source, target), weight)| GraphEdge {
                source,
                target,
                weight,
            })
            .collect(),
    }
}

fn wei_to_ether(wei: U256) -> f64 {
    wei.to_string().parse::<f64>().unwrap_or(0.0) / WEI_PER_ETHER
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    fn tx(seed: u8, from: u8, to: Option<u8>) -> TxSummary {
        TxSummary {
            hash: B256::with_last_byte(seed),
            from: Address::with_last_byte(from),
            to: to.map(Address::with_last_byte),
            value_wei: "0".into(),
            block_number: 1,
            timestamp: 1_700_000_000,
            gas_price_wei: "1".into(),
        }
    }

    #[test]
    fn edge_weights_are_direction_agnostic() {
        let txs = vec![tx(1, 1, Some(2)), tx(2, 2, Some(1)), tx(3, 1, Some(2))];
        let (participants, edges) = build_edges(&txs);

        assert_eq!(participants.len(), 2);
        assert_eq!(edges.len(), 1);
        let key = (Address::with_last_byte(1), Address::with_last_byte(2));
        assert_eq!(edges[&key], 3);
    }

    #[test]
    fn creations_contribute_a_node_but_no_edge() {
        let txs = vec![tx(1, 5, None)];
        let (participants, edges) = build_edges(&txs);

        assert_eq!(participants.len(), 1);
        assert!(participants.contains(&Address::with_last_byte(5)));
        assert!(edges.is_empty());
    }

    #[test]
    fn endpoints_are_sorted_within_the_key() {
        let txs = vec![tx(1, 9, Some(3))];
        let (_, edges) = build_edges(&txs);
        let ((source, target), _) = edges.into_iter().next().unwrap();
        assert!(source <= target);
    }

    #[test]
    fn wei_conversion_scales_to_ether() {
        assert_eq!(wei_to_ether(U256::from(10).pow(U256::from(18))), 1.0);
        assert_eq!(wei_to_ether(U256::ZERO), 0.0);
    }
}
