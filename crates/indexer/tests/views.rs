//! Query-surface rendering over a synced cache.

mod common;

use alloy_primitives::U256;
use common::MockChain;
use scry_core::error::ScryError;
use scry_indexer::{CacheStore, SyncOrchestrator, ViewKind, ViewServer};
use scry_provider::ChainReader;
use std::sync::Arc;

async fn synced_cache(chain: &Arc<MockChain>) -> scry_core::Cache {
    let dir = tempfile::tempdir().unwrap();
    let orch = SyncOrchestrator::new(
        Arc::clone(chain) as Arc<dyn ChainReader>,
        CacheStore::new(dir.path()),
    );
    let (cache, _) = orch.sync().await.unwrap();
    cache
}

#[tokio::test]
async fn dashboard_serves_the_six_newest_entries() {
    let chain = Arc::new(MockChain::new());
    for i in 0..10 {
        chain.push_block(vec![MockChain::tx(100 + i, 1, Some(2))]);
    }
    let cache = synced_cache(&chain).await;

    let server = ViewServer::new(Arc::clone(&chain) as Arc<dyn ChainReader>);
    let view = server.render(ViewKind::Dashboard, &cache).await.unwrap();

    let blocks = view["latestBlocks"].as_array().unwrap();
    assert_eq!(blocks.len(), 6);
    assert_eq!(blocks[0]["number"], 9);
    assert_eq!(blocks[5]["number"], 4);

    let txs = view["latestTransactions"].as_array().unwrap();
    assert_eq!(txs.len(), 6);
    assert_eq!(txs[0]["blockNumber"], 9);

    assert_eq!(view["gasPriceGwei"], 2.0);
    assert_eq!(view["lastScannedBlock"], 9);
    assert!(view["lastSynced"].is_string());
}

#[tokio::test]
async fn network_view_is_symmetric_and_balance_enriched() {
    let chain = Arc::new(MockChain::new());
    chain.push_block(vec![MockChain::tx(1, 1, Some(2)), MockChain::tx(2, 2, Some(1))]);
    chain.set_balance(
        MockChain::addr(1),
        U256::from(2u64) * U256::from(10u64).pow(U256::from(18u64)),
    );
    let cache = synced_cache(&chain).await;

    let server = ViewServer::new(Arc::clone(&chain) as Arc<dyn ChainReader>);
    let view = server.render(ViewKind::Network, &cache).await.unwrap();

    let edges = view["edges"].as_array().unwrap();
    assert_eq!(edges.len(), 1, "one undirected edge for both directions");
    assert_eq!(edges[0]["weight"], 2);

    let nodes = view["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 2);
    let node_one = nodes
        .iter()
        .find(|n| n["id"] == format!("{}", MockChain::addr(1)))
        .unwrap();
    assert_eq!(node_one["balance"], 2.0);
    assert!(node_one["label"].as_str().unwrap().contains("..."));
}

#[tokio::test]
async fn tokens_and_transactions_views_carry_staleness_fields() {
    let chain = Arc::new(MockChain::new());
    chain.push_block(vec![MockChain::tx(5, 3, Some(4))]);
    let cache = synced_cache(&chain).await;

    let server = ViewServer::new(Arc::clone(&chain) as Arc<dyn ChainReader>);
    for kind in [ViewKind::All, ViewKind::Transactions, ViewKind::Tokens] {
        let view = server.render(kind, &cache).await.unwrap();
        assert_eq!(view["lastScannedBlock"], 0);
        assert!(view["lastSynced"].is_string());
    }

    let all = server.render(ViewKind::All, &cache).await.unwrap();
    assert_eq!(all["txCount"], 1);
    assert_eq!(all["blockCount"], 1);
}

#[tokio::test]
async fn heatmap_view_totals_match_the_cache() {
    let chain = Arc::new(MockChain::new());
    chain.push_block(vec![MockChain::tx(1, 1, Some(2)), MockChain::tx(2, 2, Some(3))]);
    chain.push_block(vec![MockChain::tx(3, 3, Some(4))]);
    let cache = synced_cache(&chain).await;

    let hourly = scry_indexer::views::heatmap_view(&cache, false).unwrap();
    let total: u64 = hourly
        .as_object()
        .unwrap()
        .values()
        .map(|v| v.as_u64().unwrap())
        .sum();
    assert_eq!(total, cache.transactions.len() as u64);

    let daily = scry_indexer::views::heatmap_view(&cache, true).unwrap();
    let daily_total: u64 = daily
        .as_object()
        .unwrap()
        .values()
        .map(|v| v.as_u64().unwrap())
        .sum();
    assert_eq!(daily_total, total);
}

#[tokio::test]
async fn detail_lookups_resolve_live_data() {
    let chain = Arc::new(MockChain::new());
    let tx = MockChain::tx(77, 5, Some(6));
    let hash = tx.hash;
    chain.push_block(vec![tx]);
    let cache = synced_cache(&chain).await;

    let server = ViewServer::new(Arc::clone(&chain) as Arc<dyn ChainReader>);

    let block = server.block_detail(0u64.into()).await.unwrap();
    assert_eq!(block["number"], 0);
    assert_eq!(block["txCount"], 1);

    let tx_view = server.tx_detail(hash).await.unwrap();
    assert_eq!(tx_view["blockNumber"], 0);
    assert_eq!(tx_view["from"], format!("{}", MockChain::addr(5)));

    let addr_view = server
        .address_detail(&cache, MockChain::addr(5))
        .await
        .unwrap();
    assert_eq!(addr_view["txCount"], 1);
    assert_eq!(addr_view["history"].as_array().unwrap().len(), 1);

    let missing = server.tx_detail(alloy_primitives::B256::ZERO).await;
    assert!(matches!(missing, Err(ScryError::NotFound(_))));
}
