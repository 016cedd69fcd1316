//! Chain access layer: node façade and windowed batch scanning.

pub mod erc20;
pub mod rpc;
pub mod scanner;

use alloy_eips::BlockId;
use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use scry_core::{ChainBlock, ReceiptInfo, ScryResult, TxLookup};

pub use rpc::RpcReader;
pub use scanner::{BatchScanner, DEFAULT_WINDOW};

/// Stateless façade over a remote node. Purely transport, no caching.
///
/// Any call may fail while the node is unreachable; callers decide per
/// call whether a failure is fatal or tolerated.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Current chain height.
    async fn latest_height(&self) -> ScryResult<u64>;

    /// Fetch a block by number or hash. `full` embeds transactions.
    async fn get_block(&self, id: BlockId, full: bool) -> ScryResult<Option<ChainBlock>>;

    /// Fetch a transaction joined with its receipt.
    async fn get_transaction(&self, hash: B256) -> ScryResult<Option<TxLookup>>;

    /// Fetch a transaction receipt.
    async fn get_receipt(&self, hash: B256) -> ScryResult<Option<ReceiptInfo>>;

    /// Current balance in wei.
    async fn get_balance(&self, addr: Address) -> ScryResult<U256>;

    /// Transaction count (nonce) for an address.
    async fn get_tx_count(&self, addr: Address) -> ScryResult<u64>;

    /// Current gas price estimate in wei.
    async fn get_fee_estimate(&self) -> ScryResult<u128>;

    /// Read-only contract call. Returns the raw ABI-encoded output.
    async fn call(&self, to: Address, data: Bytes) -> ScryResult<Bytes>;
}
