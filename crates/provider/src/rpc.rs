//! JSON-RPC chain reader backed by alloy-rs.

use crate::ChainReader;
use alloy_consensus::transaction::Transaction as TxTrait;
use alloy_eips::BlockId;
use alloy_primitives::{Address, Bytes, TxKind, B256, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types::{TransactionInput, TransactionReceipt, TransactionRequest};
use async_trait::async_trait;
use scry_core::error::{ScryError, ScryResult};
use scry_core::{ChainBlock, ChainTx, ReceiptInfo, TxLookup};
use std::future::IntoFuture;
use std::time::Duration;
use url::Url;

/// Per-request deadline. A slow node degrades to a tolerated per-item
/// failure instead of stalling a whole scan window.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Fetches chain data from an Ethereum JSON-RPC endpoint.
///
/// ```ignore
/// let reader = RpcReader::connect("http://10.0.0.1:8545").await?;
/// ```
pub struct RpcReader {
    provider: DynProvider,
    rpc_url: String,
}

impl RpcReader {
    pub async fn connect(rpc_url: &str) -> ScryResult<Self> {
        let url = Url::parse(rpc_url)
            .map_err(|e| ScryError::InvalidInput(format!("bad RPC URL {rpc_url}: {e}")))?;

        let provider = ProviderBuilder::new()
            .connect(url.as_str())
            .await
            .map_err(|e| ScryError::Node(format!("Failed to connect to {rpc_url}: {e}")))?;

        tracing::info!(rpc_url, "connected");

        Ok(Self {
            provider: provider.erased(),
            rpc_url: rpc_url.to_string(),
        })
    }
}

/// Awaits `fut` under [`REQUEST_TIMEOUT`], mapping both transport errors
/// and the deadline to [`ScryError::Node`].
async fn timed<T, E>(what: &str, fut: impl IntoFuture<Output = Result<T, E>>) -> ScryResult<T>
where
    E: std::fmt::Display,
{
    match tokio::time::timeout(REQUEST_TIMEOUT, fut.into_future()).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ScryError::Node(format!("{what}: {e}"))),
        Err(_) => Err(ScryError::Node(format!(
            "{what}: no response within {REQUEST_TIMEOUT:?}"
        ))),
    }
}

fn to_chain_tx<T: TxTrait>(hash: B256, from: Address, tx: &T) -> ChainTx {
    ChainTx {
        hash,
        from,
        to: tx.to(),
        value: tx.value(),
        // Legacy txs carry an explicit gas price; 1559 txs cap at max fee.
        gas_price: tx.gas_price().unwrap_or_else(|| tx.max_fee_per_gas()),
    }
}

fn to_receipt_info(receipt: &TransactionReceipt) -> ReceiptInfo {
    ReceiptInfo {
        tx_hash: receipt.transaction_hash,
        block_number: receipt.block_number,
        contract_address: receipt.contract_address,
        gas_used: receipt.gas_used,
        success: receipt.status(),
    }
}

#[async_trait]
impl ChainReader for RpcReader {
    async fn latest_height(&self) -> ScryResult<u64> {
        timed("latest height", self.provider.get_block_number()).await
    }

    async fn get_block(&self, id: BlockId, full: bool) -> ScryResult<Option<ChainBlock>> {
        tracing::debug!(?id, full, rpc_url = %self.rpc_url, "fetching block");

        let block = if full {
            timed("get block", self.provider.get_block(id).full()).await?
        } else {
            timed("get block", self.provider.get_block(id)).await?
        };

        let Some(block) = block else {
            return Ok(None);
        };

        let transactions: Vec<ChainTx> = block
            .transactions
            .into_transactions()
            .map(|tx| to_chain_tx(*tx.inner.tx_hash(), tx.inner.signer(), &tx))
            .collect();

        Ok(Some(ChainBlock {
            number: block.header.number,
            timestamp: block.header.timestamp,
            miner: block.header.beneficiary,
            gas_used: block.header.gas_used,
            gas_limit: block.header.gas_limit,
            transactions,
        }))
    }

    async fn get_transaction(&self, hash: B256) -> ScryResult<Option<TxLookup>> {
        let (tx, receipt) = tokio::join!(
            timed("get transaction", self.provider.get_transaction_by_hash(hash)),
            timed("get receipt", self.provider.get_transaction_receipt(hash)),
        );

        let Some(tx) = tx? else {
            return Ok(None);
        };
        let receipt = receipt?;

        let chain_tx = to_chain_tx(*tx.inner.tx_hash(), tx.inner.signer(), &tx);
        Ok(Some(TxLookup {
            hash: chain_tx.hash,
            from: chain_tx.from,
            to: chain_tx.to,
            value_wei: chain_tx.value.to_string(),
            gas_price_wei: chain_tx.gas_price.to_string(),
            block_number: tx.block_number,
            receipt: receipt.as_ref().map(to_receipt_info),
        }))
    }

    async fn get_receipt(&self, hash: B256) -> ScryResult<Option<ReceiptInfo>> {
        let receipt = timed("get receipt", self.provider.get_transaction_receipt(hash)).await?;
        Ok(receipt.as_ref().map(to_receipt_info))
    }

    async fn get_balance(&self, addr: Address) -> ScryResult<U256> {
        timed("get balance", self.provider.get_balance(addr)).await
    }

    async fn get_tx_count(&self, addr: Address) -> ScryResult<u64> {
        timed("get tx count", self.provider.get_transaction_count(addr)).await
    }

    async fn get_fee_estimate(&self) -> ScryResult<u128> {
        timed("gas price", self.provider.get_gas_price()).await
    }

    async fn call(&self, to: Address, data: Bytes) -> ScryResult<Bytes> {
        let request = TransactionRequest {
            to: Some(TxKind::Call(to)),
            input: TransactionInput::new(data),
            ..Default::default()
        };
        timed("contract call", self.provider.call(request)).await
    }
}
