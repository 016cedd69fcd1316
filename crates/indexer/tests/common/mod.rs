//! In-memory chain double used by the integration tests.
//!
//! Serves blocks, receipts, balances, and ERC-20 probe responses from
//! plain maps, and records every block request and probe call so tests
//! can assert on exactly what the indexer asked the node for.

// Each test target compiles its own copy; not every target uses every helper.
#![allow(dead_code)]

use alloy_eips::{BlockId, BlockNumberOrTag};
use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use scry_core::error::{ScryError, ScryResult};
use scry_core::{ChainBlock, ChainTx, ReceiptInfo, TxLookup};
use scry_provider::ChainReader;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

/// ERC-20 metadata the mock serves for a deployed contract.
#[derive(Debug, Clone)]
pub struct MockToken {
    pub name: String,
    pub symbol: String,
    /// `None` makes the decimals probe revert.
    pub decimals: Option<u8>,
    pub total_supply: U256,
}

#[derive(Default)]
pub struct MockChain {
    blocks: Mutex<Vec<ChainBlock>>,
    /// Creation tx hash -> deployed contract address.
    receipts: Mutex<HashMap<B256, Address>>,
    balances: Mutex<HashMap<Address, U256>>,
    tokens: Mutex<HashMap<Address, MockToken>>,
    fail_blocks: Mutex<HashSet<u64>>,
    requested_blocks: Mutex<Vec<u64>>,
    probe_calls: Mutex<Vec<Address>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn addr(byte: u8) -> Address {
        Address::with_last_byte(byte)
    }

    pub fn tx(seed: u64, from: u8, to: Option<u8>) -> ChainTx {
        ChainTx {
            hash: B256::from(U256::from(seed)),
            from: Self::addr(from),
            to: to.map(Self::addr),
            value: U256::from(1_000_000_000_000_000_000u128),
            gas_price: 1_000_000_000,
        }
    }

    /// Appends a block with the given transactions; returns its number.
    pub fn push_block(&self, transactions: Vec<ChainTx>) -> u64 {
        let mut blocks = self.blocks.lock().unwrap();
        let number = blocks.len() as u64;
        blocks.push(ChainBlock {
            number,
            timestamp: GENESIS_TIMESTAMP + number * 12,
            miner: Self::addr(0xee),
            gas_used: 21_000 * transactions.len() as u64,
            gas_limit: 30_000_000,
            transactions,
        });
        number
    }

    pub fn push_empty_blocks(&self, count: u64) {
        for _ in 0..count {
            self.push_block(Vec::new());
        }
    }

    /// A contract-creation transaction whose receipt reports `contract`.
    pub fn deploy_tx(&self, seed: u64, from: u8, contract: Address) -> ChainTx {
        let tx = Self::tx(seed, from, None);
        self.receipts.lock().unwrap().insert(tx.hash, contract);
        tx
    }

    pub fn set_token(&self, contract: Address, token: MockToken) {
        self.tokens.lock().unwrap().insert(contract, token);
    }

    pub fn set_balance(&self, addr: Address, wei: U256) {
        self.balances.lock().unwrap().insert(addr, wei);
    }

    pub fn fail_block(&self, number: u64) {
        self.fail_blocks.lock().unwrap().insert(number);
    }

    pub fn heal_block(&self, number: u64) {
        self.fail_blocks.lock().unwrap().remove(&number);
    }

    pub fn requested_blocks(&self) -> Vec<u64> {
        self.requested_blocks.lock().unwrap().clone()
    }

    pub fn clear_requested(&self) {
        self.requested_blocks.lock().unwrap().clear();
    }

    pub fn probe_calls(&self) -> Vec<Address> {
        self.probe_calls.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------------------
// ABI return encodings (standard offset/length/word layout)
// ---------------------------------------------------------------------------

pub fn abi_string(s: &str) -> Bytes {
    let mut out = Vec::with_capacity(96);
    out.extend_from_slice(&U256::from(0x20u64).to_be_bytes::<32>());
    out.extend_from_slice(&U256::from(s.len() as u64).to_be_bytes::<32>());
    let mut padded = s.as_bytes().to_vec();
    padded.resize(s.len().div_ceil(32) * 32, 0);
    out.extend_from_slice(&padded);
    Bytes::from(out)
}

pub fn abi_word(value: U256) -> Bytes {
    Bytes::from(value.to_be_bytes::<32>().to_vec())
}

#[async_trait]
impl ChainReader for MockChain {
    async fn latest_height(&self) -> ScryResult<u64> {
        let blocks = self.blocks.lock().unwrap();
        if blocks.is_empty() {
            return Err(ScryError::Node("no blocks".into()));
        }
        Ok(blocks.len() as u64 - 1)
    }

    async fn get_block(&self, id: BlockId, _full: bool) -> ScryResult<Option<ChainBlock>> {
        let number = match id {
            BlockId::Number(BlockNumberOrTag::Number(n)) => n,
            _ => return Err(ScryError::InvalidInput("mock expects numbered lookups".into())),
        };
        self.requested_blocks.lock().unwrap().push(number);
        if self.fail_blocks.lock().unwrap().contains(&number) {
            return Err(ScryError::Node(format!("injected failure for block {number}")));
        }
        Ok(self.blocks.lock().unwrap().get(number as usize).cloned())
    }

    async fn get_transaction(&self, hash: B256) -> ScryResult<Option<TxLookup>> {
        let blocks = self.blocks.lock().unwrap();
        for block in blocks.iter() {
            if let Some(tx) = block.transactions.iter().find(|tx| tx.hash == hash) {
                let receipt = self.receipts.lock().unwrap().get(&hash).map(|&addr| ReceiptInfo {
                    tx_hash: hash,
                    block_number: Some(block.number),
                    contract_address: Some(addr),
                    gas_used: 50_000,
                    success: true,
                });
                return Ok(Some(TxLookup {
                    hash,
                    from: tx.from,
                    to: tx.to,
                    value_wei: tx.value.to_string(),
                    gas_price_wei: tx.gas_price.to_string(),
                    block_number: Some(block.number),
                    receipt,
                }));
            }
        }
        Ok(None)
    }

    async fn get_receipt(&self, hash: B256) -> ScryResult<Option<ReceiptInfo>> {
        Ok(self.receipts.lock().unwrap().get(&hash).map(|&addr| ReceiptInfo {
            tx_hash: hash,
            block_number: None,
            contract_address: Some(addr),
            gas_used: 50_000,
            success: true,
        }))
    }

    async fn get_balance(&self, addr: Address) -> ScryResult<U256> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(&addr)
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn get_tx_count(&self, addr: Address) -> ScryResult<u64> {
        let blocks = self.blocks.lock().unwrap();
        Ok(blocks
            .iter()
            .flat_map(|b| &b.transactions)
            .filter(|tx| tx.from == addr)
            .count() as u64)
    }

    async fn get_fee_estimate(&self) -> ScryResult<u128> {
        Ok(2_000_000_000)
    }

    async fn call(&self, to: Address, data: Bytes) -> ScryResult<Bytes> {
        self.probe_calls.lock().unwrap().push(to);

        let token = self.tokens.lock().unwrap().get(&to).cloned();
        let Some(token) = token else {
            return Err(ScryError::Node("execution reverted".into()));
        };
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| ScryError::InvalidInput("missing selector".into()))?;

        match selector {
            [0x06, 0xfd, 0xde, 0x03] => Ok(abi_string(&token.name)),
            [0x95, 0xd8, 0x9b, 0x41] => Ok(abi_string(&token.symbol)),
            [0x31, 0x3c, 0xe5, 0x67] => match token.decimals {
                Some(d) => Ok(abi_word(U256::from(d))),
                None => Err(ScryError::Node("execution reverted".into())),
            },
            [0x18, 0x16, 0x0d, 0xdd] => Ok(abi_word(token.total_supply)),
            _ => Err(ScryError::Node("unknown method".into())),
        }
    }
}
