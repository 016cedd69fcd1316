//! ERC-20 classification of newly discovered contracts.

use alloy_primitives::{Address, Bytes};
use scry_core::{Cache, TokenRecord};
use scry_provider::{erc20, ChainReader};
use std::sync::Arc;

/// Assumed when the `decimals` probe does not resolve.
const DEFAULT_DECIMALS: u8 = 18;

/// Probes contract addresses for the four-method ERC-20 surface and
/// records the ones that qualify.
pub struct TokenClassifier {
    reader: Arc<dyn ChainReader>,
}

impl TokenClassifier {
    pub fn new(reader: Arc<dyn ChainReader>) -> Self {
        Self { reader }
    }

    /// Probes each candidate not yet checked and records classified
    /// tokens in the cache. Returns how many records were written.
    ///
    /// Per-contract failures never abort the pass, and a contract is
    /// marked checked whatever the outcome: it is probed exactly once.
    pub async fn classify_new(&self, cache: &mut Cache, candidates: &[Address]) -> u64 {
        let mut recorded = 0;
        for &addr in candidates {
            if cache.checked_contracts.contains(&addr) {
                continue;
            }
            cache.checked_contracts.push(addr);

            if let Some(token) = self.probe(addr).await {
                tracing::info!(address = %addr, symbol = %token.symbol, "token classified");
                // Supply may have changed; replace any previous record.
                cache.tokens.retain(|t| t.address != addr);
                cache.tokens.push(token);
                recorded += 1;
            }
        }
        recorded
    }

    /// Issues the four probe calls concurrently, each individually
    /// tolerant. Qualifies iff name, symbol, and totalSupply resolve.
    async fn probe(&self, addr: Address) -> Option<TokenRecord> {
        let reader = self.reader.as_ref();
        let (name, symbol, decimals, total_supply) = tokio::join!(
            call_decoded(reader, addr, erc20::name_call(), erc20::decode_name),
            call_decoded(reader, addr, erc20::symbol_call(), erc20::decode_symbol),
            call_decoded(reader, addr, erc20::decimals_call(), erc20::decode_decimals),
            call_decoded(reader, addr, erc20::total_supply_call(), erc20::decode_total_supply),
        );

        let (name, symbol, total_supply) = match (name, symbol, total_supply) {
            (Some(name), Some(symbol), Some(supply)) => (name, symbol, supply),
            _ => return None,
        };
        let decimals = decimals.unwrap_or(DEFAULT_DECIMALS);

        let raw = total_supply.to_string();
        // Display-only scaling; precision loss past f64 range is fine.
        let formatted = raw.parse::<f64>().unwrap_or(0.0) / 10f64.powi(decimals as i32);

        Some(TokenRecord {
            address: addr,
            name,
            symbol,
            decimals,
            total_supply_raw: raw,
            total_supply_formatted: formatted,
        })
    }
}

async fn call_decoded<T>(
    reader: &dyn ChainReader,
    addr: Address,
    data: Bytes,
    decode: impl Fn(&[u8]) -> Option<T>,
) -> Option<T> {
    match reader.call(addr, data).await {
        Ok(out) => decode(&out),
        Err(e) => {
            tracing::debug!(address = %addr, error = %e, "probe call failed");
            None
        }
    }
}
